use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use binnai_model::{
    ContentPart, ErrorKind, GenerateRequest, GeneratedContent, InlineData,
    ModelFinishReason, ModelMessage, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug)]
struct FakeModelResponse {
    fake_items: VecDeque<String>,
    completed: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeModelResponse {
    fn new(input: &str) -> Self {
        let fake_items = format!("Kamu bilang {}", input)
            .split(" ")
            .map(ToString::to_string)
            .collect();
        Self {
            fake_items,
            completed: false,
            sleep: None,
        }
    }
}

impl ModelResponse for FakeModelResponse {
    type Error = FakeModelProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            if let Some(mut this_item) = this.fake_items.pop_front() {
                if !this.fake_items.is_empty() {
                    this_item.push(' ');
                }
                return Poll::Ready(Ok(Some(
                    ModelResponseEvent::MessageDelta(this_item),
                )));
            }
            if !this.completed {
                this.completed = true;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            }

            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;
    type Response = FakeModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = match req.messages.last() {
            Some(ModelMessage::User(text)) => Ok(FakeModelResponse::new(text)),
            _ => Err(FakeModelProviderError(ErrorKind::Other)),
        };
        ready(result)
    }

    fn generate_content(
        &self,
        req: &GenerateRequest,
    ) -> impl Future<Output = Result<GeneratedContent, Self::Error>> + Send + 'static
    {
        let result = if req.prompt.is_empty() {
            Err(FakeModelProviderError(ErrorKind::Moderated))
        } else {
            Ok(GeneratedContent {
                parts: vec![
                    ContentPart::Text(format!("Ini {}", req.prompt)),
                    ContentPart::InlineData(InlineData {
                        mime_type: "image/png".to_owned(),
                        data: "iVBORw0KGgo=".to_owned(),
                    }),
                ],
            })
        };
        ready(result)
    }
}

mod tests {
    use std::future::poll_fn;

    use super::*;

    fn user_request(text: &str) -> ModelRequest {
        ModelRequest {
            system_instruction: None,
            temperature: None,
            messages: vec![ModelMessage::User(text.to_string())],
        }
    }

    #[tokio::test]
    async fn test_completion() {
        let provider = FakeModelProvider;
        let mut resp =
            provider.send_request(&user_request("Selamat pagi")).await.unwrap();

        let mut resp_message = String::new();
        let mut finish_reason = None;
        loop {
            let resp_fut =
                poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx));
            match resp_fut.await {
                Ok(Some(ModelResponseEvent::MessageDelta(delta))) => {
                    resp_message.push_str(&delta);
                }
                Ok(Some(ModelResponseEvent::Completed(reason))) => {
                    finish_reason = Some(reason);
                }
                Ok(None) => break,
                Err(err) => unreachable!("unexpected error: {err:?}"),
            }
        }

        assert_eq!(resp_message, "Kamu bilang Selamat pagi");
        assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_error() {
        let provider = FakeModelProvider;
        let req = ModelRequest {
            system_instruction: Some("Jawab singkat.".to_string()),
            temperature: Some(0.7),
            messages: vec![],
        };
        let err = provider.send_request(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_generate_content_keeps_part_order() {
        let provider = FakeModelProvider;
        let content = provider
            .generate_content(&GenerateRequest {
                prompt: "kucing".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(content.parts.len(), 2);
        assert_eq!(content.parts[0], ContentPart::Text("Ini kucing".into()));
        assert!(matches!(content.parts[1], ContentPart::InlineData(_)));

        let err = provider
            .generate_content(&GenerateRequest {
                prompt: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }
}
