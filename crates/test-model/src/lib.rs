//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use binnai_model::{
    ContentPart, ErrorKind, GenerateRequest, GeneratedContent, InlineData,
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A request received by [`TestModelProvider`].
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedRequest {
    /// A streaming text request.
    Stream(ModelRequest),
    /// A single-shot generation request.
    Generate(GenerateRequest),
}

pub struct TestModelResponse {
    events: VecDeque<PresetEvent>,
    completed: bool,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            match this.events.pop_front() {
                Some(PresetEvent::MessageDelta(msg)) => {
                    return Poll::Ready(Ok(Some(
                        ModelResponseEvent::MessageDelta(msg),
                    )));
                }
                Some(PresetEvent::Failure(message)) => {
                    this.events.clear();
                    this.completed = true;
                    return Poll::Ready(Err(Error::new(
                        message,
                        ErrorKind::Other,
                    )));
                }
                None if !this.completed => {
                    this.completed = true;
                    return Poll::Ready(Ok(Some(
                        ModelResponseEvent::Completed(ModelFinishReason::Stop),
                    )));
                }
                // In case this method is called after completion.
                None => return Poll::Ready(Ok(None)),
            }
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    requests: Vec<RecordedRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to queue the preset responses, which
/// are consumed in order, one per request, regardless of the endpoint. If
/// the queue runs dry, or the next preset doesn't fit the endpoint, an
/// error is returned. Every request is recorded and can be inspected with
/// [`TestModelProvider::requests`].
///
/// Clones share the same script, so a test can keep a clone around after
/// handing the provider over.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.lock_script().responses.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock_script().requests.clone()
    }

    /// Returns the number of preset responses not consumed yet.
    pub fn remaining_responses(&self) -> usize {
        self.lock_script().responses.len()
    }

    fn lock_script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, request: RecordedRequest) -> Option<PresetResponse> {
        let mut script = self.lock_script();
        script.requests.push(request);
        script.responses.pop_front()
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result =
            match self.next_response(RecordedRequest::Stream(req.clone())) {
                Some(PresetResponse::Stream { events }) => {
                    Ok(TestModelResponse {
                        events: events.into(),
                        completed: false,
                        delay: self.delay.unwrap_or(Duration::from_millis(1)),
                        sleep: None,
                    })
                }
                Some(PresetResponse::Rejected { message, kind }) => {
                    Err(Error::new(message, kind))
                }
                Some(PresetResponse::Content { .. }) => Err(Error::new(
                    "not a streaming response step",
                    ErrorKind::Other,
                )),
                None => Err(Error::new("no enough steps", ErrorKind::Other)),
            };
        ready(result)
    }

    fn generate_content(
        &self,
        req: &GenerateRequest,
    ) -> impl Future<Output = Result<GeneratedContent, Self::Error>> + Send + 'static
    {
        let result =
            match self.next_response(RecordedRequest::Generate(req.clone())) {
                Some(PresetResponse::Content { parts }) => {
                    Ok(GeneratedContent {
                        parts: parts.into_iter().map(content_part).collect(),
                    })
                }
                Some(PresetResponse::Rejected { message, kind }) => {
                    Err(Error::new(message, kind))
                }
                Some(PresetResponse::Stream { .. }) => Err(Error::new(
                    "not a generation response step",
                    ErrorKind::Other,
                )),
                None => Err(Error::new("no enough steps", ErrorKind::Other)),
            };
        ready(result)
    }
}

fn content_part(part: PresetPart) -> ContentPart {
    match part {
        PresetPart::Text(text) => ContentPart::Text(text),
        PresetPart::Image { mime_type, data } => {
            ContentPart::InlineData(InlineData { mime_type, data })
        }
    }
}
