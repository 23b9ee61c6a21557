//! The gateway between the chat and the generative backend.

use std::collections::VecDeque;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use binnai_model::{
    ContentPart, ErrorKind, GenerateRequest, GeneratedContent, ModelMessage,
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use thiserror::Error;
use tracing::Instrument;

use crate::dispatch::{self, Dispatch};

/// Shown when the backend fails without a message of its own.
pub const FALLBACK_ERROR_MESSAGE: &str =
    "Oops! Gangguan sistem. Coba lagi nanti.";

/// Final text of an image exchange that delivered an image.
pub const IMAGE_COMPLETION_NOTE: &str = "Gambar berhasil dibuat!";

/// Sampling temperature of the text endpoint.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const SYSTEM_INSTRUCTION: &str = include_str!("./system_instruction.md");

/// A failed backend call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    message: String,
    kind: ErrorKind,
}

impl GatewayError {
    fn from_provider<E: ModelProviderError>(err: E) -> Self {
        error!("backend call failed: {err:?}");
        let message = err.to_string();
        let message = if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_owned()
        } else {
            message
        };
        Self {
            message,
            kind: err.kind(),
        }
    }

    /// Returns the human-readable message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the kind reported by the backend.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// An incremental result of an exchange.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeEvent {
    /// A piece of model text, to be appended as is.
    TextChunk(String),
    /// A generated image, as a `data:` URL.
    ImageReady(String),
}

type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type BoxedResponse = Pin<Box<dyn ErasedResponse>>;
type StreamFuture = BoxedFuture<Result<BoxedResponse, GatewayError>>;
type GenerateFuture = BoxedFuture<Result<GeneratedContent, GatewayError>>;
type StreamFn = Arc<dyn Fn(ModelRequest) -> StreamFuture + Send + Sync>;
type GenerateFn = Arc<dyn Fn(GenerateRequest) -> GenerateFuture + Send + Sync>;

trait ErasedResponse: Send {
    fn poll_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, GatewayError>>;
}

impl<R: ModelResponse> ErasedResponse for R {
    #[inline]
    fn poll_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, GatewayError>> {
        self.poll_next_event(cx).map_err(GatewayError::from_provider)
    }
}

/// Translates user messages into backend calls.
///
/// The gateway classifies every message, calls either the streaming text
/// endpoint or the single-shot image endpoint, and hides that distinction
/// behind one event sequence ([`Exchange`]). It also keeps the history of
/// completed text exchanges, which is sent along with the next text
/// request until [`Gateway::reset_chat`] is called.
pub struct Gateway {
    stream_fn: StreamFn,
    generate_fn: GenerateFn,
    system_instruction: String,
    temperature: f32,
    history: Vec<ModelMessage>,
}

impl Gateway {
    /// Creates a gateway on top of the given provider, with the BinnAI
    /// persona and the default temperature.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so that nothing above the gateway needs to be generic
        // over the provider.
        let provider = Arc::new(provider);
        let stream_fn: StreamFn = {
            let provider = Arc::clone(&provider);
            Arc::new(move |req: ModelRequest| -> StreamFuture {
                let fut = provider.send_request(&req);
                Box::pin(async move {
                    trace!("got a stream request: {req:?}");
                    match fut.await {
                        Ok(resp) => Ok(Box::pin(resp) as BoxedResponse),
                        Err(err) => Err(GatewayError::from_provider(err)),
                    }
                })
            })
        };
        let generate_fn: GenerateFn =
            Arc::new(move |req: GenerateRequest| -> GenerateFuture {
                let fut = provider.generate_content(&req);
                Box::pin(async move {
                    trace!("got a generate request: {req:?}");
                    fut.await.map_err(GatewayError::from_provider)
                })
            });

        Self {
            stream_fn,
            generate_fn,
            system_instruction: SYSTEM_INSTRUCTION.trim().to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            history: Vec::new(),
        }
    }

    /// Replaces the system instruction of the text endpoint.
    #[inline]
    pub fn with_system_instruction<S: Into<String>>(
        mut self,
        instruction: S,
    ) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Replaces the sampling temperature of the text endpoint.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns the system instruction sent with every text request.
    #[inline]
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Returns the retained history of completed text exchanges.
    #[inline]
    pub fn history(&self) -> &[ModelMessage] {
        &self.history
    }

    /// Starts one backend call for `text`.
    ///
    /// The text is expected to be trimmed and non-empty. For image
    /// requests the whole call happens here, for text requests this
    /// returns as soon as the backend accepted the stream.
    pub async fn send_message(
        &mut self,
        text: &str,
    ) -> Result<Exchange<'_>, GatewayError> {
        let dispatch = dispatch::classify(text);
        debug!("dispatching message as {dispatch:?}");

        let source = match dispatch {
            Dispatch::Image => {
                let req = GenerateRequest {
                    prompt: text.to_owned(),
                };
                let content = (self.generate_fn)(req)
                    .instrument(debug_span!("generate content"))
                    .await?;
                ExchangeSource::Parts(content.parts.into())
            }
            Dispatch::Text => {
                let mut messages = self.history.clone();
                messages.push(ModelMessage::User(text.to_owned()));
                let req = ModelRequest {
                    system_instruction: Some(self.system_instruction.clone()),
                    temperature: Some(self.temperature),
                    messages,
                };
                let resp = (self.stream_fn)(req)
                    .instrument(debug_span!("stream request"))
                    .await?;
                ExchangeSource::Stream(resp)
            }
        };

        Ok(Exchange {
            dispatch,
            source,
            user_text: text.to_owned(),
            streamed_text: String::new(),
            image_delivered: false,
            history: &mut self.history,
        })
    }

    /// Callback flavor of [`Gateway::send_message`].
    ///
    /// `on_chunk` is invoked for every text chunk and `on_image` at most
    /// once, strictly in arrival order. Returns the final text of the
    /// exchange.
    pub async fn send_message_with(
        &mut self,
        text: &str,
        mut on_chunk: impl FnMut(&str),
        mut on_image: impl FnMut(&str),
    ) -> Result<String, GatewayError> {
        let mut exchange = self.send_message(text).await?;
        while let Some(event) = exchange.next_event().await? {
            match &event {
                ExchangeEvent::TextChunk(chunk) => on_chunk(chunk),
                ExchangeEvent::ImageReady(url) => on_image(url),
            }
        }
        Ok(exchange.finish())
    }

    /// Forgets the retained history, the next text request starts a fresh
    /// conversation with the backend.
    #[inline]
    pub fn reset_chat(&mut self) {
        debug!("resetting {} history messages", self.history.len());
        self.history.clear();
    }
}

enum ExchangeSource {
    Stream(BoxedResponse),
    Parts(VecDeque<ContentPart>),
    Finished,
}

/// One in-flight backend call, seen as a lazy, finite sequence of
/// [`ExchangeEvent`]s.
///
/// The exchange borrows its gateway mutably, so there is never more than
/// one exchange per gateway at a time.
pub struct Exchange<'a> {
    dispatch: Dispatch,
    source: ExchangeSource,
    user_text: String,
    streamed_text: String,
    image_delivered: bool,
    history: &'a mut Vec<ModelMessage>,
}

impl Exchange<'_> {
    /// Returns how the message was dispatched.
    #[inline]
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    /// Pulls the next event. `Ok(None)` marks the end of the exchange,
    /// and so does any error.
    pub async fn next_event(
        &mut self,
    ) -> Result<Option<ExchangeEvent>, GatewayError> {
        loop {
            match &mut self.source {
                ExchangeSource::Stream(resp) => {
                    let event = poll_fn(|cx| resp.as_mut().poll_event(cx)).await;
                    match event {
                        Ok(Some(ModelResponseEvent::MessageDelta(delta))) => {
                            if delta.is_empty() {
                                continue;
                            }
                            self.streamed_text.push_str(&delta);
                            return Ok(Some(ExchangeEvent::TextChunk(delta)));
                        }
                        Ok(Some(ModelResponseEvent::Completed(reason))) => {
                            debug!("stream completed: {reason:?}");
                        }
                        Ok(None) => {
                            self.source = ExchangeSource::Finished;
                            self.commit_history();
                            return Ok(None);
                        }
                        Err(err) => {
                            self.source = ExchangeSource::Finished;
                            return Err(err);
                        }
                    }
                }
                ExchangeSource::Parts(parts) => match parts.pop_front() {
                    Some(ContentPart::Text(text)) => {
                        if text.is_empty() {
                            continue;
                        }
                        self.streamed_text.push_str(&text);
                        return Ok(Some(ExchangeEvent::TextChunk(text)));
                    }
                    Some(ContentPart::InlineData(data)) => {
                        // The first image ends the exchange, later parts are
                        // dropped.
                        trace!("got inline data of type {}", data.mime_type);
                        self.source = ExchangeSource::Finished;
                        self.image_delivered = true;
                        let url = format!("data:image/png;base64,{}", data.data);
                        return Ok(Some(ExchangeEvent::ImageReady(url)));
                    }
                    None => {
                        self.source = ExchangeSource::Finished;
                        return Ok(None);
                    }
                },
                ExchangeSource::Finished => return Ok(None),
            }
        }
    }

    /// Consumes the exchange and returns its final text: the full streamed
    /// text for text requests, a completion note for delivered images, and
    /// an empty string for image requests that produced no image.
    pub fn finish(self) -> String {
        match self.dispatch {
            Dispatch::Text => self.streamed_text,
            Dispatch::Image if self.image_delivered => {
                IMAGE_COMPLETION_NOTE.to_owned()
            }
            Dispatch::Image => String::new(),
        }
    }

    fn commit_history(&mut self) {
        if self.dispatch != Dispatch::Text {
            return;
        }
        self.history
            .push(ModelMessage::User(std::mem::take(&mut self.user_text)));
        self.history
            .push(ModelMessage::Model(self.streamed_text.clone()));
    }
}
