//! A model provider for the Google Gemini API.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use binnai_model::{
    ErrorKind, GenerateRequest, GeneratedContent, ModelProvider,
    ModelProviderError, ModelRequest,
};
use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};

pub use config::{GeminiConfig, GeminiConfigBuilder};
use io::{Chunks, Sse};
use proto::{ErrorEnvelope, GenerateContentResponse};
use response::GeminiResponse;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Error type for [`GeminiProvider`].
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

    fn from_transport(err: reqwest::Error) -> Self {
        Self::new(format!("{err}"), ErrorKind::Other)
    }

    /// Builds an error from a non-success response. The message is empty
    /// when the body carries none, callers substitute their own.
    fn from_status(status: StatusCode, body: &str) -> Self {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let api_status = envelope
            .as_ref()
            .and_then(|envelope| envelope.error.status.as_deref());
        let kind = match (status.as_u16(), api_status) {
            (401 | 403, _)
            | (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) => {
                ErrorKind::Unauthenticated
            }
            (429, _) | (_, Some("RESOURCE_EXHAUSTED")) => {
                ErrorKind::RateLimitExceeded
            }
            _ => ErrorKind::Other,
        };
        let message = envelope
            .and_then(|envelope| envelope.error.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_default();
        Self::new(message, kind)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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

/// Gemini model provider.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: Client,
    config: Arc<GeminiConfig>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` with the given configuration.
    #[inline]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

impl ModelProvider for GeminiProvider {
    type Error = Error;
    type Response = GeminiResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let gemini_req = proto::create_stream_request(req);
        let resp_fut = self
            .client
            .post(self.config.stream_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream")
            .json(&gemini_req)
            .send();

        async move {
            let resp = resp_fut.await.map_err(Error::from_transport)?;
            let resp = check_status(resp).await?;

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| {
                    m.type_() == mime::TEXT && m.subtype() == "event-stream"
                })
                .unwrap_or(false);
            if !is_event_stream {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ));
            }

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(GeminiResponse::from_sse(sse))
        }
    }

    fn generate_content(
        &self,
        req: &GenerateRequest,
    ) -> impl Future<Output = Result<GeneratedContent, Self::Error>> + Send + 'static
    {
        let gemini_req = proto::create_generate_request(req);
        let resp_fut = self
            .client
            .post(self.config.generate_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&gemini_req)
            .send();

        async move {
            let resp = resp_fut.await.map_err(Error::from_transport)?;
            let resp = check_status(resp).await?;
            let body = resp
                .json::<GenerateContentResponse>()
                .await
                .map_err(Error::from_transport)?;
            trace!("got generate content response: {body:?}");
            proto::into_generated_content(body)
        }
    }
}

async fn check_status(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    error!("request failed with {status}: {body}");
    Err(Error::from_status(status, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_status() {
        let body = r#"{
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED"
            }
        }"#;
        let err = Error::from_status(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(
            err.message(),
            "Resource has been exhausted (e.g. check quota)."
        );

        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "PERMISSION_DENIED"}}"#;
        let err = Error::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn test_error_without_message() {
        let err = Error::from_status(StatusCode::BAD_GATEWAY, "<html></html>");
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.message(), "");
    }
}
