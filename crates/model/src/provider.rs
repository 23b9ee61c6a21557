use std::error::Error;

use crate::error::ErrorKind;
use crate::request::{GenerateRequest, ModelRequest};
use crate::response::{GeneratedContent, ModelResponse};

/// The error type for a model provider.
///
/// The `Display` output is shown to the user as is, so implementations
/// should keep it human-readable and prefer the backend's own message.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a model provider, which is an entry for the
/// streaming text endpoint and the single-shot generation endpoint.
///
/// Once the provider is created, it should behave like a stateless object.
/// Conversation history is owned by the caller and sent with every
/// [`ModelRequest`].
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The streaming response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends a streaming text-completion request to the model.
    ///
    /// The returned future resolves once the backend accepted the request,
    /// the message itself is delivered through the response events.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;

    /// Sends a single-shot generation request (used for image synthesis).
    fn generate_content(
        &self,
        req: &GenerateRequest,
    ) -> impl Future<Output = Result<GeneratedContent, Self::Error>> + Send + 'static;
}
