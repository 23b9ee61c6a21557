use std::fmt::Debug;

pub(crate) const DEFAULT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub(crate) const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Builder for [`GeminiConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GeminiConfigBuilder {
    api_key: String,
    text_model: Option<String>,
    image_model: Option<String>,
    base_url: Option<String>,
}

impl GeminiConfigBuilder {
    /// Creates a builder with the given API key.
    ///
    /// An empty key is accepted, requests will then be rejected by the
    /// backend at request time.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            text_model: None,
            image_model: None,
            base_url: None,
        }
    }

    /// Sets the model used for streaming chat.
    #[inline]
    pub fn with_text_model<S: Into<String>>(mut self, model: S) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Sets the model used for image generation.
    #[inline]
    pub fn with_image_model<S: Into<String>>(mut self, model: S) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> GeminiConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        GeminiConfig {
            api_key: self.api_key,
            text_model: self
                .text_model
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: self
                .image_model
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Debug for GeminiConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Configuration for the Gemini provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GeminiConfig {
    pub(crate) api_key: String,
    pub(crate) text_model: String,
    pub(crate) image_model: String,
    pub(crate) base_url: String,
}

impl GeminiConfig {
    /// Returns the model used for streaming chat.
    #[inline]
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    /// Returns the model used for image generation.
    #[inline]
    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub(crate) fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.text_model
        )
    }

    pub(crate) fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url, self.image_model
        )
    }
}

impl Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<deducted>")
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_urls() {
        let config = GeminiConfigBuilder::with_api_key("secret")
            .with_base_url("http://localhost:8080/v1beta/")
            .build();
        assert_eq!(config.text_model(), DEFAULT_TEXT_MODEL);
        assert_eq!(config.image_model(), DEFAULT_IMAGE_MODEL);
        assert_eq!(
            config.stream_url(),
            "http://localhost:8080/v1beta/models/gemini-3-flash-preview:streamGenerateContent?alt=sse"
        );
        assert_eq!(
            config.generate_url(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = GeminiConfigBuilder::with_api_key("secret").build();
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<deducted>"));
    }
}
