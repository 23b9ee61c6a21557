/// A streaming text-completion request.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelRequest {
    /// The system instruction that configures the model's persona.
    pub system_instruction: Option<String>,
    /// The sampling temperature, `None` leaves the backend default.
    pub temperature: Option<f32>,
    /// History messages followed by the new user input.
    pub messages: Vec<ModelMessage>,
}

/// A complete message in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// A text produced by the model.
    Model(String),
}

impl ModelMessage {
    /// Returns the text of this message.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            ModelMessage::User(text) | ModelMessage::Model(text) => text,
        }
    }
}

/// A single-shot generation request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenerateRequest {
    /// The text prompt.
    pub prompt: String,
}
