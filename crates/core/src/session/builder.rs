use binnai_model::ModelProvider;

use super::{ChatSession, UpdateFn};
use crate::conversation::ChatState;
use crate::gateway::Gateway;

/// [`ChatSession`] builder.
pub struct ChatSessionBuilder {
    pub(super) gateway: Gateway,
    pub(super) on_update: Option<UpdateFn>,
}

impl ChatSessionBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            gateway: Gateway::new(provider),
            on_update: None,
        }
    }

    /// Overrides the system instruction of text requests.
    #[inline]
    pub fn with_system_instruction<S: Into<String>>(
        mut self,
        instruction: S,
    ) -> Self {
        self.gateway = self.gateway.with_system_instruction(instruction);
        self
    }

    /// Overrides the sampling temperature of text requests.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.gateway = self.gateway.with_temperature(temperature);
        self
    }

    /// Attaches a callback to be invoked after every state change.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl FnMut(&ChatState) + Send + 'static,
    ) -> Self {
        self.on_update = Some(Box::new(on_update));
        self
    }

    /// Builds the session.
    #[inline]
    pub fn build(self) -> ChatSession {
        ChatSession::from_builder(self)
    }
}
