mod builder;

use tracing::Instrument;

use crate::conversation::{ChatState, PendingExchange};
use crate::gateway::{Gateway, GatewayError};
pub use builder::ChatSessionBuilder;

type UpdateFn = Box<dyn FnMut(&ChatState) + Send>;

/// How a call to [`ChatSession::send`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The input was blank, or another exchange was in flight. Nothing
    /// changed.
    Rejected,
    /// The exchange finished, with its final text.
    Completed(String),
    /// The exchange failed. The error is also recorded in the state.
    Failed(GatewayError),
}

/// A chat session, which ties the visible conversation to the gateway.
///
/// Every state change is reported to the `on_update` observer (if any)
/// right after it happens, so a front end can redraw incrementally while
/// the model text streams in.
pub struct ChatSession {
    gateway: Gateway,
    state: ChatState,
    on_update: Option<UpdateFn>,
}

impl ChatSession {
    /// Submits `input` and drives the resulting exchange to its end.
    pub async fn send(&mut self, input: &str) -> SendOutcome {
        let Self {
            gateway,
            state,
            on_update,
        } = self;

        let Some(pending) = state.submit(input) else {
            return SendOutcome::Rejected;
        };
        notify(on_update, state);

        let span = debug_span!("exchange", placeholder = %pending.placeholder());
        let result = run_exchange(gateway, state, on_update, &pending)
            .instrument(span)
            .await;

        let outcome = match result {
            Ok(text) => {
                state.complete(pending);
                SendOutcome::Completed(text)
            }
            Err(err) => {
                state.fail(pending, err.message());
                SendOutcome::Failed(err)
            }
        };
        notify(on_update, state);
        outcome
    }

    /// Clears the conversation and the history retained by the gateway.
    pub fn reset(&mut self) {
        self.gateway.reset_chat();
        self.state.reset();
        notify(&mut self.on_update, &self.state);
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Returns the underlying gateway.
    #[inline]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

impl ChatSession {
    fn from_builder(builder: ChatSessionBuilder) -> Self {
        let ChatSessionBuilder { gateway, on_update } = builder;
        Self {
            gateway,
            state: ChatState::new(),
            on_update,
        }
    }
}

async fn run_exchange(
    gateway: &mut Gateway,
    state: &mut ChatState,
    on_update: &mut Option<UpdateFn>,
    pending: &PendingExchange,
) -> Result<String, GatewayError> {
    let mut exchange = gateway.send_message(pending.text()).await?;
    while let Some(event) = exchange.next_event().await? {
        state.apply(pending, &event);
        notify(on_update, state);
    }
    Ok(exchange.finish())
}

#[inline]
fn notify(on_update: &mut Option<UpdateFn>, state: &ChatState) {
    if let Some(on_update) = on_update {
        on_update(state);
    }
}
