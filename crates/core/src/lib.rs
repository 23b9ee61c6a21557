//! Core logic of BinnAI: message dispatching, the backend gateway, and the
//! conversation state a front end renders.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod conversation;
pub mod dispatch;
pub mod gateway;
mod session;

pub use conversation::{ChatState, Message, MessageId, Role};
pub use dispatch::Dispatch;
pub use gateway::{Exchange, ExchangeEvent, Gateway, GatewayError};
pub use session::{ChatSession, ChatSessionBuilder, SendOutcome};
