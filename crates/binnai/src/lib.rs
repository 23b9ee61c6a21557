//! BinnAI, a chat assistant that talks and draws.
//!
//! The crate includes a terminal front end. The pieces it is built from are
//! also usable as a library, to put BinnAI into other host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod image;
pub mod input;

pub use binnai_core::{ChatSession, ChatSessionBuilder, SendOutcome};

/// Re-exports of [`binnai_core`] crate.
pub mod core {
    pub use binnai_core::*;
}

/// Re-exports of [`binnai_model`] crate.
pub mod model {
    pub use binnai_model::*;
}
