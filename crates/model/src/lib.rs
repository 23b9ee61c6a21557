//! An abstraction layer for the generative backends BinnAI talks to.
//!
//! A backend exposes two endpoints: a streaming text-completion endpoint
//! that produces incremental message deltas, and a single-shot generation
//! endpoint that returns an ordered list of content parts (text or inline
//! binary data such as a generated image).
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to. The core crate only
//! talks to backends through these types, which is what allows tests to
//! swap in a scripted fake backend.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
