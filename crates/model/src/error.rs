use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// The kind of error that occurred.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited or out of quota.
    RateLimitExceeded,
    /// The credential is missing or rejected by the backend.
    Unauthenticated,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Moderated => write!(f, "Moderated"),
            ErrorKind::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            ErrorKind::Unauthenticated => write!(f, "Unauthenticated"),
            ErrorKind::Other => write!(f, "Other"),
        }
    }
}
