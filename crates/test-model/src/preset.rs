use binnai_model::ErrorKind;
use serde::{Deserialize, Serialize};

/// The events in a preset streaming response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    /// The stream breaks with the given error message.
    #[serde(rename = "failure")]
    Failure(String),
}

/// One part of a preset single-shot response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetPart {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "image")]
    Image {
        mime_type: String,
        /// Base64-encoded payload.
        data: String,
    },
}

/// How the fake backend answers one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresetResponse {
    /// Answers a streaming text request.
    Stream { events: Vec<PresetEvent> },
    /// Answers a single-shot generation request.
    Content { parts: Vec<PresetPart> },
    /// Rejects whichever request comes in.
    Rejected { message: String, kind: ErrorKind },
}

impl PresetResponse {
    /// Creates a streaming response with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self::Stream {
            events: events.into(),
        }
    }

    /// Creates a streaming response out of plain text deltas.
    #[inline]
    pub fn with_deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stream {
            events: deltas
                .into_iter()
                .map(|delta| PresetEvent::MessageDelta(delta.into()))
                .collect(),
        }
    }

    /// Creates a single-shot response with the specified parts.
    #[inline]
    pub fn with_parts(parts: impl Into<Vec<PresetPart>>) -> Self {
        Self::Content {
            parts: parts.into(),
        }
    }

    /// Creates a response that rejects the request.
    #[inline]
    pub fn rejected(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self::Rejected {
            message: message.into(),
            kind,
        }
    }
}
