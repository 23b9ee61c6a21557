//! Decides which backend endpoint a user message goes to.

/// Words that mark a message as an image-generation request.
///
/// Matching is a plain case-insensitive substring test, so a trigger that
/// shows up incidentally (say, "image" inside a code snippet) still routes
/// the message to the image endpoint.
pub const IMAGE_TRIGGERS: &[&str] = &[
    "gambar",
    "foto",
    "image",
    "generate image",
    "buatkan gambar",
    "lukisan",
];

/// The endpoint a message is dispatched to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// Conversational request, answered by the streaming text endpoint.
    Text,
    /// Image-generation request, answered by the single-shot endpoint.
    Image,
}

/// Classifies a user message.
pub fn classify(text: &str) -> Dispatch {
    let text = text.to_lowercase();
    if IMAGE_TRIGGERS.iter().any(|trigger| text.contains(trigger)) {
        Dispatch::Image
    } else {
        Dispatch::Text
    }
}
