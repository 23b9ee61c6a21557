//! Line editing rules of the terminal front end.

/// Prompt shown before clearing the conversation.
pub const CLEAR_CONFIRMATION: &str = "Hapus riwayat percakapan BinnAI? [y/N]";

/// Joins physical lines into one message.
///
/// A line ending in a backslash continues on the next line: the backslash
/// is replaced by a newline that becomes part of the message.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: String,
}

impl LineAssembler {
    /// Creates an empty assembler.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a continued message is being assembled.
    #[inline]
    pub fn is_continuing(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Feeds one line, with or without its terminator. Returns the whole
    /// message once a line doesn't continue.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        match line.strip_suffix('\\') {
            Some(head) => {
                self.buffer.push_str(head);
                self.buffer.push('\n');
                None
            }
            None => {
                self.buffer.push_str(line);
                Some(std::mem::take(&mut self.buffer))
            }
        }
    }
}

/// What the user asked for with one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Send the text to the assistant.
    Send(String),
    /// Clear the conversation, after confirmation.
    Clear,
    /// Leave.
    Quit,
    /// Nothing to do.
    Empty,
}

impl Command {
    /// Interprets an assembled message.
    pub fn parse(message: &str) -> Self {
        match message.trim() {
            "" => Self::Empty,
            "/clear" => Self::Clear,
            "/quit" => Self::Quit,
            _ => Self::Send(message.to_owned()),
        }
    }
}

/// Returns `true` if `answer` accepts a `[y/N]` prompt.
#[inline]
pub fn is_confirmed(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("ya")
}
