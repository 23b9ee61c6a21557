use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only the `data` field carries payload. Multiple `data` lines of one
/// event are joined with a line feed, comments and the `event`, `id` and
/// `retry` fields are skipped. Events may be terminated by either
/// `\n\n` or `\r\n\r\n`, which is what Gemini sends.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain what is already buffered before touching the stream.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                // A trailing unterminated event is dropped.
                None => return Ok(None),
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        while let Some((end, sep_len)) = find_event_boundary(&self.buf) {
            // Bytes are decoded per event, so a multi-byte character split
            // across two chunks is fine.
            let raw: Vec<u8> = self.buf.drain(..end + sep_len).collect();
            let Ok(block) = std::str::from_utf8(&raw[..end]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data_lines: Option<Vec<&str>> = None;
            for line in block.lines() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                match field {
                    "data" => data_lines.get_or_insert_default().push(value),
                    "event" | "id" | "retry" => {}
                    _ => return Err(Error::InvalidPayload),
                }
            }

            if let Some(data_lines) = data_lines {
                return Ok(Some(data_lines.join("\n")));
            }
            // Comment-only block, look for the next one.
        }
        Ok(None)
    }
}

fn find_event_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(lf), Some(crlf)) => Some(if lf.0 <= crlf.0 { lf } else { crlf }),
        (lf, crlf) => lf.or(crlf),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_normal_events() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data: hello\n\n"),
                Bytes::from_static(b"data: bye\n\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_crlf_events_in_one_chunk() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"a\":1}\r\n\r\ndata: {\"a\":2}\r\n\r\n",
            )]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "{\"a\":2}");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data:"),
                Bytes::from_static(b" hello\r\n"),
                Bytes::from_static(b"\r\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_utf8_character() {
        // "é" is 0xC3 0xA9.
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data: caf\xC3"),
                Bytes::from_static(b"\xA9\n\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "café");
    }

    #[tokio::test]
    async fn test_comments_and_multiline_data() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b": keep-alive\n\nevent: message\ndata: a\ndata: b\n\n",
            )]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a\nb");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(b"xxxxxx\n\n")].into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(b"xxxxxx\n")].into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data: hello\n"),
                Bytes::from_static(b"data: bye\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);
    }
}
