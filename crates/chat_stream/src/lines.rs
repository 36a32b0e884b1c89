//! Line framing for `data:`-prefixed streaming responses.

use crate::error::ChatStreamError;

/// Prefix marking a line that carries one encoded event.
pub const DATA_PREFIX: &str = "data:";
/// Literal line that terminates the stream.
pub const DONE_LINE: &str = "data: [DONE]";
/// Longest accepted response line, terminator included.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// One non-blank, trimmed response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine {
    /// Payload of a `data:` line with the prefix stripped.
    Data(String),
    /// Stream terminator.
    Done,
    /// Any line without the data prefix; backends report errors this way.
    Raw(String),
}

impl StreamLine {
    /// Classify one line. Blank lines yield `None`.
    pub fn classify(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Some(Self::Raw(line.to_owned()));
        };
        if line == DONE_LINE {
            return Some(Self::Done);
        }
        Some(Self::Data(payload.to_owned()))
    }
}

/// Incremental splitter turning arbitrary body chunks into [`StreamLine`]s.
///
/// Splits on raw `\n` bytes so multi-byte characters straddling a chunk
/// boundary are decoded intact. A line longer than [`MAX_LINE_BYTES`] is a
/// framing error.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Append raw body bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete non-blank line, or `None` until more bytes arrive.
    pub fn next_line(&mut self) -> Option<Result<StreamLine, ChatStreamError>> {
        loop {
            let Some(split) = self.buffer.iter().position(|byte| *byte == b'\n') else {
                if self.buffer.len() >= MAX_LINE_BYTES {
                    self.buffer.clear();
                    return Some(Err(line_too_long()));
                }
                return None;
            };
            if split >= MAX_LINE_BYTES {
                self.buffer.clear();
                return Some(Err(line_too_long()));
            }

            let raw: Vec<u8> = self.buffer.drain(..=split).collect();
            if let Some(line) = StreamLine::classify(&String::from_utf8_lossy(&raw)) {
                return Some(Ok(line));
            }
        }
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<StreamLine> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        StreamLine::classify(&String::from_utf8_lossy(&raw))
    }
}

fn line_too_long() -> ChatStreamError {
    ChatStreamError::LineTooLong {
        limit: MAX_LINE_BYTES,
    }
}

#[cfg(test)]
mod tests {
    use super::{LineDecoder, StreamLine, MAX_LINE_BYTES};
    use crate::error::ChatStreamError;

    fn feed(decoder: &mut LineDecoder, bytes: &[u8]) -> Vec<StreamLine> {
        decoder.push(bytes);
        std::iter::from_fn(|| decoder.next_line())
            .map(|line| line.expect("line within limit"))
            .collect()
    }

    #[test]
    fn lines_split_across_chunks_are_joined() {
        let mut decoder = LineDecoder::default();

        assert!(feed(&mut decoder, b"data: {\"content\":").is_empty());
        let lines = feed(&mut decoder, b"\"hi\"}\r\n\n");

        assert_eq!(
            lines,
            vec![StreamLine::Data(" {\"content\":\"hi\"}".to_owned())]
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let text = "data: {\"content\":\"é\"}\n".as_bytes();
        let split = text.iter().position(|byte| *byte >= 0x80).expect("multibyte") + 1;

        let mut decoder = LineDecoder::default();
        let mut lines = feed(&mut decoder, &text[..split]);
        lines.extend(feed(&mut decoder, &text[split..]));

        assert_eq!(
            lines,
            vec![StreamLine::Data(" {\"content\":\"é\"}".to_owned())]
        );
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = LineDecoder::default();
        assert!(feed(&mut decoder, b"  boom  ").is_empty());
        assert_eq!(decoder.finish(), Some(StreamLine::Raw("boom".to_owned())));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn complete_lines_come_before_an_over_long_one() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"data: {}\n");
        decoder.push(&vec![b'x'; MAX_LINE_BYTES]);

        assert_eq!(
            decoder.next_line().map(Result::ok),
            Some(Some(StreamLine::Data("{}".to_owned())))
        );
        assert!(matches!(
            decoder.next_line(),
            Some(Err(ChatStreamError::LineTooLong { limit })) if limit == MAX_LINE_BYTES
        ));
        assert!(decoder.next_line().is_none());
    }

    #[test]
    fn unterminated_line_below_the_limit_waits_for_more_bytes() {
        let mut decoder = LineDecoder::default();
        decoder.push(&vec![b'x'; MAX_LINE_BYTES - 1]);
        assert!(decoder.next_line().is_none());

        decoder.push(b"x");
        assert!(matches!(decoder.next_line(), Some(Err(_))));
    }

    #[test]
    fn terminated_line_past_the_limit_is_rejected() {
        let mut line = vec![b'y'; MAX_LINE_BYTES + 10];
        line.push(b'\n');

        let mut decoder = LineDecoder::default();
        decoder.push(&line);
        assert!(matches!(decoder.next_line(), Some(Err(_))));
    }
}
