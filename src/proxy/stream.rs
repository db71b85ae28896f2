//! Upstream stream line handling.
//!
//! Provides [`LineBuffer`] for reassembling newline-delimited lines across
//! TCP chunk boundaries, and [`classify_line`] which decides what the relay
//! does with each complete line. Lines stay raw bytes so that forwarded
//! lines reach the client exactly as the upstream sent them.

use super::types::StreamResponse;

/// End-of-stream marker sent by OpenAI-style upstreams.
pub const DONE_SENTINEL: &[u8] = b"[DONE]";

/// Prefix of an event-stream data line.
pub const DATA_PREFIX: &[u8] = b"data: ";

/// Byte buffer that yields complete lines as chunks arrive.
///
/// The buffer has no length cap: a line is held until its newline shows up
/// or the stream ends. `scanned` marks how much of the held tail is known to
/// contain no newline, so each byte is searched once.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every line it completes.
    ///
    /// Returned lines have the `\n` and any trailing `\r` removed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut cursor = self.scanned;
        while let Some(offset) = self.buffer[cursor..].iter().position(|&b| b == b'\n') {
            let end = cursor + offset;
            lines.push(trim_cr(&self.buffer[start..end]).to_vec());
            start = end + 1;
            cursor = start;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        self.scanned = self.buffer.len();
        lines
    }

    /// Return the unterminated remainder, if any.
    pub fn finish(self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(trim_cr(&self.buffer).to_vec())
        }
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// What to do with one upstream line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    /// Drop the line without forwarding it.
    Skip,
    /// Forward the line. `content` is set for data chunks with non-empty
    /// delta content.
    Forward { content: bool },
    /// Forward the line and stop reading.
    Finish,
}

/// Decide how the relay treats `line`.
pub fn classify_line(line: &[u8]) -> LineAction {
    if line.is_empty() {
        return LineAction::Skip;
    }

    if contains(line, DONE_SENTINEL) {
        return LineAction::Finish;
    }

    match line.strip_prefix(DATA_PREFIX) {
        Some(payload) => match StreamResponse::parse(payload) {
            Ok(chunk) => LineAction::Forward {
                content: chunk.has_content(),
            },
            Err(e) => {
                tracing::debug!(error = %e, "Dropping unparseable stream chunk");
                LineAction::Skip
            }
        },
        // Provider-specific control lines (event:, id:, comments) pass through
        None => LineAction::Forward { content: false },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Join lines with `\n`, then split at the given byte positions to
    /// simulate TCP chunk boundaries.
    fn split_at_positions(lines: &[&str], split_positions: &[usize]) -> Vec<Vec<u8>> {
        let full: Vec<u8> = lines
            .iter()
            .flat_map(|l| format!("{}\n", l).into_bytes())
            .collect();

        let mut chunks = Vec::new();
        let mut prev = 0;
        for &pos in split_positions {
            if pos > prev && pos < full.len() {
                chunks.push(full[prev..pos].to_vec());
                prev = pos;
            }
        }
        chunks.push(full[prev..].to_vec());
        chunks
    }

    fn as_strs(lines: &[Vec<u8>]) -> Vec<&str> {
        lines
            .iter()
            .map(|l| std::str::from_utf8(l).unwrap())
            .collect()
    }

    #[test]
    fn test_single_chunk_multiple_lines() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"data: {}\n\ndata: [DONE]\n");
        assert_eq!(as_strs(&lines), vec!["data: {}", "", "data: [DONE]"]);
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_line_split_across_chunks() {
        let events = [
            r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":" world"}}]}"#,
            "data: [DONE]",
        ];
        let chunks = split_at_positions(&events, &[7, 30, 60, 95]);
        assert!(chunks.len() > 1, "Should be split into multiple chunks");

        let mut buffer = LineBuffer::new();
        let mut lines = Vec::new();
        for chunk in &chunks {
            lines.extend(buffer.push(chunk));
        }

        assert_eq!(as_strs(&lines), events.to_vec());
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_crlf_stripped() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"data: {}\r\n\r\n");
        assert_eq!(as_strs(&lines), vec!["data: {}", ""]);
    }

    #[test]
    fn test_unterminated_tail_returned_by_finish() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: [DO").is_empty());
        assert!(buffer.push(b"NE]").is_empty());
        assert_eq!(buffer.finish(), Some(b"data: [DONE]".to_vec()));
    }

    #[test]
    fn test_long_line_is_not_truncated() {
        let long = "x".repeat(256 * 1024);
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(long.as_bytes()).is_empty());
        let lines = buffer.push(b"\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), long.len());
    }

    #[test]
    fn test_long_line_in_many_small_chunks() {
        let mut buffer = LineBuffer::new();
        for _ in 0..10_000 {
            assert!(buffer.push(b"abcdefgh").is_empty());
        }
        let lines = buffer.push(b"\nnext");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 80_000);
        assert_eq!(buffer.finish(), Some(b"next".to_vec()));
    }

    #[test]
    fn test_many_lines_in_one_chunk() {
        let chunk = "a\n".repeat(5_000);
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(chunk.as_bytes());
        assert_eq!(lines.len(), 5_000);
        assert!(lines.iter().all(|l| l == b"a"));
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_invalid_utf8_kept_byte_for_byte() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"event: \xff\xfe\n");
        assert_eq!(lines, vec![b"event: \xff\xfe".to_vec()]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo\"}}]}\n";
        let bytes = line.as_bytes();
        // Split inside the two-byte 'é'
        let split = line.find('é').unwrap() + 1;

        let mut buffer = LineBuffer::new();
        assert!(buffer.push(&bytes[..split]).is_empty());
        let lines = buffer.push(&bytes[split..]);
        assert_eq!(as_strs(&lines), vec![line.trim_end_matches('\n')]);
    }

    #[test]
    fn test_classify_empty_line() {
        assert_eq!(classify_line(b""), LineAction::Skip);
    }

    #[test]
    fn test_classify_done_variants() {
        assert_eq!(classify_line(b"data: [DONE]"), LineAction::Finish);
        assert_eq!(classify_line(b"[DONE]"), LineAction::Finish);
        assert_eq!(classify_line(b"data:[DONE]"), LineAction::Finish);
    }

    #[test]
    fn test_classify_content_chunk() {
        assert_eq!(
            classify_line(br#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            LineAction::Forward { content: true }
        );
    }

    #[test]
    fn test_classify_empty_content_chunk() {
        assert_eq!(
            classify_line(br#"data: {"choices":[{"delta":{"content":""}}]}"#),
            LineAction::Forward { content: false }
        );
    }

    #[test]
    fn test_classify_null_shaped_chunks_forwarded() {
        for line in [
            &br#"data: {"choices":null}"#[..],
            br#"data: {"choices":[{"delta":null,"finish_reason":"stop"}]}"#,
            b"data: null",
        ] {
            assert_eq!(
                classify_line(line),
                LineAction::Forward { content: false },
                "line {:?}",
                String::from_utf8_lossy(line)
            );
        }

        assert_eq!(
            classify_line(br#"data: {"choices":[{"index":-1,"delta":{"content":"x"}}]}"#),
            LineAction::Forward { content: true }
        );
    }

    #[test]
    fn test_classify_malformed_chunk_skipped() {
        assert_eq!(classify_line(b"data: {this is not valid json}"), LineAction::Skip);
        assert_eq!(classify_line(b"data: keep-alive"), LineAction::Skip);
    }

    #[test]
    fn test_classify_wrong_shape_chunk_skipped() {
        assert_eq!(classify_line(br#"data: {"choices":"nope"}"#), LineAction::Skip);
    }

    #[test]
    fn test_classify_control_lines_forwarded() {
        for line in [
            &b"event: message"[..],
            b"id: 123",
            b": keep-alive comment",
            b"retry: 5000",
            b"event: \xff\xfe",
        ] {
            assert_eq!(
                classify_line(line),
                LineAction::Forward { content: false },
                "line {:?}",
                String::from_utf8_lossy(line)
            );
        }
    }

    #[test]
    fn test_classify_data_without_space_is_control_line() {
        // Only "data: " with the space is treated as a chunk
        assert_eq!(
            classify_line(br#"data:{"choices":[{"delta":{"content":"Hi"}}]}"#),
            LineAction::Forward { content: false }
        );
    }
}
