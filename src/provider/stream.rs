//! Line-oriented stream decoding
//!
//! Both wire formats we read are line based: SSE (`data: {...}`) for hosted
//! backends and NDJSON for Ollama. `LineDecoder` reassembles lines from
//! arbitrary network chunks; `line_stream` turns an HTTP body into a
//! `ChunkStream` given a per-line parser.

use futures::StreamExt;
use futures::stream;
use std::collections::VecDeque;

use super::{BackendError, ChunkStream, StreamChunk};

/// Reassembles complete lines from byte chunks
///
/// Buffers raw bytes, so multi-byte UTF-8 sequences split across network
/// chunks survive. A line that is not valid UTF-8 is dropped on its own.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Maximum buffered bytes without a newline (1MB)
    const MAX_BUFFER_SIZE: usize = 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of bytes and extract complete, non-empty lines
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(line) = decode_line(&raw) {
                lines.push(line);
            }
        }

        if self.buffer.len() > Self::MAX_BUFFER_SIZE {
            tracing::warn!(
                "Line buffer exceeded {}KB without a newline, discarding",
                Self::MAX_BUFFER_SIZE / 1024
            );
            self.buffer.clear();
        }

        lines
    }

    /// Take the trailing unterminated line, if any
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        decode_line(&raw)
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    match std::str::from_utf8(raw) {
        Ok(text) => {
            let line = text.trim();
            (!line.is_empty()).then(|| line.to_string())
        }
        Err(e) => {
            tracing::debug!("Skipping undecodable line: {}", e);
            None
        }
    }
}

/// Per-line parser: `Err` carries an error the server reported in-band
pub(crate) type LineParser = fn(&str) -> Result<Vec<StreamChunk>, String>;

/// Decode an HTTP body into chunks, one `parse` call per complete line
///
/// A read error or an in-band error line is yielded once and ends the stream.
pub(crate) fn line_stream(
    backend: &'static str,
    response: reqwest::Response,
    parse: LineParser,
) -> ChunkStream {
    let state = (
        Box::pin(response.bytes_stream()),
        LineDecoder::new(),
        VecDeque::<Result<StreamChunk, BackendError>>::new(),
        false,
    );

    let chunks = stream::unfold(state, move |state| async move {
        let (mut body, mut decoder, mut pending, mut finished) = state;
        loop {
            if let Some(item) = pending.pop_front() {
                return Some((item, (body, decoder, pending, finished)));
            }
            if finished {
                return None;
            }

            let lines = match body.next().await {
                Some(Ok(bytes)) => decoder.push(&bytes),
                Some(Err(e)) => {
                    finished = true;
                    return Some((Err(BackendError::from(e)), (body, decoder, pending, finished)));
                }
                None => {
                    finished = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for line in lines {
                match parse(&line) {
                    Ok(chunks) => pending.extend(chunks.into_iter().map(Ok)),
                    Err(message) => {
                        // Lines after an error are never parsed
                        finished = true;
                        pending.push_back(Err(BackendError::Stream { backend, message }));
                        break;
                    }
                }
            }
        }
    });

    Box::pin(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_lines() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"first\nsecond\n");
        assert_eq!(lines, vec!["first", "second"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_partial_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: {\"part\":").is_empty());
        let lines = decoder.push(b" 1}\n");
        assert_eq!(lines, vec!["data: {\"part\": 1}"]);
    }

    #[test]
    fn test_empty_lines_and_crlf() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"\r\n\ndata: content\r\n\n\n");
        assert_eq!(lines, vec!["data: content"]);
    }

    #[test]
    fn test_split_utf8_sequence() {
        let text = "{\"content\":\"東京\"}\n".as_bytes();
        // Split inside the first multi-byte character
        let (head, tail) = text.split_at(14);
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), vec!["{\"content\":\"東京\"}"]);
    }

    #[test]
    fn test_invalid_line_does_not_poison_next() {
        let mut decoder = LineDecoder::new();
        let mut chunk = vec![0xff, 0xfe, b'\n'];
        chunk.extend_from_slice(b"ok\n");
        assert_eq!(decoder.push(&chunk), vec!["ok"]);
    }

    #[test]
    fn test_unterminated_tail() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"done\":true}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("{\"done\":true}"));
    }
}
