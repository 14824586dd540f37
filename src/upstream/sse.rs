//! Incremental Server-Sent-Events parser.
//!
//! Bytes arrive in arbitrary chunks; a message is complete once a blank line
//! is seen. Only the `event:` and `data:` fields are kept.

use bytes::{Buf, BytesMut};

use super::UpstreamError;

/// A complete SSE message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseMessage {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buf: BytesMut,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every message it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<SseMessage, UpstreamError>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }

            match std::str::from_utf8(&line) {
                Ok(line) => {
                    if let Some(message) = self.accept_line(line) {
                        out.push(Ok(message));
                    }
                }
                Err(e) => out.push(Err(UpstreamError::Stream(format!(
                    "SSE line is not valid UTF-8: {e}"
                )))),
            }
        }

        out
    }

    /// Flush a trailing message that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<SseMessage> {
        if self.buf.has_remaining() {
            let rest = String::from_utf8_lossy(&self.buf).into_owned();
            self.buf.clear();
            if let Some(message) = self.accept_line(rest.trim_end_matches('\r')) {
                return Some(message);
            }
        }
        self.take_message()
    }

    fn accept_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            return self.take_message();
        }
        // Comment line.
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id:, retry: and unknown fields are ignored
            _ => {}
        }
        None
    }

    fn take_message(&mut self) -> Option<SseMessage> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseMessage {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}
