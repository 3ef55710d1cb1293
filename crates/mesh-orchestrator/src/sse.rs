//! Incremental decoder for `data: <json>` event lines.

use bytes::{Buf, BytesMut};
use mesh_core::AgentMessage;
use tracing::trace;

/// Terminal marker some agents send instead of closing the stream
const DONE_MARKER: &str = "[DONE]";

/// Splits a byte stream into lines and decodes `data:` payloads.
///
/// Bytes are buffered until a newline arrives, so multi-byte characters
/// and JSON split across network chunks decode correctly. Blank lines,
/// non-`data` fields and payloads that are not valid JSON are skipped.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: BytesMut,
    done: bool,
}

impl EventDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a `[DONE]` marker has been seen
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk and return every message completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<AgentMessage> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            if let Some(message) = self.decode_line(&line) {
                messages.push(message);
            }
        }
        messages
    }

    /// Decode whatever remains once the byte stream has ended
    pub fn finish(&mut self) -> Option<AgentMessage> {
        let rest = self.buffer.split();
        self.decode_line(&rest)
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<AgentMessage> {
        if self.done {
            return None;
        }

        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches('\r');
        let data = line.strip_prefix("data:")?.trim();

        if data.is_empty() {
            return None;
        }
        if data == DONE_MARKER {
            self.done = true;
            return None;
        }

        match serde_json::from_str(data) {
            Ok(value) => Some(AgentMessage::new(value)),
            Err(e) => {
                trace!(error = %e, "Dropping unparseable event line");
                None
            }
        }
    }
}
