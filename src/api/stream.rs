use super::logging::emit_record_parse_error;
use crate::types::StreamEvent;
use serde_json::{Map, Value};

const RECORD_SEPARATOR: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data: ";

/// Incremental decoder for one streamed `/chat` response.
///
/// Bytes are buffered until a blank line closes a record, so multi-byte UTF-8
/// sequences and the `data: ` prefix may be split anywhere between `feed` calls.
/// The buffer never holds a complete record once `feed` returns.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    // Offset below which the buffer is known to hold no separator.
    scanned: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        // A separator may straddle the previous tail and the new chunk.
        let mut search_from = self.scanned.saturating_sub(RECORD_SEPARATOR.len() - 1);

        while let Some(offset) = find_separator(&self.buffer[search_from..]) {
            let record_end = search_from + offset;
            events.extend(decode_record(&self.buffer[start..record_end]));
            start = record_end + RECORD_SEPARATOR.len();
            search_from = start;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        self.scanned = self.buffer.len();

        events
    }

    /// Decode whatever trailing record is left once the transport reports end of stream.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let tail = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        if tail.iter().all(u8::is_ascii_whitespace) {
            return Vec::new();
        }
        decode_record(&tail)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn find_separator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(RECORD_SEPARATOR.len())
        .position(|window| window == RECORD_SEPARATOR)
}

fn decode_record(raw: &[u8]) -> Vec<StreamEvent> {
    // "\n\n" never occurs inside a multi-byte sequence, so every record is whole UTF-8.
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_start_matches(['\r', '\n']);
    let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
        if !text.trim().is_empty() {
            tracing::debug!(record = %text, "ignoring stream record without data prefix");
        }
        return Vec::new();
    };

    match serde_json::from_str::<Map<String, Value>>(payload) {
        Ok(record) => StreamEvent::from_record(&record),
        Err(error) => {
            tracing::warn!(%error, "dropping malformed stream record");
            emit_record_parse_error(payload, &error);
            Vec::new()
        }
    }
}
