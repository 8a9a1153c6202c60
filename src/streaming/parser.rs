//! Incremental server-sent events parser for streaming responses
//!
//! Network chunks arrive at arbitrary boundaries, so bytes are buffered
//! until a full line is available. `data:` lines accumulate into the
//! current event and a blank line dispatches it.
//! - Buffer: 1MB maximum
//! - Line endings: `\n` or `\r\n`
//! - Comments (`:` prefix) and non-data fields are ignored

use bytes::{Buf, BytesMut};

use crate::errors::{RagError, Result};
use crate::models::types::GenerateContentResponse;

/// Maximum buffer size (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Incremental SSE parser
#[derive(Debug)]
pub struct SseParser {
    /// Bytes not yet forming a complete line
    buffer: BytesMut,

    /// `data:` lines of the event being assembled
    data_lines: Vec<String>,

    /// Maximum buffer size
    max_buffer_size: usize,
}

impl SseParser {
    /// Create new parser with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create parser with custom buffer capacity
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            data_lines: Vec::new(),
            max_buffer_size,
        }
    }

    /// Add bytes and return the payloads of every event completed by them
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        if self.buffer.len() + bytes.len() > self.max_buffer_size {
            return Err(RagError::ParseError(format!(
                "Buffer overflow: {} bytes exceeds maximum {}",
                self.buffer.len() + bytes.len(),
                self.max_buffer_size
            )));
        }

        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(newline);
            self.buffer.advance(1);

            let line = String::from_utf8_lossy(&line);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Dispatch whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            let rest = rest.strip_suffix('\r').unwrap_or(&rest).to_string();
            if let Some(event) = self.process_line(&rest) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    /// Decode one event payload
    pub fn parse_response(&self, data: &str) -> Result<GenerateContentResponse> {
        serde_json::from_str(data)
            .map_err(|e| RagError::ParseError(format!("Failed to parse stream event: {}", e)))
    }

    /// Get current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.data_lines.is_empty()
    }

    /// Clear the buffer and any partial event
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.data_lines.clear();
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data_lines.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(data)
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}
