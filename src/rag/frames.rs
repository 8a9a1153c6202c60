//! Answer frames and their wire encoding
//!
//! In-process consumers read typed [`AnswerFrame`]s. Only at the wire
//! boundary are they flattened into plain text: answer fragments verbatim,
//! then either `SOURCES:<json array>` or `\n\nError: <message>`.

use serde::{Deserialize, Serialize};

/// Prefix of the trailing sources frame on the wire
pub const SOURCES_MARKER: &str = "SOURCES:";

/// Source reported when no retrieval contributed to the answer
pub const GENERAL_KNOWLEDGE_SOURCE: &str = "General AI Knowledge";

/// One unit of a streamed answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AnswerFrame {
    /// Model output fragment
    Text(String),
    /// Sources used, sent once after the model stream completes
    Sources(Vec<String>),
    /// Generation failure; nothing follows it
    Error(String),
}

impl AnswerFrame {
    /// Sources frame, falling back to the general-knowledge sentinel
    pub fn sources(sources: Vec<String>) -> Self {
        if sources.is_empty() {
            AnswerFrame::Sources(vec![GENERAL_KNOWLEDGE_SOURCE.to_string()])
        } else {
            AnswerFrame::Sources(sources)
        }
    }

    /// Whether this frame ends the answer
    pub fn is_final(&self) -> bool {
        !matches!(self, AnswerFrame::Text(_))
    }

    /// Wire text for this frame
    pub fn encode(&self) -> String {
        match self {
            AnswerFrame::Text(text) => text.clone(),
            AnswerFrame::Sources(sources) => {
                // a Vec<String> always serializes
                let json = serde_json::to_string(sources).unwrap_or_else(|_| "[]".to_string());
                format!("{}{}", SOURCES_MARKER, json)
            }
            AnswerFrame::Error(message) => format!("\n\nError: {}", message),
        }
    }
}

/// Split a complete wire response into answer text and sources
///
/// Uses the last `SOURCES:` marker whose tail parses as a JSON array of
/// strings, so answer text that happens to contain the marker is left
/// intact. Returns `None` for sources when no such marker exists.
pub fn split_sources(wire: &str) -> (&str, Option<Vec<String>>) {
    for (position, _) in wire.rmatch_indices(SOURCES_MARKER) {
        let tail = &wire[position + SOURCES_MARKER.len()..];
        if let Ok(sources) = serde_json::from_str::<Vec<String>>(tail) {
            return (&wire[..position], Some(sources));
        }
    }
    (wire, None)
}
