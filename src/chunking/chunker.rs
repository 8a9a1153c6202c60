//! Sentence-boundary chunker
//!
//! Greedy packing of whole sentences into passages:
//! - Sentence end: `.`, `!` or `?` followed by whitespace
//! - Budget: 700 characters per passage (Unicode scalar values)
//! - A single sentence longer than the budget becomes its own passage,
//!   text is never cut mid-sentence

use serde::{Deserialize, Serialize};

/// Default passage budget in characters
pub const CHUNK_SIZE: usize = 700;

/// A passage awaiting embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub source: String,
    pub text: String,
}

/// Chunker that packs sentences into bounded passages
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    budget: usize,
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceChunker {
    /// Create chunker with the default 700 character budget
    pub fn new() -> Self {
        Self::with_budget(CHUNK_SIZE)
    }

    /// Create chunker with a custom budget
    pub fn with_budget(budget: usize) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Split a document into passages, each with a fresh id
    ///
    /// Sentences are joined with a single space. A buffer is flushed when
    /// appending the next sentence would push it past the budget; the
    /// overflowing sentence starts the next buffer.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Passage> {
        let mut passages = Vec::new();
        let mut buffer = String::new();
        let mut buffer_chars = 0usize;

        for sentence in split_sentences(text) {
            let sentence_chars = sentence.chars().count();
            let candidate = if buffer.is_empty() {
                sentence_chars
            } else {
                buffer_chars + 1 + sentence_chars
            };

            if candidate > self.budget && !buffer.is_empty() {
                passages.push(Self::passage(&buffer, source));
                buffer.clear();
                buffer.push_str(sentence);
                buffer_chars = sentence_chars;
            } else {
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(sentence);
                buffer_chars = candidate;
            }
        }

        if !buffer.is_empty() {
            passages.push(Self::passage(&buffer, source));
        }

        passages
    }

    fn passage(text: &str, source: &str) -> Passage {
        Passage {
            id: uuid::Uuid::new_v4().simple().to_string(),
            source: source.to_string(),
            text: text.to_string(),
        }
    }
}

/// Split text into trimmed, non-empty sentences
///
/// A sentence ends at `.`, `!` or `?` immediately followed by whitespace;
/// the whitespace run is consumed. Trailing text without a terminator is
/// the last sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let followed_by_space = matches!(chars.peek(), Some((_, next)) if next.is_whitespace());
        if !followed_by_space {
            continue;
        }

        let end = i + c.len_utf8();
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }

        while let Some((j, next)) = chars.peek().copied() {
            if next.is_whitespace() {
                chars.next();
            } else {
                start = j;
                break;
            }
        }
        // whitespace ran to the end of the text
        if chars.peek().is_none() {
            start = text.len();
        }
    }

    if start < text.len() {
        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }
    }

    sentences
}

/// Derive a source identifier from a file name (`jane.md` -> `jane`)
pub fn source_id_from_name(name: &str) -> String {
    name.strip_suffix(".md")
        .or_else(|| name.strip_suffix(".txt"))
        .unwrap_or(name)
        .to_string()
}
