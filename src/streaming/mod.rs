//! Streaming generation module
//!
//! Provides the Gemini generation client and incremental SSE parser.

pub mod client;
pub mod parser;

// Re-export commonly used types
pub use client::{
    text_fragments, GeminiGenerationClient, GenerationProvider, TextStream, DEFAULT_CHAT_MODEL,
};
pub use parser::{SseParser, MAX_BUFFER_SIZE};
