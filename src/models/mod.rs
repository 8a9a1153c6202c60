//! Gemini model catalog and wire types
//!
//! This module provides:
//! - Request/response shapes shared by the embedding and generation clients
//! - Listing the models an API key can use
//! - Checking that configured models exist and support the needed method

pub mod client;
pub mod types;

// Re-export key types for convenience
pub use client::{GeminiModelClient, DEFAULT_GEMINI_URL};
pub use types::{Content, GenerationConfig, ModelInfo, Part};
