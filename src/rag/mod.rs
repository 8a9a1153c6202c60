//! Retrieval-augmented answering
//!
//! Components:
//! - Retrieval: cosine top-k over an index
//! - Context: prompt assembly from ranked chunks
//! - State: per-request pipeline state machine
//! - Frames: typed answer frames and their wire encoding
//! - Pipeline: end-to-end orchestration

pub mod context;
pub mod frames;
pub mod pipeline;
pub mod retrieval;
pub mod state;

// Re-export key types
pub use context::{build_prompt, AssembledContext, SYSTEM_PROMPT};
pub use frames::{split_sources, AnswerFrame, GENERAL_KNOWLEDGE_SOURCE, SOURCES_MARKER};
pub use pipeline::{Answer, AnswerPipeline, FrameStream, PipelineConfig};
pub use retrieval::{top_k, RetrievalEngine, SearchParams};
pub use state::{PipelineEvent, PipelineState, PipelineTrace};
