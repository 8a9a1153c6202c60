//! Answer pipeline state machine
//!
//! One machine per request:
//! - Happy path: Idle → LoadingIndex → EmbeddingQuery → Retrieving → Prompting → Streaming → Done
//! - Degraded path: any of LoadingIndex, EmbeddingQuery, Retrieving → Prompting without context
//! - Generation failures end in Failed
//!
//! Done and Failed are terminal; anything else not listed is an error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{RagError, Result};

/// Pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    /// Request accepted, nothing done yet
    Idle,

    /// Resolving or building the index for the request
    LoadingIndex,

    /// Embedding the question
    EmbeddingQuery,

    /// Ranking chunks against the question
    Retrieving,

    /// Building the prompt (with or without context)
    Prompting,

    /// Forwarding model output
    Streaming,

    /// Answer and sources delivered (terminal)
    Done,

    /// Generation failed, error delivered inline (terminal)
    Failed,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Request validated
    Start,

    /// Index resolved
    IndexReady,

    /// Question embedded
    QueryEmbedded,

    /// Top chunks selected
    Retrieved,

    /// A step before prompting failed; continue with no context
    Degrade,

    /// Prompt sent, model stream opened
    StreamOpened,

    /// Model stream ended cleanly
    StreamFinished,

    /// Generation service failed
    GenerationFailed,
}

impl PipelineState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether the degraded edge to `Prompting` leaves this state
    pub fn can_degrade(&self) -> bool {
        matches!(
            self,
            PipelineState::LoadingIndex | PipelineState::EmbeddingQuery | PipelineState::Retrieving
        )
    }

    /// Attempt state transition with validation
    pub fn transition(&self, event: PipelineEvent) -> Result<PipelineState> {
        use PipelineEvent::*;
        use PipelineState::*;

        let next = match (self, event) {
            (Idle, Start) => LoadingIndex,

            (LoadingIndex, IndexReady) => EmbeddingQuery,
            (EmbeddingQuery, QueryEmbedded) => Retrieving,
            (Retrieving, Retrieved) => Prompting,

            (state, Degrade) if state.can_degrade() => Prompting,

            (Prompting, StreamOpened) => Streaming,
            (Prompting, GenerationFailed) => Failed,

            (Streaming, StreamFinished) => Done,
            (Streaming, GenerationFailed) => Failed,

            (from, event) => {
                return Err(RagError::InvalidTransition {
                    from: from.to_string(),
                    event: format!("{:?}", event),
                });
            }
        };

        Ok(next)
    }

    /// Get all valid events from this state
    pub fn valid_events(&self) -> Vec<PipelineEvent> {
        use PipelineEvent::*;
        use PipelineState::*;

        match self {
            Idle => vec![Start],
            LoadingIndex => vec![IndexReady, Degrade],
            EmbeddingQuery => vec![QueryEmbedded, Degrade],
            Retrieving => vec![Retrieved, Degrade],
            Prompting => vec![StreamOpened, GenerationFailed],
            Streaming => vec![StreamFinished, GenerationFailed],
            Done | Failed => vec![],
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "Idle",
            PipelineState::LoadingIndex => "LoadingIndex",
            PipelineState::EmbeddingQuery => "EmbeddingQuery",
            PipelineState::Retrieving => "Retrieving",
            PipelineState::Prompting => "Prompting",
            PipelineState::Streaming => "Streaming",
            PipelineState::Done => "Done",
            PipelineState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// State plus the path taken to reach it
#[derive(Debug, Clone)]
pub struct PipelineTrace {
    current: PipelineState,
    history: Vec<PipelineState>,
}

impl PipelineTrace {
    pub fn new() -> Self {
        Self {
            current: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    /// Apply an event, recording the new state
    pub fn advance(&mut self, event: PipelineEvent) -> Result<PipelineState> {
        let next = self.current.transition(event)?;
        tracing::debug!(from = %self.current, to = %next, ?event, "Pipeline transition");
        self.current = next;
        self.history.push(next);
        Ok(next)
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    /// Every state visited, starting with `Idle`
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }
}

impl Default for PipelineTrace {
    fn default() -> Self {
        Self::new()
    }
}
