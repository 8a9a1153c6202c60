//! End-to-end answer pipeline: resolve index -> embed question -> retrieve -> prompt -> stream
//!
//! Everything before prompting is best-effort: a missing index, a failed
//! query embedding or a retrieval error all degrade to answering without
//! context. Generation failures end the answer with an inline error frame.

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{RagError, Result};
use crate::index::{IndexScope, IndexStore};
use crate::models::GenerationConfig;
use crate::rag::context::{build_prompt, AssembledContext};
use crate::rag::frames::{AnswerFrame, GENERAL_KNOWLEDGE_SOURCE};
use crate::rag::retrieval::{RetrievalEngine, SearchParams};
use crate::rag::state::{PipelineEvent, PipelineState, PipelineTrace};
use crate::streaming::{GenerationProvider, TextStream};
use crate::types::{AskRequest, Index, SessionId};

/// Ordered stream of answer frames
pub type FrameStream = BoxStream<'static, AnswerFrame>;

/// Answer pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Retrieval parameters
    pub search: SearchParams,
    /// Sampling options for generation
    pub generation: GenerationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search: SearchParams::default(),
            generation: GenerationConfig::default(),
        }
    }
}

/// A started answer
pub struct Answer {
    /// Answer frames: text fragments, then one `Sources` or `Error` frame
    pub frames: FrameStream,
    /// Sources the trailing `Sources` frame will carry
    pub sources: Vec<String>,
    /// Whether retrieved context went into the prompt
    pub used_context: bool,
    /// Session the uploaded files were indexed under, if any
    pub session: Option<SessionId>,
    /// States visited before streaming began
    pub states: Vec<PipelineState>,
}

impl Answer {
    /// Flatten frames into the plain-text wire encoding
    pub fn into_wire(self) -> BoxStream<'static, String> {
        self.frames.map(|frame| frame.encode()).boxed()
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Answer")
            .field("sources", &self.sources)
            .field("used_context", &self.used_context)
            .field("session", &self.session)
            .field("states", &self.states)
            .finish()
    }
}

/// Retrieval-augmented answer pipeline
pub struct AnswerPipeline {
    store: Arc<IndexStore>,
    generator: Arc<dyn GenerationProvider>,
    retrieval: RetrievalEngine,
    config: PipelineConfig,
}

impl AnswerPipeline {
    /// Create new pipeline with default configuration
    pub fn new(store: Arc<IndexStore>, generator: Arc<dyn GenerationProvider>) -> Self {
        Self::with_config(store, generator, PipelineConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(
        store: Arc<IndexStore>,
        generator: Arc<dyn GenerationProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            generator,
            retrieval: RetrievalEngine::with_params(config.search),
            config,
        }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer a question
    ///
    /// Only a malformed request is an `Err`; every later failure is either
    /// absorbed (no context) or delivered as an `Error` frame.
    pub async fn answer(&self, request: &AskRequest) -> Result<Answer> {
        request.validate()?;

        let mut trace = PipelineTrace::new();
        trace.advance(PipelineEvent::Start)?;

        let mut session = request.session.clone();
        let context = match self.retrieve_context(request, &mut session, &mut trace).await {
            Ok(context) => Some(context),
            Err(e) => {
                warn!(error = %e, "Retrieval failed, answering without context");
                trace.advance(PipelineEvent::Degrade)?;
                None
            }
        };

        let context = context.filter(|c| !c.is_empty());
        let sources = match &context {
            Some(context) => context.sources.clone(),
            None => vec![GENERAL_KNOWLEDGE_SOURCE.to_string()],
        };
        let prompt = build_prompt(&request.question, context.as_ref());

        let model = self.generator.model();
        info!(
            used_context = context.is_some(),
            chunks = context.as_ref().map(|c| c.chunk_count).unwrap_or(0),
            model,
            "Prompting model"
        );

        let (frames, states) = match self
            .generator
            .stream_generate(&prompt, &self.config.generation)
            .await
        {
            Ok(text) => {
                trace.advance(PipelineEvent::StreamOpened)?;
                let states = trace.history().to_vec();
                (answer_frames(text, sources.clone(), trace, model), states)
            }
            Err(e) => {
                warn!(error = %e, "Generation request failed");
                trace.advance(PipelineEvent::GenerationFailed)?;
                let frame = AnswerFrame::Error(describe_generation_error(&e, model));
                (stream::iter(vec![frame]).boxed(), trace.history().to_vec())
            }
        };

        Ok(Answer {
            frames,
            sources,
            used_context: context.is_some(),
            session,
            states,
        })
    }

    /// Resolve the index, embed the question and rank chunks
    async fn retrieve_context(
        &self,
        request: &AskRequest,
        session: &mut Option<SessionId>,
        trace: &mut PipelineTrace,
    ) -> Result<AssembledContext> {
        let index = self.resolve_index(request, session).await?;
        trace.advance(PipelineEvent::IndexReady)?;

        let query = self.store.embedder().embed_one(&request.question).await?;
        trace.advance(PipelineEvent::QueryEmbedded)?;

        let hits = self.retrieval.retrieve(&query, &index)?;
        trace.advance(PipelineEvent::Retrieved)?;

        info!(hits = hits.len(), chunks = index.len(), "Retrieved context");
        Ok(AssembledContext::from_results(&hits))
    }

    /// Uploaded files win, then the session's index, then the shared corpus
    async fn resolve_index(
        &self,
        request: &AskRequest,
        session: &mut Option<SessionId>,
    ) -> Result<Arc<Index>> {
        if let Some(files) = &request.files {
            let id = session.get_or_insert_with(SessionId::new).clone();
            return self.store.build_from_uploaded_files(&id, files).await;
        }

        let scope = match session {
            Some(id) => IndexScope::Session(id.clone()),
            None => IndexScope::Shared,
        };
        self.store.load(&scope).await
    }
}

struct FrameState {
    text: TextStream,
    sources: Vec<String>,
    trace: PipelineTrace,
    model: String,
}

/// Text frames as they arrive, then exactly one closing frame
fn answer_frames(
    text: TextStream,
    sources: Vec<String>,
    trace: PipelineTrace,
    model: &str,
) -> FrameStream {
    let state = FrameState {
        text,
        sources,
        trace,
        model: model.to_string(),
    };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        match state.text.next().await {
            Some(Ok(fragment)) => Some((AnswerFrame::Text(fragment), Some(state))),
            Some(Err(e)) => {
                warn!(error = %e, "Generation stream failed");
                if let Err(transition) = state.trace.advance(PipelineEvent::GenerationFailed) {
                    warn!(error = %transition, "Unexpected pipeline state");
                }
                Some((AnswerFrame::Error(describe_generation_error(&e, &state.model)), None))
            }
            None => {
                if let Err(transition) = state.trace.advance(PipelineEvent::StreamFinished) {
                    warn!(error = %transition, "Unexpected pipeline state");
                }
                let sources = std::mem::take(&mut state.sources);
                Some((AnswerFrame::sources(sources), None))
            }
        }
    })
    .boxed()
}

/// User-facing message for a generation failure
fn describe_generation_error(error: &RagError, model: &str) -> String {
    let message = error.to_string();
    if message.contains("404") || message.contains("not found") {
        format!(
            "Model \"{}\" not available. Set GEMINI_CHAT_MODEL to one of the models listed by `resumebuddy models`.",
            model
        )
    } else {
        message
    }
}
