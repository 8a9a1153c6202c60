//! Prompt assembly for retrieval-augmented answers

use serde::{Deserialize, Serialize};

use crate::types::RetrievalResult;

/// Fixed instruction sent ahead of every question
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant for resume analysis and career-related questions.\n\
- When candidate files are available, answer questions using the resume and project information provided.\n\
- When no files are uploaded, provide general helpful career advice and guidance.\n\
- Be concise and specific in your responses.\n\
- Always be encouraging and constructive.\n\
- Provide actionable insights when possible.";

/// Retrieved context ready for the prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// `[source] text` blocks separated by blank lines
    pub text: String,
    /// Source of every included chunk, in rank order (repeats kept)
    pub sources: Vec<String>,
    /// Number of chunks included
    pub chunk_count: usize,
}

impl AssembledContext {
    /// Assemble context from ranked chunks
    pub fn from_results(results: &[RetrievalResult]) -> Self {
        let text = results
            .iter()
            .map(|r| format!("[{}] {}", r.source, r.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let sources = results.iter().map(|r| r.source.clone()).collect();

        Self {
            text,
            sources,
            chunk_count: results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }
}

/// User turn, with retrieved context when there is any
pub fn user_prompt(question: &str, context: Option<&AssembledContext>) -> String {
    match context.filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "Here is the relevant content from the uploaded files:\n\n{}\n\n\
             Based on this information, please answer the following question:\n{}",
            context.text, question
        ),
        None => format!(
            "Please provide general career advice for the following question:\n{}",
            question
        ),
    }
}

/// Full prompt sent to the model
pub fn build_prompt(question: &str, context: Option<&AssembledContext>) -> String {
    format!("{}\n\n{}", SYSTEM_PROMPT, user_prompt(question, context))
}
