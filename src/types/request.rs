//! Request-side types: uploaded files, sessions and the ask request

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chunking::source_id_from_name;
use crate::errors::{RagError, Result};

/// Identifier scoping uploaded-file indexes to one caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random session id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Safe to embed in a file name (ASCII alphanumerics, `-` and `_` only)
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What an uploaded document describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Resume,
    Project,
}

impl FromStr for FileKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "resume" => Ok(FileKind::Resume),
            "project" => Ok(FileKind::Project),
            other => Err(RagError::ValidationError(format!(
                "unknown file kind '{}', expected 'resume' or 'project'",
                other
            ))),
        }
    }
}

/// A document supplied by the caller for one request or session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            kind,
        }
    }

    /// Source identifier used for this file's chunks
    pub fn source_id(&self) -> String {
        source_id_from_name(&self.name)
    }
}

/// A question, optionally with files to answer from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<UploadedFile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_files(mut self, files: Vec<UploadedFile>) -> Self {
        self.files = Some(files);
        self
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    /// Reject malformed requests before any pipeline work
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(RagError::ValidationError(
                "question must be a non-empty string".to_string(),
            ));
        }

        if let Some(files) = &self.files {
            if files.is_empty() {
                return Err(RagError::ValidationError("No files provided".to_string()));
            }
            if let Some(file) = files.iter().find(|f| f.name.trim().is_empty()) {
                return Err(RagError::ValidationError(format!(
                    "uploaded {:?} file has an empty name",
                    file.kind
                )));
            }
        }

        if let Some(session) = &self.session {
            if !session.is_path_safe() {
                return Err(RagError::ValidationError(format!(
                    "invalid session id '{}'",
                    session
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_question() {
        assert!(AskRequest::new("   ").validate().is_err());
        assert!(AskRequest::new("What did Jane build?").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_file_list() {
        let request = AskRequest::new("Who is Jane?").with_files(Vec::new());
        match request.validate() {
            Err(RagError::ValidationError(msg)) => assert!(msg.contains("No files")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_unsafe_session() {
        let request = AskRequest::new("Who?").with_session(SessionId::from("../etc"));
        assert!(request.validate().is_err());

        let request = AskRequest::new("Who?").with_session(SessionId::new());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_uploaded_file_wire_format() {
        let json = r#"{"name":"jane.md","content":"Jane.","type":"resume"}"#;
        let file: UploadedFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.kind, FileKind::Resume);
        assert_eq!(file.source_id(), "jane");
    }

    #[test]
    fn test_file_kind_from_str() {
        assert_eq!("Project".parse::<FileKind>().unwrap(), FileKind::Project);
        assert!("essay".parse::<FileKind>().is_err());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(a.is_path_safe());
    }
}
