//! Doctor command for system diagnostics
//!
//! Provides health checks for the Gemini setup and the corpus index.

use colored::Colorize;
use std::path::Path;

use crate::bootstrap;
use crate::cli::Config;
use crate::index::{DurableStorage, IndexScope, Storage};
use crate::models::ModelInfo;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
}

impl Doctor {
    /// Create a new doctor instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = vec![self.check_api_key()];

        if self.config.require_api_key().is_ok() {
            checks.extend(self.check_gemini().await);
        }

        checks.push(check_corpus_dir(&self.config.corpus_dir()));
        checks.push(check_corpus_index(&self.config.artifact_path()).await);

        checks
    }

    /// Check 1: API key configured
    fn check_api_key(&self) -> HealthCheck {
        match self.config.require_api_key() {
            Ok(_) => HealthCheck::new("API Key", HealthStatus::Pass),
            Err(e) => HealthCheck::new("API Key", HealthStatus::Fail(e.to_string())),
        }
    }

    /// Checks 2-4: API reachable, configured models usable
    async fn check_gemini(&self) -> Vec<HealthCheck> {
        let client = match bootstrap::model_client(&self.config) {
            Ok(client) => client,
            Err(e) => return vec![HealthCheck::new("Gemini API", HealthStatus::Fail(e.to_string()))],
        };

        match client.health_check().await {
            Ok(true) => {}
            Ok(false) => {
                return vec![HealthCheck::new(
                    "Gemini API",
                    HealthStatus::Fail("API not reachable or key rejected".to_string()),
                )]
            }
            Err(e) => {
                return vec![HealthCheck::new(
                    "Gemini API",
                    HealthStatus::Fail(format!("Error checking API: {}", e)),
                )]
            }
        }

        let mut checks = vec![HealthCheck::new("Gemini API", HealthStatus::Pass)];
        match client.list_models().await {
            Ok(models) => checks.extend(check_models(
                &models,
                &self.config.gemini.chat_model,
                &self.config.gemini.embed_model,
            )),
            Err(e) => checks.push(HealthCheck::new(
                "Models",
                HealthStatus::Fail(format!("Cannot list models: {}", e)),
            )),
        }
        checks
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "ResumeBuddy Diagnostics".bold());
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red().to_string(),
            };
            println!("{:<20} {}", check.name, status);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

/// Configured chat and embedding models exist and support their methods
pub fn check_models(models: &[ModelInfo], chat_model: &str, embed_model: &str) -> Vec<HealthCheck> {
    let find = |name: &str| {
        let wanted = name.strip_prefix("models/").unwrap_or(name);
        models.iter().find(|m| m.short_name() == wanted)
    };

    let chat = match find(chat_model) {
        Some(m) if m.supports("generateContent") => HealthStatus::Pass,
        Some(_) => HealthStatus::Fail(format!("{} does not support generateContent", chat_model)),
        None => HealthStatus::Fail(format!("{} not available; run `resumebuddy models`", chat_model)),
    };

    let embed = match find(embed_model) {
        Some(m) if m.supports("embedContent") => HealthStatus::Pass,
        Some(_) => HealthStatus::Fail(format!("{} does not support embedContent", embed_model)),
        None => HealthStatus::Fail(format!("{} not available", embed_model)),
    };

    vec![
        HealthCheck::new("Chat Model", chat),
        HealthCheck::new("Embedding Model", embed),
    ]
}

/// Corpus directory holds documents to build from
pub fn check_corpus_dir(dir: &Path) -> HealthCheck {
    if !dir.is_dir() {
        return HealthCheck::new(
            "Corpus Directory",
            HealthStatus::Warn(format!("{} does not exist", dir.display())),
        );
    }

    let documents = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    matches!(
                        e.path().extension().and_then(|x| x.to_str()),
                        Some("md") | Some("txt")
                    )
                })
                .count()
        })
        .unwrap_or(0);

    if documents == 0 {
        HealthCheck::new(
            "Corpus Directory",
            HealthStatus::Warn(format!("no .md or .txt files in {}", dir.display())),
        )
    } else {
        HealthCheck::new("Corpus Directory", HealthStatus::Pass)
    }
}

/// Corpus index artifact present and readable
pub async fn check_corpus_index(path: &Path) -> HealthCheck {
    let storage = DurableStorage::new(path);
    match storage.load(&IndexScope::Shared).await {
        Ok(Some(index)) if !index.is_empty() => HealthCheck::new("Corpus Index", HealthStatus::Pass),
        Ok(Some(_)) => HealthCheck::new(
            "Corpus Index",
            HealthStatus::Warn("index is empty; answers will use general knowledge".to_string()),
        ),
        Ok(None) => HealthCheck::new(
            "Corpus Index",
            HealthStatus::Warn(format!(
                "{} not found; run `resumebuddy build`",
                path.display()
            )),
        ),
        Err(e) => HealthCheck::new("Corpus Index", HealthStatus::Fail(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Index};
    use tempfile::TempDir;

    fn model(name: &str, methods: &[&str]) -> ModelInfo {
        ModelInfo {
            name: format!("models/{}", name),
            display_name: None,
            description: None,
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_health_status_equality() {
        assert_eq!(HealthStatus::Pass, HealthStatus::Pass);
        assert_eq!(
            HealthStatus::Warn("test".to_string()),
            HealthStatus::Warn("test".to_string())
        );
    }

    #[test]
    fn test_overall_status() {
        let checks = vec![
            HealthCheck::new("a", HealthStatus::Pass),
            HealthCheck::new("b", HealthStatus::Warn("warning".to_string())),
        ];
        assert!(Doctor::overall_status(&checks));

        let checks = vec![HealthCheck::new("a", HealthStatus::Fail("error".to_string()))];
        assert!(!Doctor::overall_status(&checks));
    }

    #[tokio::test]
    async fn test_missing_key_skips_remote_checks() {
        let doctor = Doctor::new(Config::default());
        let checks = doctor.run_diagnostics().await;
        assert_eq!(checks[0].name, "API Key");
        assert!(matches!(checks[0].status, HealthStatus::Fail(_)));
        assert!(!checks.iter().any(|c| c.name == "Gemini API"));
    }

    #[test]
    fn test_check_models() {
        let models = vec![
            model("gemini-2.5-flash", &["generateContent"]),
            model("text-embedding-004", &["embedContent"]),
        ];
        let checks = check_models(&models, "gemini-2.5-flash", "text-embedding-004");
        assert!(checks.iter().all(|c| c.status == HealthStatus::Pass));

        let checks = check_models(&models, "gemini-pro", "gemini-2.5-flash");
        assert!(checks.iter().all(|c| matches!(c.status, HealthStatus::Fail(_))));
    }

    #[tokio::test]
    async fn test_check_corpus_index() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.json");
        assert!(matches!(
            check_corpus_index(&path).await.status,
            HealthStatus::Warn(_)
        ));

        let index = Index::new(vec![Chunk {
            id: "c1".to_string(),
            source: "cv".to_string(),
            text: "Text.".to_string(),
            embedding: vec![1.0, 0.0],
        }])
        .unwrap();
        std::fs::write(&path, serde_json::to_string(&index).unwrap()).unwrap();
        assert_eq!(check_corpus_index(&path).await.status, HealthStatus::Pass);
    }

    #[test]
    fn test_check_corpus_dir() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            check_corpus_dir(&temp.path().join("missing")).status,
            HealthStatus::Warn(_)
        ));

        std::fs::write(temp.path().join("jane.md"), "Jane.").unwrap();
        assert_eq!(check_corpus_dir(temp.path()).status, HealthStatus::Pass);
    }
}
