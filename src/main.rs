//! ResumeBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use resumebuddy::{
    bootstrap,
    cli::{Args, Commands, Config, Verbosity},
    doctor::Doctor,
    rag::AnswerFrame,
    types::{AskRequest, FileKind, SessionId, UploadedFile},
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity());

    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;

    match &args.command {
        Commands::Build { data_dir } => {
            run_build(&args, &config, data_dir.as_deref()).await?;
        }
        Commands::Ask {
            question,
            files,
            kind,
            session,
        } => {
            run_ask(&args, &config, question, files, *kind, session.as_deref()).await?;
        }
        Commands::Models => {
            list_models(&config).await?;
        }
        Commands::Doctor => {
            run_doctor(&config).await?;
        }
        Commands::Config => {
            show_config(&args, &config);
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flags
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn run_build(args: &Args, config: &Config, data_dir: Option<&Path>) -> Result<()> {
    let dir = data_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.corpus_dir());

    let pb = if args.verbosity().show_progress() {
        Some(spinner(&format!("Embedding documents in {}", dir.display()))?)
    } else {
        None
    };

    let mut embedder = bootstrap::embedder(config, bootstrap::embedding_provider(config)?);
    if let Some(pb) = &pb {
        let pb = pb.clone();
        embedder = embedder.with_progress(Arc::new(move |done, total| {
            pb.set_message(format!("Embedded {}/{} chunks", done, total));
        }));
    }

    let store = bootstrap::index_store(config, embedder);
    let result = store.build_from_corpus_files(&dir).await;

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    let index = result?;

    println!(
        "{} Built corpus index: {} chunks from {} documents -> {}",
        "✓".green(),
        index.len(),
        index.sources().len(),
        config.artifact_path().display()
    );
    Ok(())
}

async fn read_uploads(paths: &[PathBuf], kind: FileKind) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(UploadedFile::new(name, content, kind));
    }
    Ok(files)
}

async fn run_ask(
    args: &Args,
    config: &Config,
    question: &str,
    paths: &[PathBuf],
    kind: FileKind,
    session: Option<&str>,
) -> Result<()> {
    let mut request = AskRequest::new(question);
    if !paths.is_empty() {
        request = request.with_files(read_uploads(paths, kind).await?);
    }
    if let Some(session) = session {
        request = request.with_session(SessionId::from(session));
    }

    let embedder = bootstrap::embedder(config, bootstrap::embedding_provider(config)?);
    let store = Arc::new(bootstrap::index_store(config, embedder));
    let pipeline = bootstrap::answer_pipeline(config, store)?;

    let answer = pipeline.answer(&request).await?;
    let details = args.verbosity().show_details();

    if details && !answer.used_context {
        eprintln!("{}", "No matching documents; answering from general knowledge.".yellow());
    }

    let uploaded_session = answer.session.clone().filter(|_| request.files.is_some());
    let mut frames = answer.frames;
    let mut stdout = std::io::stdout();
    let mut failed = false;

    while let Some(frame) = frames.next().await {
        match frame {
            AnswerFrame::Text(text) => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            AnswerFrame::Sources(sources) => {
                writeln!(stdout)?;
                if details {
                    println!("\n{} {}", "Sources:".bold(), sources.join(", ").cyan());
                }
            }
            AnswerFrame::Error(message) => {
                writeln!(stdout)?;
                eprintln!("{} {}", "Error:".red().bold(), message);
                failed = true;
            }
        }
    }

    if details {
        if let Some(session) = uploaded_session {
            eprintln!("{} {}", "Session:".dimmed(), session);
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn list_models(config: &Config) -> Result<()> {
    let client = bootstrap::model_client(config)?;

    println!("\nChecking Gemini models...\n");

    match client.generation_models().await {
        Ok(usable) => {
            if usable.is_empty() {
                println!("No models support generateContent for this API key.");
            } else {
                println!("Models that can answer questions:");
                for model in &usable {
                    let marker = if model.short_name() == config.gemini.chat_model {
                        "*".green().to_string()
                    } else {
                        " ".to_string()
                    };
                    println!(" {} {}", marker, model);
                }
                if !usable.iter().any(|m| m.short_name() == config.gemini.chat_model) {
                    println!(
                        "\nConfigured model {} is not listed. Try: GEMINI_CHAT_MODEL={}",
                        config.gemini.chat_model.yellow(),
                        usable[0].short_name()
                    );
                }
            }
            println!();
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("\nCheck GEMINI_API_KEY and network access.");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn run_doctor(config: &Config) -> Result<()> {
    let doctor = Doctor::new(config.clone());
    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(args: &Args, config: &Config) {
    println!("\n{}\n", "ResumeBuddy Configuration".bold());

    let source = args
        .config
        .clone()
        .or_else(Config::default_path)
        .filter(|p| p.exists())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    println!("Loaded from: {}\n", source);

    println!("Gemini:");
    println!("  Base URL:     {}", config.gemini.base_url);
    println!(
        "  API key:      {}",
        if config.require_api_key().is_ok() { "set" } else { "not set" }
    );
    println!("  Embed model:  {}", config.gemini.embed_model);
    println!("  Chat model:   {}", config.gemini.chat_model);
    println!("  Temperature:  {}", config.gemini.temperature);
    println!();

    println!("Embedding:");
    println!("  Batch size:     {}", config.embedding.batch_size);
    println!("  Call delay:     {} ms", config.embedding.inter_call_delay_ms);
    println!("  Max concurrent: {}", config.embedding.max_concurrent);
    println!();

    println!("Index:");
    println!("  Chunk size:   {}", config.index.chunk_size);
    println!("  Top K:        {}", config.index.top_k);
    println!("  Corpus dir:   {}", config.corpus_dir().display());
    println!("  Artifact:     {}", config.artifact_path().display());
    println!(
        "  Session TTL:  {} s (max {} sessions)",
        config.index.session_ttl_secs, config.index.max_sessions
    );
    println!("  Verbosity:    {:?}", args.verbosity());
    println!();
}
