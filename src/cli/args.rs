//! Command-line argument parsing for ResumeBuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::FileKind;

/// ResumeBuddy - ask questions about résumés and project notes
#[derive(Parser, Debug)]
#[command(name = "resumebuddy")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Answer questions about résumés and projects with retrieval-augmented Gemini", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only the answer is printed)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the shared corpus index from a directory of .md/.txt files
    Build {
        /// Corpus directory (defaults to the configured one)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Ask a question, streaming the answer
    Ask {
        /// The question
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Answer from these files only (repeatable)
        #[arg(short, long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,

        /// What the uploaded files describe
        #[arg(short, long, default_value = "resume")]
        kind: FileKind,

        /// Reuse the index of an earlier upload session
        #[arg(short, long, value_name = "ID")]
        session: Option<String>,
    },

    /// List Gemini models that can answer questions
    Models,

    /// Run diagnostics and health checks
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "resumebuddy=info",
            Verbosity::VeryVerbose => "resumebuddy=debug",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show sources and session details
    pub fn show_details(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
