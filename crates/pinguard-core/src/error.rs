// miette's Diagnostic derive generates code that triggers this false positive
#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;

/// Errors that can occur across pinguard.
///
/// Each variant wraps a specific error domain. Library crates return this
/// type directly; the binary renders it through `miette`.
///
/// # Examples
///
/// ```
/// use pinguard_core::PinguardError;
///
/// let err = PinguardError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum PinguardError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(pinguard::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(pinguard::config),
        help("Check .pinguard.toml and the action inputs")
    )]
    Config(String),

    /// GitHub API failure.
    #[error("GitHub error: {0}")]
    #[diagnostic(code(pinguard::github))]
    GitHub(String),

    /// The workflow event payload is missing or malformed.
    #[error("event error: {0}")]
    #[diagnostic(
        code(pinguard::event),
        help("pinguard run expects GITHUB_EVENT_PATH to point at a pull_request event payload")
    )]
    Event(String),

    /// Diff parsing failure.
    #[error("parse error: {0}")]
    #[diagnostic(code(pinguard::parse))]
    Parse(String),

    /// LLM API or response error.
    #[error("LLM error: {0}")]
    #[diagnostic(code(pinguard::llm))]
    Llm(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(pinguard::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(pinguard::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(pinguard::file_not_found))]
    FileNotFound(PathBuf),
}
