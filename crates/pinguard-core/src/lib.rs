//! Core types, configuration, and error handling for pinguard.
//!
//! This crate provides the shared foundation used by the other pinguard crates:
//! - [`PinguardError`]: unified error type using `thiserror` and `miette`
//! - [`PinguardConfig`]: configuration loaded from `.pinguard.toml`
//! - Shared types: [`FileKind`], [`DiffHunk`], [`Finding`], [`Verdict`],
//!   [`ReviewComment`], [`PositionedComment`], [`PrDetails`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{GitHubConfig, LlmConfig, PatternSet, PatternsConfig, PinguardConfig, ReviewConfig};
pub use error::PinguardError;
pub use types::{
    ChangeKind, DiffHunk, DiffLine, FileKind, Finding, IssueType, OutputFormat,
    PositionedComment, PrDetails, ReviewComment, Severity, Verdict, VerdictStatus,
};

/// A convenience `Result` type for pinguard operations.
pub type Result<T> = std::result::Result<T, PinguardError>;
