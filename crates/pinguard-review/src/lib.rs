//! Pull request review for dependency pinning and migration safety.
//!
//! Loads the Actions event, fetches the diff from GitHub, asks an
//! OpenAI-compatible model about each hunk of every dependency manifest and
//! migration, and posts the findings as inline review comments.

pub mod cookbook;
pub mod event;
pub mod github;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod publish;
pub mod run;
