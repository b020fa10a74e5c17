//! Diff parsing, file classification, and review-position mapping.
//!
//! Turns the unified diff GitHub returns for a pull request into per-file
//! hunks with line numbers, decides which files are dependency manifests or
//! migrations, and maps new-file line numbers to review-comment positions.

pub mod classify;
pub mod filter;
pub mod parser;
pub mod position;
