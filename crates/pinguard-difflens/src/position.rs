//! Mapping from new-file line numbers to GitHub review positions.
//!
//! A position counts lines below the first `@@` header of a file's diff: the
//! line right after that header is position 1. Every later hunk header and
//! every deleted line still consumes a position, but only added and context
//! lines can carry a comment.

use std::collections::HashMap;

use pinguard_core::{PositionedComment, ReviewComment};

use crate::parser::FileDiff;

/// One addressable line of a file's diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffPosition {
    /// Offset below the first hunk header.
    pub position: u32,
    /// Line number in the new version of the file.
    pub line: u32,
}

/// Addressable positions for every file of a diff.
///
/// # Examples
///
/// ```
/// use pinguard_difflens::parser::parse_unified_diff;
/// use pinguard_difflens::position::PositionMap;
///
/// let diff = "diff --git a/Dockerfile b/Dockerfile\n\
///             --- a/Dockerfile\n\
///             +++ b/Dockerfile\n\
///             @@ -1,2 +1,2 @@\n\
///             -FROM node:18.17.1\n\
///             +FROM node:latest\n\
///              WORKDIR /app\n";
/// let map = PositionMap::from_diffs(&parse_unified_diff(diff).unwrap());
/// assert_eq!(map.lookup("Dockerfile", 1), Some(2));
/// assert_eq!(map.lookup("Dockerfile", 2), Some(3));
/// ```
#[derive(Debug, Default)]
pub struct PositionMap {
    files: HashMap<String, Vec<DiffPosition>>,
}

impl PositionMap {
    /// Build the map from parsed file diffs.
    pub fn from_diffs(diffs: &[FileDiff]) -> Self {
        let mut files = HashMap::new();
        for diff in diffs {
            let Some(path) = diff.target_path() else {
                continue;
            };
            files.insert(path, file_positions(diff));
        }
        Self { files }
    }

    /// Whether the diff contains the given file.
    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Position of the first addressable diff line at `line` in `path`.
    pub fn lookup(&self, path: &str, line: u32) -> Option<u32> {
        self.files
            .get(path)?
            .iter()
            .find(|p| p.line == line)
            .map(|p| p.position)
    }

    /// All addressable positions for a file, in diff order.
    pub fn positions(&self, path: &str) -> &[DiffPosition] {
        self.files.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    /// Anchor line-based comments at diff positions.
    ///
    /// Comments on files missing from the diff, or on lines the diff does
    /// not show, end up in [`Resolution::unresolved`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_core::ReviewComment;
    /// use pinguard_difflens::parser::parse_unified_diff;
    /// use pinguard_difflens::position::PositionMap;
    ///
    /// let diff = "--- a/x.sql\n+++ b/x.sql\n@@ -1 +1,2 @@\n BEGIN;\n+DROP TABLE t;\n";
    /// let map = PositionMap::from_diffs(&parse_unified_diff(diff).unwrap());
    /// let comments = vec![
    ///     ReviewComment { path: "x.sql".into(), line: 2, body: "unsafe".into() },
    ///     ReviewComment { path: "x.sql".into(), line: 40, body: "far away".into() },
    /// ];
    /// let resolution = map.resolve(comments);
    /// assert_eq!(resolution.positioned.len(), 1);
    /// assert_eq!(resolution.positioned[0].position, 2);
    /// assert_eq!(resolution.unresolved.len(), 1);
    /// ```
    pub fn resolve(&self, comments: Vec<ReviewComment>) -> Resolution {
        let mut positioned = Vec::new();
        let mut unresolved = Vec::new();

        for comment in comments {
            if !self.contains_file(&comment.path) {
                tracing::warn!(path = %comment.path, "no diff positions found for file");
                unresolved.push(comment);
                continue;
            }
            match self.lookup(&comment.path, comment.line) {
                Some(position) => positioned.push(PositionedComment {
                    path: comment.path,
                    position,
                    line: comment.line,
                    body: comment.body,
                }),
                None => {
                    tracing::warn!(
                        path = %comment.path,
                        line = comment.line,
                        "no diff position found for line"
                    );
                    unresolved.push(comment);
                }
            }
        }

        Resolution {
            positioned,
            unresolved,
        }
    }
}

/// Outcome of anchoring comments against a diff.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Comments ready to post.
    pub positioned: Vec<PositionedComment>,
    /// Comments whose line is not part of the diff.
    pub unresolved: Vec<ReviewComment>,
}

fn file_positions(diff: &FileDiff) -> Vec<DiffPosition> {
    let mut positions = Vec::new();
    let mut position = 0u32;

    for (index, hunk) in diff.hunks.iter().enumerate() {
        if index > 0 {
            // later hunk headers occupy a position of their own
            position += 1;
        }
        for line in &hunk.lines {
            position += 1;
            if !line.is_addressable() {
                continue;
            }
            if let Some(new_line) = line.new_line {
                positions.push(DiffPosition {
                    position,
                    line: new_line,
                });
            }
        }
    }

    positions
}
