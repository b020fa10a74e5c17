//! Pre-LLM file filtering.
//!
//! Drops excluded paths and deleted files, then classifies what is left so
//! only dependency manifests and migrations reach the model.

use std::path::PathBuf;

use glob::Pattern;
use pinguard_core::{FileKind, PatternsConfig, ReviewConfig};
use serde::Serialize;

use crate::classify::{compile_patterns, FileClassifier, MATCH_OPTIONS};
use crate::parser::FileDiff;

/// Files and patterns to skip before sending to the LLM.
///
/// # Examples
///
/// ```
/// use pinguard_difflens::filter::DiffFilter;
///
/// let filter = DiffFilter::new(&["docs/**".to_string()], Default::default());
/// assert!(filter.is_excluded("docs/schema.sql"));
/// assert!(!filter.is_excluded("db/schema.sql"));
/// ```
pub struct DiffFilter {
    exclude: Vec<Pattern>,
    classifier: FileClassifier,
}

impl DiffFilter {
    /// Create a filter from exclude globs and a classifier.
    pub fn new(exclude: &[String], classifier: FileClassifier) -> Self {
        Self {
            exclude: compile_patterns(exclude),
            classifier,
        }
    }

    /// Create a filter from review and pattern configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_core::{PatternsConfig, ReviewConfig};
    /// use pinguard_difflens::filter::DiffFilter;
    ///
    /// let review = ReviewConfig {
    ///     exclude: vec!["legacy/**".into()],
    ///     ..ReviewConfig::default()
    /// };
    /// let filter = DiffFilter::from_config(&review, &PatternsConfig::default());
    /// assert!(filter.is_excluded("legacy/package.json"));
    /// ```
    pub fn from_config(review: &ReviewConfig, patterns: &PatternsConfig) -> Self {
        Self::new(&review.exclude, FileClassifier::new(patterns))
    }

    /// Check whether a path matches any exclude pattern.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_by(path).is_some()
    }

    fn excluded_by(&self, path: &str) -> Option<&Pattern> {
        self.exclude
            .iter()
            .find(|p| p.matches_with(path, MATCH_OPTIONS))
    }

    /// Split parsed diffs into reviewable files and skipped files.
    ///
    /// Checks run in order: exclude patterns, missing target path, then
    /// classification.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_difflens::filter::DiffFilter;
    /// use pinguard_difflens::parser::parse_unified_diff;
    ///
    /// let diff = "diff --git a/db/001.sql b/db/001.sql\n\
    ///             --- a/db/001.sql\n\
    ///             +++ b/db/001.sql\n\
    ///             @@ -1,2 +1,3 @@\n\
    ///              BEGIN;\n\
    ///             +ALTER TABLE t ADD c int;\n\
    ///              COMMIT;\n";
    /// let diffs = parse_unified_diff(diff).unwrap();
    /// let filter = DiffFilter::new(&[], Default::default());
    /// let result = filter.filter(diffs);
    /// assert_eq!(result.kept.len(), 1);
    /// assert!(result.skipped.is_empty());
    /// ```
    pub fn filter(&self, diffs: Vec<FileDiff>) -> FilterResult {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();

        for diff in diffs {
            let path_str = diff.new_path.to_string_lossy().into_owned();

            if let Some(pattern) = self.excluded_by(&path_str) {
                skipped.push(SkippedFile {
                    path: diff.new_path.clone(),
                    reason: SkipReason::Excluded(pattern.to_string()),
                });
                continue;
            }

            let Some(target) = diff.target_path() else {
                skipped.push(SkippedFile {
                    path: diff.old_path.clone(),
                    reason: SkipReason::Deleted,
                });
                continue;
            };

            match self.classifier.classify(&target) {
                FileKind::Ignored => skipped.push(SkippedFile {
                    path: diff.new_path.clone(),
                    reason: SkipReason::Ignored,
                }),
                kind => kept.push(ClassifiedDiff {
                    path: target,
                    kind,
                    diff,
                }),
            }
        }

        FilterResult { kept, skipped }
    }
}

impl Default for DiffFilter {
    fn default() -> Self {
        Self::new(&[], FileClassifier::default())
    }
}

/// A reviewable file together with its category.
#[derive(Debug, Clone)]
pub struct ClassifiedDiff {
    /// Repository-relative path in the new version.
    pub path: String,
    /// Dependency or migration.
    pub kind: FileKind,
    /// The parsed diff for the file.
    pub diff: FileDiff,
}

/// Result of filtering diffs.
///
/// # Examples
///
/// ```
/// use pinguard_difflens::filter::FilterResult;
///
/// let result = FilterResult {
///     kept: vec![],
///     skipped: vec![],
/// };
/// assert!(result.kept.is_empty());
/// ```
pub struct FilterResult {
    /// Diffs that passed the filter.
    pub kept: Vec<ClassifiedDiff>,
    /// Files that were skipped with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was skipped during filtering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was skipped.
///
/// # Examples
///
/// ```
/// use pinguard_difflens::filter::SkipReason;
///
/// let reason = SkipReason::Excluded("docs/**".into());
/// assert_eq!(format!("{reason}"), "excluded by docs/**");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Matched a user exclude pattern.
    Excluded(String),
    /// The file no longer exists in the new version.
    Deleted,
    /// Neither a dependency manifest nor a migration.
    Ignored,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Excluded(pat) => write!(f, "excluded by {pat}"),
            SkipReason::Deleted => write!(f, "deleted"),
            SkipReason::Ignored => write!(f, "not a dependency or migration file"),
        }
    }
}
