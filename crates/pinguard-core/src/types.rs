use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Review category a changed file falls into.
///
/// # Examples
///
/// ```
/// use pinguard_core::FileKind;
///
/// assert_eq!(FileKind::Dependency.to_string(), "dependency");
/// assert!(!FileKind::Ignored.is_reviewable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Dependency manifest checked for version pinning.
    Dependency,
    /// Database migration checked for safety.
    Migration,
    /// Anything else; never sent to the model.
    Ignored,
}

impl FileKind {
    /// Whether files of this kind are sent to the model.
    pub fn is_reviewable(self) -> bool {
        !matches!(self, FileKind::Ignored)
    }

    /// The issue type the model is expected to report for this kind.
    pub fn issue_type(self) -> Option<IssueType> {
        match self {
            FileKind::Dependency => Some(IssueType::VersionPinning),
            FileKind::Migration => Some(IssueType::MigrationSafety),
            FileKind::Ignored => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Dependency => write!(f, "dependency"),
            FileKind::Migration => write!(f, "migration"),
            FileKind::Ignored => write!(f, "ignored"),
        }
    }
}

/// Category of a finding reported by the model.
///
/// # Examples
///
/// ```
/// use pinguard_core::IssueType;
///
/// let t: IssueType = "Version Pinning".parse().unwrap();
/// assert_eq!(t, IssueType::VersionPinning);
/// assert_eq!(IssueType::MigrationSafety.to_string(), "Migration Safety");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    /// Unpinned or floating dependency version.
    #[serde(rename = "Version Pinning")]
    VersionPinning,
    /// Unsafe database migration.
    #[serde(rename = "Migration Safety")]
    MigrationSafety,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueType::VersionPinning => write!(f, "Version Pinning"),
            IssueType::MigrationSafety => write!(f, "Migration Safety"),
        }
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "versionpinning" => Ok(IssueType::VersionPinning),
            "migrationsafety" => Ok(IssueType::MigrationSafety),
            _ => Err(format!("unknown issue type: {s}")),
        }
    }
}

/// Finding severity level.
///
/// Parsing accepts both the labelled form the model is asked to emit
/// (`"🔴 Critical"`) and the bare word.
///
/// # Examples
///
/// ```
/// use pinguard_core::Severity;
///
/// assert_eq!("🔴 Critical".parse::<Severity>().unwrap(), Severity::Critical);
/// assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
/// assert_eq!(Severity::Info.to_string(), "🟢 Info");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Must be fixed before merging.
    #[serde(rename = "🔴 Critical")]
    Critical,
    /// Should be fixed.
    #[serde(rename = "🟡 Warning")]
    Warning,
    /// Informational observation.
    #[serde(rename = "🟢 Info")]
    Info,
}

impl Severity {
    /// Plain label without the marker emoji.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Severity::Critical => "\u{1f534}",
            Severity::Warning => "\u{1f7e1}",
            Severity::Info => "\u{1f7e2}",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.marker(), self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word: String = s
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_lowercase();
        match word.as_str() {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Overall outcome the model assigns to a chunk.
///
/// Variants are ordered by strictness, so the strictest verdict of a run is
/// simply the maximum.
///
/// # Examples
///
/// ```
/// use pinguard_core::VerdictStatus;
///
/// assert!(VerdictStatus::Blocked > VerdictStatus::ChangesNeeded);
/// assert_eq!("CHANGES_NEEDED".parse::<VerdictStatus>().unwrap(), VerdictStatus::ChangesNeeded);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    /// Nothing to fix.
    #[default]
    Approved,
    /// Fixable issues found.
    ChangesNeeded,
    /// Issues severe enough to block the merge.
    Blocked,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictStatus::Approved => write!(f, "APPROVED"),
            VerdictStatus::ChangesNeeded => write!(f, "CHANGES_NEEDED"),
            VerdictStatus::Blocked => write!(f, "BLOCKED"),
        }
    }
}

impl FromStr for VerdictStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "APPROVED" => Ok(VerdictStatus::Approved),
            "CHANGES_NEEDED" => Ok(VerdictStatus::ChangesNeeded),
            "BLOCKED" => Ok(VerdictStatus::Blocked),
            other => Err(format!("unknown verdict status: {other}")),
        }
    }
}

/// Verdict with its supporting details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Overall status.
    pub status: VerdictStatus,
    /// Specific items behind the status.
    #[serde(default)]
    pub details: Vec<String>,
}

impl Verdict {
    /// Fold another verdict into this one, keeping the stricter status and
    /// every distinct detail.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_core::{Verdict, VerdictStatus};
    ///
    /// let mut overall = Verdict::default();
    /// overall.merge(Verdict {
    ///     status: VerdictStatus::Blocked,
    ///     details: vec!["DROP COLUMN without backup".into()],
    /// });
    /// assert_eq!(overall.status, VerdictStatus::Blocked);
    /// assert_eq!(overall.details.len(), 1);
    /// ```
    pub fn merge(&mut self, other: Verdict) {
        self.status = self.status.max(other.status);
        for detail in other.details {
            if !self.details.contains(&detail) {
                self.details.push(detail);
            }
        }
    }
}

/// One structured finding returned by the model for a chunk.
///
/// # Examples
///
/// ```
/// use pinguard_core::{Finding, IssueType, Severity};
///
/// let finding = Finding {
///     line: 12,
///     issue_type: IssueType::VersionPinning,
///     severity: Severity::Critical,
///     problem: "Caret range on express".into(),
///     solution: "Pin to an exact version".into(),
///     example: "\"express\": \"4.18.2\"".into(),
/// };
/// assert_eq!(finding.line, 12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Line number in the new version of the file.
    pub line: u32,
    /// Finding category.
    pub issue_type: IssueType,
    /// Severity of the finding.
    pub severity: Severity,
    /// What is wrong.
    pub problem: String,
    /// The fix required.
    pub solution: String,
    /// Example of the corrected code.
    pub example: String,
}

impl Finding {
    /// Render the comment body posted on the pull request.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_core::{Finding, IssueType, Severity};
    ///
    /// let finding = Finding {
    ///     line: 3,
    ///     issue_type: IssueType::MigrationSafety,
    ///     severity: Severity::Warning,
    ///     problem: "No transaction".into(),
    ///     solution: "Wrap in BEGIN/COMMIT".into(),
    ///     example: "BEGIN; ... COMMIT;".into(),
    /// };
    /// let body = finding.to_comment_body();
    /// assert!(body.starts_with("🏷️ ISSUE TYPE: Migration Safety"));
    /// assert!(body.contains("⚠️ SEVERITY: 🟡 Warning"));
    /// ```
    pub fn to_comment_body(&self) -> String {
        format!(
            "\u{1f3f7}\u{fe0f} ISSUE TYPE: {}\n\
             \u{26a0}\u{fe0f} SEVERITY: {}\n\
             \u{274c} PROBLEM: {}\n\
             \u{2705} SOLUTION: {}\n\
             \u{1f4dd} EXAMPLE: {}",
            self.issue_type, self.severity, self.problem, self.solution, self.example
        )
    }
}

/// How a diff line relates to the two file versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Line added in the new version.
    Add,
    /// Line removed from the old version.
    Delete,
    /// Unchanged context line.
    Normal,
}

/// A single line inside a diff hunk with its line numbers.
///
/// # Examples
///
/// ```
/// use pinguard_core::{ChangeKind, DiffLine};
///
/// let line = DiffLine {
///     kind: ChangeKind::Add,
///     old_line: None,
///     new_line: Some(7),
///     content: "\"lodash\": \"4.17.21\",".into(),
/// };
/// assert!(line.is_addressable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    /// Add, delete, or context.
    pub kind: ChangeKind,
    /// Line number in the old version, absent for additions.
    pub old_line: Option<u32>,
    /// Line number in the new version, absent for deletions.
    pub new_line: Option<u32>,
    /// Line text without the leading marker.
    pub content: String,
}

impl DiffLine {
    /// Whether a review comment can be anchored on this line.
    pub fn is_addressable(&self) -> bool {
        self.kind != ChangeKind::Delete
    }

    /// The line as it appears in a unified diff, marker included.
    pub fn to_diff_line(&self) -> String {
        let marker = match self.kind {
            ChangeKind::Add => '+',
            ChangeKind::Delete => '-',
            ChangeKind::Normal => ' ',
        };
        format!("{marker}{}", self.content)
    }
}

/// A single hunk from a unified diff.
///
/// # Examples
///
/// ```
/// use pinguard_core::DiffHunk;
/// use std::path::PathBuf;
///
/// let hunk = DiffHunk {
///     file_path: PathBuf::from("package.json"),
///     header: "@@ -10,5 +10,8 @@".into(),
///     old_start: 10,
///     old_lines: 5,
///     new_start: 10,
///     new_lines: 8,
///     lines: vec![],
/// };
/// assert_eq!(hunk.old_lines, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    /// Path to the affected file.
    pub file_path: PathBuf,
    /// The raw `@@ ... @@` header line.
    pub header: String,
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// Parsed lines of the hunk body.
    pub lines: Vec<DiffLine>,
}

/// A review comment anchored at a line of the new file version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewComment {
    /// Repository-relative file path.
    pub path: String,
    /// Line number in the new version of the file.
    pub line: u32,
    /// Markdown body.
    pub body: String,
}

/// A review comment anchored at a diff position, ready to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedComment {
    /// Repository-relative file path.
    pub path: String,
    /// Offset below the file's first hunk header.
    pub position: u32,
    /// New-file line the comment was written for. Not sent to GitHub.
    #[serde(skip)]
    pub line: u32,
    /// Markdown body.
    pub body: String,
}

/// Identity and description of the pull request under review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrDetails {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
    /// Pull request title, empty when unset.
    pub title: String,
    /// Pull request body, empty when unset.
    pub description: String,
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use pinguard_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
