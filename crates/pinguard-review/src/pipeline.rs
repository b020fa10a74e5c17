use std::fmt;
use std::sync::Arc;

use pinguard_core::{DiffHunk, FileKind, PrDetails, ReviewComment, Verdict, VerdictStatus};
use pinguard_difflens::filter::{ClassifiedDiff, FilterResult, SkippedFile};
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::llm::{ChatMessage, LlmClient};
use crate::prompt;

/// Result of analysing a set of filtered diffs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Line-anchored comments, in file order.
    pub comments: Vec<ReviewComment>,
    /// Strictest verdict across all chunks.
    pub verdict: Verdict,
    /// Files that never reached the model.
    pub skipped: Vec<SkippedFile>,
    /// Statistics about the run.
    pub stats: AnalysisStats,
}

/// Statistics about an analysis run.
///
/// # Examples
///
/// ```
/// use pinguard_review::pipeline::AnalysisStats;
///
/// let stats = AnalysisStats {
///     files_analyzed: 2,
///     files_skipped: 4,
///     chunks_analyzed: 3,
///     llm_failures: 1,
///     comments_generated: 5,
///     model_used: "gpt-4o-2024-08-06".into(),
/// };
/// assert_eq!(stats.chunks_analyzed - stats.llm_failures, 2);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    /// Dependency and migration files sent to the model.
    pub files_analyzed: usize,
    /// Files skipped by the filter.
    pub files_skipped: usize,
    /// Hunks sent to the model.
    pub chunks_analyzed: usize,
    /// Chunks whose request or reply failed.
    pub llm_failures: usize,
    /// Comments produced across all chunks.
    pub comments_generated: usize,
    /// Model identifier used for the run.
    pub model_used: String,
}

/// Sends each hunk of each reviewable file to the model and collects
/// findings.
///
/// Up to `concurrency` files are in flight at once; the hunks of one file
/// are analysed concurrently.
pub struct ReviewPipeline {
    llm: LlmClient,
    concurrency: usize,
}

#[derive(Default)]
struct FileOutcome {
    comments: Vec<ReviewComment>,
    verdict: Verdict,
    chunks: usize,
    failures: usize,
}

enum ChunkOutcome {
    Analyzed {
        comments: Vec<ReviewComment>,
        verdict: Verdict,
    },
    Failed,
}

impl ReviewPipeline {
    /// Create a pipeline; a concurrency of zero is treated as one.
    pub fn new(llm: LlmClient, concurrency: usize) -> Self {
        Self {
            llm,
            concurrency: concurrency.max(1),
        }
    }

    /// Analyse every kept file of `filtered` against the cookbook rules.
    ///
    /// Chunk failures are logged and counted, never propagated.
    pub async fn analyze(
        &self,
        filtered: FilterResult,
        pr: &PrDetails,
        cookbook: &str,
    ) -> AnalysisResult {
        let FilterResult { kept, skipped } = filtered;
        let mut stats = AnalysisStats {
            files_analyzed: kept.len(),
            files_skipped: skipped.len(),
            model_used: self.llm.model().to_string(),
            ..AnalysisStats::default()
        };
        tracing::info!(
            files = kept.len(),
            skipped = skipped.len(),
            "analysing dependency and migration changes"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let system = Arc::new(prompt::build_system_prompt(cookbook));
        let pr = Arc::new(pr.clone());

        let mut handles = Vec::with_capacity(kept.len());
        for file in kept {
            let path = file.path.clone();
            let llm = self.llm.clone();
            let semaphore = Arc::clone(&semaphore);
            let system = Arc::clone(&system);
            let pr = Arc::clone(&pr);
            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return FileOutcome::default();
                };
                analyze_file(llm, system, pr, file).await
            });
            handles.push((path, handle));
        }

        let mut comments = Vec::new();
        let mut verdict = Verdict::default();
        for (path, handle) in handles {
            match handle.await {
                Ok(outcome) => {
                    stats.chunks_analyzed += outcome.chunks;
                    stats.llm_failures += outcome.failures;
                    comments.extend(outcome.comments);
                    verdict.merge(outcome.verdict);
                }
                Err(e) => {
                    tracing::error!(%path, error = %e, "file analysis task failed");
                }
            }
        }

        stats.comments_generated = comments.len();
        tracing::info!(
            comments = comments.len(),
            verdict = %verdict.status,
            "analysis complete"
        );

        AnalysisResult {
            comments,
            verdict,
            skipped,
            stats,
        }
    }
}

async fn analyze_file(
    llm: LlmClient,
    system: Arc<String>,
    pr: Arc<PrDetails>,
    file: ClassifiedDiff,
) -> FileOutcome {
    let ClassifiedDiff { path, kind, diff } = file;
    tracing::debug!(%path, %kind, hunks = diff.hunks.len(), "analysing file");

    let handles: Vec<_> = diff
        .hunks
        .into_iter()
        .enumerate()
        .map(|(index, hunk)| {
            let llm = llm.clone();
            let system = Arc::clone(&system);
            let pr = Arc::clone(&pr);
            let path = path.clone();
            tokio::spawn(
                async move { analyze_chunk(&llm, &system, &pr, &path, kind, index, &hunk).await },
            )
        })
        .collect();

    let mut outcome = FileOutcome::default();
    for handle in handles {
        outcome.chunks += 1;
        match handle.await {
            Ok(ChunkOutcome::Analyzed { comments, verdict }) => {
                outcome.comments.extend(comments);
                outcome.verdict.merge(verdict);
            }
            Ok(ChunkOutcome::Failed) => outcome.failures += 1,
            Err(e) => {
                tracing::error!(%path, error = %e, "chunk analysis task failed");
                outcome.failures += 1;
            }
        }
    }
    outcome
}

async fn analyze_chunk(
    llm: &LlmClient,
    system: &str,
    pr: &PrDetails,
    path: &str,
    kind: FileKind,
    index: usize,
    hunk: &DiffHunk,
) -> ChunkOutcome {
    let messages = vec![
        ChatMessage::system(system),
        ChatMessage::user(prompt::build_chunk_prompt(path, hunk, pr, kind)),
    ];

    let response = match llm.chat(messages).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(%path, chunk = index + 1, error = %e, "no LLM response for chunk");
            return ChunkOutcome::Failed;
        }
    };

    let Some(analysis) = prompt::parse_analysis(&response, kind) else {
        tracing::warn!(%path, chunk = index + 1, "unusable LLM response for chunk");
        return ChunkOutcome::Failed;
    };

    let comments = analysis
        .findings
        .iter()
        .map(|finding| ReviewComment {
            path: path.to_string(),
            line: finding.line,
            body: finding.to_comment_body(),
        })
        .collect();

    ChunkOutcome::Analyzed {
        comments,
        verdict: analysis.verdict,
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dependency & Migration Review")?;
        writeln!(f, "=============================")?;
        writeln!(
            f,
            "Model: {} | Files: {} (skipped: {}) | Chunks: {} (failed: {}) | Comments: {}",
            self.stats.model_used,
            self.stats.files_analyzed,
            self.stats.files_skipped,
            self.stats.chunks_analyzed,
            self.stats.llm_failures,
            self.comments.len(),
        )?;
        writeln!(f, "Verdict: {}\n", self.verdict.status)?;

        for detail in &self.verdict.details {
            writeln!(f, "  - {detail}")?;
        }
        if !self.verdict.details.is_empty() {
            writeln!(f)?;
        }

        if self.comments.is_empty() {
            writeln!(f, "No issues found.")?;
        } else {
            for c in &self.comments {
                writeln!(f, "{}:{}", c.path, c.line)?;
                for line in c.body.lines() {
                    writeln!(f, "  {line}")?;
                }
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

impl AnalysisResult {
    /// Render the result as Markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_core::Verdict;
    /// use pinguard_review::pipeline::{AnalysisResult, AnalysisStats};
    ///
    /// let result = AnalysisResult {
    ///     comments: vec![],
    ///     verdict: Verdict::default(),
    ///     skipped: vec![],
    ///     stats: AnalysisStats::default(),
    /// };
    /// let md = result.to_markdown();
    /// assert!(md.contains("No issues found."));
    /// assert!(md.contains("APPROVED"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Dependency & Migration Review\n\n");
        out.push_str(&format!(
            "**Model:** {} | **Files:** {} (skipped: {}) | **Chunks:** {} (failed: {}) | **Comments:** {}\n\n",
            self.stats.model_used,
            self.stats.files_analyzed,
            self.stats.files_skipped,
            self.stats.chunks_analyzed,
            self.stats.llm_failures,
            self.comments.len(),
        ));
        out.push_str(&format!(
            "**Verdict:** {} {}\n\n",
            verdict_marker(self.verdict.status),
            self.verdict.status
        ));
        for detail in &self.verdict.details {
            out.push_str(&format!("- {detail}\n"));
        }
        if !self.verdict.details.is_empty() {
            out.push('\n');
        }

        if self.comments.is_empty() {
            out.push_str("No issues found.\n");
        } else {
            for c in &self.comments {
                out.push_str(&format!("## `{}:{}`\n\n", c.path, c.line));
                for line in c.body.lines() {
                    out.push_str(&format!("{line}  \n"));
                }
                out.push('\n');
            }
        }
        out
    }
}

/// Marker emoji for a verdict status.
pub(crate) fn verdict_marker(status: VerdictStatus) -> &'static str {
    match status {
        VerdictStatus::Approved => "\u{2705}",
        VerdictStatus::ChangesNeeded => "\u{1f7e1}",
        VerdictStatus::Blocked => "\u{1f6d1}",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            comments: vec![ReviewComment {
                path: "Dockerfile".into(),
                line: 1,
                body: "\u{274c} PROBLEM: floating tag\n\u{2705} SOLUTION: pin it".into(),
            }],
            verdict: Verdict {
                status: VerdictStatus::ChangesNeeded,
                details: vec!["node:latest".into()],
            },
            skipped: vec![],
            stats: AnalysisStats {
                files_analyzed: 1,
                files_skipped: 2,
                chunks_analyzed: 1,
                llm_failures: 0,
                comments_generated: 1,
                model_used: "gpt-4o-2024-08-06".into(),
            },
        }
    }

    #[test]
    fn display_lists_comments_and_verdict() {
        let text = sample_result().to_string();
        assert!(text.contains("Verdict: CHANGES_NEEDED"));
        assert!(text.contains("  - node:latest"));
        assert!(text.contains("Dockerfile:1"));
        assert!(text.contains("  \u{2705} SOLUTION: pin it"));
        assert!(text.contains("(skipped: 2)"));
    }

    #[test]
    fn markdown_has_heading_per_comment() {
        let md = sample_result().to_markdown();
        assert!(md.starts_with("# Dependency & Migration Review"));
        assert!(md.contains("## `Dockerfile:1`"));
        assert!(md.contains("**Verdict:** \u{1f7e1} CHANGES_NEEDED"));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = serde_json::to_value(sample_result()).unwrap();
        assert_eq!(json["stats"]["filesAnalyzed"], 1);
        assert_eq!(json["verdict"]["status"], "CHANGES_NEEDED");
        assert_eq!(json["comments"][0]["path"], "Dockerfile");
    }

    #[test]
    fn zero_concurrency_clamped() {
        let llm = LlmClient::new(&pinguard_core::LlmConfig::default()).unwrap();
        let pipeline = ReviewPipeline::new(llm, 0);
        assert_eq!(pipeline.concurrency, 1);
    }

    #[tokio::test]
    async fn nothing_to_analyze_is_approved() {
        let llm = LlmClient::new(&pinguard_core::LlmConfig::default()).unwrap();
        let pipeline = ReviewPipeline::new(llm, 5);
        let filtered = FilterResult {
            kept: vec![],
            skipped: vec![],
        };
        let result = pipeline
            .analyze(filtered, &PrDetails::default(), "rules")
            .await;
        assert!(result.comments.is_empty());
        assert_eq!(result.verdict.status, VerdictStatus::Approved);
        assert_eq!(result.stats.model_used, "gpt-4o-2024-08-06");
    }
}
