//! Posting analysis results as a pull request review.

use pinguard_core::{PinguardError, PrDetails, ReviewComment, Verdict};
use pinguard_difflens::parser::parse_unified_diff;
use pinguard_difflens::position::{PositionMap, Resolution};

use crate::github::GitHubClient;
use crate::pipeline::{verdict_marker, AnalysisResult};

/// Outcome of a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A review with this many inline comments was created.
    Posted {
        /// Comments attached to the review.
        comments: usize,
        /// Comments dropped because their line is not in the diff.
        unresolved: usize,
    },
    /// No comment could be anchored, so nothing was posted.
    NothingToPost {
        /// Comments dropped because their line is not in the diff.
        unresolved: usize,
    },
}

/// Anchor comments at positions of the full pull request diff.
///
/// # Errors
///
/// Returns [`PinguardError::Parse`] if the diff cannot be parsed.
pub fn resolve_positions(
    comments: Vec<ReviewComment>,
    pr_diff: &str,
) -> Result<Resolution, PinguardError> {
    let diffs = parse_unified_diff(pr_diff)?;
    Ok(PositionMap::from_diffs(&diffs).resolve(comments))
}

/// Summary body of the review.
///
/// # Examples
///
/// ```
/// use pinguard_core::{Verdict, VerdictStatus};
/// use pinguard_review::publish::review_summary;
///
/// let verdict = Verdict {
///     status: VerdictStatus::Blocked,
///     details: vec!["DROP COLUMN without a backfill".into()],
/// };
/// let body = review_summary(&verdict, 3);
/// assert!(body.contains("BLOCKED"));
/// assert!(body.contains("- DROP COLUMN without a backfill"));
/// ```
pub fn review_summary(verdict: &Verdict, comments: usize) -> String {
    let mut body = format!(
        "## \u{1f916} Dependency & Migration Review\n\n**Verdict:** {} {}\n\n",
        verdict_marker(verdict.status),
        verdict.status
    );
    for detail in &verdict.details {
        body.push_str(&format!("- {detail}\n"));
    }
    if !verdict.details.is_empty() {
        body.push('\n');
    }
    let noun = if comments == 1 { "comment" } else { "comments" };
    body.push_str(&format!("{comments} inline {noun}."));
    body
}

/// Resolve `result`'s comments against `pr_diff` and post them as one review.
///
/// # Errors
///
/// Returns [`PinguardError::GitHub`] if posting fails; the attempted
/// comments are logged first.
pub async fn publish_review(
    github: &GitHubClient,
    pr: &PrDetails,
    result: &AnalysisResult,
    pr_diff: &str,
) -> Result<PublishOutcome, PinguardError> {
    let resolution = resolve_positions(result.comments.clone(), pr_diff)?;
    let unresolved = resolution.unresolved.len();

    if resolution.positioned.is_empty() {
        tracing::info!(unresolved, "no comments to post");
        return Ok(PublishOutcome::NothingToPost { unresolved });
    }

    let summary = review_summary(&result.verdict, resolution.positioned.len());
    tracing::info!(
        comments = resolution.positioned.len(),
        unresolved,
        pr = pr.number,
        "posting review"
    );

    if let Err(e) = github
        .post_review(
            &pr.owner,
            &pr.repo,
            pr.number,
            &resolution.positioned,
            &summary,
        )
        .await
    {
        for comment in &resolution.positioned {
            tracing::error!(
                path = %comment.path,
                line = comment.line,
                body_len = comment.body.len(),
                "comment in failed review"
            );
        }
        return Err(e);
    }

    Ok(PublishOutcome::Posted {
        comments: resolution.positioned.len(),
        unresolved,
    })
}
