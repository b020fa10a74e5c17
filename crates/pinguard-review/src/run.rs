//! End-to-end run for a GitHub Actions `pull_request` event.

use std::path::PathBuf;

use pinguard_core::{PinguardConfig, PinguardError, PrDetails};
use pinguard_difflens::filter::DiffFilter;
use pinguard_difflens::parser::parse_unified_diff;
use pinguard_difflens::position::Resolution;

use crate::cookbook::{cookbook_client, load_cookbook};
use crate::event::{DiffSource, PullRequestEvent};
use crate::github::GitHubClient;
use crate::llm::LlmClient;
use crate::pipeline::{AnalysisResult, ReviewPipeline};
use crate::publish::{publish_review, resolve_positions, PublishOutcome};

/// Per-run inputs that are not part of the configuration file.
#[derive(Debug, Clone)]
pub struct ActionSettings {
    /// Path of the event payload (`GITHUB_EVENT_PATH`).
    pub event_path: PathBuf,
    /// Analyse and resolve, but do not post the review.
    pub dry_run: bool,
}

/// What a run ended up doing.
#[derive(Debug)]
pub enum RunOutcome {
    /// The event action is not reviewed.
    Unsupported(String),
    /// The diff to review was empty.
    EmptyDiff,
    /// Comments were resolved but not posted.
    DryRun {
        /// Analysis of the diff.
        result: AnalysisResult,
        /// Comments anchored against the full pull request diff.
        resolution: Resolution,
    },
    /// The review was published (or there was nothing to publish).
    Published {
        /// Analysis of the diff.
        result: AnalysisResult,
        /// What the publish step did.
        outcome: PublishOutcome,
    },
}

/// Review the pull request named by the event file.
///
/// # Errors
///
/// Returns an error if the event cannot be read, a GitHub request fails, or
/// the review cannot be posted. Individual model failures are not errors.
pub async fn run_action(
    config: &PinguardConfig,
    settings: &ActionSettings,
) -> Result<RunOutcome, PinguardError> {
    let event = PullRequestEvent::from_file(&settings.event_path)?;
    let source = event.diff_source();
    if let DiffSource::Unsupported(action) = source {
        tracing::info!(%action, "unsupported event, nothing to review");
        return Ok(RunOutcome::Unsupported(action));
    }
    tracing::info!(
        owner = %event.owner,
        repo = %event.repo,
        pr = event.number,
        action = %event.action,
        "reviewing pull request"
    );

    let github = GitHubClient::new(&config.github)?;
    let pr = github
        .get_pr_details(&event.owner, &event.repo, event.number)
        .await?;

    let cookbook_url = config.review.cookbook_url.as_deref();
    let cookbook = load_cookbook(&cookbook_client()?, cookbook_url).await;

    let pr_diff = github
        .get_pr_diff(&event.owner, &event.repo, event.number)
        .await?;
    let diff_text = match &source {
        DiffSource::Compare { base, head } => {
            github
                .compare_diff(&event.owner, &event.repo, base, head)
                .await?
        }
        _ => pr_diff.clone(),
    };

    if diff_text.trim().is_empty() {
        tracing::info!("no diff found");
        return Ok(RunOutcome::EmptyDiff);
    }

    let result = analyze_diff(config, &diff_text, &pr, &cookbook).await?;

    if settings.dry_run {
        let resolution = resolve_positions(result.comments.clone(), &pr_diff)?;
        return Ok(RunOutcome::DryRun { result, resolution });
    }

    let outcome = publish_review(&github, &pr, &result, &pr_diff).await?;
    Ok(RunOutcome::Published { result, outcome })
}

/// Parse, filter, and analyse a unified diff.
///
/// # Errors
///
/// Returns [`PinguardError::Parse`] for malformed diffs or
/// [`PinguardError::Llm`] if the LLM client cannot be built.
pub async fn analyze_diff(
    config: &PinguardConfig,
    diff_text: &str,
    pr: &PrDetails,
    cookbook: &str,
) -> Result<AnalysisResult, PinguardError> {
    let diffs = parse_unified_diff(diff_text)?;
    let filter = DiffFilter::from_config(&config.review, &config.patterns);
    let filtered = filter.filter(diffs);
    for skipped in &filtered.skipped {
        tracing::debug!(path = %skipped.path.display(), reason = %skipped.reason, "skipping file");
    }

    let llm = LlmClient::new(&config.llm)?;
    let pipeline = ReviewPipeline::new(llm, config.review.concurrency);
    Ok(pipeline.analyze(filtered, pr, cookbook).await)
}
