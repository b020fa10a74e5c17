//! GitHub Actions `pull_request` event payloads.

use std::path::Path;

use pinguard_core::PinguardError;
use serde::Deserialize;

/// Which diff a run should review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSource {
    /// The whole pull request diff (`opened`, `reopened`).
    FullPullRequest,
    /// Only what a push changed (`synchronize`).
    Compare {
        /// Head commit before the push.
        base: String,
        /// Head commit after the push.
        head: String,
    },
    /// Any other action; nothing is reviewed.
    Unsupported(String),
}

/// The parts of a `pull_request` event the bot needs.
///
/// # Examples
///
/// ```
/// use pinguard_review::event::{DiffSource, PullRequestEvent};
///
/// let json = r#"{
///     "action": "opened",
///     "number": 7,
///     "repository": {"name": "shop", "owner": {"login": "acme"}}
/// }"#;
/// let event = PullRequestEvent::from_json(json).unwrap();
/// assert_eq!(event.number, 7);
/// assert_eq!(event.diff_source(), DiffSource::FullPullRequest);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    /// Event action, e.g. `opened`.
    pub action: String,
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
    /// Previous head SHA on `synchronize`.
    pub before: Option<String>,
    /// New head SHA on `synchronize`.
    pub after: Option<String>,
}

#[derive(Deserialize)]
struct RawEvent {
    action: Option<String>,
    number: Option<u64>,
    pull_request: Option<RawPullRequest>,
    repository: Option<RawRepository>,
    before: Option<String>,
    after: Option<String>,
}

#[derive(Deserialize)]
struct RawPullRequest {
    number: Option<u64>,
}

#[derive(Deserialize)]
struct RawRepository {
    name: String,
    owner: RawOwner,
}

#[derive(Deserialize)]
struct RawOwner {
    login: String,
}

impl PullRequestEvent {
    /// Read and parse the event file written by the Actions runner.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::FileNotFound`] if the file is missing, or
    /// [`PinguardError::Event`] if it is not a pull request event.
    pub fn from_file(path: &Path) -> Result<Self, PinguardError> {
        if !path.exists() {
            return Err(PinguardError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse an event payload.
    ///
    /// The PR number comes from the top-level `number`, falling back to
    /// `pull_request.number`.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::Event`] on malformed JSON or missing fields.
    pub fn from_json(content: &str) -> Result<Self, PinguardError> {
        let raw: RawEvent = serde_json::from_str(content)
            .map_err(|e| PinguardError::Event(format!("malformed event payload: {e}")))?;

        let repository = raw
            .repository
            .ok_or_else(|| PinguardError::Event("event has no repository".into()))?;
        let number = raw
            .number
            .or_else(|| raw.pull_request.and_then(|pr| pr.number))
            .ok_or_else(|| PinguardError::Event("event has no pull request number".into()))?;

        Ok(Self {
            action: raw.action.unwrap_or_default(),
            owner: repository.owner.login,
            repo: repository.name,
            number,
            before: raw.before,
            after: raw.after,
        })
    }

    /// Decide which diff to review for this event.
    ///
    /// A `synchronize` event without both SHAs falls back to the full diff.
    pub fn diff_source(&self) -> DiffSource {
        match self.action.as_str() {
            "opened" | "reopened" => DiffSource::FullPullRequest,
            "synchronize" => match (self.before.as_deref(), self.after.as_deref()) {
                (Some(base), Some(head)) if !base.is_empty() && !head.is_empty() => {
                    DiffSource::Compare {
                        base: base.to_string(),
                        head: head.to_string(),
                    }
                }
                _ => {
                    tracing::warn!("synchronize event without before/after SHAs, reviewing full diff");
                    DiffSource::FullPullRequest
                }
            },
            other => DiffSource::Unsupported(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(action: &str, extra: &str) -> String {
        format!(
            r#"{{"action": "{action}", {extra} "repository": {{"name": "shop", "owner": {{"login": "acme"}}}}}}"#
        )
    }

    #[test]
    fn opened_reviews_full_diff() {
        let event = PullRequestEvent::from_json(&payload("opened", r#""number": 3,"#)).unwrap();
        assert_eq!(event.owner, "acme");
        assert_eq!(event.repo, "shop");
        assert_eq!(event.diff_source(), DiffSource::FullPullRequest);
    }

    #[test]
    fn reopened_reviews_full_diff() {
        let event = PullRequestEvent::from_json(&payload("reopened", r#""number": 3,"#)).unwrap();
        assert_eq!(event.diff_source(), DiffSource::FullPullRequest);
    }

    #[test]
    fn synchronize_compares_shas() {
        let extra = r#""number": 3, "before": "abc123", "after": "def456","#;
        let event = PullRequestEvent::from_json(&payload("synchronize", extra)).unwrap();
        assert_eq!(
            event.diff_source(),
            DiffSource::Compare {
                base: "abc123".into(),
                head: "def456".into()
            }
        );
    }

    #[test]
    fn synchronize_without_shas_falls_back() {
        let event =
            PullRequestEvent::from_json(&payload("synchronize", r#""number": 3,"#)).unwrap();
        assert_eq!(event.diff_source(), DiffSource::FullPullRequest);
    }

    #[test]
    fn other_actions_unsupported() {
        let event = PullRequestEvent::from_json(&payload("closed", r#""number": 3,"#)).unwrap();
        assert_eq!(event.diff_source(), DiffSource::Unsupported("closed".into()));
    }

    #[test]
    fn number_falls_back_to_pull_request() {
        let extra = r#""pull_request": {"number": 42},"#;
        let event = PullRequestEvent::from_json(&payload("opened", extra)).unwrap();
        assert_eq!(event.number, 42);
    }

    #[test]
    fn missing_number_is_an_error() {
        let err = PullRequestEvent::from_json(&payload("opened", "")).unwrap_err();
        assert!(matches!(err, PinguardError::Event(_)));
    }

    #[test]
    fn missing_repository_is_an_error() {
        let err = PullRequestEvent::from_json(r#"{"action": "opened", "number": 1}"#).unwrap_err();
        assert!(matches!(err, PinguardError::Event(_)));
    }

    #[test]
    fn from_file_reads_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, payload("opened", r#""number": 9,"#)).unwrap();
        let event = PullRequestEvent::from_file(&path).unwrap();
        assert_eq!(event.number, 9);
    }

    #[test]
    fn from_file_missing() {
        let err = PullRequestEvent::from_file(Path::new("/nonexistent/event.json")).unwrap_err();
        assert!(matches!(err, PinguardError::FileNotFound(_)));
    }
}
