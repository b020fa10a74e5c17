use pinguard_core::{GitHubConfig, PinguardError, PositionedComment, PrDetails};
use serde::Deserialize;

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const USER_AGENT: &str = concat!("pinguard/", env!("CARGO_PKG_VERSION"));

/// GitHub REST client for fetching pull request data and posting reviews.
///
/// JSON endpoints go through `octocrab`; the diff media type is fetched with
/// a plain `reqwest` client because it returns text, not JSON.
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
    api_url: String,
}

#[derive(Deserialize)]
struct PullRequestInfo {
    title: Option<String>,
    body: Option<String>,
}

impl GitHubClient {
    /// Create a client from the configured token. `GITHUB_TOKEN` is only
    /// read when no token was configured.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::Config`] if no token is available, or
    /// [`PinguardError::GitHub`] if the client cannot be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, PinguardError> {
        let token = match config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => std::env::var("GITHUB_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    PinguardError::Config(
                        "GITHUB_TOKEN not set. Pass --github-token or set the GITHUB_TOKEN input"
                            .into(),
                    )
                })?,
        };
        let api_url = config.api_url.trim_end_matches('/').to_string();

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.clone())
            .base_uri(api_url.as_str())
            .map_err(|e| PinguardError::GitHub(format!("invalid GitHub API URL {api_url}: {e}")))?
            .build()
            .map_err(|e| PinguardError::GitHub(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PinguardError::GitHub(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            octocrab,
            http,
            token,
            api_url,
        })
    }

    /// Fetch title and description of a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::GitHub`] on network or API errors.
    pub async fn get_pr_details(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<PrDetails, PinguardError> {
        let route = format!("/repos/{owner}/{repo}/pulls/{pr_number}");
        let info: PullRequestInfo = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| PinguardError::GitHub(format!("failed to fetch PR #{pr_number}: {e}")))?;

        Ok(PrDetails {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number: pr_number,
            title: info.title.unwrap_or_default(),
            description: info.body.unwrap_or_default(),
        })
    }

    /// Fetch the unified diff for a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::GitHub`] on network or API errors.
    pub async fn get_pr_diff(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<String, PinguardError> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{pr_number}", self.api_url);
        self.fetch_diff(&url).await
    }

    /// Fetch the unified diff between two commits, used for `synchronize`
    /// events to review only what the latest push changed.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::GitHub`] on network or API errors.
    pub async fn compare_diff(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<String, PinguardError> {
        let url = format!("{}/repos/{owner}/{repo}/compare/{base}...{head}", self.api_url);
        self.fetch_diff(&url).await
    }

    async fn fetch_diff(&self, url: &str) -> Result<String, PinguardError> {
        tracing::debug!(%url, "fetching diff");
        let response = self
            .http
            .get(url)
            .header("Accept", DIFF_MEDIA_TYPE)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| PinguardError::GitHub(format!("failed to fetch diff: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinguardError::GitHub(format!(
                "GitHub API error {status}: {body}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| PinguardError::GitHub(format!("failed to read diff response: {e}")))
    }

    /// Post a single `COMMENT` review carrying all positioned comments.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::GitHub`] on API errors.
    pub async fn post_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        comments: &[PositionedComment],
        summary: &str,
    ) -> Result<(), PinguardError> {
        let route = format!("/repos/{owner}/{repo}/pulls/{pr_number}/reviews");
        let body = serde_json::json!({
            "event": "COMMENT",
            "body": summary,
            "comments": comments,
        });

        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(&body))
            .await
            .map_err(|e| PinguardError::GitHub(format!("failed to post review: {e}")))?;

        Ok(())
    }
}

/// Parse a PR reference string (`owner/repo#number`) into its components.
///
/// # Errors
///
/// Returns [`PinguardError::Config`] if the format is invalid.
///
/// # Examples
///
/// ```
/// use pinguard_review::github::parse_pr_reference;
///
/// let (owner, repo, num) = parse_pr_reference("octocat/hello-world#42").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// assert_eq!(num, 42);
/// ```
pub fn parse_pr_reference(pr_ref: &str) -> Result<(String, String, u64), PinguardError> {
    let invalid = || {
        PinguardError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        ))
    };
    let (owner_repo, number_str) = pr_ref.split_once('#').ok_or_else(invalid)?;
    let (owner, repo) = owner_repo.split_once('/').ok_or_else(invalid)?;
    if owner.is_empty() || repo.is_empty() {
        return Err(invalid());
    }
    let number: u64 = number_str
        .parse()
        .map_err(|_| PinguardError::Config(format!("invalid PR number: {number_str}")))?;
    Ok((owner.to_string(), repo.to_string(), number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_pr_reference() {
        let (owner, repo, num) = parse_pr_reference("rust-lang/rust#12345").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "rust");
        assert_eq!(num, 12345);
    }

    #[test]
    fn parse_pr_reference_missing_hash() {
        assert!(parse_pr_reference("owner/repo").is_err());
    }

    #[test]
    fn parse_pr_reference_missing_slash() {
        assert!(parse_pr_reference("repo#123").is_err());
    }

    #[test]
    fn parse_pr_reference_empty_owner() {
        assert!(parse_pr_reference("/repo#1").is_err());
    }

    #[test]
    fn parse_pr_reference_invalid_number() {
        assert!(parse_pr_reference("owner/repo#abc").is_err());
    }

    #[tokio::test]
    async fn configured_token_is_used() {
        let config = GitHubConfig {
            token: Some("ghp_explicit".into()),
            ..GitHubConfig::default()
        };
        let client = GitHubClient::new(&config).unwrap();
        assert_eq!(client.token, "ghp_explicit");
        assert_eq!(client.api_url, "https://api.github.com");
    }

    #[tokio::test]
    async fn trailing_slash_trimmed_from_api_url() {
        let config = GitHubConfig {
            token: Some("t".into()),
            api_url: "https://ghe.example.com/api/v3/".into(),
        };
        let client = GitHubClient::new(&config).unwrap();
        assert_eq!(client.api_url, "https://ghe.example.com/api/v3");
    }
}
