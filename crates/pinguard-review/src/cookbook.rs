//! Review rules ("cookbook") sent to the model as system instructions.

use std::time::Duration;

use pinguard_core::PinguardError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Rules used when no cookbook URL is configured or it cannot be fetched.
pub const DEFAULT_RULES: &str = "\
ANALYZE ONLY THE FOLLOWING BASED ON FILE TYPE:

\u{1f4e6} FOR DEPENDENCY FILES (package.json, Dockerfile, *.yml):
Check ONLY version pinning issues:
1. package.json:
   \u{274c} \"^1.0.0\", \"~1.0.0\", \"*\", \"latest\"
   \u{2705} \"1.0.0\" (exact version only)

2. Dockerfile:
   \u{274c} FROM node, FROM node:latest
   \u{2705} FROM node:18.17.1

3. GitHub Actions:
   \u{274c} actions/checkout@v3, actions/checkout@main
   \u{2705} actions/checkout@v3.1.2

\u{1f5c4}\u{fe0f} FOR DATABASE FILES (*.sql, *migration*, *.db):
Check ONLY migration standards:
1. Transaction Wrapping:
   \u{274c} Direct ALTER/CREATE statements
   \u{2705} BEGIN TRANSACTION; ... COMMIT;

2. Rollback Support:
   \u{274c} Missing DOWN migration
   \u{2705} Paired UP/DOWN migrations

3. Data Safety:
   \u{274c} Direct column drops, type changes
   \u{2705} Safe multi-step migrations
";

/// HTTP client for cookbook downloads.
///
/// # Errors
///
/// Returns [`PinguardError::Config`] if the client cannot be built.
pub fn cookbook_client() -> Result<reqwest::Client, PinguardError> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| PinguardError::Config(format!("failed to create HTTP client: {e}")))
}

/// Load the cookbook text.
///
/// Without a URL the built-in [`DEFAULT_RULES`] are used. Network errors,
/// non-success statuses, and empty bodies fall back to the defaults too.
pub async fn load_cookbook(client: &reqwest::Client, url: Option<&str>) -> String {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        tracing::debug!("no cookbook URL configured, using default rules");
        return DEFAULT_RULES.to_string();
    };

    match fetch(client, url).await {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!(%url, bytes = text.len(), "loaded cookbook");
            text
        }
        Ok(_) => {
            tracing::warn!(%url, "cookbook is empty, using default rules");
            DEFAULT_RULES.to_string()
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "failed to load cookbook, using default rules");
            DEFAULT_RULES.to_string()
        }
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.text().await
}
