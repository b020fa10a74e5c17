use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PinguardError;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".pinguard.toml";

/// Top-level configuration loaded from `.pinguard.toml`.
///
/// Supports layered resolution: CLI flags / action inputs > config file > defaults.
///
/// # Examples
///
/// ```
/// use pinguard_core::PinguardConfig;
///
/// let config = PinguardConfig::default();
/// assert_eq!(config.review.concurrency, 5);
/// assert_eq!(config.llm.model, "gpt-4o-2024-08-06");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinguardConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
    /// File classification patterns.
    #[serde(default)]
    pub patterns: PatternsConfig,
}

impl PinguardConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::Io`] if the file cannot be read, or
    /// [`PinguardError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, PinguardError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_core::PinguardConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// concurrency = 2
    /// "#;
    /// let config = PinguardConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.concurrency, 2);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, PinguardError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load the explicitly requested file, or `.pinguard.toml` when present,
    /// or fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PinguardError::FileNotFound`] if an explicit path does not
    /// exist, plus any error from [`PinguardConfig::from_file`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, PinguardError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(PinguardError::FileNotFound(path.to_path_buf()));
                }
                Self::from_file(path)
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use pinguard_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.max_tokens, 1000);
/// assert_eq!(config.temperature, 0.3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Completion token limit per chunk.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-2024-08-06".into()
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// GitHub API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API root (override for GitHub Enterprise Server).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Token used for all GitHub requests.
    pub token: Option<String>,
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
        }
    }
}

impl GitHubConfig {
    /// Replace the file token with the first non-blank override.
    ///
    /// `flag` is the command-line flag or action input, `env` the plain
    /// `GITHUB_TOKEN` variable. Both beat the config file.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_core::GitHubConfig;
    ///
    /// let mut config = GitHubConfig {
    ///     token: Some("from_file".into()),
    ///     ..GitHubConfig::default()
    /// };
    /// config.override_token(None, Some("from_env"));
    /// assert_eq!(config.token.as_deref(), Some("from_env"));
    /// ```
    pub fn override_token(&mut self, flag: Option<&str>, env: Option<&str>) {
        if let Some(token) = [flag, env]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
        {
            self.token = Some(token.to_string());
        }
    }
}

/// Review behavior configuration.
///
/// # Examples
///
/// ```
/// use pinguard_core::ReviewConfig;
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.concurrency, 5);
/// assert!(config.exclude.is_empty());
/// assert!(config.cookbook_url.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// URL of the rules text sent as the system prompt.
    pub cookbook_url: Option<String>,
    /// Glob patterns for files that are never reviewed.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Maximum number of files analysed at once (default: 5).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    5
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            cookbook_url: None,
            exclude: Vec::new(),
            concurrency: default_concurrency(),
        }
    }
}

impl ReviewConfig {
    /// Append comma-separated exclude patterns, dropping blanks.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_core::ReviewConfig;
    ///
    /// let mut config = ReviewConfig::default();
    /// config.add_excludes("docs/**, ,*.md");
    /// assert_eq!(config.exclude, vec!["docs/**", "*.md"]);
    /// ```
    pub fn add_excludes(&mut self, input: &str) {
        self.exclude.extend(
            input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        );
    }
}

/// Glob patterns and filename suffixes identifying one file category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternSet {
    /// Globs matched against the full repository path.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Suffixes matched against the end of the path.
    #[serde(default)]
    pub file_types: Vec<String>,
}

/// Classification patterns for dependency manifests and migrations.
///
/// # Examples
///
/// ```
/// use pinguard_core::PatternsConfig;
///
/// let config = PatternsConfig::default();
/// assert!(config.dependency.file_types.contains(&"package.json".to_string()));
/// assert!(config.migration.file_types.contains(&".sql".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternsConfig {
    /// Dependency manifests checked for version pinning.
    #[serde(default = "default_dependency_patterns")]
    pub dependency: PatternSet,
    /// Database migrations checked for safety.
    #[serde(default = "default_migration_patterns")]
    pub migration: PatternSet,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_dependency_patterns() -> PatternSet {
    PatternSet {
        patterns: strings(&[
            "**/package.json",
            "**/Dockerfile",
            "**/Dockerfile.*",
            ".github/workflows/*",
        ]),
        file_types: strings(&[".yml", ".yaml", "Dockerfile", "package.json"]),
    }
}

fn default_migration_patterns() -> PatternSet {
    PatternSet {
        patterns: strings(&["**/*migration*", "**/*migration*/**"]),
        file_types: strings(&[".sql", ".db"]),
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            dependency: default_dependency_patterns(),
            migration: default_migration_patterns(),
        }
    }
}
