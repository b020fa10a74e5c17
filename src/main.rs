use std::io::Read;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use pinguard_core::{OutputFormat, PinguardConfig, PrDetails};
use pinguard_difflens::classify::FileClassifier;
use pinguard_difflens::filter::DiffFilter;
use pinguard_review::cookbook::{cookbook_client, load_cookbook};
use pinguard_review::github::{parse_pr_reference, GitHubClient};
use pinguard_review::pipeline::AnalysisResult;
use pinguard_review::publish::PublishOutcome;
use pinguard_review::run::{analyze_diff, run_action, ActionSettings, RunOutcome};

#[derive(Parser)]
#[command(
    name = "pinguard",
    version,
    about = "AI review of dependency pinning and database migrations in pull requests",
    long_about = "pinguard reviews the dependency manifests and database migrations a pull\n\
                   request touches and posts its findings as inline review comments.\n\n\
                   Examples:\n  \
                     pinguard run                          Review the PR of the current Actions event\n  \
                     pinguard run --dry-run                Analyse without posting\n  \
                     git diff main | pinguard check        Check a local diff\n  \
                     pinguard classify package.json db/001.sql  Show how paths are categorised"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .pinguard.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Review the pull request of a GitHub Actions event
    #[command(long_about = "Review the pull request of a GitHub Actions event.\n\n\
        Reads the event payload, fetches the diff (the whole PR when opened, only\n\
        the pushed commits on synchronize), analyses dependency and migration\n\
        files, and posts one review with inline comments.\n\n\
        Every flag can also be set through the matching action input variable.")]
    Run {
        /// GitHub token (falls back to GITHUB_TOKEN)
        #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// OpenAI API key (falls back to OPENAI_API_KEY)
        #[arg(long, env = "INPUT_OPENAI_API_KEY", hide_env_values = true)]
        openai_api_key: Option<String>,

        /// URL of the review rules
        #[arg(long, env = "INPUT_COOKBOOK_URL")]
        cookbook_url: Option<String>,

        /// Comma-separated glob patterns of files to skip
        #[arg(long, env = "INPUT_EXCLUDE")]
        exclude: Option<String>,

        /// Event payload written by the Actions runner
        #[arg(long, env = "GITHUB_EVENT_PATH")]
        event_path: PathBuf,

        /// Analyse and resolve comments without posting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Check a unified diff from a file or stdin without GitHub
    #[command(long_about = "Check a unified diff from a file or stdin without GitHub.\n\n\
        Runs the same classification and analysis as `run` and prints the\n\
        findings. Line numbers refer to the new version of each file.\n\n\
        Examples:\n  git diff main | pinguard check\n  pinguard check --file changes.patch --format json\n  pinguard check --pr acme/shop#42")]
    Check {
        /// Read diff from file instead of stdin
        #[arg(long, conflicts_with = "pr")]
        file: Option<PathBuf>,

        /// Fetch the diff of a GitHub PR instead (format: owner/repo#123)
        #[arg(
            long,
            long_help = "Fetch the diff of a GitHub PR instead of reading one.\n\nFormat: owner/repo#123\nRequires GITHUB_TOKEN. Nothing is posted."
        )]
        pr: Option<String>,

        /// GitHub token for --pr (falls back to GITHUB_TOKEN)
        #[arg(long, requires = "pr")]
        github_token: Option<String>,

        /// OpenAI API key (falls back to OPENAI_API_KEY)
        #[arg(long)]
        openai_api_key: Option<String>,

        /// URL of the review rules
        #[arg(long)]
        cookbook_url: Option<String>,

        /// Comma-separated glob patterns of files to skip
        #[arg(long)]
        exclude: Option<String>,

        /// Title passed to the model as pull request context
        #[arg(long)]
        title: Option<String>,
    },
    /// Show how paths are categorised
    Classify {
        /// Repository-relative paths
        #[arg(required = true)]
        paths: Vec<String>,

        /// Comma-separated glob patterns of files to skip
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,pinguard=debug,pinguard_review=debug,pinguard_difflens=debug")
    } else {
        EnvFilter::try_from_env("PINGUARD_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| {
                EnvFilter::new("warn,pinguard=info,pinguard_review=info,pinguard_difflens=info")
            })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::env::var("NO_COLOR").is_err())
        .without_time()
        .init();
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Apply the LLM key override: flag or input first, then `OPENAI_API_KEY`,
/// then the config file.
fn apply_api_key(config: &mut PinguardConfig, flag: Option<String>) {
    let key = non_empty(flag).or_else(|| non_empty(std::env::var("OPENAI_API_KEY").ok()));
    if key.is_some() {
        config.llm.api_key = key;
    }
}

/// Apply the GitHub token override: flag or input first, then
/// `GITHUB_TOKEN`, then the config file.
fn apply_github_token(config: &mut PinguardConfig, flag: Option<String>) {
    let env = std::env::var("GITHUB_TOKEN").ok();
    config
        .github
        .override_token(flag.as_deref(), env.as_deref());
}

fn apply_review_overrides(
    config: &mut PinguardConfig,
    cookbook_url: Option<String>,
    exclude: Option<String>,
) {
    if let Some(url) = non_empty(cookbook_url) {
        config.review.cookbook_url = Some(url);
    }
    if let Some(exclude) = non_empty(exclude) {
        config.review.add_excludes(&exclude);
    }
}

fn ensure_api_key(config: &PinguardConfig) -> Result<()> {
    if config.llm.api_key.is_none() && config.llm.base_url.is_none() {
        miette::bail!(miette::miette!(
            help = "Set OPENAI_API_KEY, pass --openai-api-key, or add api_key under [llm] in .pinguard.toml",
            "No API key configured for the LLM provider"
        ));
    }
    Ok(())
}

fn read_diff_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

fn print_result(result: &AnalysisResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result).into_diagnostic()?);
        }
        OutputFormat::Markdown => print!("{}", result.to_markdown()),
        OutputFormat::Text => print!("{result}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .ok();
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = PinguardConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            github_token,
            openai_api_key,
            cookbook_url,
            exclude,
            event_path,
            dry_run,
        } => {
            apply_github_token(&mut config, github_token);
            apply_api_key(&mut config, openai_api_key);
            apply_review_overrides(&mut config, cookbook_url, exclude);
            ensure_api_key(&config)?;

            let settings = ActionSettings {
                event_path,
                dry_run,
            };
            match run_action(&config, &settings).await? {
                RunOutcome::Unsupported(action) => {
                    tracing::info!("Unsupported event: {action}");
                }
                RunOutcome::EmptyDiff => {
                    tracing::info!("No diff found.");
                }
                RunOutcome::DryRun { result, resolution } => {
                    print_result(&result, cli.format)?;
                    tracing::info!(
                        comments = resolution.positioned.len(),
                        unresolved = resolution.unresolved.len(),
                        "Dry run: review not posted"
                    );
                }
                RunOutcome::Published { result, outcome } => {
                    print_result(&result, cli.format)?;
                    match outcome {
                        PublishOutcome::Posted {
                            comments,
                            unresolved,
                        } => tracing::info!(comments, unresolved, "Posted review"),
                        PublishOutcome::NothingToPost { unresolved } => {
                            tracing::info!(unresolved, "No comments to post")
                        }
                    }
                }
            }
        }
        Command::Check {
            file,
            pr,
            github_token,
            openai_api_key,
            cookbook_url,
            exclude,
            title,
        } => {
            apply_api_key(&mut config, openai_api_key);
            apply_review_overrides(&mut config, cookbook_url, exclude);
            ensure_api_key(&config)?;

            let (input, mut details) = match pr {
                Some(ref pr_ref) => {
                    let (owner, repo, number) = parse_pr_reference(pr_ref)?;
                    apply_github_token(&mut config, github_token);
                    let github = GitHubClient::new(&config.github)?;
                    let details = github.get_pr_details(&owner, &repo, number).await?;
                    let diff = github.get_pr_diff(&owner, &repo, number).await?;
                    (diff, details)
                }
                None => (read_diff_input(&file)?, PrDetails::default()),
            };
            if input.trim().is_empty() {
                tracing::info!("No diff found.");
                return Ok(());
            }
            if let Some(title) = non_empty(title) {
                details.title = title;
            }
            let cookbook = load_cookbook(
                &cookbook_client()?,
                config.review.cookbook_url.as_deref(),
            )
            .await;
            let result = analyze_diff(&config, &input, &details, &cookbook).await?;
            print_result(&result, cli.format)?;
        }
        Command::Classify { paths, exclude } => {
            apply_review_overrides(&mut config, None, exclude);
            let filter = DiffFilter::from_config(&config.review, &config.patterns);
            let classifier = FileClassifier::new(&config.patterns);
            let rows: Vec<(String, String)> = paths
                .into_iter()
                .map(|path| {
                    let category = if filter.is_excluded(&path) {
                        "excluded".to_string()
                    } else {
                        classifier.classify(&path).to_string()
                    };
                    (path, category)
                })
                .collect();

            match cli.format {
                OutputFormat::Json => {
                    let json: Vec<_> = rows
                        .iter()
                        .map(|(path, kind)| serde_json::json!({ "path": path, "kind": kind }))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("| Path | Kind |");
                    println!("|------|------|");
                    for (path, kind) in &rows {
                        println!("| `{path}` | {kind} |");
                    }
                }
                OutputFormat::Text => {
                    for (path, kind) in &rows {
                        println!("{kind:<10} {path}");
                    }
                }
            }
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pinguard", &mut std::io::stdout());
        }
    }

    Ok(())
}
