use pinguard_core::{
    ChangeKind, DiffHunk, FileKind, Finding, IssueType, PrDetails, Severity, Verdict,
    VerdictStatus,
};
use serde::Deserialize;

const PROMPT_TITLE: &str = "\u{1f916} AI Dependency & Migration Validator v2.0";

const RESPONSE_FORMAT: &str = "\
RESPONSE FORMAT:
{
  \"reviews\": [{
    \"lineNumber\": <number>,
    \"issueType\": \"Version Pinning|Migration Safety\",
    \"severity\": \"\u{1f534} Critical|\u{1f7e1} Warning|\u{1f7e2} Info\",
    \"problem\": \"Specific issue found\",
    \"solution\": \"Exact fix required\",
    \"example\": \"Code example of correct implementation\"
  }],
  \"verdict\": {
    \"status\": \"APPROVED|CHANGES_NEEDED|BLOCKED\",
    \"details\": [\"List of specific items\"]
  }
}";

const RULES: &str = "\
IMPORTANT RULES:
1. Check version pinning for dependency files and migration safety for database files, nothing else
2. Every review entry uses exactly the response format above
3. Every review entry names a severity and a concrete fix
4. Always include the verdict object
5. Keep it short: structured feedback only, no prose outside the JSON";

/// Build the system prompt from the cookbook rules.
///
/// # Examples
///
/// ```
/// use pinguard_review::prompt::build_system_prompt;
///
/// let prompt = build_system_prompt("Pin every image tag.");
/// assert!(prompt.contains("Pin every image tag."));
/// assert!(prompt.contains("\"lineNumber\""));
/// ```
pub fn build_system_prompt(cookbook: &str) -> String {
    format!(
        "{PROMPT_TITLE}\n\n{}\n\n{RESPONSE_FORMAT}\n\n{RULES}",
        cookbook.trim()
    )
}

/// Build the user prompt for a single hunk.
///
/// Every line that exists in the new file is prefixed with its new-file line
/// number so the model can report `lineNumber` directly. Deleted lines carry
/// no number.
///
/// # Examples
///
/// ```
/// use pinguard_core::{ChangeKind, DiffHunk, DiffLine, FileKind, PrDetails};
/// use pinguard_review::prompt::build_chunk_prompt;
///
/// let hunk = DiffHunk {
///     file_path: "Dockerfile".into(),
///     header: "@@ -1 +1 @@".into(),
///     old_start: 1,
///     old_lines: 1,
///     new_start: 1,
///     new_lines: 1,
///     lines: vec![DiffLine {
///         kind: ChangeKind::Add,
///         old_line: None,
///         new_line: Some(1),
///         content: "FROM node".into(),
///     }],
/// };
/// let prompt = build_chunk_prompt("Dockerfile", &hunk, &PrDetails::default(), FileKind::Dependency);
/// assert!(prompt.contains("    1 +FROM node"));
/// ```
pub fn build_chunk_prompt(path: &str, hunk: &DiffHunk, pr: &PrDetails, kind: FileKind) -> String {
    let mut prompt = format!("Review this diff in \"{path}\" ({kind} file).\n\n");

    if !pr.title.is_empty() {
        prompt.push_str(&format!("Pull request title: {}\n", pr.title));
    }
    if !pr.description.trim().is_empty() {
        prompt.push_str(&format!(
            "Pull request description:\n---\n{}\n---\n",
            pr.description.trim()
        ));
    }

    prompt.push_str(&format!("\n```diff\n{}\n", hunk.header));
    for line in &hunk.lines {
        let number = match (line.kind, line.new_line) {
            (ChangeKind::Delete, _) | (_, None) => String::new(),
            (_, Some(n)) => n.to_string(),
        };
        prompt.push_str(&format!("{number:>5} {}\n", line.to_diff_line()));
    }
    prompt.push_str("```\n");
    prompt
}

/// Findings and verdict parsed from one model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    /// Findings with a usable line number.
    pub findings: Vec<Finding>,
    /// Verdict for the chunk, approved when the reply has none.
    pub verdict: Verdict,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    reviews: Vec<RawReview>,
    verdict: Option<RawVerdict>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReview {
    line_number: Option<serde_json::Value>,
    issue_type: Option<String>,
    severity: Option<String>,
    problem: Option<String>,
    solution: Option<String>,
    example: Option<String>,
}

#[derive(Deserialize)]
struct RawVerdict {
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

/// Parse a model reply into an [`Analysis`].
///
/// Code fences around the JSON are tolerated. Findings without a positive
/// line number are dropped. Unknown severities become
/// [`Severity::Info`]; unknown issue types fall back to the one expected for
/// `kind`. Returns `None` when the reply is not valid JSON.
///
/// # Examples
///
/// ```
/// use pinguard_core::{FileKind, VerdictStatus};
/// use pinguard_review::prompt::parse_analysis;
///
/// let reply = r#"{"reviews":[],"verdict":{"status":"APPROVED","details":[]}}"#;
/// let analysis = parse_analysis(reply, FileKind::Dependency).unwrap();
/// assert!(analysis.findings.is_empty());
/// assert_eq!(analysis.verdict.status, VerdictStatus::Approved);
///
/// assert!(parse_analysis("not json", FileKind::Dependency).is_none());
/// ```
pub fn parse_analysis(response: &str, kind: FileKind) -> Option<Analysis> {
    let cleaned = strip_code_fences(response);

    let parsed: RawAnalysis = match serde_json::from_str(cleaned) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse LLM response");
            return None;
        }
    };

    let fallback_type = kind.issue_type().unwrap_or(IssueType::VersionPinning);
    let findings = parsed
        .reviews
        .into_iter()
        .filter_map(|review| {
            let line = parse_line_number(review.line_number.as_ref())?;
            let issue_type = review
                .issue_type
                .as_deref()
                .and_then(|t| t.parse().ok())
                .unwrap_or(fallback_type);
            let severity = review
                .severity
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Severity::Info);
            Some(Finding {
                line,
                issue_type,
                severity,
                problem: review.problem.unwrap_or_default(),
                solution: review.solution.unwrap_or_default(),
                example: review.example.unwrap_or_default(),
            })
        })
        .collect();

    let verdict = match parsed.verdict {
        Some(raw) => Verdict {
            status: raw
                .status
                .as_deref()
                .and_then(|s| s.parse::<VerdictStatus>().ok())
                .unwrap_or_default(),
            details: raw
                .details
                .into_iter()
                .map(|d| match d {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .filter(|d| !d.trim().is_empty())
                .collect(),
        },
        None => Verdict::default(),
    };

    Some(Analysis { findings, verdict })
}

fn parse_line_number(value: Option<&serde_json::Value>) -> Option<u32> {
    let line = match value? {
        serde_json::Value::Number(n) => n.as_u64()?,
        serde_json::Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(line).ok().filter(|&l| l > 0)
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    for fence in ["```json", "```"] {
        if let Some(inner) = trimmed
            .strip_prefix(fence)
            .and_then(|rest| rest.strip_suffix("```"))
        {
            return inner.trim();
        }
    }
    trimmed
}
