//! Full action runs against mocked GitHub and LLM endpoints.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use pinguard_core::{
    GitHubConfig, LlmConfig, PinguardConfig, PinguardError, PrDetails, ReviewConfig,
    VerdictStatus,
};
use pinguard_review::publish::PublishOutcome;
use pinguard_review::run::{analyze_diff, run_action, ActionSettings, RunOutcome};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PR_DIFF: &str = "\
diff --git a/Dockerfile b/Dockerfile
index 1111111..2222222 100644
--- a/Dockerfile
+++ b/Dockerfile
@@ -1,3 +1,3 @@
-FROM node:18.17.1
+FROM node:latest
 WORKDIR /app
 COPY . .
diff --git a/src/app.ts b/src/app.ts
index 3333333..4444444 100644
--- a/src/app.ts
+++ b/src/app.ts
@@ -1 +1,2 @@
 export const app = 1;
+export const port = 3000;
";

const PUSH_DIFF: &str = "\
diff --git a/Dockerfile b/Dockerfile
--- a/Dockerfile
+++ b/Dockerfile
@@ -1 +1 @@
-FROM node:20
+FROM node:latest
";

fn event_file(dir: &TempDir, action: &str) -> PathBuf {
    let event = json!({
        "action": action,
        "number": 7,
        "before": "abc123",
        "after": "def456",
        "pull_request": {"number": 7},
        "repository": {"name": "shop", "owner": {"login": "acme"}}
    });
    let path = dir.path().join("event.json");
    std::fs::write(&path, event.to_string()).unwrap();
    path
}

fn config(server: &MockServer) -> PinguardConfig {
    PinguardConfig {
        llm: LlmConfig {
            base_url: Some(server.uri()),
            api_key: Some("sk-test".into()),
            timeout_secs: 5,
            ..LlmConfig::default()
        },
        github: GitHubConfig {
            api_url: server.uri(),
            token: Some("ghp_test".into()),
        },
        review: ReviewConfig::default(),
        ..PinguardConfig::default()
    }
}

fn settings(event_path: PathBuf, dry_run: bool) -> ActionSettings {
    ActionSettings {
        event_path,
        dry_run,
    }
}

async fn mount_pull_request(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/7"))
        .and(header("accept", "application/vnd.github.v3.diff"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PR_DIFF))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/pulls/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 7,
            "title": "Use latest node",
            "body": "Keeps the image fresh"
        })))
        .mount(server)
        .await;
}

async fn mount_llm(server: &MockServer, content: serde_json::Value, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Dockerfile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": content.to_string()}}]
        })))
        .expect(calls)
        .mount(server)
        .await;
}

fn floating_tag_reply() -> serde_json::Value {
    json!({
        "reviews": [{
            "lineNumber": 1,
            "issueType": "Version Pinning",
            "severity": "🔴 Critical",
            "problem": "node:latest floats",
            "solution": "Pin an exact tag",
            "example": "FROM node:18.17.1"
        }],
        "verdict": {"status": "CHANGES_NEEDED", "details": ["Dockerfile uses latest"]}
    })
}

#[tokio::test]
async fn opened_event_posts_review() {
    let server = MockServer::start().await;
    mount_pull_request(&server).await;
    mount_llm(&server, floating_tag_reply(), 1).await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/pulls/7/reviews"))
        .and(body_partial_json(json!({
            "event": "COMMENT",
            "comments": [{"path": "Dockerfile", "position": 2}]
        })))
        .and(body_string_contains("CHANGES_NEEDED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 99})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = run_action(&config(&server), &settings(event_file(&dir, "opened"), false))
        .await
        .unwrap();

    match outcome {
        RunOutcome::Published { result, outcome } => {
            assert_eq!(
                outcome,
                PublishOutcome::Posted {
                    comments: 1,
                    unresolved: 0
                }
            );
            assert_eq!(result.verdict.status, VerdictStatus::ChangesNeeded);
            assert_eq!(result.stats.files_analyzed, 1);
            assert_eq!(result.stats.files_skipped, 1);
            assert!(result.comments[0].body.contains("ISSUE TYPE: Version Pinning"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn synchronize_reviews_push_but_positions_against_pr() {
    let server = MockServer::start().await;
    mount_pull_request(&server).await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/compare/abc123...def456"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PUSH_DIFF))
        .expect(1)
        .mount(&server)
        .await;
    mount_llm(&server, floating_tag_reply(), 1).await;

    let dir = TempDir::new().unwrap();
    let outcome = run_action(
        &config(&server),
        &settings(event_file(&dir, "synchronize"), true),
    )
    .await
    .unwrap();

    match outcome {
        RunOutcome::DryRun { result, resolution } => {
            assert_eq!(result.comments.len(), 1);
            assert_eq!(resolution.positioned.len(), 1);
            assert_eq!(resolution.positioned[0].position, 2);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn llm_failures_mean_nothing_is_posted() {
    let server = MockServer::start().await;
    mount_pull_request(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/pulls/7/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = run_action(&config(&server), &settings(event_file(&dir, "opened"), false))
        .await
        .unwrap();

    match outcome {
        RunOutcome::Published { result, outcome } => {
            assert_eq!(outcome, PublishOutcome::NothingToPost { unresolved: 0 });
            assert_eq!(result.stats.llm_failures, 1);
            assert_eq!(result.verdict.status, VerdictStatus::Approved);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn comments_outside_the_diff_are_not_posted() {
    let server = MockServer::start().await;
    mount_pull_request(&server).await;
    let reply = json!({
        "reviews": [{"lineNumber": 40, "issueType": "Version Pinning", "severity": "Warning"}]
    });
    mount_llm(&server, reply, 1).await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/pulls/7/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = run_action(&config(&server), &settings(event_file(&dir, "opened"), false))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Published {
            outcome: PublishOutcome::NothingToPost { unresolved: 1 },
            ..
        }
    ));
}

#[tokio::test]
async fn excluded_files_never_reach_the_model() {
    let server = MockServer::start().await;
    mount_pull_request(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "{}"}}]
        })))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.review.add_excludes("Dockerfile");
    let dir = TempDir::new().unwrap();
    let outcome = run_action(&config, &settings(event_file(&dir, "opened"), true))
        .await
        .unwrap();

    match outcome {
        RunOutcome::DryRun { result, .. } => {
            assert_eq!(result.stats.files_analyzed, 0);
            assert_eq!(result.stats.files_skipped, 2);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_action_does_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let outcome = run_action(&config(&server), &settings(event_file(&dir, "closed"), false))
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Unsupported(action) if action == "closed"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn rejected_review_is_an_error() {
    let server = MockServer::start().await;
    mount_pull_request(&server).await;
    mount_llm(&server, floating_tag_reply(), 1).await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/pulls/7/reviews"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Unprocessable Entity",
            "errors": ["Position is invalid"],
            "documentation_url": "https://docs.github.com/rest"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let result = run_action(&config(&server), &settings(event_file(&dir, "opened"), false)).await;

    assert!(matches!(result, Err(PinguardError::GitHub(_))), "{result:?}");
}

const THREE_MANIFESTS: &str = "\
diff --git a/api/package.json b/api/package.json
--- a/api/package.json
+++ b/api/package.json
@@ -1 +1 @@
-\"express\": \"4.18.2\"
+\"express\": \"^4.19.0\"
diff --git a/web/package.json b/web/package.json
--- a/web/package.json
+++ b/web/package.json
@@ -1 +1 @@
-\"react\": \"18.2.0\"
+\"react\": \"^18.3.0\"
diff --git a/worker/package.json b/worker/package.json
--- a/worker/package.json
+++ b/worker/package.json
@@ -1 +1 @@
-\"bullmq\": \"5.1.0\"
+\"bullmq\": \"latest\"
";

const LLM_DELAY: Duration = Duration::from_millis(300);

async fn timed_analysis(concurrency: usize) -> Duration {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "{}"}}]}))
                .set_delay(LLM_DELAY),
        )
        .expect(3)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.review.concurrency = concurrency;
    let started = Instant::now();
    let result = analyze_diff(&config, THREE_MANIFESTS, &PrDetails::default(), "rules")
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.stats.files_analyzed, 3);
    assert_eq!(result.stats.llm_failures, 0);
    elapsed
}

#[tokio::test]
async fn concurrency_one_analyses_files_one_at_a_time() {
    let elapsed = timed_analysis(1).await;
    assert!(elapsed >= LLM_DELAY * 3, "finished in {elapsed:?}");
}

#[tokio::test]
async fn files_run_in_parallel_up_to_the_limit() {
    let elapsed = timed_analysis(3).await;
    assert!(elapsed < LLM_DELAY * 3, "finished in {elapsed:?}");
}
