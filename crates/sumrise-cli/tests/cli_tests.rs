//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sumrise() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("sumrise").unwrap()
}

/// A command isolated from any real config, pointed at `base_url`.
fn sumrise_against(dir: &TempDir, base_url: &str) -> Command {
    let mut cmd = sumrise();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("SUMRISE_GRADING_URL", base_url)
        .env_remove("SUMRISE_API_KEY")
        .env("RUST_LOG", "off");
    cmd
}

async fn mount_pool(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "q1", "topic": "fractions", "prompt": "1/2 + 1/2"},
            {"id": "q2", "topic": "fractions", "prompt": "3/4 - 1/4"},
            {"id": "q3", "topic": "order-of-operations", "prompt": "2 + 3 * 4"}
        ])))
        .mount(server)
        .await;
}

#[test]
fn help_lists_commands() {
    sumrise()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("practice"))
        .stdout(predicate::str::contains("attempts"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn version_flag() {
    sumrise()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sumrise"));
}

#[test]
fn validate_accepts_expressions() {
    sumrise()
        .args(["validate", "2 + 2", " (3*4)^2 "])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"(3*4)^2\""))
        .stdout(predicate::str::contains("All answers valid"));
}

#[test]
fn validate_reports_each_rejection() {
    sumrise()
        .args(["validate", "abc", "", "-4"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Only digits"))
        .stdout(predicate::str::contains("Answer required"))
        .stdout(predicate::str::contains("OK       \"-4\""))
        .stderr(predicate::str::contains("2 answer(s) rejected"));
}

#[test]
fn validate_rejects_long_answer() {
    sumrise()
        .args(["validate", &"1".repeat(101)])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Answer too long (> 100)"));
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    sumrise()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created sumrise.toml"));

    let content = std::fs::read_to_string(dir.path().join("sumrise.toml")).unwrap();
    assert!(content.contains("base_url"));

    sumrise()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn attempt_rejects_invalid_id() {
    let dir = TempDir::new().unwrap();

    // Nothing listens here; the id must be rejected before any request.
    sumrise_against(&dir, "http://127.0.0.1:9")
        .args(["attempt", "not-a-number"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid attempt id"));
}

#[test]
fn missing_config_file_fails() {
    sumrise()
        .args(["topics", "--config", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn practice_submits_and_lists_retry_set() {
    let server = MockServer::start().await;
    mount_pool(&server).await;
    Mock::given(method("POST"))
        .and(path("/mark-batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "attempt_id": "31",
            "results": [
                {"id": "q1", "response": {"ok": true, "correct": true, "score": 1, "feedback": "Correct"}},
                {"id": "q2", "ok": true, "correct": false, "score": 0, "feedback": "Not quite", "expected_str": "1/2"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let answers = dir.path().join("answers.toml");
    std::fs::write(&answers, "q1 = 1\nq2 = \"1/4\"\n").unwrap();

    sumrise_against(&dir, &server.uri())
        .args(["practice", "--topic", "fractions", "--count", "2", "--answers"])
        .arg(&answers)
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 1/2"))
        .stdout(predicate::str::contains("Saved as attempt 31"))
        .stdout(predicate::str::contains("Retry set:"))
        .stdout(predicate::str::contains("[q2] 3/4 - 1/4"));
}

#[tokio::test(flavor = "multi_thread")]
async fn practice_blocks_invalid_answers_without_submitting() {
    let server = MockServer::start().await;
    mount_pool(&server).await;
    Mock::given(method("POST"))
        .and(path("/mark-batch"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let answers = dir.path().join("answers.json");
    std::fs::write(&answers, r#"{"q1": "1", "q2": "half"}"#).unwrap();

    sumrise_against(&dir, &server.uri())
        .args(["practice", "--topic", "fractions", "--answers"])
        .arg(&answers)
        .assert()
        .failure()
        .stderr(predicate::str::contains("[q2] Only digits"))
        .stderr(predicate::str::contains(
            "Error: Please fix the highlighted answers.",
        ));
}

#[tokio::test(flavor = "multi_thread")]
async fn practice_shows_service_error() {
    let server = MockServer::start().await;
    mount_pool(&server).await;
    Mock::given(method("POST"))
        .and(path("/mark-batch"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"feedback": "Too many items"})),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let answers = dir.path().join("answers.toml");
    std::fs::write(&answers, "q3 = \"14\"\n").unwrap();

    sumrise_against(&dir, &server.uri())
        .args(["practice", "--topic", "order-of-operations", "--answers"])
        .arg(&answers)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Too many items"));
}

#[tokio::test(flavor = "multi_thread")]
async fn topics_lists_labels() {
    let server = MockServer::start().await;
    mount_pool(&server).await;

    let dir = TempDir::new().unwrap();
    sumrise_against(&dir, &server.uri())
        .arg("topics")
        .assert()
        .success()
        .stdout(predicate::str::contains("All topics"))
        .stdout(predicate::str::contains("Fractions"))
        .stdout(predicate::str::contains("Order of Operations"));
}

#[tokio::test(flavor = "multi_thread")]
async fn evaluate_prints_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/evaluate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "value": 14})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    sumrise_against(&dir, &server.uri())
        .args(["evaluate", "2 + 3 * 4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 + 3 * 4 = 14"));
}

#[tokio::test(flavor = "multi_thread")]
async fn evaluate_leaves_unsupported_syntax_to_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/evaluate"))
        .and(body_json(json!({"expr": "sqrt(4)"})))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"ok": false, "error": "Unsupported function: sqrt"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    sumrise_against(&dir, &server.uri())
        .args(["evaluate", "sqrt(4)"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Unsupported function: sqrt"));
}

#[tokio::test(flavor = "multi_thread")]
async fn attempts_lists_wrapped_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attempts/recent-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 9, "created_at": "2024-03-05T09:07:02", "total": 4, "correct": 3, "duration_ms": 61000}]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    sumrise_against(&dir, &server.uri())
        .args(["attempts", "--limit", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("05/03/2024 09:07:02"))
        .stdout(predicate::str::contains("3/4"))
        .stdout(predicate::str::contains("61.0s"));
}
