//! The `sumrise practice` command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use sumrise_client::{create_transport, load_config_from};
use sumrise_core::controller::{SubmissionObserver, FIX_ANSWERS_MESSAGE};
use sumrise_core::model::{AnswerMap, BatchResult, TopicFilter};
use sumrise_core::session::fetch_pool;
use sumrise_core::topics::topic_label;
use sumrise_core::{
    PracticeSession, QuestionSetSelector, SubmissionController, SubmitOutcome, ValidationError,
};

use super::format_duration;

/// Console submission observer.
struct ConsoleObserver;

impl SubmissionObserver for ConsoleObserver {
    fn on_blocked(&self, errors: &BTreeMap<String, ValidationError>) {
        for (id, err) in errors {
            eprintln!("  [{id}] {err}");
        }
    }

    fn on_submitting(&self, items: usize, duration_ms: u64) {
        eprintln!(
            "Submitting {items} answer(s) after {}...",
            format_duration(Some(duration_ms))
        );
    }

    fn on_settled(&self, outcome: Result<&BatchResult, &str>) {
        match outcome {
            Ok(result) => eprintln!("Graded: {}/{} correct", result.correct, result.total),
            Err(message) => eprintln!("Submission failed: {message}"),
        }
    }
}

/// Answer file values may be written as bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<AnswerValue> for String {
    fn from(value: AnswerValue) -> Self {
        match value {
            AnswerValue::Text(s) => s,
            AnswerValue::Int(n) => n.to_string(),
            AnswerValue::Float(x) => x.to_string(),
        }
    }
}

/// Read a `{question id = answer}` map from a `.json` or TOML file.
fn read_answers(path: &Path) -> Result<AnswerMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers: {}", path.display()))?;

    let raw: BTreeMap<String, AnswerValue> =
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse answers: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("failed to parse answers: {}", path.display()))?
        };

    Ok(raw.into_iter().map(|(id, v)| (id, v.into())).collect())
}

pub async fn execute(
    topic: Option<String>,
    count: Option<usize>,
    answers_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let transport = create_transport(&config)?;

    let mut set_config = config.set_config();
    if let Some(topic) = topic {
        set_config.topic_filter = TopicFilter::from(topic.as_str());
    }
    if let Some(count) = count {
        set_config.set_count(count);
    }

    let pool = fetch_pool(transport.as_ref())
        .await
        .context("failed to fetch questions")?;
    let selector = QuestionSetSelector::with_config(pool, set_config);
    let controller = SubmissionController::new(transport)
        .with_normalize_options(config.normalize_options())
        .with_observer(Arc::new(ConsoleObserver));
    let mut session = PracticeSession::new(selector, controller);

    if session.active().is_empty() {
        anyhow::bail!(
            "no questions available for {}",
            topic_label(session.selector().config().topic_filter.as_slug())
        );
    }

    eprintln!(
        "{}: {} question(s)",
        topic_label(session.selector().config().topic_filter.as_slug()),
        session.active().len()
    );

    match answers_path {
        Some(path) => {
            for (id, answer) in read_answers(&path)? {
                if !session.controller().set_answer(&id, answer) {
                    tracing::warn!(%id, "answer for a question outside the set ignored");
                }
            }
        }
        None => prompt_answers(&session).await?,
    }

    match session.submit().await {
        SubmitOutcome::Succeeded(result) => {
            print_results(&session, &result);
            if session.retry_incorrect() {
                println!("\nRetry set:");
                for q in session.active() {
                    println!("  [{}] {}", q.id, q.display_prompt());
                }
            }
            Ok(())
        }
        SubmitOutcome::Blocked(_) => anyhow::bail!(FIX_ANSWERS_MESSAGE),
        SubmitOutcome::Failed(message) => anyhow::bail!(message),
        SubmitOutcome::AlreadyInFlight | SubmitOutcome::Cancelled => {
            anyhow::bail!("submission did not complete")
        }
    }
}

/// Ask for each answer on stdin; end of input leaves the rest blank.
async fn prompt_answers(session: &PracticeSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let total = session.active().len();

    for (i, question) in session.active().iter().enumerate() {
        eprint!("[{}/{}] {} = ", i + 1, total, question.display_prompt());
        let Some(line) = lines.next_line().await.context("failed to read answer")? else {
            eprintln!();
            break;
        };
        session.controller().set_answer(&question.id, line);
    }
    Ok(())
}

fn print_results(session: &PracticeSession, result: &BatchResult) {
    use comfy_table::{Cell, Table};

    let prompts: BTreeMap<&str, &str> = session
        .active()
        .iter()
        .map(|q| (q.id.as_str(), q.display_prompt()))
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["Question", "Prompt", "Result", "Score", "Feedback", "Expected"]);

    for item in &result.results {
        table.add_row(vec![
            Cell::new(&item.id),
            Cell::new(prompts.get(item.id.as_str()).copied().unwrap_or("")),
            Cell::new(if item.correct { "correct" } else { "incorrect" }),
            Cell::new(format!("{:.2}", item.score)),
            Cell::new(&item.feedback),
            Cell::new(item.expected.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");
    println!(
        "Score: {}/{} in {}",
        result.correct,
        result.total,
        format_duration(result.duration_ms)
    );
    if let Some(id) = result.attempt_id {
        println!("Saved as attempt {id}");
    }
}
