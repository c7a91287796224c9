//! The `sumrise attempts` and `sumrise attempt` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};

use sumrise_client::{create_transport, load_config_from};
use sumrise_core::normalize::normalize_attempt_id;

use super::format_duration;

pub async fn list(limit: Option<u32>, config_path: Option<PathBuf>) -> Result<()> {
    use comfy_table::{Cell, Table};

    let config = load_config_from(config_path.as_deref())?;
    let limit = limit.unwrap_or(config.attempts_limit);
    let transport = create_transport(&config)?;

    let attempts = transport
        .recent_attempts(limit)
        .await
        .context("failed to fetch attempts")?;

    if attempts.is_empty() {
        println!("No attempts yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Attempt", "Date", "Score", "Duration"]);
    for attempt in &attempts {
        table.add_row(vec![
            Cell::new(attempt.id),
            Cell::new(format_timestamp(attempt.created_at.as_deref())),
            Cell::new(format!("{}/{}", attempt.correct, attempt.total)),
            Cell::new(format_duration(attempt.duration_ms)),
        ]);
    }
    println!("{table}");

    Ok(())
}

pub async fn show(id: String, config_path: Option<PathBuf>) -> Result<()> {
    use comfy_table::{Cell, Table};

    let id = parse_attempt_id(&id)?;
    let config = load_config_from(config_path.as_deref())?;
    let transport = create_transport(&config)?;

    let attempt = transport
        .attempt(id)
        .await
        .with_context(|| format!("failed to fetch attempt {id}"))?;

    println!(
        "Attempt {} ({}): {}/{} correct in {}",
        attempt.id,
        format_timestamp(attempt.created_at.as_deref()),
        attempt.correct,
        attempt.total,
        format_duration(attempt.duration_ms)
    );

    let results = attempt.results();
    if results.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Question", "Result", "Score", "Feedback", "Expected"]);
    for item in &results {
        table.add_row(vec![
            Cell::new(&item.id),
            Cell::new(if item.correct { "correct" } else { "incorrect" }),
            Cell::new(format!("{:.2}", item.score)),
            Cell::new(&item.feedback),
            Cell::new(item.expected.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");

    Ok(())
}

fn parse_attempt_id(raw: &str) -> Result<i64> {
    normalize_attempt_id(Some(&serde_json::Value::String(raw.to_string())))
        .with_context(|| format!("invalid attempt id: {raw:?}"))
}

/// `dd/mm/yyyy hh:mm:ss` in local time; unparseable values are shown as-is.
fn format_timestamp(raw: Option<&str>) -> String {
    const FORMAT: &str = "%d/%m/%Y %H:%M:%S";

    let Some(raw) = raw else {
        return "-".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format(FORMAT).to_string();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
    {
        return naive.format(FORMAT).to_string();
    }
    raw.to_string()
}
