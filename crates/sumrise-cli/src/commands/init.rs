//! The `sumrise init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("sumrise.toml").exists() {
        println!("sumrise.toml already exists, skipping.");
        return Ok(());
    }

    std::fs::write("sumrise.toml", SAMPLE_CONFIG)?;
    println!("Created sumrise.toml");

    println!("\nNext steps:");
    println!("  1. Point base_url at your grading service");
    println!("  2. Run: sumrise topics");
    println!("  3. Run: sumrise practice --topic fractions --count 5");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# sumrise configuration

base_url = "http://127.0.0.1:8001"
api_key = "${SUMRISE_API_KEY}"
timeout_secs = 30

# Fail on malformed grading responses instead of skipping bad items.
# strict_responses = true

default_topic = "all"
default_count = 10
attempts_limit = 20
"#;
