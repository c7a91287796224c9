//! The `sumrise topics` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use sumrise_client::{create_transport, load_config_from};
use sumrise_core::session::fetch_pool;
use sumrise_core::topics::{topic_label, topic_options};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    use comfy_table::{Cell, Table};

    let config = load_config_from(config_path.as_deref())?;
    let transport = create_transport(&config)?;
    let pool = fetch_pool(transport.as_ref())
        .await
        .context("failed to fetch questions")?;

    let mut table = Table::new();
    table.set_header(vec!["Topic", "Label", "Questions"]);
    table.add_row(vec![
        Cell::new("all"),
        Cell::new(topic_label(None)),
        Cell::new(pool.len()),
    ]);

    for (slug, label) in topic_options(pool.iter().map(|q| q.topic.as_str())) {
        let count = pool.iter().filter(|q| q.topic == slug).count();
        table.add_row(vec![Cell::new(slug), Cell::new(label), Cell::new(count)]);
    }

    println!("{table}");
    Ok(())
}
