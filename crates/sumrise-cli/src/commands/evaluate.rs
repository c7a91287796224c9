//! The `sumrise evaluate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use sumrise_client::{create_transport, load_config_from};
use sumrise_core::model::Evaluation;

pub async fn execute(expr: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let transport = create_transport(&config)?;

    match transport
        .evaluate(&expr)
        .await
        .context("failed to evaluate expression")?
    {
        Evaluation::Value(value) => {
            println!("{expr} = {value}");
            Ok(())
        }
        Evaluation::Error(message) => anyhow::bail!(message),
    }
}
