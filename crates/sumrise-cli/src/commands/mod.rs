pub mod attempts;
pub mod evaluate;
pub mod init;
pub mod practice;
pub mod topics;
pub mod validate;

/// Render a duration hint as seconds.
pub(crate) fn format_duration(ms: Option<u64>) -> String {
    match ms {
        Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
        None => "-".to_string(),
    }
}
