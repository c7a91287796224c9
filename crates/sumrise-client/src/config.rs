//! Client configuration and transport factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sumrise_core::model::{QuestionSetConfig, TopicFilter, DEFAULT_SET_SIZE};
use sumrise_core::normalize::NormalizeOptions;
use sumrise_core::traits::GradingTransport;

use crate::http::HttpGradingClient;

/// Configuration for talking to the grading service.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the grading service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `x-api-key` on every request when set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Fail on malformed batch responses instead of dropping bad items.
    /// Unset means strict in debug builds only.
    #[serde(default)]
    pub strict_responses: Option<bool>,
    /// Topic slug, or "all".
    #[serde(default = "default_topic")]
    pub default_topic: String,
    /// Questions per set; clamped to [1, 50].
    #[serde(default = "default_count")]
    pub default_count: usize,
    /// How many attempts `attempts` lists by default.
    #[serde(default = "default_attempts_limit")]
    pub attempts_limit: u32,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("strict_responses", &self.strict_responses)
            .field("default_topic", &self.default_topic)
            .field("default_count", &self.default_count)
            .field("attempts_limit", &self.attempts_limit)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8001".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_topic() -> String {
    "all".to_string()
}
fn default_count() -> usize {
    DEFAULT_SET_SIZE
}
fn default_attempts_limit() -> u32 {
    20
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            strict_responses: None,
            default_topic: default_topic(),
            default_count: default_count(),
            attempts_limit: default_attempts_limit(),
        }
    }
}

impl ClientConfig {
    /// How batch responses are normalized under this config.
    pub fn normalize_options(&self) -> NormalizeOptions {
        match self.strict_responses {
            Some(true) => NormalizeOptions::strict(),
            Some(false) => NormalizeOptions::lenient(),
            None => NormalizeOptions::default(),
        }
    }

    /// Initial question set selection.
    pub fn set_config(&self) -> QuestionSetConfig {
        QuestionSetConfig::new(TopicFilter::from(self.default_topic.as_str()), self.default_count)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load config from an explicit path, or search the well-known paths.
///
/// Search order without a path:
/// 1. `sumrise.toml` in the current directory
/// 2. `~/.config/sumrise/config.toml`
///
/// Environment variable overrides: `SUMRISE_GRADING_URL`, `SUMRISE_API_KEY`.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("sumrise.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded client config");
            config
        }
        None => ClientConfig::default(),
    };

    if let Ok(url) = std::env::var("SUMRISE_GRADING_URL") {
        config.base_url = url;
    }
    if let Ok(key) = std::env::var("SUMRISE_API_KEY") {
        config.api_key = Some(key);
    }

    config.base_url = resolve_env_vars(&config.base_url);
    config.api_key = config
        .api_key
        .as_deref()
        .map(resolve_env_vars)
        .filter(|k| !k.is_empty());

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("sumrise"))
}

/// Build the HTTP transport for a configuration.
pub fn create_transport(config: &ClientConfig) -> Result<Arc<dyn GradingTransport>> {
    let client = HttpGradingClient::new(config).context("failed to build grading client")?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_SUMRISE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_SUMRISE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_SUMRISE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_SUMRISE_UNSET_VAR}"), "");
        std::env::remove_var("_SUMRISE_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8001");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.attempts_limit, 20);
        assert_eq!(config.set_config().count(), 10);
        assert_eq!(config.set_config().topic_filter, TopicFilter::All);
    }

    #[test]
    fn parse_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sumrise.toml");
        std::fs::write(
            &path,
            r#"
base_url = "http://grader.local:9000"
api_key = "${_SUMRISE_PARSE_KEY}"
strict_responses = false
default_topic = "fractions"
default_count = 80
"#,
        )
        .unwrap();
        std::env::set_var("_SUMRISE_PARSE_KEY", "k-123");

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.normalize_options(), NormalizeOptions::lenient());
        let set = config.set_config();
        assert_eq!(set.topic_filter, TopicFilter::from("fractions"));
        assert_eq!(set.count(), 50);
        std::env::remove_var("_SUMRISE_PARSE_KEY");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/no/such/sumrise.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn debug_masks_api_key() {
        let config = ClientConfig {
            api_key: Some("secret-key".into()),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("***"));
    }
}
