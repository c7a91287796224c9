//! Core data model types for sumrise.
//!
//! Questions come from the question service, answers are collected locally,
//! and [`BatchResult`] is the canonical outcome of one batch mark no matter
//! which wire shape the grading service used.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Smallest number of questions in a sampled set.
pub const MIN_SET_SIZE: usize = 1;
/// Largest number of questions in a sampled set.
pub const MAX_SET_SIZE: usize = 50;
/// Set size used when none is configured.
pub const DEFAULT_SET_SIZE: usize = 10;

/// A practice question as served by the question service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within a pool.
    pub id: String,
    /// Topic slug (e.g. "fractions").
    #[serde(default)]
    pub topic: String,
    /// Text shown to the learner.
    #[serde(default)]
    pub prompt: String,
    /// Question kind reported by the service.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Older question banks carried the prompt here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Question {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            prompt: prompt.into(),
            kind: None,
            text: None,
        }
    }

    /// Prompt to display, falling back to the legacy text and then the id.
    pub fn display_prompt(&self) -> &str {
        if !self.prompt.is_empty() {
            &self.prompt
        } else if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            text
        } else {
            &self.id
        }
    }
}

/// Raw answers keyed by question id.
pub type AnswerMap = BTreeMap<String, String>;

/// Canonical per-question outcome of a batch mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkItemResult {
    pub id: String,
    pub ok: bool,
    pub correct: bool,
    pub score: f64,
    pub feedback: String,
    /// Expected answer, coalesced to a string.
    pub expected: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Canonical result of one batch mark.
///
/// Serializes in the flat wire shape, so feeding it back through the
/// normalizer yields the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub ok: bool,
    /// Number of graded items, as reported by the service or derived.
    pub total: u64,
    /// Number of correct items, as reported by the service or derived.
    pub correct: u64,
    pub results: Vec<MarkItemResult>,
    /// Id of the persisted attempt, when the service stored one.
    pub attempt_id: Option<i64>,
    pub duration_ms: Option<u64>,
}

impl BatchResult {
    /// Ids of the items graded as incorrect, in result order.
    pub fn incorrect_ids(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.correct)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Returns `true` if at least one item was graded incorrect.
    pub fn has_incorrect(&self) -> bool {
        self.results.iter().any(|r| !r.correct)
    }
}

/// Topic restriction for the active set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TopicFilter {
    #[default]
    All,
    Topic(String),
}

impl TopicFilter {
    /// Returns `true` if a question with this topic passes the filter.
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::Topic(t) => t == topic,
        }
    }

    /// Topic slug to send as a query parameter, if any.
    pub fn as_slug(&self) -> Option<&str> {
        match self {
            TopicFilter::All => None,
            TopicFilter::Topic(t) => Some(t),
        }
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicFilter::All => write!(f, "all"),
            TopicFilter::Topic(t) => write!(f, "{t}"),
        }
    }
}

impl FromStr for TopicFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(TopicFilter::All)
        } else {
            Ok(TopicFilter::Topic(s.to_string()))
        }
    }
}

impl From<&str> for TopicFilter {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(filter) => filter,
            Err(never) => match never {},
        }
    }
}

/// Clamp a requested set size into `[MIN_SET_SIZE, MAX_SET_SIZE]`.
pub fn clamp_set_size(n: usize) -> usize {
    n.clamp(MIN_SET_SIZE, MAX_SET_SIZE)
}

/// How the active set is derived from the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSetConfig {
    pub topic_filter: TopicFilter,
    count: usize,
}

impl QuestionSetConfig {
    pub fn new(topic_filter: TopicFilter, count: usize) -> Self {
        Self {
            topic_filter,
            count: clamp_set_size(count),
        }
    }

    /// Requested set size, always within bounds.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, n: usize) {
        self.count = clamp_set_size(n);
    }
}

impl Default for QuestionSetConfig {
    fn default() -> Self {
        Self::new(TopicFilter::All, DEFAULT_SET_SIZE)
    }
}

/// Query parameters for `GET /questions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuestionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random: Option<bool>,
}

/// One answer in a batch mark request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkBatchItem {
    pub id: String,
    pub answer: String,
}

/// Body of `POST /mark-batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkBatchRequest {
    pub items: Vec<MarkBatchItem>,
    /// Elapsed session time, as a hint for the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// A persisted batch-mark session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub correct: u64,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Stored items, in whichever wire shape the service kept them.
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

impl Attempt {
    /// Stored items as canonical results; malformed entries are skipped.
    pub fn results(&self) -> Vec<MarkItemResult> {
        crate::normalize::normalize_items(&self.items)
    }
}

/// `GET /attempts/recent-list` returns either a bare list or `{items: [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttemptList {
    Bare(Vec<Attempt>),
    Wrapped { items: Vec<Attempt> },
}

impl From<AttemptList> for Vec<Attempt> {
    fn from(list: AttemptList) -> Self {
        match list {
            AttemptList::Bare(items) | AttemptList::Wrapped { items } => items,
        }
    }
}

/// Outcome of `POST /evaluate`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawEvaluation")]
pub enum Evaluation {
    Value(f64),
    Error(String),
}

#[derive(Deserialize)]
struct RawEvaluation {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    feedback: Option<String>,
}

impl From<RawEvaluation> for Evaluation {
    fn from(raw: RawEvaluation) -> Self {
        match (raw.ok, raw.value) {
            (true, Some(v)) => Evaluation::Value(v),
            _ => Evaluation::Error(
                raw.error
                    .or(raw.feedback)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_filter_parse_and_display() {
        assert_eq!("all".parse::<TopicFilter>().unwrap(), TopicFilter::All);
        assert_eq!("".parse::<TopicFilter>().unwrap(), TopicFilter::All);
        assert_eq!(
            TopicFilter::from("fractions"),
            TopicFilter::Topic("fractions".into())
        );
        assert_eq!(TopicFilter::Topic("algebra".into()).to_string(), "algebra");
        assert!(TopicFilter::All.matches("anything"));
        assert!(!TopicFilter::from("fractions").matches("Fractions"));
    }

    #[test]
    fn set_size_is_clamped() {
        assert_eq!(QuestionSetConfig::new(TopicFilter::All, 0).count(), 1);
        assert_eq!(QuestionSetConfig::new(TopicFilter::All, 51).count(), 50);
        let mut config = QuestionSetConfig::default();
        assert_eq!(config.count(), DEFAULT_SET_SIZE);
        config.set_count(500);
        assert_eq!(config.count(), MAX_SET_SIZE);
    }

    #[test]
    fn question_falls_back_to_legacy_text() {
        let q: Question =
            serde_json::from_str(r#"{"id":"q1","topic":"fractions","text":"Half of 1?"}"#).unwrap();
        assert_eq!(q.display_prompt(), "Half of 1?");
        let q: Question = serde_json::from_str(r#"{"id":"q2"}"#).unwrap();
        assert_eq!(q.display_prompt(), "q2");
    }

    #[test]
    fn mark_request_omits_missing_duration() {
        let req = MarkBatchRequest {
            items: vec![MarkBatchItem {
                id: "q1".into(),
                answer: "1/2".into(),
            }],
            duration_ms: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("duration_ms").is_none());
    }

    #[test]
    fn attempt_list_accepts_both_shapes() {
        let bare: AttemptList =
            serde_json::from_str(r#"[{"id":1,"total":2,"correct":1}]"#).unwrap();
        let wrapped: AttemptList =
            serde_json::from_str(r#"{"items":[{"id":1,"total":2,"correct":1}]}"#).unwrap();
        assert_eq!(Vec::<Attempt>::from(bare).len(), 1);
        assert_eq!(Vec::<Attempt>::from(wrapped)[0].correct, 1);
    }

    #[test]
    fn evaluation_variants() {
        let ok: Evaluation = serde_json::from_str(r#"{"ok":true,"value":25}"#).unwrap();
        assert_eq!(ok, Evaluation::Value(25.0));
        let err: Evaluation =
            serde_json::from_str(r#"{"ok":false,"feedback":"division by zero"}"#).unwrap();
        assert_eq!(err, Evaluation::Error("division by zero".into()));
        let bare: Evaluation = serde_json::from_str(r#"{"ok":false}"#).unwrap();
        assert_eq!(bare, Evaluation::Error("Unknown error".into()));
    }

    #[test]
    fn incorrect_ids_in_result_order() {
        let item = |id: &str, correct: bool| MarkItemResult {
            id: id.into(),
            ok: true,
            correct,
            score: if correct { 1.0 } else { 0.0 },
            feedback: String::new(),
            expected: None,
            duration_ms: None,
        };
        let result = BatchResult {
            ok: true,
            total: 3,
            correct: 1,
            results: vec![item("b", false), item("a", true), item("c", false)],
            attempt_id: None,
            duration_ms: None,
        };
        assert_eq!(result.incorrect_ids(), vec!["b", "c"]);
        assert!(result.has_incorrect());
    }
}
