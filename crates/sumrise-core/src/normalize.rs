//! Batch response normalization.
//!
//! The grading service reports per-item results either nested
//! (`{id, response: {ok, correct, ...}}`) or flat (`{id, ok, correct, ...}`).
//! Both are folded into [`MarkItemResult`] here and nowhere else, and batch
//! totals the service leaves out are derived from the items.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::NormalizeError;
use crate::model::{BatchResult, MarkItemResult};

/// Controls how contract violations in a batch response are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Fail on a malformed item instead of dropping it.
    pub strict: bool,
}

impl Default for NormalizeOptions {
    /// Strict in debug builds, lenient in release builds.
    fn default() -> Self {
        Self {
            strict: cfg!(debug_assertions),
        }
    }
}

impl NormalizeOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

/// The two wire shapes an item can arrive in.
#[derive(Debug)]
enum WireItem<'a> {
    Nested {
        id: &'a str,
        response: &'a Map<String, Value>,
    },
    Flat {
        id: &'a str,
        fields: &'a Map<String, Value>,
    },
}

impl<'a> WireItem<'a> {
    /// Discriminate on the presence of a nested `response` object.
    fn classify(raw: &'a Value) -> Result<Self, String> {
        let obj = raw.as_object().ok_or("not an object")?;
        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or("id missing/invalid")?;
        match obj.get("response") {
            Some(Value::Object(response)) => Ok(WireItem::Nested { id, response }),
            None | Some(Value::Null) => Ok(WireItem::Flat { id, fields: obj }),
            Some(_) => Err(format!("results[{id}].response is not an object")),
        }
    }

    fn id(&self) -> &'a str {
        match self {
            WireItem::Nested { id, .. } | WireItem::Flat { id, .. } => *id,
        }
    }

    fn fields(&self) -> &'a Map<String, Value> {
        match self {
            WireItem::Nested { response, .. } => *response,
            WireItem::Flat { fields, .. } => *fields,
        }
    }

    /// Project into the canonical shape, naming the first missing field.
    fn project(&self) -> Result<MarkItemResult, String> {
        let id = self.id();
        let fields = self.fields();
        let ok = fields
            .get("ok")
            .and_then(Value::as_bool)
            .ok_or_else(|| format!("results[{id}].ok invalid"))?;
        let correct = fields
            .get("correct")
            .and_then(Value::as_bool)
            .ok_or_else(|| format!("results[{id}].correct invalid"))?;
        let score = fields
            .get("score")
            .and_then(Value::as_f64)
            .filter(|s| s.is_finite())
            .ok_or_else(|| format!("results[{id}].score invalid"))?;
        let feedback = fields
            .get("feedback")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("results[{id}].feedback invalid"))?;

        Ok(MarkItemResult {
            id: id.to_string(),
            ok,
            correct,
            score,
            feedback: feedback.to_string(),
            expected: coalesce_expected(fields),
            duration_ms: duration_field(fields),
        })
    }
}

/// `expected` wins when present (numbers are rendered as strings); the
/// string-typed `expected_str` is the fallback.
fn coalesce_expected(fields: &Map<String, Value>) -> Option<String> {
    match fields.get("expected") {
        Some(Value::String(s)) => return Some(s.clone()),
        Some(Value::Number(n)) => return Some(n.to_string()),
        _ => {}
    }
    fields
        .get("expected_str")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn duration_field(fields: &Map<String, Value>) -> Option<u64> {
    fields
        .get("duration_ms")
        .or_else(|| fields.get("durationMs"))
        .and_then(as_count)
}

/// A non-negative JSON number as an integer count.
fn as_count(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f.round() as u64)
    })
}

/// Attempt id from a finite integral number or a numeric string.
///
/// Anything else, including a missing value, yields `None`.
pub fn normalize_attempt_id(raw: Option<&Value>) -> Option<i64> {
    let as_integral = |f: f64| {
        (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
            .then_some(f as i64)
    };
    match raw? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(as_integral)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(as_integral))
        }
        _ => None,
    }
}

fn item_list(obj: &Map<String, Value>) -> &[Value] {
    let list = match obj.get("results") {
        None | Some(Value::Null) => obj.get("items"),
        other => other,
    };
    list.and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn normalize_list(
    items: &[Value],
    options: NormalizeOptions,
) -> Result<Vec<MarkItemResult>, NormalizeError> {
    let mut results = Vec::with_capacity(items.len());
    for (index, raw) in items.iter().enumerate() {
        let item = match WireItem::classify(raw) {
            Ok(item) => item,
            Err(reason) => {
                warn!(index, %reason, "dropping unidentifiable mark item");
                continue;
            }
        };
        match item.project() {
            Ok(result) => results.push(result),
            Err(reason) if options.strict => {
                return Err(NormalizeError::Malformed { index, reason });
            }
            Err(reason) => {
                warn!(index, %reason, "dropping malformed mark item");
            }
        }
    }
    Ok(results)
}

/// Leniently normalize a bare list of items, skipping malformed ones.
pub fn normalize_items(items: &[Value]) -> Vec<MarkItemResult> {
    normalize_list(items, NormalizeOptions::lenient()).unwrap_or_default()
}

/// Normalize a raw `POST /mark-batch` body into a [`BatchResult`].
///
/// A `null` or non-object body yields an empty, not-ok result. `total` and
/// `correct` supplied by the service are kept as-is; when absent they are
/// derived from the normalized items.
pub fn normalize_batch(
    raw: &Value,
    options: NormalizeOptions,
) -> Result<BatchResult, NormalizeError> {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let results = normalize_list(item_list(obj), options)?;

    let total = obj
        .get("total")
        .and_then(as_count)
        .unwrap_or(results.len() as u64);
    let correct = obj
        .get("correct")
        .and_then(as_count)
        .unwrap_or_else(|| results.iter().filter(|r| r.correct).count() as u64);

    Ok(BatchResult {
        ok: obj.get("ok").and_then(Value::as_bool).unwrap_or(false),
        total,
        correct,
        results,
        attempt_id: normalize_attempt_id(obj.get("attempt_id")),
        duration_ms: duration_field(obj),
    })
}
