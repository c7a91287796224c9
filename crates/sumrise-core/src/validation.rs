//! Syntactic admission control for answers.
//!
//! Only checks whether an answer may be sent; whether it is mathematically
//! sound is for the grading service to decide.

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::model::{AnswerMap, Question};

/// Maximum answer length in characters.
pub const ANSWER_LEN_LIMIT: usize = 100;

/// `Ok` carries the trimmed answer.
pub type ValidationResult = Result<String, ValidationError>;

/// Screens a raw answer before submission.
pub trait AnswerValidator: Send + Sync {
    fn validate(&self, raw: &str) -> ValidationResult;
}

/// Default validator for arithmetic answers: digits, `+ - * / ^ ( ) .` and
/// whitespace, at most `max_len` characters.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionValidator {
    max_len: usize,
}

impl ExpressionValidator {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl Default for ExpressionValidator {
    fn default() -> Self {
        Self::new(ANSWER_LEN_LIMIT)
    }
}

impl AnswerValidator for ExpressionValidator {
    fn validate(&self, raw: &str) -> ValidationResult {
        if raw.is_empty() {
            return Err(ValidationError::Required);
        }
        if raw.chars().count() > self.max_len {
            return Err(ValidationError::TooLong {
                limit: self.max_len,
            });
        }
        if !raw.chars().all(is_allowed) {
            return Err(ValidationError::DisallowedCharacters {
                limit: self.max_len,
            });
        }
        Ok(raw.trim().to_string())
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit()
        || matches!(c, '+' | '-' | '*' | '/' | '^' | '(' | ')' | '.')
        || c.is_whitespace()
}

/// Validate with the default [`ExpressionValidator`].
pub fn validate_answer(raw: &str) -> ValidationResult {
    ExpressionValidator::default().validate(raw)
}

/// Rejections for every question in `questions`, keyed by id.
///
/// A question with no entry in `answers` is validated as the empty string.
pub fn validate_all(
    validator: &dyn AnswerValidator,
    questions: &[Question],
    answers: &AnswerMap,
) -> BTreeMap<String, ValidationError> {
    questions
        .iter()
        .filter_map(|q| {
            let raw = answers.get(&q.id).map(String::as_str).unwrap_or("");
            validator.validate(raw).err().map(|e| (q.id.clone(), e))
        })
        .collect()
}
