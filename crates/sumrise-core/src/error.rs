//! Error types for the grading core.
//!
//! Transport errors are defined here rather than in `sumrise-client` so the
//! submission controller can pick the user-facing message without string
//! matching.

use thiserror::Error;

/// Fallback banner when a submission fails without a service message.
pub const GENERIC_SUBMIT_FAILURE: &str = "Failed to submit. Please try again.";

/// Why an answer was refused before it left the client.
///
/// Variants are listed in the order the checks run; the first failing
/// check wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The raw input is empty.
    #[error("Answer required")]
    Required,

    /// The raw input is longer than the limit.
    #[error("Answer too long (> {limit})")]
    TooLong { limit: usize },

    /// The raw input contains a character outside the allowlist.
    #[error("Only digits, + - * / ^ ( ) . and spaces allowed (max {limit} chars)")]
    DisallowedCharacters { limit: usize },
}

/// Errors that can occur when talking to the grading service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The service answered with a non-2xx status.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The body could not be decoded into the expected type.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Message to show in the submission banner.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Service { message, .. } if !message.is_empty() => message.clone(),
            _ => GENERIC_SUBMIT_FAILURE.to_string(),
        }
    }

    /// Returns `true` for client-side (4xx) rejections that a retry won't fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, TransportError::Service { status, .. } if (400..500).contains(status))
    }
}

/// A batch response violated the canonical shape contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("results[{index}] malformed: {reason}")]
    Malformed { index: usize, reason: String },
}
