//! The grading service seam.
//!
//! Implemented over HTTP by `sumrise-client` and in memory by
//! [`crate::mock::MockTransport`].

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::{Attempt, Evaluation, MarkBatchRequest, Question, QuestionQuery};

/// Transport to the remote grading service.
#[async_trait]
pub trait GradingTransport: Send + Sync {
    /// Fetch questions, optionally filtered and limited by the service.
    async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, TransportError>;

    /// Fetch a single question.
    async fn get_question(&self, id: &str) -> Result<Question, TransportError>;

    /// Submit a batch of answers.
    ///
    /// Returns the raw body; the caller normalizes it, since the service
    /// uses more than one item shape.
    async fn mark_batch(
        &self,
        request: &MarkBatchRequest,
    ) -> Result<serde_json::Value, TransportError>;

    /// Most recent attempts, newest first.
    async fn recent_attempts(&self, limit: u32) -> Result<Vec<Attempt>, TransportError>;

    /// A single stored attempt.
    async fn attempt(&self, id: i64) -> Result<Attempt, TransportError>;

    /// Evaluate an arithmetic expression.
    async fn evaluate(&self, expr: &str) -> Result<Evaluation, TransportError>;
}
