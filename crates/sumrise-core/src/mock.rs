//! In-memory grading transport for tests and offline demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::error::TransportError;
use crate::model::{Attempt, Evaluation, MarkBatchRequest, Question, QuestionQuery};
use crate::traits::GradingTransport;

/// A mock grading service.
///
/// Grades against an answer key unless a fixed batch response is set, and
/// can hold `mark_batch` calls until [`MockTransport::release`] is called.
pub struct MockTransport {
    questions: Vec<Question>,
    /// Map of question id → expected answer.
    answer_key: HashMap<String, String>,
    /// Overrides answer-key grading when set.
    mark_response: Mutex<Option<Result<Value, TransportError>>>,
    attempts: Vec<Attempt>,
    mark_calls: AtomicU32,
    last_mark: Mutex<Option<MarkBatchRequest>>,
    gate: Option<Semaphore>,
}

impl MockTransport {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            answer_key: HashMap::new(),
            mark_response: Mutex::new(None),
            attempts: Vec::new(),
            mark_calls: AtomicU32::new(0),
            last_mark: Mutex::new(None),
            gate: None,
        }
    }

    pub fn with_answer_key<I, K, V>(mut self, key: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.answer_key = key.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Always answer `mark_batch` with this raw body.
    pub fn with_mark_response(self, body: Value) -> Self {
        self.set_mark_response(Ok(body));
        self
    }

    /// Always fail `mark_batch` with this error.
    pub fn with_mark_error(self, err: TransportError) -> Self {
        self.set_mark_response(Err(err));
        self
    }

    pub fn with_attempts(mut self, attempts: Vec<Attempt>) -> Self {
        self.attempts = attempts;
        self
    }

    /// Make every `mark_batch` call wait for a [`release`](Self::release).
    pub fn held(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Let one held `mark_batch` call through.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn set_mark_response(&self, response: Result<Value, TransportError>) {
        *self
            .mark_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(response);
    }

    /// Number of `mark_batch` calls received.
    pub fn mark_calls(&self) -> u32 {
        self.mark_calls.load(Ordering::SeqCst)
    }

    /// The last batch submitted.
    pub fn last_mark(&self) -> Option<MarkBatchRequest> {
        self.last_mark
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn grade(&self, request: &MarkBatchRequest) -> Value {
        let results: Vec<Value> = request
            .items
            .iter()
            .map(|item| {
                let expected = self.answer_key.get(&item.id);
                let correct = expected.is_some_and(|e| e.trim() == item.answer.trim());
                json!({
                    "id": item.id,
                    "response": {
                        "ok": true,
                        "correct": correct,
                        "score": if correct { 1.0 } else { 0.0 },
                        "feedback": if correct { "Correct" } else { "Not quite" },
                        "expected": expected,
                    }
                })
            })
            .collect();
        json!({ "ok": true, "results": results })
    }
}

#[async_trait]
impl GradingTransport for MockTransport {
    async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, TransportError> {
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(self
            .questions
            .iter()
            .filter(|q| query.topic.as_deref().map_or(true, |t| t == q.topic))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_question(&self, id: &str) -> Result<Question, TransportError> {
        self.questions
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or_else(|| TransportError::Service {
                status: 404,
                message: format!("question {id} not found"),
            })
    }

    async fn mark_batch(&self, request: &MarkBatchRequest) -> Result<Value, TransportError> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_mark.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            permit.forget();
        }

        let fixed = self
            .mark_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match fixed {
            Some(response) => response,
            None => Ok(self.grade(request)),
        }
    }

    async fn recent_attempts(&self, limit: u32) -> Result<Vec<Attempt>, TransportError> {
        Ok(self.attempts.iter().take(limit as usize).cloned().collect())
    }

    async fn attempt(&self, id: i64) -> Result<Attempt, TransportError> {
        self.attempts
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| TransportError::Service {
                status: 404,
                message: format!("attempt {id} not found"),
            })
    }

    async fn evaluate(&self, expr: &str) -> Result<Evaluation, TransportError> {
        Ok(expr
            .trim()
            .parse::<f64>()
            .map(Evaluation::Value)
            .unwrap_or_else(|_| Evaluation::Error("mock can only evaluate literals".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MarkBatchItem;

    fn questions() -> Vec<Question> {
        vec![
            Question::new("q1", "fractions", "1/2 + 1/2"),
            Question::new("q2", "percentages", "50% of 4"),
        ]
    }

    #[tokio::test]
    async fn grades_against_answer_key() {
        let mock = MockTransport::new(questions()).with_answer_key([("q1", "1"), ("q2", "2")]);
        let request = MarkBatchRequest {
            items: vec![
                MarkBatchItem {
                    id: "q1".into(),
                    answer: " 1 ".into(),
                },
                MarkBatchItem {
                    id: "q2".into(),
                    answer: "3".into(),
                },
            ],
            duration_ms: Some(10),
        };
        let body = mock.mark_batch(&request).await.unwrap();
        assert_eq!(body["results"][0]["response"]["correct"], true);
        assert_eq!(body["results"][1]["response"]["correct"], false);
        assert_eq!(body["results"][1]["response"]["expected"], "2");
        assert_eq!(mock.mark_calls(), 1);
        assert_eq!(mock.last_mark().unwrap().duration_ms, Some(10));
    }

    #[tokio::test]
    async fn filters_questions_by_topic() {
        let mock = MockTransport::new(questions());
        let query = QuestionQuery {
            topic: Some("percentages".into()),
            ..Default::default()
        };
        let found = mock.list_questions(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "q2");
        assert!(mock.get_question("nope").await.is_err());
    }

    #[tokio::test]
    async fn serves_stored_attempts() {
        let attempt = |id: i64| Attempt {
            id,
            created_at: None,
            total: 1,
            correct: 0,
            duration_ms: Some(900),
            items: vec![json!({
                "id": "q1", "ok": true, "correct": false, "score": 0, "feedback": "Not quite"
            })],
        };
        let mock =
            MockTransport::new(questions()).with_attempts(vec![attempt(3), attempt(2), attempt(1)]);

        let recent = mock.recent_attempts(2).await.unwrap();
        assert_eq!(recent.iter().map(|a| a.id).collect::<Vec<_>>(), vec![3, 2]);

        let stored = mock.attempt(1).await.unwrap();
        assert_eq!(stored.results()[0].id, "q1");
        let err = mock.attempt(9).await.unwrap_err();
        assert!(err.is_permanent());
    }
}
