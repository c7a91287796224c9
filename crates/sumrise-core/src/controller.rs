//! Batch submission lifecycle.
//!
//! `Idle → Validating → {Idle (blocked) | Submitting} → {Succeeded | Failed}`.
//!
//! At most one submission is in flight. Every cancellation, reset or change
//! of the active set bumps a generation counter; a response is applied only
//! if the generation it started under is still current.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::error::ValidationError;
use crate::model::{AnswerMap, BatchResult, MarkBatchItem, MarkBatchRequest, Question};
use crate::normalize::{normalize_batch, NormalizeOptions};
use crate::traits::GradingTransport;
use crate::validation::{validate_all, AnswerValidator, ExpressionValidator};

/// Banner shown when a submission is blocked by invalid answers.
pub const FIX_ANSWERS_MESSAGE: &str = "Please fix the highlighted answers.";

/// Where the controller is in the submission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

/// What a call to [`SubmissionController::submit`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Some answers were rejected; nothing was sent.
    Blocked(BTreeMap<String, ValidationError>),
    /// Another submission was already in flight; nothing was sent.
    AlreadyInFlight,
    Succeeded(BatchResult),
    /// The request failed; carries the user-facing message.
    Failed(String),
    /// Cancelled or superseded before the response could be applied.
    Cancelled,
}

/// Published state, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSnapshot {
    pub phase: SubmissionPhase,
    pub result: Option<BatchResult>,
    pub error: Option<String>,
}

/// Notified of lifecycle transitions that were actually applied.
pub trait SubmissionObserver: Send + Sync {
    fn on_blocked(&self, errors: &BTreeMap<String, ValidationError>);
    fn on_submitting(&self, items: usize, duration_ms: u64);
    fn on_settled(&self, outcome: Result<&BatchResult, &str>);
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl SubmissionObserver for NoopObserver {
    fn on_blocked(&self, _: &BTreeMap<String, ValidationError>) {}
    fn on_submitting(&self, _: usize, _: u64) {}
    fn on_settled(&self, _: Result<&BatchResult, &str>) {}
}

struct State {
    phase: SubmissionPhase,
    questions: Vec<Question>,
    answers: AnswerMap,
    result: Option<BatchResult>,
    error: Option<String>,
    started_at: Option<Instant>,
    generation: u64,
}

impl State {
    /// Drop answers, outcome and timing, and invalidate anything in flight.
    fn clear_session(&mut self) {
        self.generation += 1;
        self.phase = SubmissionPhase::Idle;
        self.answers.clear();
        self.result = None;
        self.error = None;
        self.started_at = None;
    }
}

/// Drives one batch submission at a time against a grading transport.
pub struct SubmissionController {
    transport: Arc<dyn GradingTransport>,
    validator: Box<dyn AnswerValidator>,
    observer: Arc<dyn SubmissionObserver>,
    options: NormalizeOptions,
    state: Mutex<State>,
    cancelled: Notify,
}

impl SubmissionController {
    pub fn new(transport: Arc<dyn GradingTransport>) -> Self {
        Self {
            transport,
            validator: Box::new(ExpressionValidator::default()),
            observer: Arc::new(NoopObserver),
            options: NormalizeOptions::default(),
            state: Mutex::new(State {
                phase: SubmissionPhase::Idle,
                questions: Vec::new(),
                answers: AnswerMap::new(),
                result: None,
                error: None,
                started_at: None,
                generation: 0,
            }),
            cancelled: Notify::new(),
        }
    }

    pub fn with_validator(mut self, validator: Box<dyn AnswerValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SubmissionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the active question set.
    ///
    /// Answers, result, error and start time are cleared and any in-flight
    /// submission is cancelled.
    pub fn set_questions(&self, questions: Vec<Question>) {
        {
            let mut state = self.lock();
            state.clear_session();
            state.questions = questions;
        }
        self.cancelled.notify_waiters();
    }

    pub fn questions(&self) -> Vec<Question> {
        self.lock().questions.clone()
    }

    /// Record the raw answer for an active question.
    ///
    /// Returns `false` and stores nothing if `id` is not in the active set.
    pub fn set_answer(&self, id: &str, value: impl Into<String>) -> bool {
        let mut state = self.lock();
        if !state.questions.iter().any(|q| q.id == id) {
            debug!(id, "ignoring answer for inactive question");
            return false;
        }
        state.answers.insert(id.to_string(), value.into());
        true
    }

    pub fn answers(&self) -> AnswerMap {
        self.lock().answers.clone()
    }

    /// Current rejections, keyed by question id.
    pub fn validation(&self) -> BTreeMap<String, ValidationError> {
        let state = self.lock();
        validate_all(self.validator.as_ref(), &state.questions, &state.answers)
    }

    /// True when something is answered, nothing is rejected and no
    /// submission is in flight.
    pub fn can_submit(&self) -> bool {
        let state = self.lock();
        if state.phase == SubmissionPhase::Submitting {
            return false;
        }
        let any_answered = state.questions.iter().any(|q| {
            state
                .answers
                .get(&q.id)
                .is_some_and(|a| !a.trim().is_empty())
        });
        any_answered
            && validate_all(self.validator.as_ref(), &state.questions, &state.answers).is_empty()
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.lock().phase
    }

    pub fn result(&self) -> Option<BatchResult> {
        self.lock().result.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn snapshot(&self) -> SubmissionSnapshot {
        let state = self.lock();
        SubmissionSnapshot {
            phase: state.phase,
            result: state.result.clone(),
            error: state.error.clone(),
        }
    }

    /// Abort the in-flight submission, if any. Its response is never applied.
    pub fn cancel(&self) {
        {
            let mut state = self.lock();
            state.generation += 1;
            if state.phase == SubmissionPhase::Submitting {
                debug!("cancelling in-flight submission");
                state.phase = SubmissionPhase::Idle;
            }
        }
        self.cancelled.notify_waiters();
    }

    /// Clear answers, result, error and start time, and return to idle.
    pub fn reset(&self) {
        self.lock().clear_session();
        self.cancelled.notify_waiters();
    }

    /// Validate every active answer and, if all pass, submit them as one
    /// batch.
    pub async fn submit(&self) -> SubmitOutcome {
        let cancelled = self.cancelled.notified();
        tokio::pin!(cancelled);

        let started = {
            let mut state = self.lock();
            if state.phase == SubmissionPhase::Submitting {
                debug!("submission already in flight");
                return SubmitOutcome::AlreadyInFlight;
            }

            state.phase = SubmissionPhase::Validating;
            let mut items = Vec::with_capacity(state.questions.len());
            let mut errors = BTreeMap::new();
            for q in &state.questions {
                let raw = state.answers.get(&q.id).map(String::as_str).unwrap_or("");
                match self.validator.validate(raw) {
                    Ok(answer) => items.push(MarkBatchItem {
                        id: q.id.clone(),
                        answer,
                    }),
                    Err(e) => {
                        errors.insert(q.id.clone(), e);
                    }
                }
            }

            if errors.is_empty() {
                state.phase = SubmissionPhase::Submitting;
                state.result = None;
                state.error = None;
                let start = *state.started_at.get_or_insert_with(Instant::now);
                let duration_ms = start.elapsed().as_millis() as u64;
                cancelled.as_mut().enable();
                Ok((
                    state.generation,
                    MarkBatchRequest {
                        items,
                        duration_ms: Some(duration_ms),
                    },
                ))
            } else {
                state.phase = SubmissionPhase::Idle;
                state.result = None;
                state.error = Some(FIX_ANSWERS_MESSAGE.to_string());
                Err(errors)
            }
        };

        let (generation, request) = match started {
            Ok(started) => started,
            Err(errors) => {
                debug!(rejected = errors.len(), "submission blocked by validation");
                self.observer.on_blocked(&errors);
                return SubmitOutcome::Blocked(errors);
            }
        };

        debug!(
            generation,
            items = request.items.len(),
            duration_ms = ?request.duration_ms,
            "submitting batch"
        );
        self.observer
            .on_submitting(request.items.len(), request.duration_ms.unwrap_or(0));

        let mut guard = InFlightGuard {
            state: &self.state,
            generation,
            armed: true,
        };

        let response = tokio::select! {
            biased;
            _ = &mut cancelled => {
                // Left armed: a cancel that landed before this submission
                // took the lock wakes it without a newer generation.
                debug!(generation, "submission cancelled before response");
                return SubmitOutcome::Cancelled;
            }
            response = self.transport.mark_batch(&request) => response,
        };
        guard.armed = false;

        let outcome = {
            let mut state = self.lock();
            if state.generation != generation {
                warn!(
                    generation,
                    current = state.generation,
                    "discarding stale batch response"
                );
                return SubmitOutcome::Cancelled;
            }

            let settled = response
                .map_err(|e| {
                    warn!(error = %e, "batch submission failed");
                    e.user_message()
                })
                .and_then(|raw| {
                    normalize_batch(&raw, self.options).map_err(|e| {
                        error!(error = %e, "batch response violates the result contract");
                        e.to_string()
                    })
                });

            match settled {
                Ok(result) => {
                    state.phase = SubmissionPhase::Succeeded;
                    state.result = Some(result.clone());
                    state.error = None;
                    SubmitOutcome::Succeeded(result)
                }
                Err(message) => {
                    state.phase = SubmissionPhase::Failed;
                    state.result = None;
                    state.error = Some(message.clone());
                    SubmitOutcome::Failed(message)
                }
            }
        };

        match &outcome {
            SubmitOutcome::Succeeded(result) => self.observer.on_settled(Ok(result)),
            SubmitOutcome::Failed(message) => self.observer.on_settled(Err(message)),
            _ => {}
        }
        outcome
    }
}

/// Returns the controller to idle if a submit future is dropped mid-flight.
struct InFlightGuard<'a> {
    state: &'a Mutex<State>,
    generation: u64,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == self.generation && state.phase == SubmissionPhase::Submitting {
            debug!(generation = self.generation, "submission dropped mid-flight");
            state.generation += 1;
            state.phase = SubmissionPhase::Idle;
        }
    }
}
