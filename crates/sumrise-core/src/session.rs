//! A practice session: one question selector feeding one submission
//! controller.
//!
//! Every change to the active set is pushed into the controller, so answers
//! and results from a previous set are never attributed to a new one.

use std::sync::Arc;

use tracing::info;

use crate::controller::{SubmissionController, SubmitOutcome};
use crate::error::TransportError;
use crate::model::{Question, QuestionQuery, QuestionSetConfig, TopicFilter};
use crate::selector::QuestionSetSelector;
use crate::traits::GradingTransport;

pub struct PracticeSession {
    selector: QuestionSetSelector,
    controller: SubmissionController,
}

impl PracticeSession {
    pub fn new(selector: QuestionSetSelector, controller: SubmissionController) -> Self {
        let session = Self {
            selector,
            controller,
        };
        session.publish();
        session
    }

    /// Fetch the whole pool once and start a session with default
    /// controller settings.
    pub async fn load(
        transport: Arc<dyn GradingTransport>,
        config: QuestionSetConfig,
    ) -> Result<Self, TransportError> {
        let pool = fetch_pool(transport.as_ref()).await?;
        let selector = QuestionSetSelector::with_config(pool, config);
        Ok(Self::new(selector, SubmissionController::new(transport)))
    }

    pub fn selector(&self) -> &QuestionSetSelector {
        &self.selector
    }

    pub fn controller(&self) -> &SubmissionController {
        &self.controller
    }

    pub fn active(&self) -> &[Question] {
        self.selector.active()
    }

    pub fn set_filter(&mut self, topic: TopicFilter) {
        self.selector.set_filter(topic);
        self.publish();
    }

    pub fn set_count(&mut self, n: usize) {
        self.selector.set_count(n);
        self.publish();
    }

    pub fn replace_pool(&mut self, pool: Vec<Question>) {
        self.selector.replace_pool(pool);
        self.publish();
    }

    /// Narrow the set to the questions the last result marked incorrect.
    ///
    /// Returns `false` and changes nothing when there is no result or
    /// nothing to retry.
    pub fn retry_incorrect(&mut self) -> bool {
        let Some(last) = self.controller.result() else {
            return false;
        };
        if !self.selector.retry_incorrect(&last) {
            return false;
        }
        self.publish();
        true
    }

    /// Make the whole pool active and clear answers and result.
    pub fn reset(&mut self) {
        self.selector.reset();
        self.publish();
    }

    pub async fn submit(&self) -> SubmitOutcome {
        self.controller.submit().await
    }

    fn publish(&self) {
        info!(
            questions = self.selector.active().len(),
            topic = %self.selector.config().topic_filter,
            "active question set changed"
        );
        self.controller.set_questions(self.selector.active().to_vec());
    }
}

/// Fetch every question the service offers.
pub async fn fetch_pool(
    transport: &dyn GradingTransport,
) -> Result<Vec<Question>, TransportError> {
    transport.list_questions(&QuestionQuery::default()).await
}
