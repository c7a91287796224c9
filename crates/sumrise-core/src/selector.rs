//! Active question set selection.
//!
//! The selector owns the question pool and the subset currently presented:
//! topic filter, bounded random sample, retry-incorrect and reset.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::model::{BatchResult, Question, QuestionSetConfig, TopicFilter};

/// Filter `pool` by topic, then draw `min(count, matches)` questions without
/// replacement in random order.
pub fn sample<R: Rng + ?Sized>(
    pool: &[Question],
    topic: &TopicFilter,
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    let mut seen = HashSet::new();
    let mut candidates: Vec<&Question> = pool
        .iter()
        .filter(|q| topic.matches(&q.topic))
        .filter(|q| seen.insert(q.id.as_str()))
        .collect();
    let take = count.min(candidates.len());
    let (chosen, _) = candidates.partial_shuffle(rng, take);
    chosen.iter().map(|q| (*q).clone()).collect()
}

/// Maintains the active subset of a question pool.
pub struct QuestionSetSelector {
    pool: Vec<Question>,
    config: QuestionSetConfig,
    active: Vec<Question>,
    rng: StdRng,
}

impl QuestionSetSelector {
    /// Create a selector with the default config and an entropy-seeded RNG.
    pub fn new(pool: Vec<Question>) -> Self {
        Self::with_rng(pool, QuestionSetConfig::default(), StdRng::from_entropy())
    }

    pub fn with_config(pool: Vec<Question>, config: QuestionSetConfig) -> Self {
        Self::with_rng(pool, config, StdRng::from_entropy())
    }

    /// Deterministic sampling for tests and reproducible sets.
    pub fn seeded(pool: Vec<Question>, config: QuestionSetConfig, seed: u64) -> Self {
        Self::with_rng(pool, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(pool: Vec<Question>, config: QuestionSetConfig, rng: StdRng) -> Self {
        let mut selector = Self {
            pool: dedupe(pool),
            config,
            active: Vec::new(),
            rng,
        };
        selector.resample();
        selector
    }

    pub fn pool(&self) -> &[Question] {
        &self.pool
    }

    pub fn active(&self) -> &[Question] {
        &self.active
    }

    pub fn config(&self) -> &QuestionSetConfig {
        &self.config
    }

    /// Topic slugs present in the pool, sorted and unique.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .pool
            .iter()
            .map(|q| q.topic.clone())
            .filter(|t| !t.is_empty())
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// Change the topic filter and draw a new active set.
    pub fn set_filter(&mut self, topic: TopicFilter) -> &[Question] {
        self.config.topic_filter = topic;
        self.resample();
        &self.active
    }

    /// Change the set size (clamped to `[1, 50]`) and draw a new active set.
    pub fn set_count(&mut self, n: usize) -> &[Question] {
        self.config.set_count(n);
        self.resample();
        &self.active
    }

    /// Swap in a freshly fetched pool and draw a new active set.
    pub fn replace_pool(&mut self, pool: Vec<Question>) -> &[Question] {
        self.pool = dedupe(pool);
        self.resample();
        &self.active
    }

    /// Narrow the active set to the questions graded incorrect in `last`.
    ///
    /// Pool metadata is kept. Returns `false`, leaving the active set
    /// untouched, when nothing in `last` is both incorrect and in the pool.
    pub fn retry_incorrect(&mut self, last: &BatchResult) -> bool {
        let mut seen = HashSet::new();
        let retry: Vec<Question> = last
            .incorrect_ids()
            .into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.pool.iter().find(|q| q.id == id).cloned())
            .collect();
        if retry.is_empty() {
            debug!("no incorrect answers to retry");
            return false;
        }
        debug!(count = retry.len(), "retrying incorrect questions");
        self.active = retry;
        true
    }

    /// Make the whole pool active.
    pub fn reset(&mut self) -> &[Question] {
        self.active = self.pool.clone();
        &self.active
    }

    fn resample(&mut self) {
        self.active = sample(
            &self.pool,
            &self.config.topic_filter,
            self.config.count(),
            &mut self.rng,
        );
        debug!(
            topic = %self.config.topic_filter,
            requested = self.config.count(),
            drawn = self.active.len(),
            "sampled question set"
        );
    }
}

fn dedupe(pool: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    let before = pool.len();
    let unique: Vec<Question> = pool
        .into_iter()
        .filter(|q| seen.insert(q.id.clone()))
        .collect();
    if unique.len() != before {
        warn!(dropped = before - unique.len(), "question pool contained duplicate ids");
    }
    unique
}
