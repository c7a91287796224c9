//! sumrise-core — Client-side grading core.
//!
//! Validates free-text answers, normalizes the grading service's batch
//! responses into one canonical result model, maintains the active question
//! set and drives the batch-submission lifecycle.

pub mod controller;
pub mod error;
pub mod mock;
pub mod model;
pub mod normalize;
pub mod selector;
pub mod session;
pub mod topics;
pub mod traits;
pub mod validation;

pub use controller::{SubmissionController, SubmissionPhase, SubmitOutcome};
pub use error::{NormalizeError, TransportError, ValidationError};
pub use model::{BatchResult, MarkItemResult, Question};
pub use selector::QuestionSetSelector;
pub use session::PracticeSession;
pub use traits::GradingTransport;
