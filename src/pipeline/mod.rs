//! Email classification and dispatch pipeline.
//!
//! Every email flows through:
//! 1. `Classifier::classify()` — LLM label, coerced into the closed vocabulary
//! 2. `Router::dispatch()` — category handler: draft reply, then side effects
//! 3. `BatchRunner` — records one `ProcessingResult` per email
//!
//! **Failures never cross email boundaries.** They show up as
//! `success = false` rows, not errors.

pub mod classifier;
pub mod responder;
pub mod router;
pub mod runner;
pub mod types;

pub use classifier::Classifier;
pub use responder::Responder;
pub use router::{HandlerFailure, HandlerOutcome, Router};
pub use runner::BatchRunner;
pub use types::{BatchSummary, Category, Email, ProcessingResult};
