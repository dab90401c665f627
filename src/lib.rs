//! ExamFlow progression engine.
//!
//! Tracks a learner's level, experience, lifetime score, per-subject progress and
//! unlocked achievements, persists them to a key-value store and reports level-ups
//! and unlocks through a notification sink.

pub mod achievements;
pub mod api;
pub mod config;
pub mod error;
pub mod gamification;
pub mod notify;
pub mod reducer;
pub mod state;
pub mod store;

pub use error::{ProgressError, Result, StoreError};
pub use gamification::{AwardOutcome, ProgressSummary, ProgressionEngine};
pub use state::ProgressionState;
