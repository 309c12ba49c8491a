//! # Reminders Feature
//!
//! Scheduled deadline reminders with idempotent delivery.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.3.0: Editing a deadline re-arms the full reminder ladder
//! - 1.2.0: Periodic sent-log retention purge
//! - 1.1.0: Startup jitter for multi-replica deployments
//! - 1.0.0: Initial lead-time ladder and evaluation loop

pub mod engine;
pub mod evaluator;
pub mod prefs;
pub mod scheduler;

pub use engine::{due_reminders, effective_sent_set, ReminderState, SentKey};
pub use evaluator::{CycleReport, Evaluator, UserReport};
pub use prefs::{LeadTime, ReminderPreferences};
pub use scheduler::ReminderScheduler;
