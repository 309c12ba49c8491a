//! # Alerts Feature
//!
//! Derives upcoming-deadline alerts from the tracked item lists: merge,
//! deduplicate, rank by proximity, classify urgency.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Dedup prefers the provider ref; titles are the fallback only
//! - 1.1.0: Urgency tiers carry labels and accent colors
//! - 1.0.0: Initial merge, sort, and limit pipeline

pub mod engine;
pub mod model;

pub use engine::{compute_upcoming_alerts, dedup_key};
pub use model::{DeadlineAlert, SourceKind, TrackedItem, UrgencyTier};
