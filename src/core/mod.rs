//! # Core Module
//!
//! Configuration and content utilities shared by every feature.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Add content module with reminder text limits
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod content;

// Re-export commonly used items
pub use config::{parse_duration, Config};
pub use content::{truncate_body, truncate_subject, BODY_LIMIT, SUBJECT_LIMIT};
