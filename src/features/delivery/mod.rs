//! # Delivery Feature
//!
//! Rendering and dispatching reminders: templates, channels, and the
//! delivery history.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Webhook channel and YAML template overrides
//! - 1.0.0: Log channel and built-in wording

pub mod channel;
pub mod templates;
pub mod tracker;
pub mod webhook;

pub use channel::{DeliveryChannel, LogChannel, ReminderMessage};
pub use templates::{ReminderTemplate, RenderedReminder, TemplateConfig};
pub use tracker::{AttemptEvent, DeliveryTracker};
pub use webhook::WebhookChannel;
