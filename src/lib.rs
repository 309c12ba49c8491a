// Core layer - shared configuration and content utilities
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure - persistence and collaborator seams
pub mod database;
pub mod stores;

// Re-export core config for convenience
pub use core::Config;

// Re-export feature items
pub use features::{
    // Alerts
    compute_upcoming_alerts, DeadlineAlert, SourceKind, TrackedItem, UrgencyTier,
    // Reminders
    due_reminders, CycleReport, Evaluator, LeadTime, ReminderPreferences, ReminderScheduler,
    ReminderState,
    // Delivery
    DeliveryChannel, DeliveryTracker, LogChannel, ReminderMessage, TemplateConfig, WebhookChannel,
};

// Re-export store seams
pub use database::{Database, DatabaseSource};
pub use stores::{ItemSource, PreferenceStore, SentLog, SentRecord};
