//! # Feature Modules
//!
//! Engine capabilities grouped the way they ship: alert computation,
//! the reminder lifecycle, and delivery.
//!
//! - **Version**: 1.4.0
//! - **Since**: 0.1.0

pub mod alerts;
pub mod delivery;
pub mod reminders;

pub use alerts::{compute_upcoming_alerts, DeadlineAlert, SourceKind, TrackedItem, UrgencyTier};
pub use delivery::{
    DeliveryChannel, DeliveryTracker, LogChannel, ReminderMessage, TemplateConfig, WebhookChannel,
};
pub use reminders::{
    due_reminders, CycleReport, Evaluator, LeadTime, ReminderPreferences, ReminderScheduler,
    ReminderState,
};

/// Name and version of one engine feature, for the startup banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// Engine version from Cargo metadata
pub fn get_engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Features compiled into this build, with their individual versions
pub fn get_features() -> Vec<FeatureInfo> {
    vec![
        FeatureInfo {
            name: "alerts",
            version: "1.2.0",
        },
        FeatureInfo {
            name: "reminders",
            version: "1.3.0",
        },
        FeatureInfo {
            name: "delivery",
            version: "1.1.0",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_version_matches_manifest() {
        assert_eq!(get_engine_version(), env!("CARGO_PKG_VERSION"));
        assert!(!get_engine_version().is_empty());
    }

    #[test]
    fn test_feature_list_is_stable() {
        let names: Vec<&str> = get_features().iter().map(|f| f.name).collect();
        assert_eq!(names, ["alerts", "reminders", "delivery"]);
    }
}
