//! Delivery channel seam and the development channel.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serde::Serialize;

use crate::features::alerts::UrgencyTier;
use crate::features::reminders::LeadTime;

/// A fully rendered reminder, ready for any channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderMessage {
    pub user_id: String,
    pub item_id: String,
    pub title: String,
    pub lead_time: LeadTime,
    pub tier: UrgencyTier,
    pub subject: String,
    pub body: String,
}

/// Where rendered reminders go.
///
/// `Ok` means the reminder reached the channel; only then does the caller
/// mark it sent. Any `Err` leaves the reminder due, to be retried on the
/// next cycle.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Channel name for logs and the delivery history
    fn name(&self) -> &'static str;

    async fn deliver(&self, message: &ReminderMessage) -> Result<()>;
}

/// Development channel that logs reminders instead of sending them.
pub struct LogChannel;

#[async_trait]
impl DeliveryChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, message: &ReminderMessage) -> Result<()> {
        info!(
            "⏰ [{}] reminder for {} (item {}): {}",
            message.tier.label(),
            message.user_id,
            message.item_id,
            message.subject
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_channel_always_accepts() {
        let message = ReminderMessage {
            user_id: "alice".to_string(),
            item_id: "s1".to_string(),
            title: "Merit Grant".to_string(),
            lead_time: LeadTime::ThreeDays,
            tier: UrgencyTier::Critical,
            subject: "Only 3 days left: Merit Grant".to_string(),
            body: "Merit Grant closes on 2025-06-30.".to_string(),
        };
        assert!(LogChannel.deliver(&message).await.is_ok());
        assert_eq!(LogChannel.name(), "log");
    }
}
