//! Webhook delivery channel.
//!
//! Posts rendered reminders as JSON to a configured HTTP endpoint.
//! Deployments point this at whatever bridges into their mailer; the
//! engine only cares that the endpoint answers 2xx.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use serde_json::json;

use super::channel::{DeliveryChannel, ReminderMessage};

pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    /// `timeout` bounds a single POST end to end.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(WebhookChannel {
            client,
            url: url.to_string(),
        })
    }

    fn payload(message: &ReminderMessage) -> serde_json::Value {
        json!({
            "user_id": message.user_id,
            "item_id": message.item_id,
            "title": message.title,
            "lead_time_days": message.lead_time.days(),
            "urgency": message.tier.as_str(),
            "color": message.tier.color(),
            "subject": message.subject,
            "body": message.body,
        })
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, message: &ReminderMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&Self::payload(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("webhook returned {status}"));
        }

        debug!(
            "Webhook accepted reminder for {} (item {})",
            message.user_id, message.item_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::alerts::UrgencyTier;
    use crate::features::reminders::LeadTime;

    #[test]
    fn test_payload_carries_the_delivery_fields() {
        let message = ReminderMessage {
            user_id: "alice".to_string(),
            item_id: "s1".to_string(),
            title: "Merit Grant".to_string(),
            lead_time: LeadTime::Week,
            tier: UrgencyTier::Warning,
            subject: "One week left: Merit Grant".to_string(),
            body: "The deadline is 2025-06-30.".to_string(),
        };

        let payload = WebhookChannel::payload(&message);
        assert_eq!(payload["user_id"], "alice");
        assert_eq!(payload["lead_time_days"], 7);
        assert_eq!(payload["urgency"], "warning");
        assert_eq!(payload["color"], 0xF39C12);
        assert_eq!(payload["subject"], "One week left: Merit Grant");
    }

    #[test]
    fn test_construction_with_sane_timeout() {
        let channel = WebhookChannel::new("http://127.0.0.1:9/hook", Duration::from_secs(5));
        assert!(channel.is_ok());
        assert_eq!(channel.unwrap().name(), "webhook");
    }
}
