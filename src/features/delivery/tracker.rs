//! Delivery attempt tracking.
//!
//! The sent log answers "may this reminder fire again?"; the delivery
//! history answers "what happened when it fired?". Attempts are queued
//! onto a background writer so delivery never waits on a history insert.

use log::{error, warn};
use tokio::sync::mpsc;

use crate::database::Database;
use crate::features::reminders::LeadTime;

/// One delivery attempt headed for the history table.
#[derive(Debug, Clone)]
pub enum AttemptEvent {
    Sent {
        user_id: String,
        item_id: String,
        lead_time: LeadTime,
        channel: &'static str,
    },
    Failed {
        user_id: String,
        item_id: String,
        lead_time: LeadTime,
        channel: &'static str,
        reason: String,
    },
}

/// Fire-and-forget recorder for delivery attempts.
#[derive(Clone)]
pub struct DeliveryTracker {
    sender: mpsc::UnboundedSender<AttemptEvent>,
}

impl DeliveryTracker {
    pub fn new(database: Database) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(Self::background_writer(database, receiver));
        DeliveryTracker { sender }
    }

    pub fn log_sent(&self, user_id: &str, item_id: &str, lead_time: LeadTime, channel: &'static str) {
        self.queue(AttemptEvent::Sent {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            lead_time,
            channel,
        });
    }

    pub fn log_failed(
        &self,
        user_id: &str,
        item_id: &str,
        lead_time: LeadTime,
        channel: &'static str,
        reason: &str,
    ) {
        self.queue(AttemptEvent::Failed {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            lead_time,
            channel,
            reason: reason.to_string(),
        });
    }

    fn queue(&self, event: AttemptEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("Failed to queue delivery event: {e}");
        }
    }

    async fn background_writer(
        database: Database,
        mut receiver: mpsc::UnboundedReceiver<AttemptEvent>,
    ) {
        while let Some(event) = receiver.recv().await {
            let result = match &event {
                AttemptEvent::Sent {
                    user_id,
                    item_id,
                    lead_time,
                    channel,
                } => {
                    database
                        .log_delivery_attempt(user_id, item_id, *lead_time, channel, "sent", None)
                        .await
                }
                AttemptEvent::Failed {
                    user_id,
                    item_id,
                    lead_time,
                    channel,
                    reason,
                } => {
                    database
                        .log_delivery_attempt(
                            user_id,
                            item_id,
                            *lead_time,
                            channel,
                            "failed",
                            Some(reason),
                        )
                        .await
                }
            };
            if let Err(e) = result {
                error!("Failed to store delivery attempt: {e}");
            }
        }
    }
}
