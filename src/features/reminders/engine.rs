//! Due-reminder computation and the delivery state machine.
//!
//! The functions here are the idempotence core of the whole engine: pure
//! over their inputs, no clock, no I/O. A cycle that crashes after
//! recording its sends can be replayed from scratch and every already-sent
//! reminder stays sent.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use super::prefs::{LeadTime, ReminderPreferences};
use crate::features::alerts::DeadlineAlert;
use crate::stores::SentRecord;

/// Key of the already-sent set: one (item, lead time) pair.
pub type SentKey = (String, LeadTime);

/// Delivery lifecycle of one (item, lead time) pair.
///
/// `Sent` is terminal for a given deadline. When the deadline itself is
/// edited the pair starts over at `Pending`, which falls out of
/// [`effective_sent_set`] ignoring records for superseded deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// The lead-time day has not arrived
    Pending,
    /// The lead-time day is here and nothing has been delivered yet
    Due,
    /// Delivered for the current deadline
    Sent,
}

impl ReminderState {
    /// State of one pair given how far out the deadline is and whether the
    /// sent log already has it.
    pub fn of(days_until: i64, lead: LeadTime, already_sent: bool) -> Self {
        if already_sent {
            ReminderState::Sent
        } else if days_until == lead.days() {
            ReminderState::Due
        } else {
            ReminderState::Pending
        }
    }
}

/// Lead times newly due for one alert.
///
/// A lead time fires when the user enabled it, the deadline is exactly
/// that many days out, and the sent set does not contain the pair yet.
/// Nothing fires early and nothing fires late: a window skipped because
/// the engine was down stays skipped. `email_enabled` plays no part here;
/// dueness and delivery are separate questions.
pub fn due_reminders(
    alert: &DeadlineAlert,
    prefs: &ReminderPreferences,
    already_sent: &HashSet<SentKey>,
) -> BTreeSet<LeadTime> {
    prefs
        .lead_times
        .iter()
        .copied()
        .filter(|lead| alert.days_until == lead.days())
        .filter(|lead| !already_sent.contains(&(alert.item.id.clone(), *lead)))
        .collect()
}

/// Projects durable sent records onto the current alerts.
///
/// Only records whose stored deadline matches the item's current deadline
/// count. An edited deadline therefore re-arms the full ladder for that
/// item, because every old record stops matching at once.
pub fn effective_sent_set(
    records: &[SentRecord],
    alerts: &[DeadlineAlert],
) -> HashSet<SentKey> {
    let current: HashMap<&str, NaiveDate> = alerts
        .iter()
        .map(|alert| (alert.item.id.as_str(), alert.deadline))
        .collect();

    records
        .iter()
        .filter(|record| current.get(record.item_id.as_str()) == Some(&record.deadline))
        .map(|record| (record.item_id.clone(), record.lead_time))
        .collect()
}
