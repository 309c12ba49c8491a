//! Collaborator seams between the engine and its surroundings.
//!
//! The evaluator only ever talks to these traits: something that supplies
//! item snapshots, something that holds preferences, and a durable log of
//! what was already sent. `Database` backs all three in the daemon; the
//! DashMap-backed versions here back tests and embedders that bring their
//! own persistence.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;

use crate::features::alerts::{SourceKind, TrackedItem};
use crate::features::reminders::{LeadTime, ReminderPreferences};

/// One durable sent-log row: this reminder went out against this deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub item_id: String,
    pub lead_time: LeadTime,
    /// Deadline the reminder was sent against; records for a superseded
    /// deadline stop counting the moment the item's deadline changes
    pub deadline: NaiveDate,
    pub sent_at: DateTime<Utc>,
}

/// Supplies tracked-item snapshots for one list.
///
/// Snapshots may trail the backing store. An evaluation treats what it got
/// as authoritative and picks up edits on the next cycle.
#[async_trait]
pub trait ItemSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Users that currently have items in this source
    async fn users(&self) -> Result<Vec<String>>;

    async fn items(&self, user_id: &str) -> Result<Vec<TrackedItem>>;
}

/// Loads and saves per-user reminder preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// `None` means the user never saved settings; callers apply the
    /// defaults
    async fn load(&self, user_id: &str) -> Result<Option<ReminderPreferences>>;

    async fn save(&self, user_id: &str, prefs: &ReminderPreferences) -> Result<()>;
}

/// Durable record of delivered reminders.
///
/// Appends are at-least-once: recording the same (item, lead time,
/// deadline) twice must be harmless.
#[async_trait]
pub trait SentLog: Send + Sync {
    async fn entries(&self, user_id: &str) -> Result<Vec<SentRecord>>;

    async fn append(&self, user_id: &str, record: &SentRecord) -> Result<()>;

    /// Drop records whose deadline is before `cutoff`. Returns how many
    /// were removed.
    async fn purge_before(&self, cutoff: NaiveDate) -> Result<usize>;
}

/// In-memory source holding one fixed list per user.
pub struct StaticSource {
    kind: SourceKind,
    items: DashMap<String, Vec<TrackedItem>>,
}

impl StaticSource {
    pub fn new(kind: SourceKind) -> Self {
        StaticSource {
            kind,
            items: DashMap::new(),
        }
    }

    /// Replace the user's list wholesale
    pub fn put(&self, user_id: &str, items: Vec<TrackedItem>) {
        self.items.insert(user_id.to_string(), items);
    }
}

#[async_trait]
impl ItemSource for StaticSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn users(&self) -> Result<Vec<String>> {
        Ok(self.items.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn items(&self, user_id: &str) -> Result<Vec<TrackedItem>> {
        Ok(self
            .items
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

/// DashMap-backed preference store.
#[derive(Default)]
pub struct MemoryPreferences {
    prefs: DashMap<String, ReminderPreferences>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn load(&self, user_id: &str) -> Result<Option<ReminderPreferences>> {
        Ok(self.prefs.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, user_id: &str, prefs: &ReminderPreferences) -> Result<()> {
        self.prefs.insert(user_id.to_string(), prefs.clone());
        Ok(())
    }
}

/// DashMap-backed sent log with set semantics on append.
#[derive(Default)]
pub struct MemorySentLog {
    records: DashMap<String, Vec<SentRecord>>,
}

impl MemorySentLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SentLog for MemorySentLog {
    async fn entries(&self, user_id: &str) -> Result<Vec<SentRecord>> {
        Ok(self
            .records
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn append(&self, user_id: &str, record: &SentRecord) -> Result<()> {
        let mut entry = self.records.entry(user_id.to_string()).or_default();
        let duplicate = entry.iter().any(|existing| {
            existing.item_id == record.item_id
                && existing.lead_time == record.lead_time
                && existing.deadline == record.deadline
        });
        if !duplicate {
            entry.push(record.clone());
        }
        Ok(())
    }

    async fn purge_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let mut removed = 0;
        for mut entry in self.records.iter_mut() {
            let before = entry.len();
            entry.retain(|record| record.deadline >= cutoff);
            removed += before - entry.len();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(item_id: &str, deadline: &str) -> SentRecord {
        SentRecord {
            item_id: item_id.to_string(),
            lead_time: LeadTime::Week,
            deadline: deadline.parse().unwrap(),
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_static_source_lists_its_users() {
        let source = StaticSource::new(SourceKind::Saved);
        source.put("alice", vec![]);
        source.put("bob", vec![]);

        let mut users = source.users().await.unwrap();
        users.sort();
        assert_eq!(users, ["alice", "bob"]);
        assert!(source.items("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_preferences_round_trip() {
        let store = MemoryPreferences::new();
        assert!(store.load("alice").await.unwrap().is_none());

        let mut prefs = ReminderPreferences::default();
        prefs.email_enabled = false;
        store.save("alice", &prefs).await.unwrap();

        assert_eq!(store.load("alice").await.unwrap(), Some(prefs));
    }

    #[tokio::test]
    async fn test_memory_sent_log_ignores_duplicate_appends() {
        let log = MemorySentLog::new();
        let record = sample_record("s1", "2025-06-30");

        log.append("alice", &record).await.unwrap();
        log.append("alice", &record).await.unwrap();

        assert_eq!(log.entries("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_sent_log_keeps_users_apart() {
        let log = MemorySentLog::new();
        log.append("alice", &sample_record("s1", "2025-06-30"))
            .await
            .unwrap();

        assert!(log.entries("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_drops_only_old_deadlines() {
        let log = MemorySentLog::new();
        log.append("alice", &sample_record("old", "2025-01-10"))
            .await
            .unwrap();
        log.append("alice", &sample_record("new", "2025-06-30"))
            .await
            .unwrap();

        let removed = log.purge_before("2025-03-01".parse().unwrap()).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = log.entries("alice").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].item_id, "new");
    }
}
