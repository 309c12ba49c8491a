//! SQLite persistence for tracked items, preferences, the sent log, and
//! the delivery history.
//!
//! One connection behind an async mutex. Statements never hold the lock
//! across an await, so the handle stays cheap to clone into background
//! tasks. Dates are stored as `YYYY-MM-DD` text and timestamps as RFC3339
//! text; both sort correctly as strings.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use sqlite::{Connection, State};
use tokio::sync::Mutex;

use crate::features::alerts::{SourceKind, TrackedItem};
use crate::features::reminders::{LeadTime, ReminderPreferences};
use crate::stores::{ItemSource, PreferenceStore, SentLog, SentRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shared handle to the engine database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// One row of the delivery history, newest first when listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub item_id: String,
    pub lead_time_days: i64,
    pub channel: String,
    pub outcome: String,
    pub detail: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema.
    pub async fn new(path: &str) -> Result<Self> {
        let conn =
            sqlite::open(path).with_context(|| format!("opening database at {path}"))?;
        let database = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        database.create_schema().await?;
        Ok(database)
    }

    async fn create_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tracked_items (
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                source TEXT NOT NULL,
                title TEXT NOT NULL,
                deadline TEXT,
                external_ref TEXT,
                added_at TEXT NOT NULL,
                PRIMARY KEY (user_id, item_id)
            );
            CREATE TABLE IF NOT EXISTS preferences (
                user_id TEXT PRIMARY KEY,
                email_enabled INTEGER NOT NULL DEFAULT 1,
                lead_7 INTEGER NOT NULL DEFAULT 1,
                lead_3 INTEGER NOT NULL DEFAULT 1,
                lead_1 INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sent_log (
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                lead_time_days INTEGER NOT NULL,
                deadline TEXT NOT NULL,
                sent_at TEXT NOT NULL,
                PRIMARY KEY (user_id, item_id, lead_time_days, deadline)
            );
            CREATE TABLE IF NOT EXISTS delivery_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                lead_time_days INTEGER NOT NULL,
                channel TEXT NOT NULL,
                outcome TEXT NOT NULL,
                detail TEXT,
                attempted_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Insert or update a tracked item. Re-adding an item moves it to the
    /// given source and refreshes its registration time.
    pub async fn add_tracked_item(&self, user_id: &str, item: &TrackedItem) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO tracked_items
             (user_id, item_id, source, title, deadline, external_ref, added_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )?;
        let deadline = item.deadline.map(|d| d.format(DATE_FORMAT).to_string());
        stmt.bind((1, user_id))?;
        stmt.bind((2, item.id.as_str()))?;
        stmt.bind((3, item.source.as_str()))?;
        stmt.bind((4, item.title.as_str()))?;
        stmt.bind((5, deadline.as_deref()))?;
        stmt.bind((6, item.external_ref.as_deref()))?;
        stmt.bind((7, Utc::now().to_rfc3339().as_str()))?;
        stmt.next()?;
        Ok(())
    }

    pub async fn remove_tracked_item(&self, user_id: &str, item_id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("DELETE FROM tracked_items WHERE user_id = ? AND item_id = ?")?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, item_id))?;
        stmt.next()?;
        Ok(())
    }

    /// One user's items in one source, in registration order.
    pub async fn tracked_items(
        &self,
        user_id: &str,
        kind: SourceKind,
    ) -> Result<Vec<TrackedItem>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT item_id, title, deadline, external_ref FROM tracked_items
             WHERE user_id = ? AND source = ?
             ORDER BY added_at, rowid",
        )?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, kind.as_str()))?;

        let mut items = Vec::new();
        while let State::Row = stmt.next()? {
            let deadline = stmt
                .read::<Option<String>, _>(2)?
                .as_deref()
                .and_then(parse_date);
            items.push(TrackedItem {
                id: stmt.read::<String, _>(0)?,
                title: stmt.read::<String, _>(1)?,
                deadline,
                source: kind,
                external_ref: stmt.read::<Option<String>, _>(3)?,
            });
        }
        Ok(items)
    }

    /// Users with at least one item in `kind`.
    pub async fn users_with_items(&self, kind: SourceKind) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT user_id FROM tracked_items WHERE source = ? ORDER BY user_id",
        )?;
        stmt.bind((1, kind.as_str()))?;

        let mut users = Vec::new();
        while let State::Row = stmt.next()? {
            users.push(stmt.read::<String, _>(0)?);
        }
        Ok(users)
    }

    pub async fn preferences(&self, user_id: &str) -> Result<Option<ReminderPreferences>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT email_enabled, lead_7, lead_3, lead_1 FROM preferences WHERE user_id = ?",
        )?;
        stmt.bind((1, user_id))?;

        if let State::Row = stmt.next()? {
            let mut lead_times = BTreeSet::new();
            if stmt.read::<i64, _>(1)? != 0 {
                lead_times.insert(LeadTime::Week);
            }
            if stmt.read::<i64, _>(2)? != 0 {
                lead_times.insert(LeadTime::ThreeDays);
            }
            if stmt.read::<i64, _>(3)? != 0 {
                lead_times.insert(LeadTime::DayBefore);
            }
            Ok(Some(ReminderPreferences {
                email_enabled: stmt.read::<i64, _>(0)? != 0,
                lead_times,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn save_preferences(
        &self,
        user_id: &str,
        prefs: &ReminderPreferences,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO preferences (user_id, email_enabled, lead_7, lead_3, lead_1, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 email_enabled = excluded.email_enabled,
                 lead_7 = excluded.lead_7,
                 lead_3 = excluded.lead_3,
                 lead_1 = excluded.lead_1,
                 updated_at = excluded.updated_at",
        )?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, prefs.email_enabled as i64))?;
        stmt.bind((3, prefs.wants(LeadTime::Week) as i64))?;
        stmt.bind((4, prefs.wants(LeadTime::ThreeDays) as i64))?;
        stmt.bind((5, prefs.wants(LeadTime::DayBefore) as i64))?;
        stmt.bind((6, Utc::now().to_rfc3339().as_str()))?;
        stmt.next()?;
        Ok(())
    }

    pub async fn sent_entries(&self, user_id: &str) -> Result<Vec<SentRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT item_id, lead_time_days, deadline, sent_at FROM sent_log
             WHERE user_id = ?",
        )?;
        stmt.bind((1, user_id))?;

        let mut records = Vec::new();
        while let State::Row = stmt.next()? {
            let days = stmt.read::<i64, _>(1)?;
            let Some(lead_time) = LeadTime::from_days(days) else {
                debug!("Ignoring sent-log row with unknown lead time of {days} days");
                continue;
            };
            let Some(deadline) = parse_date(&stmt.read::<String, _>(2)?) else {
                continue;
            };
            let sent_at = DateTime::parse_from_rfc3339(&stmt.read::<String, _>(3)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default();
            records.push(SentRecord {
                item_id: stmt.read::<String, _>(0)?,
                lead_time,
                deadline,
                sent_at,
            });
        }
        Ok(records)
    }

    /// Record a sent reminder. Replays of the same (item, lead time,
    /// deadline) are absorbed by the primary key.
    pub async fn record_sent(&self, user_id: &str, record: &SentRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO sent_log (user_id, item_id, lead_time_days, deadline, sent_at)
             VALUES (?, ?, ?, ?, ?)",
        )?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, record.item_id.as_str()))?;
        stmt.bind((3, record.lead_time.days()))?;
        stmt.bind((4, record.deadline.format(DATE_FORMAT).to_string().as_str()))?;
        stmt.bind((5, record.sent_at.to_rfc3339().as_str()))?;
        stmt.next()?;
        Ok(())
    }

    /// Remove sent-log rows for deadlines before `cutoff`, all users.
    pub async fn purge_sent_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("DELETE FROM sent_log WHERE deadline < ?")?;
        stmt.bind((1, cutoff.format(DATE_FORMAT).to_string().as_str()))?;
        stmt.next()?;
        Ok(conn.change_count())
    }

    pub async fn log_delivery_attempt(
        &self,
        user_id: &str,
        item_id: &str,
        lead_time: LeadTime,
        channel: &str,
        outcome: &str,
        detail: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO delivery_log
             (user_id, item_id, lead_time_days, channel, outcome, detail, attempted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, item_id))?;
        stmt.bind((3, lead_time.days()))?;
        stmt.bind((4, channel))?;
        stmt.bind((5, outcome))?;
        stmt.bind((6, detail))?;
        stmt.bind((7, Utc::now().to_rfc3339().as_str()))?;
        stmt.next()?;
        Ok(())
    }

    /// Most recent delivery attempts for a user, newest first.
    pub async fn delivery_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DeliveryAttempt>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT item_id, lead_time_days, channel, outcome, detail, attempted_at
             FROM delivery_log WHERE user_id = ?
             ORDER BY id DESC LIMIT ?",
        )?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, limit as i64))?;

        let mut attempts = Vec::new();
        while let State::Row = stmt.next()? {
            let attempted_at = DateTime::parse_from_rfc3339(&stmt.read::<String, _>(5)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default();
            attempts.push(DeliveryAttempt {
                item_id: stmt.read::<String, _>(0)?,
                lead_time_days: stmt.read::<i64, _>(1)?,
                channel: stmt.read::<String, _>(2)?,
                outcome: stmt.read::<String, _>(3)?,
                detail: stmt.read::<Option<String>, _>(4)?,
                attempted_at,
            });
        }
        Ok(attempts)
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

#[async_trait]
impl PreferenceStore for Database {
    async fn load(&self, user_id: &str) -> Result<Option<ReminderPreferences>> {
        self.preferences(user_id).await
    }

    async fn save(&self, user_id: &str, prefs: &ReminderPreferences) -> Result<()> {
        self.save_preferences(user_id, prefs).await
    }
}

#[async_trait]
impl SentLog for Database {
    async fn entries(&self, user_id: &str) -> Result<Vec<SentRecord>> {
        self.sent_entries(user_id).await
    }

    async fn append(&self, user_id: &str, record: &SentRecord) -> Result<()> {
        self.record_sent(user_id, record).await
    }

    async fn purge_before(&self, cutoff: NaiveDate) -> Result<usize> {
        self.purge_sent_before(cutoff).await
    }
}

/// One tracked list served out of the database.
pub struct DatabaseSource {
    database: Database,
    kind: SourceKind,
}

impl DatabaseSource {
    pub fn new(database: Database, kind: SourceKind) -> Self {
        DatabaseSource { database, kind }
    }
}

#[async_trait]
impl ItemSource for DatabaseSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn users(&self) -> Result<Vec<String>> {
        self.database.users_with_items(self.kind).await
    }

    async fn items(&self, user_id: &str) -> Result<Vec<TrackedItem>> {
        self.database.tracked_items(user_id, self.kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new(":memory:").await.unwrap()
    }

    fn item(id: &str, title: &str, deadline: Option<&str>, source: SourceKind) -> TrackedItem {
        TrackedItem {
            id: id.to_string(),
            title: title.to_string(),
            deadline: deadline.map(|d| d.parse().unwrap()),
            source,
            external_ref: None,
        }
    }

    #[tokio::test]
    async fn test_tracked_items_round_trip_in_order() {
        let db = test_db().await;
        db.add_tracked_item("alice", &item("s1", "First", Some("2025-03-01"), SourceKind::Saved))
            .await
            .unwrap();
        db.add_tracked_item("alice", &item("s2", "Second", None, SourceKind::Saved))
            .await
            .unwrap();
        db.add_tracked_item("alice", &item("a1", "Applied", Some("2025-04-01"), SourceKind::Applied))
            .await
            .unwrap();

        let saved = db.tracked_items("alice", SourceKind::Saved).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].id, "s1");
        assert_eq!(saved[0].deadline, Some("2025-03-01".parse().unwrap()));
        assert_eq!(saved[1].deadline, None);

        let applied = db.tracked_items("alice", SourceKind::Applied).await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].source, SourceKind::Applied);
    }

    #[tokio::test]
    async fn test_readding_an_item_moves_it_between_sources() {
        let db = test_db().await;
        db.add_tracked_item("alice", &item("x1", "Grant", Some("2025-03-01"), SourceKind::Saved))
            .await
            .unwrap();
        db.add_tracked_item("alice", &item("x1", "Grant", Some("2025-03-01"), SourceKind::Applied))
            .await
            .unwrap();

        assert!(db.tracked_items("alice", SourceKind::Saved).await.unwrap().is_empty());
        assert_eq!(
            db.tracked_items("alice", SourceKind::Applied).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_remove_tracked_item() {
        let db = test_db().await;
        db.add_tracked_item("alice", &item("s1", "Gone Soon", None, SourceKind::Saved))
            .await
            .unwrap();
        db.remove_tracked_item("alice", "s1").await.unwrap();
        assert!(db.tracked_items("alice", SourceKind::Saved).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_users_with_items_is_per_source() {
        let db = test_db().await;
        db.add_tracked_item("alice", &item("s1", "A", None, SourceKind::Saved))
            .await
            .unwrap();
        db.add_tracked_item("bob", &item("a1", "B", None, SourceKind::Applied))
            .await
            .unwrap();

        assert_eq!(db.users_with_items(SourceKind::Saved).await.unwrap(), ["alice"]);
        assert_eq!(db.users_with_items(SourceKind::Applied).await.unwrap(), ["bob"]);
    }

    #[tokio::test]
    async fn test_preferences_default_to_none_then_round_trip() {
        let db = test_db().await;
        assert!(db.preferences("alice").await.unwrap().is_none());

        let mut prefs = ReminderPreferences::default();
        prefs.email_enabled = false;
        prefs.set_lead_time(LeadTime::ThreeDays, false);
        db.save_preferences("alice", &prefs).await.unwrap();

        let loaded = db.preferences("alice").await.unwrap().unwrap();
        assert_eq!(loaded, prefs);

        prefs.email_enabled = true;
        db.save_preferences("alice", &prefs).await.unwrap();
        assert_eq!(db.preferences("alice").await.unwrap().unwrap(), prefs);
    }

    #[tokio::test]
    async fn test_record_sent_is_idempotent() {
        let db = test_db().await;
        let record = SentRecord {
            item_id: "s1".to_string(),
            lead_time: LeadTime::ThreeDays,
            deadline: "2025-06-30".parse().unwrap(),
            sent_at: Utc::now(),
        };

        db.record_sent("alice", &record).await.unwrap();
        db.record_sent("alice", &record).await.unwrap();

        let entries = db.sent_entries("alice").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item_id, "s1");
        assert_eq!(entries[0].lead_time, LeadTime::ThreeDays);
        assert_eq!(entries[0].deadline, "2025-06-30".parse().unwrap());
    }

    #[tokio::test]
    async fn test_same_item_new_deadline_gets_its_own_row() {
        let db = test_db().await;
        let first = SentRecord {
            item_id: "s1".to_string(),
            lead_time: LeadTime::Week,
            deadline: "2025-06-30".parse().unwrap(),
            sent_at: Utc::now(),
        };
        let mut moved = first.clone();
        moved.deadline = "2025-07-15".parse().unwrap();

        db.record_sent("alice", &first).await.unwrap();
        db.record_sent("alice", &moved).await.unwrap();

        assert_eq!(db.sent_entries("alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_purge_sent_before_reports_removals() {
        let db = test_db().await;
        for (id, deadline) in [("old1", "2025-01-05"), ("old2", "2025-02-01"), ("new", "2025-06-30")] {
            let record = SentRecord {
                item_id: id.to_string(),
                lead_time: LeadTime::DayBefore,
                deadline: deadline.parse().unwrap(),
                sent_at: Utc::now(),
            };
            db.record_sent("alice", &record).await.unwrap();
        }

        let removed = db.purge_sent_before("2025-03-01".parse().unwrap()).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(db.sent_entries("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_history_newest_first() {
        let db = test_db().await;
        db.log_delivery_attempt("alice", "s1", LeadTime::Week, "log", "sent", None)
            .await
            .unwrap();
        db.log_delivery_attempt("alice", "s2", LeadTime::DayBefore, "webhook", "failed", Some("502"))
            .await
            .unwrap();

        let history = db.delivery_history("alice", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].item_id, "s2");
        assert_eq!(history[0].outcome, "failed");
        assert_eq!(history[0].detail.as_deref(), Some("502"));
        assert_eq!(history[1].channel, "log");

        let capped = db.delivery_history("alice", 1).await.unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn test_database_source_serves_its_kind() {
        let db = test_db().await;
        db.add_tracked_item("alice", &item("s1", "Saved Item", None, SourceKind::Saved))
            .await
            .unwrap();

        let source = DatabaseSource::new(db.clone(), SourceKind::Saved);
        assert_eq!(source.kind(), SourceKind::Saved);
        assert_eq!(source.users().await.unwrap(), ["alice"]);
        assert_eq!(source.items("alice").await.unwrap().len(), 1);
        assert!(source.items("bob").await.unwrap().is_empty());
    }
}
