//! Interval-driven scheduling of evaluation cycles.
//!
//! Cheap, frequent, idempotent: the loop just re-runs the evaluator
//! against the current calendar day and lets the sent log make repeats
//! harmless. Restarts, overlapping deployments, and missed ticks all come
//! out in the wash for the same reason.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveDate, Utc};
use log::{info, warn};
use rand::Rng;
use tokio::time::{interval, sleep};

use super::evaluator::{CycleReport, Evaluator};

/// Cycles between sent-log retention sweeps
const PURGE_EVERY: u32 = 24;

/// Drives the evaluator on a fixed interval.
pub struct ReminderScheduler {
    evaluator: Evaluator,
    eval_interval: Duration,
    startup_jitter: Duration,
    utc_offset_minutes: i32,
    sent_retention_days: i64,
}

impl ReminderScheduler {
    pub fn new(evaluator: Evaluator, eval_interval: Duration) -> Self {
        ReminderScheduler {
            evaluator,
            eval_interval,
            startup_jitter: Duration::ZERO,
            utc_offset_minutes: 0,
            sent_retention_days: 60,
        }
    }

    /// Random delay cap before the first cycle, to spread replicas out
    pub fn with_startup_jitter(mut self, jitter: Duration) -> Self {
        self.startup_jitter = jitter;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn with_sent_retention_days(mut self, days: i64) -> Self {
        self.sent_retention_days = days;
        self
    }

    /// One evaluation pass against the current calendar day.
    pub async fn run_once(&self) -> CycleReport {
        self.evaluator.run_cycle(self.today()).await
    }

    /// Run forever. The first cycle starts immediately (after any jitter),
    /// then one cycle per interval.
    pub async fn run(self) {
        if !self.startup_jitter.is_zero() {
            let cap = self.startup_jitter.as_millis() as u64;
            let delay = Duration::from_millis(rand::rng().random_range(0..=cap));
            info!("Waiting {delay:?} of startup jitter before the first cycle");
            sleep(delay).await;
        }

        info!(
            "Reminder scheduler started (every {:?}, day offset {} minutes)",
            self.eval_interval, self.utc_offset_minutes
        );

        let mut ticker = interval(self.eval_interval);
        let mut cycles: u32 = 0;

        loop {
            ticker.tick().await;
            cycles = cycles.wrapping_add(1);

            self.run_once().await;

            if cycles % PURGE_EVERY == 0 {
                self.purge_stale().await;
            }
        }
    }

    fn today(&self) -> NaiveDate {
        today_for(Utc::now(), self.utc_offset_minutes)
    }

    async fn purge_stale(&self) {
        let cutoff = self.today() - ChronoDuration::days(self.sent_retention_days);
        match self.evaluator.sent_log().purge_before(cutoff).await {
            Ok(0) => {}
            Ok(removed) => info!("Purged {removed} sent-log rows with deadlines before {cutoff}"),
            Err(e) => warn!("Sent-log purge failed: {e}"),
        }
    }
}

/// Calendar day at `now` shifted by the configured offset. The offset is a
/// deployment-wide compromise, not a per-user timezone.
fn today_for(now: DateTime<Utc>, offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(offset_minutes * 60) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::alerts::{SourceKind, TrackedItem};
    use crate::features::delivery::LogChannel;
    use crate::features::reminders::LeadTime;
    use crate::stores::{ItemSource, MemoryPreferences, MemorySentLog, SentLog, SentRecord, StaticSource};
    use std::sync::Arc;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_today_follows_the_offset() {
        let now = utc("2025-06-24T23:30:00Z");
        assert_eq!(today_for(now, 0), "2025-06-24".parse().unwrap());
        // Tokyo is already on the next day
        assert_eq!(today_for(now, 540), "2025-06-25".parse().unwrap());
        // Honolulu is still mid-afternoon
        assert_eq!(today_for(now, -600), "2025-06-24".parse().unwrap());
    }

    #[test]
    fn test_today_at_exact_midnight() {
        let now = utc("2025-06-25T00:00:00Z");
        assert_eq!(today_for(now, 0), "2025-06-25".parse().unwrap());
        assert_eq!(today_for(now, -1), "2025-06-24".parse().unwrap());
    }

    #[tokio::test]
    async fn test_run_once_reports_current_alerts() {
        let saved = Arc::new(StaticSource::new(SourceKind::Saved));
        let deadline = Utc::now().date_naive() + ChronoDuration::days(10);
        saved.put(
            "alice",
            vec![TrackedItem {
                id: "s1".to_string(),
                title: "Merit Grant".to_string(),
                deadline: Some(deadline),
                source: SourceKind::Saved,
                external_ref: None,
            }],
        );

        let evaluator = Evaluator::new(
            vec![saved as Arc<dyn ItemSource>],
            Arc::new(MemoryPreferences::new()),
            Arc::new(MemorySentLog::new()),
            Arc::new(LogChannel),
        );
        let scheduler = ReminderScheduler::new(evaluator, Duration::from_secs(3600));

        let report = scheduler.run_once().await;
        assert_eq!(report.users, 1);
        assert_eq!(report.alerts, 1);
        // Ten days out is not a reminder window
        assert_eq!(report.due, 0);
    }

    #[tokio::test]
    async fn test_purge_respects_retention() {
        let sent_log = Arc::new(MemorySentLog::new());
        let today = Utc::now().date_naive();
        for (id, age_days) in [("ancient", 90), ("recent", 10)] {
            let record = SentRecord {
                item_id: id.to_string(),
                lead_time: LeadTime::Week,
                deadline: today - ChronoDuration::days(age_days),
                sent_at: Utc::now(),
            };
            sent_log.append("alice", &record).await.unwrap();
        }

        let evaluator = Evaluator::new(
            vec![],
            Arc::new(MemoryPreferences::new()),
            sent_log.clone(),
            Arc::new(LogChannel),
        );
        let scheduler = ReminderScheduler::new(evaluator, Duration::from_secs(3600))
            .with_sent_retention_days(60);

        scheduler.purge_stale().await;

        let remaining = sent_log.entries("alice").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].item_id, "recent");
    }
}
