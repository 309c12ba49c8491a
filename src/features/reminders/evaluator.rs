//! The evaluation pipeline.
//!
//! One pass over one user: snapshot the sources, compute alerts, decide
//! what is due, deliver, record. Failures stay small: a failed delivery
//! never takes down the rest of the user's batch, and a failed user never
//! takes down the cycle. Nothing is marked sent until the channel said Ok,
//! so a crash anywhere in the pass re-runs cleanly.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use tokio::time::timeout;
use uuid::Uuid;

use super::engine::{due_reminders, effective_sent_set};
use super::prefs::LeadTime;
use crate::features::alerts::{compute_upcoming_alerts, DeadlineAlert, TrackedItem};
use crate::features::delivery::{DeliveryChannel, DeliveryTracker, ReminderMessage, TemplateConfig};
use crate::stores::{ItemSource, PreferenceStore, SentLog, SentRecord};

/// Counters from one user's evaluation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserReport {
    pub alerts: usize,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Due reminders withheld because the user turned delivery off
    pub suppressed: usize,
}

/// Counters from one full cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub users: usize,
    pub users_skipped: usize,
    pub alerts: usize,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    pub suppressed: usize,
}

impl CycleReport {
    fn absorb(&mut self, user: &UserReport) {
        self.alerts += user.alerts;
        self.due += user.due;
        self.sent += user.sent;
        self.failed += user.failed;
        self.suppressed += user.suppressed;
    }
}

/// Runs the reminder pipeline over the collaborator seams.
pub struct Evaluator {
    sources: Vec<Arc<dyn ItemSource>>,
    preferences: Arc<dyn PreferenceStore>,
    sent_log: Arc<dyn SentLog>,
    channel: Arc<dyn DeliveryChannel>,
    tracker: Option<DeliveryTracker>,
    templates: TemplateConfig,
    alert_limit: usize,
    delivery_timeout: Duration,
}

impl Evaluator {
    /// Sources are given in priority order; when two sources track the
    /// same item, the earlier one wins the merge.
    pub fn new(
        sources: Vec<Arc<dyn ItemSource>>,
        preferences: Arc<dyn PreferenceStore>,
        sent_log: Arc<dyn SentLog>,
        channel: Arc<dyn DeliveryChannel>,
    ) -> Self {
        Evaluator {
            sources,
            preferences,
            sent_log,
            channel,
            tracker: None,
            templates: TemplateConfig::default(),
            alert_limit: 25,
            delivery_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_templates(mut self, templates: TemplateConfig) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_tracker(mut self, tracker: DeliveryTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_alert_limit(mut self, limit: usize) -> Self {
        self.alert_limit = limit;
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// The sent log this evaluator records into
    pub fn sent_log(&self) -> &dyn SentLog {
        self.sent_log.as_ref()
    }

    /// The user's current upcoming alerts, for settings and preview
    /// surfaces.
    pub async fn upcoming_alerts(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<DeadlineAlert>> {
        let snapshots = self.snapshot_sources(user_id).await?;
        let views: Vec<&[TrackedItem]> = snapshots.iter().map(|s| s.as_slice()).collect();
        Ok(compute_upcoming_alerts(&views, today, self.alert_limit))
    }

    /// Evaluate one user against `today`.
    ///
    /// A store error aborts the whole user with nothing partially
    /// recorded; delivery errors are contained to their item.
    pub async fn evaluate_user(&self, user_id: &str, today: NaiveDate) -> Result<UserReport> {
        let prefs = self
            .preferences
            .load(user_id)
            .await
            .context("loading preferences")?
            .unwrap_or_default();

        let snapshots = self.snapshot_sources(user_id).await?;
        let views: Vec<&[TrackedItem]> = snapshots.iter().map(|s| s.as_slice()).collect();
        let alerts = compute_upcoming_alerts(&views, today, self.alert_limit);

        let records = self.sent_log.entries(user_id).await.context("reading sent log")?;
        let already_sent = effective_sent_set(&records, &alerts);

        let mut report = UserReport {
            alerts: alerts.len(),
            ..Default::default()
        };

        for alert in &alerts {
            let due = due_reminders(alert, &prefs, &already_sent);
            report.due += due.len();

            for lead in due {
                if !prefs.email_enabled {
                    debug!(
                        "Holding {} reminder for {} (item {}): delivery disabled",
                        lead.as_str(),
                        user_id,
                        alert.item.id
                    );
                    report.suppressed += 1;
                    continue;
                }

                match self.deliver_one(user_id, alert, lead).await {
                    Ok(()) => {
                        report.sent += 1;
                        if let Some(tracker) = &self.tracker {
                            tracker.log_sent(user_id, &alert.item.id, lead, self.channel.name());
                        }
                    }
                    Err(e) => {
                        report.failed += 1;
                        if let Some(tracker) = &self.tracker {
                            tracker.log_failed(
                                user_id,
                                &alert.item.id,
                                lead,
                                self.channel.name(),
                                &format!("{e:#}"),
                            );
                        }
                        warn!(
                            "Delivery failed for item {} at {} (user {user_id}): {e:#}",
                            alert.item.id,
                            lead.as_str()
                        );
                    }
                }
            }
        }

        Ok(report)
    }

    /// Evaluate every user with tracked items. Per-user failures are
    /// logged and skipped; the cycle itself always completes.
    pub async fn run_cycle(&self, today: NaiveDate) -> CycleReport {
        let run_id = Uuid::new_v4();
        let mut report = CycleReport::default();

        let mut seen = HashSet::new();
        let mut users: Vec<String> = Vec::new();
        for source in &self.sources {
            match source.users().await {
                Ok(list) => {
                    for user in list {
                        if seen.insert(user.clone()) {
                            users.push(user);
                        }
                    }
                }
                Err(e) => warn!(
                    "Could not list users from the {} source: {e}",
                    source.kind().as_str()
                ),
            }
        }
        users.sort();

        debug!("Cycle {run_id}: evaluating {} user(s) for {today}", users.len());

        for user_id in &users {
            match self.evaluate_user(user_id, today).await {
                Ok(user_report) => {
                    report.users += 1;
                    report.absorb(&user_report);
                }
                Err(e) => {
                    report.users_skipped += 1;
                    warn!("Skipping user {user_id} this cycle: {e:#}");
                }
            }
        }

        info!(
            "Cycle {run_id} done: {} users ({} skipped), {} alerts, {} due, {} sent, {} failed, {} held",
            report.users,
            report.users_skipped,
            report.alerts,
            report.due,
            report.sent,
            report.failed,
            report.suppressed
        );

        report
    }

    async fn snapshot_sources(&self, user_id: &str) -> Result<Vec<Vec<TrackedItem>>> {
        let mut snapshots = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let items = source
                .items(user_id)
                .await
                .with_context(|| format!("fetching {} items", source.kind().as_str()))?;
            snapshots.push(items);
        }
        Ok(snapshots)
    }

    async fn deliver_one(&self, user_id: &str, alert: &DeadlineAlert, lead: LeadTime) -> Result<()> {
        let rendered = self.templates.render(alert, lead);
        let message = ReminderMessage {
            user_id: user_id.to_string(),
            item_id: alert.item.id.clone(),
            title: alert.item.title.clone(),
            lead_time: lead,
            tier: alert.tier,
            subject: rendered.subject,
            body: rendered.body,
        };

        match timeout(self.delivery_timeout, self.channel.deliver(&message)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(anyhow!(
                    "delivery timed out after {:?}",
                    self.delivery_timeout
                ))
            }
        }

        let record = SentRecord {
            item_id: alert.item.id.clone(),
            lead_time: lead,
            deadline: alert.deadline,
            sent_at: Utc::now(),
        };
        self.sent_log
            .append(user_id, &record)
            .await
            .context("recording sent reminder")?;

        Ok(())
    }
}
