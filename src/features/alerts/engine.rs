//! The upcoming-deadline pipeline.
//!
//! Pure functions over item snapshots: merge the tracked lists, drop what
//! has no usable deadline, collapse duplicates, sort by proximity, cap the
//! result. No clock access and no I/O here; the caller supplies `today`
//! and the engine stays trivially replayable.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::model::{DeadlineAlert, TrackedItem};

/// Identity of an item for cross-source merging.
///
/// The provider reference wins when present; two sources tracking the same
/// scholarship are expected to carry the same ref even when their display
/// titles drift. Title matching is the fallback for items that never got a
/// ref, compared case-insensitively with whitespace runs collapsed.
pub fn dedup_key(item: &TrackedItem) -> String {
    if let Some(ext) = item.external_ref.as_deref().map(str::trim) {
        if !ext.is_empty() {
            return format!("ref:{ext}");
        }
    }
    let title = item.title.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("title:{}", title.to_lowercase())
}

/// Merge source snapshots into the ordered alert list.
///
/// Sources are scanned in the order given, which is their priority order:
/// the first occurrence of a dedup key keeps its item and later ones are
/// dropped. Items without a deadline, or whose deadline is already past,
/// never produce an alert. A deadline landing today does; `days_until` is
/// 0 for it. The result is sorted by deadline ascending, with ties left in
/// scan order, and truncated to `limit`.
pub fn compute_upcoming_alerts(
    sources: &[&[TrackedItem]],
    today: NaiveDate,
    limit: usize,
) -> Vec<DeadlineAlert> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut alerts: Vec<DeadlineAlert> = Vec::new();

    for source in sources {
        for item in *source {
            let Some(deadline) = item.deadline else {
                continue;
            };
            let days_until = deadline.signed_duration_since(today).num_days();
            if days_until < 0 {
                continue;
            }
            if !seen.insert(dedup_key(item)) {
                continue;
            }
            alerts.push(DeadlineAlert::new(item.clone(), deadline, days_until));
        }
    }

    alerts.sort_by_key(|alert| alert.deadline);
    alerts.truncate(limit);
    alerts
}
