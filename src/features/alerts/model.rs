//! Tracked items and the alert types derived from them.
//!
//! Everything here is a value type. Sources hand the engine immutable
//! snapshots of `TrackedItem`s; the engine derives `DeadlineAlert`s from
//! them fresh on every evaluation and never persists the result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which tracked list an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Items the user has started or submitted an application for
    Applied,
    /// Items the user bookmarked for later
    Saved,
}

impl SourceKind {
    /// Storage form, also used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Applied => "applied",
            SourceKind::Saved => "saved",
        }
    }

    /// Reverse of `as_str` for rows read back from storage
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(SourceKind::Applied),
            "saved" => Some(SourceKind::Saved),
            _ => None,
        }
    }
}

/// One deadline-bearing item as reported by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    /// Stable per-user identifier, shared across sources when both track
    /// the same item
    pub id: String,
    pub title: String,
    /// Date-only deadline; `None` when the source had no usable date
    pub deadline: Option<NaiveDate>,
    pub source: SourceKind,
    /// Provider-issued identifier, preferred over the title when merging
    /// duplicates across sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
}

/// How hard an upcoming deadline should be signaled.
///
/// Ordering follows urgency: `Critical` sorts before `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    /// 0 to 3 days out
    Critical,
    /// 4 to 7 days out
    Warning,
    /// 8 to 14 days out
    Notice,
    /// Anything further
    Low,
}

impl UrgencyTier {
    /// Tier for a non-negative day count. Boundaries are inclusive, so
    /// exactly 3 days out is still `Critical` and exactly 7 is `Warning`.
    pub fn from_days_until(days_until: i64) -> Self {
        if days_until <= 3 {
            UrgencyTier::Critical
        } else if days_until <= 7 {
            UrgencyTier::Warning
        } else if days_until <= 14 {
            UrgencyTier::Notice
        } else {
            UrgencyTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Critical => "critical",
            UrgencyTier::Warning => "warning",
            UrgencyTier::Notice => "notice",
            UrgencyTier::Low => "low",
        }
    }

    /// Human wording used in reminder content
    pub fn label(&self) -> &'static str {
        match self {
            UrgencyTier::Critical => "Closing now",
            UrgencyTier::Warning => "Closing soon",
            UrgencyTier::Notice => "Coming up",
            UrgencyTier::Low => "On the radar",
        }
    }

    /// Accent color for rendered surfaces
    pub fn color(&self) -> u32 {
        match self {
            UrgencyTier::Critical => 0xE74C3C, // Alarm red
            UrgencyTier::Warning => 0xF39C12,  // Amber
            UrgencyTier::Notice => 0x4A90D9,   // Calm blue
            UrgencyTier::Low => 0x95A5A6,      // Muted gray
        }
    }
}

/// A tracked item paired with how soon its deadline lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineAlert {
    pub item: TrackedItem,
    /// The deadline the alert was computed from
    pub deadline: NaiveDate,
    /// Whole days between the evaluation day and the deadline; 0 means due
    /// today
    pub days_until: i64,
    pub tier: UrgencyTier,
}

impl DeadlineAlert {
    pub(crate) fn new(item: TrackedItem, deadline: NaiveDate, days_until: i64) -> Self {
        DeadlineAlert {
            item,
            deadline,
            days_until,
            tier: UrgencyTier::from_days_until(days_until),
        }
    }
}
