//! User reminder preferences and the lead-time ladder.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How far before a deadline a reminder can fire.
///
/// Declaration order is longest lead first, so ordered collections iterate
/// 7, 3, 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LeadTime {
    Week,
    ThreeDays,
    DayBefore,
}

impl LeadTime {
    /// Every supported lead time, longest first
    pub const ALL: [LeadTime; 3] = [LeadTime::Week, LeadTime::ThreeDays, LeadTime::DayBefore];

    /// Days before the deadline this lead time fires at
    pub fn days(self) -> i64 {
        match self {
            LeadTime::Week => 7,
            LeadTime::ThreeDays => 3,
            LeadTime::DayBefore => 1,
        }
    }

    /// Reverse of `days`, for values read back from storage
    pub fn from_days(days: i64) -> Option<Self> {
        match days {
            7 => Some(LeadTime::Week),
            3 => Some(LeadTime::ThreeDays),
            1 => Some(LeadTime::DayBefore),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadTime::Week => "week",
            LeadTime::ThreeDays => "three_days",
            LeadTime::DayBefore => "day_before",
        }
    }

    /// Human wording used in reminder content
    pub fn label(self) -> &'static str {
        match self {
            LeadTime::Week => "one week",
            LeadTime::ThreeDays => "three days",
            LeadTime::DayBefore => "one day",
        }
    }
}

/// Per-user reminder settings.
///
/// Passed by value between the settings surface and the engine; a cycle
/// works from the copy it loaded and never observes a mid-cycle edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPreferences {
    /// Master switch for outbound delivery. Turning it off does not change
    /// which reminders are due, only whether they leave the building.
    pub email_enabled: bool,
    /// Enabled lead times, any combination including none
    pub lead_times: BTreeSet<LeadTime>,
}

impl Default for ReminderPreferences {
    /// Users who never touched settings get the full ladder with delivery
    /// on; opting out is an explicit save.
    fn default() -> Self {
        ReminderPreferences {
            email_enabled: true,
            lead_times: LeadTime::ALL.into_iter().collect(),
        }
    }
}

impl ReminderPreferences {
    pub fn wants(&self, lead: LeadTime) -> bool {
        self.lead_times.contains(&lead)
    }

    pub fn set_lead_time(&mut self, lead: LeadTime, enabled: bool) {
        if enabled {
            self.lead_times.insert(lead);
        } else {
            self.lead_times.remove(&lead);
        }
    }
}
