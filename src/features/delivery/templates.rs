//! # Reminder Template Schema
//!
//! YAML-based reminder templates with full schema validation. One template
//! per lead time; lead times without a custom template fall back to the
//! built-ins, so a file overriding only the day-before wording is valid.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.4.0
//!
//! Supported placeholders: `{title}`, `{days}`, `{deadline}`, `{tier}`,
//! `{lead}`.
//!
//! ```yaml
//! templates:
//!   - lead_time_days: 1
//!     subject: "Tomorrow: {title}"
//!     body: "{title} closes {deadline}. Submit today if you can."
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::content::{truncate_body, truncate_subject, SUBJECT_LIMIT};
use crate::features::alerts::DeadlineAlert;
use crate::features::reminders::LeadTime;

/// Placeholders the renderer understands
const KNOWN_PLACEHOLDERS: [&str; 5] = ["title", "days", "deadline", "tier", "lead"];

/// A single reminder template
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReminderTemplate {
    /// Which lead time this template is for (7, 3, or 1)
    pub lead_time_days: i64,

    /// Subject line with placeholders
    pub subject: String,

    /// Body text with placeholders
    pub body: String,
}

/// Root configuration containing all templates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplateConfig {
    pub templates: Vec<ReminderTemplate>,
}

/// Rendered subject and body for one reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReminder {
    pub subject: String,
    pub body: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        TemplateConfig {
            templates: LeadTime::ALL.into_iter().map(builtin_template).collect(),
        }
    }
}

impl TemplateConfig {
    /// Load template configuration from a YAML file
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TemplateConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all templates in the configuration
    pub fn validate(&self) -> Result<()> {
        let placeholder = regex::Regex::new(r"\{([a-z_]+)\}")
            .map_err(|e| anyhow::anyhow!("Placeholder pattern failed to compile: {e}"))?;

        for template in &self.templates {
            if LeadTime::from_days(template.lead_time_days).is_none() {
                return Err(anyhow::anyhow!(
                    "Unknown lead time in template: {} days (expected 7, 3, or 1)",
                    template.lead_time_days
                ));
            }

            if template.subject.trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "Template for {} days has an empty subject",
                    template.lead_time_days
                ));
            }

            if template.subject.len() > SUBJECT_LIMIT {
                return Err(anyhow::anyhow!(
                    "Template subject too long (max {SUBJECT_LIMIT} chars) for {} days",
                    template.lead_time_days
                ));
            }

            for text in [&template.subject, &template.body] {
                for capture in placeholder.captures_iter(text) {
                    let name = &capture[1];
                    if !KNOWN_PLACEHOLDERS.contains(&name) {
                        return Err(anyhow::anyhow!(
                            "Unknown placeholder '{{{name}}}' in template for {} days",
                            template.lead_time_days
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Template for a lead time, falling back to the built-in wording
    pub fn resolve(&self, lead: LeadTime) -> ReminderTemplate {
        self.templates
            .iter()
            .find(|template| template.lead_time_days == lead.days())
            .cloned()
            .unwrap_or_else(|| builtin_template(lead))
    }

    /// Render the template for `lead` against one alert, enforcing the
    /// content limits.
    pub fn render(&self, alert: &DeadlineAlert, lead: LeadTime) -> RenderedReminder {
        let template = self.resolve(lead);
        RenderedReminder {
            subject: truncate_subject(&fill(&template.subject, alert, lead)),
            body: truncate_body(&fill(&template.body, alert, lead)),
        }
    }
}

fn fill(text: &str, alert: &DeadlineAlert, lead: LeadTime) -> String {
    text.replace("{title}", &alert.item.title)
        .replace("{days}", &alert.days_until.to_string())
        .replace("{deadline}", &alert.deadline.format("%Y-%m-%d").to_string())
        .replace("{tier}", alert.tier.label())
        .replace("{lead}", lead.label())
}

fn builtin_template(lead: LeadTime) -> ReminderTemplate {
    let (subject, body) = match lead {
        LeadTime::Week => (
            "One week left: {title}",
            "The deadline for {title} is {deadline}, {days} days from now. \
             A week is enough time to finish and review your application.",
        ),
        LeadTime::ThreeDays => (
            "Only {days} days left: {title}",
            "{title} closes on {deadline}. Three days out is the time to wrap \
             up essays and chase any missing references.",
        ),
        LeadTime::DayBefore => (
            "Last day tomorrow: {title}",
            "{title} is due {deadline}. Tomorrow is the final day to submit.",
        ),
    };
    ReminderTemplate {
        lead_time_days: lead.days(),
        subject: subject.to_string(),
        body: body.to_string(),
    }
}
