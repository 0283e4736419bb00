//! Draft records — fully structured, unsaved task/event candidates pending
//! submission to the external stores.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::extract::Repeat;

// ─── Reminders ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

/// One reminder attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes_before: u32,
}

impl Reminder {
    pub fn email(minutes_before: u32) -> Self {
        Self { method: ReminderMethod::Email, minutes_before }
    }

    pub fn popup(minutes_before: u32) -> Self {
        Self { method: ReminderMethod::Popup, minutes_before }
    }

    /// The default trio: a day ahead and an hour ahead by email, ten minutes
    /// ahead by popup.
    pub fn default_set() -> Vec<Reminder> {
        vec![Reminder::email(1440), Reminder::email(60), Reminder::popup(10)]
    }
}

// ─── Task draft ──────────────────────────────────────────────────────────────

/// An unsaved task. `title` is never empty and `due` is always a concrete
/// date by the time a draft exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub due: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
}

// ─── Event draft ─────────────────────────────────────────────────────────────

/// An unsaved calendar event.
///
/// `attendees` is deduplicated. `end_time` earlier than `start_time` means
/// the event crosses midnight; the calendar adapter pushes the end to the
/// next day when building timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub due: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Repeat>,
    pub reminders: Vec<Reminder>,
}

impl EventDraft {
    /// Whether the event should carry a virtual-meeting request: no location,
    /// or a location that names a conferencing surface.
    pub fn is_virtual(&self) -> bool {
        let loc = self.location.trim().to_lowercase();
        loc.is_empty() || matches!(loc.as_str(), "google meet" | "meet" | "virtual" | "online")
    }
}
