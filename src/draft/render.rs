//! Human-readable rendering of drafts for the tool phase transcript.

use super::types::{EventDraft, ReminderMethod, TaskDraft};

/// Markdown summary block for a task draft.
pub fn render_task(draft: &TaskDraft) -> String {
    let mut lines = vec![format!("📝 **Task**: {}", draft.title)];
    lines.push(format!("📅 **Due**: {}", draft.due.format("%Y-%m-%d")));
    if let Some(time) = draft.time {
        lines.push(format!("⏰ **Time**: {}", time.format("%H:%M")));
    }
    if let Some(repeat) = &draft.repeat {
        let mut line = format!("🔄 **Repeats**: {}", repeat.frequency.as_rule().to_lowercase());
        if let Some(count) = repeat.count {
            line.push_str(&format!(", {count} times"));
        }
        lines.push(line);
    }
    if !draft.notes.is_empty() {
        lines.push(format!("📋 **Notes**:\n{}", draft.notes));
    }
    lines.join("\n")
}

/// Markdown summary block for an event draft.
pub fn render_event(draft: &EventDraft) -> String {
    let mut lines = vec![format!("📅 **{}**", draft.summary)];
    lines.push(format!(
        "⏰ **When**: {} from {} to {}",
        draft.due.format("%Y-%m-%d"),
        draft.start_time.format("%H:%M"),
        draft.end_time.format("%H:%M"),
    ));
    if draft.is_virtual() {
        lines.push("📍 **Where**: Virtual Meeting (Google Meet)".to_string());
    } else {
        lines.push(format!("📍 **Where**: {}", draft.location));
    }
    if !draft.attendees.is_empty() {
        lines.push(format!("👥 **Attendees**: {}", draft.attendees.join(", ")));
    }
    if let Some(repeat) = &draft.recurrence {
        let mut line = format!("🔄 **Repeats**: {}", repeat.frequency.as_rule().to_lowercase());
        if let Some(count) = repeat.count {
            line.push_str(&format!(" for {count} times"));
        } else if let Some(until) = repeat.until {
            line.push_str(&format!(" until {}", until.format("%Y-%m-%d")));
        }
        lines.push(line);
    }
    if !draft.reminders.is_empty() {
        let parts: Vec<String> = draft.reminders.iter().map(|r| {
            let method = match r.method {
                ReminderMethod::Email => "email",
                ReminderMethod::Popup => "popup",
            };
            let lead = r.minutes_before;
            if lead >= 1440 {
                format!("{} day(s) before by {method}", lead / 1440)
            } else if lead >= 60 {
                format!("{} hour(s) before by {method}", lead / 60)
            } else {
                format!("{lead} minutes before by {method}")
            }
        }).collect();
        lines.push(format!("⏰ **Reminders**: {}", parts.join(", ")));
    }
    if !draft.description.is_empty() {
        lines.push(format!("📝 **Description**: {}", draft.description));
    }
    lines.join("\n")
}
