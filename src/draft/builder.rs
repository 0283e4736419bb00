//! Draft builder — turns an utterance into a structured task or event draft.
//!
//! Primary path: ask the model to elaborate the utterance into a constrained
//! JSON object and decode it loosely. Whatever happens — provider failure,
//! unparseable output, missing required field — the deterministic fallback
//! built on the extraction pipeline always produces a draft. Nothing here
//! performs network mutation; drafts are handed to the tool adapters.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use thiserror::Error;

use crate::extract::{self, Frequency, Repeat};
use crate::provider::types::ChatMessage;
use crate::provider::{ProviderClient, ProviderError};

use super::json_scan::decode_loose;
use super::types::{EventDraft, Reminder, ReminderMethod, TaskDraft};

// ─── Elaboration prompts (opaque configuration) ──────────────────────────────

const TASK_ANALYSIS_PROMPT: &str = "\
You are a task analysis assistant. Analyze this task request and respond with \
a single JSON object, no other text:\n\
{\"title\": \"short action-oriented title\", \"time\": \"HH:MM or omit\", \
\"notes\": [\"up to three short helpful points\"], \
\"repeat\": {\"frequency\": \"daily|weekly|monthly|yearly\", \"count\": 3}}\n\
Omit any field you cannot fill. Do not generate the date — it is resolved \
separately.\n\nUser request: {content}";

const EVENT_ANALYSIS_PROMPT: &str = "\
You are an event scheduling assistant. Analyze this event request and respond \
with a single JSON object, no other text:\n\
{\"summary\": \"short event title\", \"description\": \"one to three line \
overview followed by 2-3 agenda bullets\", \"location\": \"Google Meet or a \
physical place\", \"start_time\": \"HH:MM\", \"end_time\": \"HH:MM\", \
\"attendees\": [{\"email\": \"person@example.com\"}], \
\"reminders\": [{\"method\": \"email|popup\", \"minutes\": 60}], \
\"repeat\": {\"frequency\": \"weekly\", \"count\": 4}}\n\
Keep every email address mentioned in the request. Omit any field you cannot \
fill. Do not generate the date — it is resolved separately.\n\n\
User request: {content}";

/// Canonical time-of-day for drafts that carry no explicit time.
const DEFAULT_TIME: NaiveTime = match NaiveTime::from_hms_opt(10, 0, 0) {
    Some(t) => t,
    None => panic!("10:00 is a valid time"),
};

// ─── Internal error (absorbed by the fallback, never crosses the module) ─────

#[derive(Debug, Error)]
enum DraftError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("unparseable analysis: {snippet}")]
    Unparseable { snippet: String },
}

// ─── Analysis shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct TaskAnalysis {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    notes: Option<NotesField>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    repeat: Option<RepeatAnalysis>,
}

/// Models return notes as either one string or a list of bullet strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NotesField {
    One(String),
    Many(Vec<String>),
}

impl NotesField {
    fn join(self) -> String {
        match self {
            NotesField::One(s) => s,
            NotesField::Many(lines) => lines.join("\n"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RepeatAnalysis {
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default)]
    count: Option<serde_json::Value>,
    #[serde(default)]
    until: Option<String>,
    #[serde(default)]
    interval: Option<u32>,
    #[serde(default)]
    byday: Vec<String>,
}

const WEEKDAY_CODES: &[&str] = &["MO", "TU", "WE", "TH", "FR", "SA", "SU"];

impl RepeatAnalysis {
    /// Coerce into a validated [`Repeat`]. An unknown frequency drops the
    /// whole recurrence; a non-numeric or non-positive count drops the count;
    /// unknown weekday codes are filtered out.
    fn into_repeat(self) -> Option<Repeat> {
        let frequency = match self.frequency?.trim().to_lowercase().as_str() {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "monthly" => Frequency::Monthly,
            "yearly" | "annually" => Frequency::Yearly,
            _ => return None,
        };
        let count = self.count.as_ref().and_then(coerce_count);
        let until = self
            .until
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        let byday = self
            .byday
            .into_iter()
            .map(|d| d.trim().to_uppercase())
            .filter(|d| WEEKDAY_CODES.contains(&d.as_str()))
            .collect();
        Some(Repeat {
            frequency,
            count,
            until,
            interval: self.interval.filter(|n| *n > 1),
            byday,
        })
    }
}

/// Accept a count as a JSON number or a numeric string; reject zero.
fn coerce_count(value: &serde_json::Value) -> Option<u32> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

#[derive(Debug, Default, Deserialize)]
struct EventAnalysis {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    attendees: Option<Vec<AttendeeField>>,
    #[serde(default)]
    reminders: Option<Vec<ReminderAnalysis>>,
    #[serde(default)]
    repeat: Option<RepeatAnalysis>,
}

/// Attendees arrive as bare strings or `{"email": …}` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AttendeeField {
    Email(String),
    Object { email: String },
}

impl AttendeeField {
    fn email(self) -> String {
        match self {
            AttendeeField::Email(e) | AttendeeField::Object { email: e } => e,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReminderAnalysis {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    minutes: Option<u32>,
}

impl ReminderAnalysis {
    fn into_reminder(self) -> Option<Reminder> {
        let method = match self.method?.trim().to_lowercase().as_str() {
            "email" => ReminderMethod::Email,
            "popup" | "notification" => ReminderMethod::Popup,
            _ => return None,
        };
        Some(Reminder { method, minutes_before: self.minutes? })
    }
}

// ─── DraftBuilder ────────────────────────────────────────────────────────────

/// Builds task/event drafts for one request. `today` comes from the clock
/// service so extraction is deterministic for the whole request.
pub struct DraftBuilder<'a> {
    provider: &'a ProviderClient,
    today: NaiveDate,
}

impl<'a> DraftBuilder<'a> {
    pub fn new(provider: &'a ProviderClient, today: NaiveDate) -> Self {
        Self { provider, today }
    }

    // ─── Tasks ──────────────────────────────────────────────────────────

    /// Build a task draft. Never fails: the deterministic path is the
    /// terminal case of the pipeline.
    pub async fn task(&self, utterance: &str) -> TaskDraft {
        match self.analyze::<TaskAnalysis>(TASK_ANALYSIS_PROMPT, utterance).await {
            Ok(analysis) if has_text(&analysis.title) => {
                self.task_with_analysis(utterance, analysis)
            }
            Ok(_) => {
                tracing::warn!("task analysis missing a title, using deterministic draft");
                self.task_fallback(utterance)
            }
            Err(e) => {
                tracing::warn!(error = %e, "task analysis unavailable, using deterministic draft");
                self.task_fallback(utterance)
            }
        }
    }

    fn task_with_analysis(&self, utterance: &str, analysis: TaskAnalysis) -> TaskDraft {
        let time = extract::time_range(utterance)
            .map(|r| r.start)
            .or_else(|| analysis.time.as_deref().and_then(parse_clock));
        let repeat = extract::repeat(utterance)
            .or_else(|| analysis.repeat.and_then(RepeatAnalysis::into_repeat));
        let notes = analysis
            .notes
            .map(NotesField::join)
            .or(analysis.description)
            .unwrap_or_else(|| synth_task_notes(utterance, time, repeat.as_ref()));

        TaskDraft {
            title: analysis.title.unwrap_or_default().trim().to_string(),
            due: extract::resolve_date(utterance, self.today),
            time,
            notes,
            repeat,
        }
    }

    /// The deterministic path: extraction only, always succeeds.
    fn task_fallback(&self, utterance: &str) -> TaskDraft {
        let time = extract::time_range(utterance).map(|r| r.start);
        let repeat = extract::repeat(utterance);
        TaskDraft {
            title: extract::task_title(utterance).unwrap_or_else(|| "new task".to_string()),
            due: extract::resolve_date(utterance, self.today),
            time,
            notes: synth_task_notes(utterance, time, repeat.as_ref()),
            repeat,
        }
    }

    // ─── Events ─────────────────────────────────────────────────────────

    /// Build an event draft. Never fails.
    pub async fn event(&self, utterance: &str) -> EventDraft {
        match self.analyze::<EventAnalysis>(EVENT_ANALYSIS_PROMPT, utterance).await {
            Ok(analysis) if has_text(&analysis.summary) => {
                self.event_with_analysis(utterance, analysis)
            }
            Ok(_) => {
                tracing::warn!("event analysis missing a summary, using deterministic draft");
                self.event_fallback(utterance)
            }
            Err(e) => {
                tracing::warn!(error = %e, "event analysis unavailable, using deterministic draft");
                self.event_fallback(utterance)
            }
        }
    }

    fn event_with_analysis(&self, utterance: &str, analysis: EventAnalysis) -> EventDraft {
        let (start_time, end_time) = self.event_times(
            utterance,
            analysis.start_time.as_deref().and_then(parse_clock),
            analysis.end_time.as_deref().and_then(parse_clock),
        );

        let mut attendees: Vec<String> = Vec::new();
        let analyzed = analysis
            .attendees
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.email().trim().to_lowercase());
        for email in analyzed.chain(extract::emails(utterance)) {
            if !email.is_empty() && !attendees.contains(&email) {
                attendees.push(email);
            }
        }

        let reminders: Vec<Reminder> = analysis
            .reminders
            .unwrap_or_default()
            .into_iter()
            .filter_map(ReminderAnalysis::into_reminder)
            .collect();

        EventDraft {
            summary: analysis.summary.unwrap_or_default().trim().to_string(),
            description: analysis
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(default_event_description),
            location: analysis
                .location
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| "Google Meet".to_string()),
            due: extract::resolve_date(utterance, self.today),
            start_time,
            end_time,
            attendees,
            recurrence: extract::repeat(utterance)
                .or_else(|| analysis.repeat.and_then(RepeatAnalysis::into_repeat)),
            reminders: if reminders.is_empty() {
                Reminder::default_set()
            } else {
                reminders
            },
        }
    }

    fn event_fallback(&self, utterance: &str) -> EventDraft {
        let (start_time, end_time) = self.event_times(utterance, None, None);
        EventDraft {
            summary: extract::event_title(utterance)
                .map(|t| title_case(&t))
                .unwrap_or_else(|| fallback_summary(utterance)),
            description: default_event_description(),
            location: "Google Meet".to_string(),
            due: extract::resolve_date(utterance, self.today),
            start_time,
            end_time,
            attendees: extract::emails(utterance),
            recurrence: extract::repeat(utterance),
            reminders: Reminder::default_set(),
        }
    }

    /// Extracted times win over model times; the 10:00–11:00 block is the
    /// default when neither source has an answer. An end equal to its start
    /// is stretched to an hour.
    fn event_times(
        &self,
        utterance: &str,
        analysis_start: Option<NaiveTime>,
        analysis_end: Option<NaiveTime>,
    ) -> (NaiveTime, NaiveTime) {
        let extracted = extract::time_range(utterance);
        let start = extracted
            .map(|r| r.start)
            .or(analysis_start)
            .unwrap_or(DEFAULT_TIME);
        let end = extracted
            .map(|r| r.end)
            .or(analysis_end)
            .unwrap_or_else(|| start + chrono::Duration::hours(1));
        if end == start {
            (start, start + chrono::Duration::hours(1))
        } else {
            (start, end)
        }
    }

    // ─── Elaboration call ───────────────────────────────────────────────

    async fn analyze<T: serde::de::DeserializeOwned>(
        &self,
        template: &str,
        utterance: &str,
    ) -> Result<T, DraftError> {
        let prompt = template.replace("{content}", utterance);
        let text = self.provider.complete(vec![ChatMessage::user(prompt)]).await?;
        decode_loose(&text).ok_or_else(|| DraftError::Unparseable {
            snippet: text.chars().take(120).collect(),
        })
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Three short note lines for a draft built without model help.
fn synth_task_notes(utterance: &str, time: Option<NaiveTime>, repeat: Option<&Repeat>) -> String {
    let mut lines = Vec::new();
    if let Some(repeat) = repeat {
        let mut line = format!("🔄 Repeats {}", repeat.frequency.as_rule().to_lowercase());
        if let Some(count) = repeat.count {
            line.push_str(&format!(", {count} times"));
        }
        lines.push(line);
    }
    let time = time.unwrap_or(DEFAULT_TIME);
    lines.push(format!("⏰ Set for {}", time.format("%H:%M")));
    if let Some(user_notes) = extract::notes(utterance) {
        lines.push(format!("👤 {user_notes}"));
    }
    if lines.len() < 3 {
        lines.push("📌 Remember to stay consistent".to_string());
    }
    if lines.len() < 3 {
        lines.push("💡 Track your progress".to_string());
    }
    lines.truncate(3);
    lines.join("\n")
}

fn default_event_description() -> String {
    "Brief sync to discuss key points and updates.\n\
     🎯 Key points:\n\
     • Updates and progress\n\
     • Discussion items"
        .to_string()
}

/// Summary for an event utterance with no extractable title.
fn fallback_summary(utterance: &str) -> String {
    let lower = utterance.to_lowercase();
    if lower.contains("team") {
        "🤝 Team Sync".to_string()
    } else if lower.contains("review") {
        "📋 Review".to_string()
    } else {
        "📅 New Meeting".to_string()
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::config::{ProviderConfig, ProviderKind};

    fn builder_fixture() -> (ProviderClient, NaiveDate) {
        let client = ProviderClient::connect(
            ProviderKind::Gemini,
            ProviderConfig {
                base_url: "http://localhost:1/v1".to_string(),
                api_key: Some("test".to_string()),
                model_name: "test".to_string(),
                temperature: 0.0,
                max_tokens: 64,
            },
        )
        .expect("offline client");
        (client, NaiveDate::from_ymd_opt(2026, 8, 5).unwrap())
    }

    #[test]
    fn test_task_fallback_scenario() {
        let (client, today) = builder_fixture();
        let builder = DraftBuilder::new(&client, today);
        let draft = builder.task_fallback("remind me to buy milk tomorrow at 6pm");

        assert!(draft.title.contains("buy milk"));
        assert_eq!(draft.due, NaiveDate::from_ymd_opt(2026, 8, 6).unwrap());
        assert_eq!(draft.time, NaiveTime::from_hms_opt(18, 0, 0));
        assert!(!draft.notes.is_empty());
    }

    #[test]
    fn test_task_fallback_never_empty_title() {
        let (client, today) = builder_fixture();
        let builder = DraftBuilder::new(&client, today);
        let draft = builder.task_fallback("tomorrow at 9am");
        assert!(!draft.title.is_empty());
    }

    #[test]
    fn test_event_fallback_scenario() {
        let (client, today) = builder_fixture();
        let builder = DraftBuilder::new(&client, today);
        let draft =
            builder.event_fallback("schedule meeting with john@example.com tomorrow 2pm to 3pm");

        assert_eq!(draft.attendees, vec!["john@example.com".to_string()]);
        assert_eq!(draft.start_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(draft.end_time, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(draft.due, NaiveDate::from_ymd_opt(2026, 8, 6).unwrap());
        assert_eq!(draft.reminders, Reminder::default_set());
        assert_eq!(draft.location, "Google Meet");
    }

    #[test]
    fn test_event_fallback_default_times() {
        let (client, today) = builder_fixture();
        let builder = DraftBuilder::new(&client, today);
        let draft = builder.event_fallback("schedule meeting for the team tomorrow");
        assert_eq!(draft.start_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(draft.end_time, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn test_analysis_merges_and_dedups_attendees() {
        let (client, today) = builder_fixture();
        let builder = DraftBuilder::new(&client, today);
        let analysis = EventAnalysis {
            summary: Some("Kickoff".to_string()),
            attendees: Some(vec![
                AttendeeField::Object { email: "a@x.com".to_string() },
                AttendeeField::Email("b@y.org".to_string()),
            ]),
            ..Default::default()
        };
        let draft = builder.event_with_analysis("invite a@x.com and c@z.io tomorrow 2pm", analysis);
        assert_eq!(
            draft.attendees,
            vec!["a@x.com".to_string(), "b@y.org".to_string(), "c@z.io".to_string()]
        );
    }

    #[test]
    fn test_extracted_time_overrides_analysis() {
        let (client, today) = builder_fixture();
        let builder = DraftBuilder::new(&client, today);
        let analysis = EventAnalysis {
            summary: Some("Sync".to_string()),
            start_time: Some("09:00".to_string()),
            end_time: Some("09:30".to_string()),
            ..Default::default()
        };
        let draft = builder.event_with_analysis("sync 2pm to 3pm today", analysis);
        assert_eq!(draft.start_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(draft.end_time, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
    }

    #[test]
    fn test_repeat_count_coercion() {
        assert_eq!(coerce_count(&serde_json::json!(3)), Some(3));
        assert_eq!(coerce_count(&serde_json::json!("4")), Some(4));
        assert_eq!(coerce_count(&serde_json::json!(0)), None);
        assert_eq!(coerce_count(&serde_json::json!(-2)), None);
        assert_eq!(coerce_count(&serde_json::json!("soon")), None);
        assert_eq!(coerce_count(&serde_json::json!(true)), None);
    }

    #[test]
    fn test_repeat_analysis_unknown_frequency_dropped() {
        let analysis = RepeatAnalysis {
            frequency: Some("fortnightly".to_string()),
            count: Some(serde_json::json!(2)),
            ..Default::default()
        };
        assert!(analysis.into_repeat().is_none());
    }

    #[test]
    fn test_task_with_analysis_tomorrow_due() {
        let (client, today) = builder_fixture();
        let builder = DraftBuilder::new(&client, today);
        let analysis = TaskAnalysis {
            title: Some("💧 Drink water".to_string()),
            ..Default::default()
        };
        let draft = builder.task_with_analysis("drink water tomorrow", analysis);
        assert_eq!(draft.due, NaiveDate::from_ymd_opt(2026, 8, 6).unwrap());
        assert_eq!(draft.title, "💧 Drink water");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("project kickoff"), "Project Kickoff");
    }
}
