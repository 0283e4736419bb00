//! Field extraction used by the deterministic draft fallback: titles, email
//! addresses, free-form notes, and recurrence cues.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ─── Recurrence ──────────────────────────────────────────────────────────────

/// Recurrence frequency, serialized lowercase (`"weekly"`) in drafts and
/// upper-cased (`WEEKLY`) when built into a calendar recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_rule(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

/// A recurrence request extracted from text or model output.
///
/// `count` and `until` are mutually exclusive downstream; when a draft ends
/// up carrying both, `count` wins at invocation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repeat {
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
    /// Gap between occurrences; `None` means every occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// Weekday codes (`MO`…`SU`) for weekly recurrences pinned to days.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub byday: Vec<String>,
}

impl Repeat {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            count: None,
            until: None,
            interval: None,
            byday: Vec::new(),
        }
    }
}

static REPEAT_CUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:every|repeat(?:s|ing)?|recurring)\b").unwrap());

static COUNT_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?:for|count|repeat(?:s|ing)?)\s+(\d+)(?:\s+times)?").unwrap(),
        Regex::new(r"(\d+)\s+times").unwrap(),
        Regex::new(r"(\d+)\s+(?:occurrence|iteration)s?").unwrap(),
    ]
});

/// `every 2 weeks` — an interval plus a frequency unit.
static INTERVAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"every\s+(\d+)\s*(day|week|month|year)s?").unwrap());

/// `every monday` — a weekly recurrence pinned to a day.
static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"every\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)").unwrap()
});

/// Extract a recurrence request, or `None` when the text has no cue word.
///
/// The frequency defaults to daily when a cue is present without a named
/// frequency. A count that is non-numeric or zero is dropped, never
/// propagated.
pub fn repeat(text: &str) -> Option<Repeat> {
    let lower = text.to_lowercase();
    if !REPEAT_CUE_RE.is_match(&lower) {
        return None;
    }

    let mut interval = None;
    let mut byday = Vec::new();

    let frequency = if let Some(caps) = INTERVAL_RE.captures(&lower) {
        interval = caps[1].parse::<u32>().ok().filter(|n| *n > 1);
        match &caps[2] {
            "week" => Frequency::Weekly,
            "month" => Frequency::Monthly,
            "year" => Frequency::Yearly,
            _ => Frequency::Daily,
        }
    } else if let Some(caps) = WEEKDAY_RE.captures(&lower) {
        byday.push(weekday_code(&caps[1]).to_string());
        Frequency::Weekly
    } else if lower.contains("every day") || lower.contains("daily") {
        Frequency::Daily
    } else if lower.contains("every week") || lower.contains("weekly") {
        Frequency::Weekly
    } else if lower.contains("every month") || lower.contains("monthly") {
        Frequency::Monthly
    } else if lower.contains("every year") || lower.contains("yearly") || lower.contains("annual") {
        Frequency::Yearly
    } else {
        Frequency::Daily
    };

    let count = COUNT_RES
        .iter()
        .find_map(|re| re.captures(&lower))
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|n| *n > 0);

    Some(Repeat {
        frequency,
        count,
        until: None,
        interval,
        byday,
    })
}

fn weekday_code(day: &str) -> &'static str {
    match day {
        "monday" => "MO",
        "tuesday" => "TU",
        "wednesday" => "WE",
        "thursday" => "TH",
        "friday" => "FR",
        "saturday" => "SA",
        _ => "SU",
    }
}

// ─── Emails ──────────────────────────────────────────────────────────────────

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap());

/// All email-like strings in `text`, deduplicated, original order preserved.
pub fn emails(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in EMAIL_RE.find_iter(text) {
        let email = m.as_str().to_lowercase();
        if !seen.contains(&email) {
            seen.push(email);
        }
    }
    seen
}

// ─── Titles ──────────────────────────────────────────────────────────────────

/// Marker phrases that introduce a task. The suffix after the first marker
/// found becomes the fallback task title.
const TASK_MARKERS: &[&str] = &[
    "remind me to ",
    "set a reminder to ",
    "set reminder to ",
    "create a task to ",
    "create task to ",
    "set a task to ",
    "set task to ",
    "add a task to ",
    "add task to ",
];

/// Marker phrases that introduce an event.
const EVENT_MARKERS: &[&str] = &[
    "schedule a meeting for ",
    "schedule meeting for ",
    "schedule a meeting with ",
    "schedule meeting with ",
    "create a meeting for ",
    "create meeting for ",
    "set a meeting for ",
    "set meeting for ",
    "schedule an event for ",
    "schedule event for ",
    "create an event for ",
    "create event for ",
    "set event for ",
    "meeting about ",
    "event about ",
];

static TIME_PHRASE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\s*(?:from\s+)?\d{1,2}(?::\d{2})?\s*(?:am|pm)\s*(?:to|-|until)\s*\d{1,2}(?::\d{2})?\s*(?:am|pm)").unwrap(),
        Regex::new(r"(?i)\s*at\s+\d{1,2}(?::\d{2})?\s*(?:am|pm)?").unwrap(),
        Regex::new(r"(?i)\s*\d{1,2}(?::\d{2})?\s*(?:am|pm)").unwrap(),
        Regex::new(r"\s*\d{1,2}:\d{2}").unwrap(),
    ]
});

static DATE_TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:today|tomorrow|tmr|next week|next month|next day)\b").unwrap()
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip trailing time/date phrases and collapse whitespace.
pub fn clean_title(title: &str) -> String {
    let mut cleaned = title.to_string();
    for re in TIME_PHRASE_RES.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    cleaned = DATE_TERM_RE.replace_all(&cleaned, "").into_owned();
    WHITESPACE_RE
        .replace_all(&cleaned, " ")
        .trim()
        .trim_end_matches([',', '.'])
        .to_string()
}

/// Fallback task title: the suffix after the first task marker phrase,
/// cleaned of time and date phrases.
pub fn task_title(text: &str) -> Option<String> {
    title_after_marker(text, TASK_MARKERS)
        .or_else(|| suffix_after(text, "to "))
        .map(|raw| clean_title(&raw))
        .filter(|t| !t.is_empty())
}

/// Fallback event title, same shape as [`task_title`].
pub fn event_title(text: &str) -> Option<String> {
    title_after_marker(text, EVENT_MARKERS)
        .map(|raw| clean_title(&raw))
        .filter(|t| !t.is_empty())
}

fn title_after_marker(text: &str, markers: &[&str]) -> Option<String> {
    let lower = text.to_lowercase();
    markers
        .iter()
        .find_map(|marker| suffix_after(&lower, marker))
}

fn suffix_after(text: &str, marker: &str) -> Option<String> {
    let lower = text.to_lowercase();
    lower
        .find(marker)
        .map(|idx| lower[idx + marker.len()..].trim().to_string())
        .filter(|s| !s.is_empty())
}

// ─── Notes ───────────────────────────────────────────────────────────────────

static NOTES_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)notes:").unwrap());

/// Free-form notes after a `notes:` marker, if any. Matched case-insensitively
/// against the original text so the body keeps its casing.
pub fn notes(text: &str) -> Option<String> {
    let marker = NOTES_MARKER_RE.find(text)?;
    let body = text[marker.end()..].trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
