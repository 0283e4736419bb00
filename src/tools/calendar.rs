//! Calendar adapter.
//!
//! Creates events (with conferencing, reminders, and recurrence) and lists
//! them over retrieval windows. Timestamps are computed in the configured
//! fixed timezone and sent as naive date-times plus a timezone name, which is
//! how the calendar service expects localized events.

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::draft::{EventDraft, Reminder, ReminderMethod};
use crate::extract::Repeat;
use crate::intent::RetrievalWindow;
use crate::provider::Config;

use super::errors::ToolError;
use super::types::ToolResult;
use super::{expect_success, localize, service_http};

const SERVICE: &str = "calendar";

/// Default cap on listed events.
const DEFAULT_MAX_RESULTS: u32 = 10;

pub struct CalendarClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    timezone: Tz,
}

#[derive(Debug, Deserialize)]
struct PrimaryCalendar {
    /// The calendar id of the primary calendar is the owner's address.
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "htmlLink", default)]
    html_link: String,
    #[serde(rename = "hangoutLink", default)]
    hangout_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteEvents {
    #[serde(default)]
    items: Vec<RemoteEvent>,
}

#[derive(Debug, Deserialize)]
struct RemoteEvent {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    start: Option<EventEdge>,
    #[serde(default)]
    end: Option<EventEdge>,
    #[serde(rename = "htmlLink", default)]
    html_link: Option<String>,
    #[serde(rename = "hangoutLink", default)]
    hangout_link: Option<String>,
    #[serde(default)]
    attendees: Vec<RemoteAttendee>,
}

#[derive(Debug, Deserialize)]
struct EventEdge {
    #[serde(rename = "dateTime", default)]
    date_time: Option<String>,
    /// Present instead of `dateTime` for all-day events.
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteAttendee {
    #[serde(default)]
    email: Option<String>,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
    #[serde(rename = "responseStatus", default)]
    response_status: Option<String>,
}

impl CalendarClient {
    pub fn new(config: &Config, access_token: impl Into<String>) -> Self {
        Self {
            http: service_http(),
            base_url: config.calendar_base_url.clone(),
            access_token: access_token.into(),
            timezone: config.timezone,
        }
    }

    /// Create an event from a draft. The echoed `event` field in a successful
    /// payload matches the submitted draft exactly.
    pub async fn create(&self, draft: &EventDraft) -> ToolResult {
        match self.try_create(draft).await {
            Ok(payload) => ToolResult::ok(payload),
            Err(e) => e.into(),
        }
    }

    /// List events in the window, capped at `max_results` (default 10).
    pub async fn list(
        &self,
        window: RetrievalWindow,
        today: NaiveDate,
        max_results: Option<u32>,
    ) -> ToolResult {
        match self.try_list(window, today, max_results).await {
            Ok(payload) => ToolResult::ok(payload),
            Err(e) => e.into(),
        }
    }

    // ─── Internals ──────────────────────────────────────────────────────

    /// The organizer address, from the primary calendar's id. Best-effort:
    /// event creation proceeds without it.
    async fn organizer_email(&self) -> Option<String> {
        let url = format!("{}/calendars/primary", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let calendar: PrimaryCalendar = response.json().await.ok()?;
        Some(calendar.id)
    }

    async fn try_create(&self, draft: &EventDraft) -> Result<serde_json::Value, ToolError> {
        let end_date = end_date(draft);
        let reminders = if draft.reminders.is_empty() {
            Reminder::default_set()
        } else {
            draft.reminders.clone()
        };

        let mut body = json!({
            "summary": draft.summary,
            "description": draft.description,
            "location": draft.location,
            "start": {
                "dateTime": naive_stamp(draft.due, draft.start_time),
                "timeZone": self.timezone.name(),
            },
            "end": {
                "dateTime": naive_stamp(end_date, draft.end_time),
                "timeZone": self.timezone.name(),
            },
            "reminders": {
                "useDefault": false,
                "overrides": reminders.iter().map(|r| {
                    json!({
                        "method": match r.method {
                            ReminderMethod::Email => "email",
                            ReminderMethod::Popup => "popup",
                        },
                        "minutes": r.minutes_before,
                    })
                }).collect::<Vec<_>>(),
            },
        });

        if !draft.attendees.is_empty() {
            body["attendees"] = draft
                .attendees
                .iter()
                .map(|email| json!({ "email": email }))
                .collect();
        }
        if let Some(repeat) = &draft.recurrence {
            body["recurrence"] = json!([recurrence_rule(repeat)]);
        }
        if let Some(organizer) = self.organizer_email().await {
            body["organizer"] = json!({ "email": organizer, "self": true });
        }

        let mut url = format!("{}/calendars/primary/events", self.base_url);
        if draft.is_virtual() {
            body["conferenceData"] = json!({
                "createRequest": {
                    "requestId": Uuid::new_v4().to_string(),
                    "conferenceSolutionKey": { "type": "hangoutsMeet" },
                },
            });
            url.push_str("?conferenceDataVersion=1");
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&url, e))?;
        let response = expect_success(SERVICE, response).await?;
        let created: CreatedEvent =
            response.json().await.map_err(|e| ToolError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        tracing::info!(event_id = %created.id, summary = %draft.summary, "event created");
        Ok(json!({
            "message": format!("Event '{}' created successfully", draft.summary),
            "event": serde_json::to_value(draft).unwrap_or_default(),
            "id": created.id,
            "calendar_link": created.html_link,
            "meet_link": created.hangout_link,
        }))
    }

    async fn try_list(
        &self,
        window: RetrievalWindow,
        today: NaiveDate,
        max_results: Option<u32>,
    ) -> Result<serde_json::Value, ToolError> {
        let (time_min, time_max) = window_bounds(&window, today, self.timezone);
        let url = format!("{}/calendars/primary/events", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("maxResults", max_results.unwrap_or(DEFAULT_MAX_RESULTS).to_string()),
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&url, e))?;
        let response = expect_success(SERVICE, response).await?;
        let remote: RemoteEvents =
            response.json().await.map_err(|e| ToolError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        let events: Vec<serde_json::Value> = remote
            .items
            .into_iter()
            .map(|event| {
                let is_all_day = event
                    .start
                    .as_ref()
                    .is_some_and(|s| s.date.is_some());
                json!({
                    "title": event.summary.unwrap_or_else(|| "Untitled Event".to_string()),
                    "description": event.description.unwrap_or_default(),
                    "location": event.location.unwrap_or_default(),
                    "is_all_day": is_all_day,
                    "start": edge_stamp(event.start),
                    "end": edge_stamp(event.end),
                    "link": event.html_link.unwrap_or_default(),
                    "meet_link": event.hangout_link.unwrap_or_default(),
                    "attendees": event.attendees.iter().map(|a| {
                        json!({
                            "email": a.email.clone().unwrap_or_default(),
                            "name": a.display_name.clone().unwrap_or_default(),
                            "status": a.response_status.clone().unwrap_or_default(),
                        })
                    }).collect::<Vec<_>>(),
                })
            })
            .collect();

        Ok(json!({ "events": events }))
    }
}

// ─── Free functions ──────────────────────────────────────────────────────────

/// The calendar date the event ends on. An end time at or before the start
/// crosses midnight, so it lands on the next day.
fn end_date(draft: &EventDraft) -> NaiveDate {
    if draft.end_time <= draft.start_time {
        draft.due + Duration::days(1)
    } else {
        draft.due
    }
}

/// `RRULE` text for a recurrence request. `count` and `until` are mutually
/// exclusive in the rule grammar; `count` wins when a draft carries both.
fn recurrence_rule(repeat: &Repeat) -> String {
    let mut rule = format!("RRULE:FREQ={}", repeat.frequency.as_rule());
    if let Some(interval) = repeat.interval {
        rule.push_str(&format!(";INTERVAL={interval}"));
    }
    if !repeat.byday.is_empty() {
        rule.push_str(&format!(";BYDAY={}", repeat.byday.join(",")));
    }
    if let Some(count) = repeat.count {
        rule.push_str(&format!(";COUNT={count}"));
    } else if let Some(until) = repeat.until {
        rule.push_str(&format!(";UNTIL={}T235959Z", until.format("%Y%m%d")));
    }
    rule
}

fn naive_stamp(date: NaiveDate, time: chrono::NaiveTime) -> String {
    format!("{}T{}", date.format("%Y-%m-%d"), time.format("%H:%M:%S"))
}

fn edge_stamp(edge: Option<EventEdge>) -> String {
    match edge {
        Some(EventEdge { date_time: Some(dt), .. }) => dt,
        Some(EventEdge { date: Some(d), .. }) => d,
        _ => String::new(),
    }
}

/// RFC3339 bounds for the retrieval window: today / tomorrow are whole days,
/// upcoming (and the unbounded default) is the next 30 days.
fn window_bounds(window: &RetrievalWindow, today: NaiveDate, tz: Tz) -> (String, String) {
    let day_bounds = |date: NaiveDate| {
        let start = localize(tz, date, chrono::NaiveTime::MIN);
        let end = localize(
            tz,
            date,
            chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(chrono::NaiveTime::MIN),
        );
        (start, end)
    };

    if window.today_only {
        day_bounds(today)
    } else if window.tomorrow_only {
        day_bounds(today + Duration::days(1))
    } else {
        let start = localize(tz, today, chrono::NaiveTime::MIN);
        let end = localize(tz, today + Duration::days(30), chrono::NaiveTime::MIN);
        (start, end)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Frequency;

    #[test]
    fn test_recurrence_rule_count() {
        let rule = recurrence_rule(&Repeat {
            count: Some(4),
            ..Repeat::new(Frequency::Weekly)
        });
        assert_eq!(rule, "RRULE:FREQ=WEEKLY;COUNT=4");
    }

    #[test]
    fn test_recurrence_rule_until() {
        let rule = recurrence_rule(&Repeat {
            until: NaiveDate::from_ymd_opt(2026, 12, 31),
            ..Repeat::new(Frequency::Daily)
        });
        assert_eq!(rule, "RRULE:FREQ=DAILY;UNTIL=20261231T235959Z");
    }

    #[test]
    fn test_recurrence_count_wins_over_until() {
        let rule = recurrence_rule(&Repeat {
            count: Some(2),
            until: NaiveDate::from_ymd_opt(2026, 12, 31),
            ..Repeat::new(Frequency::Monthly)
        });
        assert!(rule.contains("COUNT=2"));
        assert!(!rule.contains("UNTIL"));
    }

    #[test]
    fn test_recurrence_interval_and_byday() {
        let rule = recurrence_rule(&Repeat {
            interval: Some(2),
            byday: vec!["MO".to_string(), "WE".to_string()],
            ..Repeat::new(Frequency::Weekly)
        });
        assert_eq!(rule, "RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE");
    }

    #[test]
    fn test_end_pushed_to_next_day_when_crossing_midnight() {
        let mut draft = EventDraft {
            summary: "Late call".into(),
            description: String::new(),
            location: String::new(),
            due: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
            start_time: chrono::NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            end_time: chrono::NaiveTime::from_hms_opt(1, 0, 0).unwrap(),
            attendees: vec![],
            recurrence: None,
            reminders: vec![],
        };
        assert_eq!(end_date(&draft), NaiveDate::from_ymd_opt(2026, 8, 6).unwrap());

        draft.end_time = chrono::NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert_eq!(end_date(&draft), draft.due);
    }

    #[test]
    fn test_naive_stamp() {
        let stamp = naive_stamp(
            NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            chrono::NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        );
        assert_eq!(stamp, "2026-08-06T14:00:00");
    }

    #[test]
    fn test_window_bounds_tomorrow() {
        let window = RetrievalWindow { tomorrow_only: true, ..Default::default() };
        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let (min, max) = window_bounds(&window, today, chrono_tz::Asia::Kolkata);
        assert!(min.starts_with("2026-08-06T00:00:00"));
        assert!(max.starts_with("2026-08-06T23:59:59"));
    }
}
