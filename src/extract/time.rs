//! Clock-time extraction from free text.
//!
//! Recognizes `5pm to 6pm` ranges, 24-hour `17:00 to 18:00` ranges, and a
//! single time with an implied one-hour duration. Each time token resolves
//! its own AM/PM marker — the marker nearest the token, never a marker
//! borrowed from the other end of the range.

use chrono::{Duration, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// An extracted start/end pair in wall-clock terms.
///
/// `end` may be earlier than `start` when the range crosses midnight; the
/// calendar adapter pushes such an end to the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

static AMPM_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s*(?:to|-|until)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b")
        .unwrap()
});

static H24_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\s*(?:to|-|until)\s*(\d{1,2}):(\d{2})\b").unwrap());

static AMPM_SINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").unwrap());

static H24_SINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bat\s+(\d{1,2}):(\d{2})\b").unwrap());

/// Extract a time range from `text`, or `None` when no time is mentioned.
pub fn time_range(text: &str) -> Option<TimeRange> {
    let lower = text.to_lowercase();

    if let Some(caps) = AMPM_RANGE_RE.captures(&lower) {
        let start = twelve_hour(&caps[1], caps.get(2).map(|m| m.as_str()), &caps[3]);
        let end = twelve_hour(&caps[4], caps.get(5).map(|m| m.as_str()), &caps[6]);
        if let (Some(start), Some(end)) = (start, end) {
            return Some(TimeRange { start, end });
        }
    }

    if let Some(caps) = H24_RANGE_RE.captures(&lower) {
        let start = twenty_four_hour(&caps[1], &caps[2]);
        let end = twenty_four_hour(&caps[3], &caps[4]);
        if let (Some(start), Some(end)) = (start, end) {
            return Some(TimeRange { start, end });
        }
    }

    if let Some(caps) = AMPM_SINGLE_RE.captures(&lower) {
        if let Some(start) = twelve_hour(&caps[1], caps.get(2).map(|m| m.as_str()), &caps[3]) {
            return Some(one_hour_from(start));
        }
    }

    if let Some(caps) = H24_SINGLE_RE.captures(&lower) {
        if let Some(start) = twenty_four_hour(&caps[1], &caps[2]) {
            return Some(one_hour_from(start));
        }
    }

    None
}

fn one_hour_from(start: NaiveTime) -> TimeRange {
    TimeRange {
        start,
        end: start + Duration::hours(1),
    }
}

/// Resolve one `h[:mm]` token with its own AM/PM marker.
///
/// `12am` is midnight, `12pm` is noon; an hour above 12 is rejected rather
/// than guessed at.
fn twelve_hour(hour: &str, minute: Option<&str>, marker: &str) -> Option<NaiveTime> {
    let hour: u32 = hour.parse().ok()?;
    if hour == 0 || hour > 12 {
        return None;
    }
    let minute: u32 = minute.unwrap_or("0").parse().ok()?;
    let hour = match (marker, hour) {
        ("am", 12) => 0,
        ("am", h) => h,
        ("pm", 12) => 12,
        (_, h) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn twenty_four_hour(hour: &str, minute: &str) -> Option<NaiveTime> {
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_ampm_range() {
        let range = time_range("schedule meeting tomorrow 2pm to 3pm").unwrap();
        assert_eq!(range.start, t(14, 0));
        assert_eq!(range.end, t(15, 0));
    }

    #[test]
    fn test_ampm_resolved_per_token() {
        // The start marker is am, the end marker is pm; neither side may
        // inherit the other's marker.
        let range = time_range("meet from 9:30am to 1pm").unwrap();
        assert_eq!(range.start, t(9, 30));
        assert_eq!(range.end, t(13, 0));
    }

    #[test]
    fn test_mixed_markers_crossing_noon_backwards() {
        let range = time_range("block 11am to 12pm").unwrap();
        assert_eq!(range.start, t(11, 0));
        assert_eq!(range.end, t(12, 0));
    }

    #[test]
    fn test_twenty_four_hour_range() {
        let range = time_range("standup 17:00 to 18:15").unwrap();
        assert_eq!(range.start, t(17, 0));
        assert_eq!(range.end, t(18, 15));
    }

    #[test]
    fn test_single_time_gets_one_hour() {
        let range = time_range("remind me to buy milk tomorrow at 6pm").unwrap();
        assert_eq!(range.start, t(18, 0));
        assert_eq!(range.end, t(19, 0));
    }

    #[test]
    fn test_single_time_late_evening_wraps() {
        let range = time_range("call at 11:30pm").unwrap();
        assert_eq!(range.start, t(23, 30));
        assert_eq!(range.end, t(0, 30));
    }

    #[test]
    fn test_single_24h_time() {
        let range = time_range("lunch at 13:00").unwrap();
        assert_eq!(range.start, t(13, 0));
        assert_eq!(range.end, t(14, 0));
    }

    #[test]
    fn test_midnight_and_noon() {
        assert_eq!(time_range("at 12am").unwrap().start, t(0, 0));
        assert_eq!(time_range("at 12pm").unwrap().start, t(12, 0));
    }

    #[test]
    fn test_no_time_mentioned() {
        assert!(time_range("buy milk tomorrow").is_none());
    }

    #[test]
    fn test_range_wins_over_single() {
        // "5pm" alone must not shadow the full range.
        let range = time_range("free 5pm to 7pm today").unwrap();
        assert_eq!(range.end, t(19, 0));
    }

    #[test]
    fn test_invalid_hour_rejected() {
        assert!(time_range("at 19pm").is_none());
    }
}
