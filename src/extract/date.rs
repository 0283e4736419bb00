//! Calendar-date extraction from free text.
//!
//! One ordered pipeline: relative terms first, then numeric patterns, then a
//! `today` default. The output is always a concrete date — nothing relative
//! survives past this module.

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Recurring phrases (`every 3 days`) are masked before the relative scan so
/// the digits and the word `day` inside them are not read as a date.
static RECURRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"every\s+\d+\s*(?:day|week|month)s?").unwrap());

static TOMORROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:tomorrow|tmr)\b").unwrap());
static NEXT_WEEK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnext\s+week\b").unwrap());
static NEXT_MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnext\s+month\b").unwrap());
static TODAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:today|now)\b").unwrap());

/// `DD/MM` with optional `/YYYY`.
static SLASH_DMY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}))?\b").unwrap());

/// `DD-MM` with optional `-YYYY`.
static DASH_DMY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})-(\d{1,2})(?:-(\d{4}))?\b").unwrap());

/// ISO `YYYY-MM-DD`.
static ISO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

/// Resolve the date mentioned in `text` against `today`.
///
/// Resolution order, first match wins:
/// 1. relative terms (`today`/`now`, `tomorrow`/`tmr`, `next week`, `next month`)
/// 2. numeric patterns (`DD/MM[/YYYY]`, `DD-MM[-YYYY]`, `YYYY-MM-DD`)
/// 3. default: `today`
///
/// A numeric pattern that matches but does not parse to a real date
/// (e.g. `31-02`) is skipped and the next pattern is tried.
pub fn resolve_date(text: &str, today: NaiveDate) -> NaiveDate {
    let lower = text.to_lowercase();
    let masked = RECURRING_RE.replace_all(&lower, " ");

    if TOMORROW_RE.is_match(&masked) {
        return today + Duration::days(1);
    }
    if NEXT_WEEK_RE.is_match(&masked) {
        return today + Duration::days(7);
    }
    if NEXT_MONTH_RE.is_match(&masked) {
        return today + Duration::days(30);
    }
    if TODAY_RE.is_match(&masked) {
        return today;
    }

    if let Some(date) = numeric_date(&masked, today) {
        return date;
    }

    today
}

/// Try the numeric patterns in their canonical order.
fn numeric_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = SLASH_DMY_RE.captures(text) {
        if let Some(date) = day_month_year(&caps, today) {
            return Some(date);
        }
    }

    // DD-MM must not fire on the tail of an ISO date (`2026-08-05` contains
    // `08-05`). A candidate preceded by `-` is part of a longer token; skip it.
    for caps in DASH_DMY_RE.captures_iter(text) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        if start > 0 && text.as_bytes()[start - 1] == b'-' {
            continue;
        }
        if let Some(date) = day_month_year(&caps, today) {
            return Some(date);
        }
    }

    if let Some(caps) = ISO_RE.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    None
}

/// Build a date from day/month captures plus an optional year; the current
/// year fills in when the text omits one.
fn day_month_year(caps: &regex::Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = match caps.get(3) {
        Some(y) => y.as_str().parse().ok()?,
        None => today.year(),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
    }

    #[test]
    fn test_tomorrow() {
        assert_eq!(
            resolve_date("remind me to buy milk tomorrow at 6pm", today()),
            NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
        );
    }

    #[test]
    fn test_tmr_shorthand() {
        assert_eq!(
            resolve_date("call mum tmr", today()),
            NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
        );
    }

    #[test]
    fn test_today_and_now() {
        assert_eq!(resolve_date("show my tasks for today", today()), today());
        assert_eq!(resolve_date("do it now", today()), today());
    }

    #[test]
    fn test_now_does_not_match_inside_know() {
        // "know" must not trigger the `now` branch.
        assert_eq!(resolve_date("let me know on 12/09", today()), NaiveDate::from_ymd_opt(2026, 9, 12).unwrap());
    }

    #[test]
    fn test_next_week_and_month() {
        assert_eq!(
            resolve_date("plan a review next week", today()),
            today() + Duration::days(7)
        );
        assert_eq!(
            resolve_date("renew the licence next month", today()),
            today() + Duration::days(30)
        );
    }

    #[test]
    fn test_recurring_phrase_is_masked() {
        // "every 2 days" is a recurrence, not a date.
        assert_eq!(resolve_date("drink water every 2 days", today()), today());
    }

    #[test]
    fn test_slash_date_without_year() {
        assert_eq!(
            resolve_date("pay rent on 01/09", today()),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
        );
    }

    #[test]
    fn test_slash_date_with_year() {
        assert_eq!(
            resolve_date("renew passport 15/03/2027", today()),
            NaiveDate::from_ymd_opt(2027, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_dash_date() {
        assert_eq!(
            resolve_date("dentist on 12-10", today()),
            NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
        );
    }

    #[test]
    fn test_iso_date_not_misread_as_day_month() {
        assert_eq!(
            resolve_date("deadline is 2026-12-31", today()),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_invalid_numeric_date_falls_through() {
        // 31-02 never parses; with no other pattern the default is today.
        assert_eq!(resolve_date("meet on 31-02", today()), today());
    }

    #[test]
    fn test_default_is_today() {
        assert_eq!(resolve_date("buy milk", today()), today());
    }

    #[test]
    fn test_relative_wins_over_numeric() {
        assert_eq!(
            resolve_date("tomorrow, not 12/12", today()),
            today() + Duration::days(1)
        );
    }
}
