//! Free-text field extraction.
//!
//! One ordered, tested pipeline per field type: calendar dates, clock-time
//! ranges, and the smaller fields (titles, emails, notes, recurrence) the
//! deterministic draft fallback needs. Everything here is pure — no clock
//! reads, no network. Callers pass "today" in explicitly.

pub mod date;
pub mod fields;
pub mod time;

pub use date::resolve_date;
pub use fields::{clean_title, emails, event_title, notes, repeat, task_title, Frequency, Repeat};
pub use time::{time_range, TimeRange};
