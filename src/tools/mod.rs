//! Tool invocation adapters — the side-effecting collaborators.
//!
//! Submodules:
//! - `tasks`: task store create/list against the default task list
//! - `calendar`: event create/list with conferencing, reminders, recurrence
//! - `websearch`: ranked-snippet search for prompt augmentation
//! - `clock`: locale-aware current time with a local fallback
//! - `types`: the normalized `ToolResult`
//! - `errors`: the captured error taxonomy
//!
//! Invocation never raises past this layer: every adapter folds its failures
//! into `ToolResult { success: false, error }`.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

pub mod calendar;
pub mod clock;
pub mod errors;
pub mod tasks;
pub mod types;
pub mod websearch;

pub use calendar::CalendarClient;
pub use clock::ClockClient;
pub use errors::ToolError;
pub use tasks::TaskStoreClient;
pub use types::ToolResult;
pub use websearch::WebSearchClient;

/// TCP connection timeout for the external services.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout for the external services.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Canonical time-of-day for due timestamps without an explicit time.
pub(crate) const CANONICAL_DUE_TIME: NaiveTime = match NaiveTime::from_hms_opt(10, 0, 0) {
    Some(t) => t,
    None => panic!("10:00 is a valid time"),
};

/// Shared HTTP client shape for all tool adapters.
pub(crate) fn service_http() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Fail on a non-2xx response, preserving the body for the error text.
pub(crate) async fn expect_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ToolError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ToolError::HttpError {
        service,
        status: status.as_u16(),
        body,
    })
}

/// RFC3339 timestamp for a local date/time in the fixed timezone.
///
/// Times skipped by a DST transition resolve to the UTC reading of the same
/// naive value rather than failing the whole invocation.
pub(crate) fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> String {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive).earliest() {
        Some(stamped) => stamped.to_rfc3339(),
        None => chrono::Utc.from_utc_datetime(&naive).to_rfc3339(),
    }
}
