//! Clock adapter — current time for the assistant's locale.
//!
//! Asks the remote time service first and falls back to the local clock
//! converted into the configured timezone, so a dead time endpoint never
//! blocks a request.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::provider::Config;

use super::service_http;

pub struct ClockClient {
    http: reqwest::Client,
    url: String,
    timezone: Tz,
}

#[derive(Debug, Deserialize)]
struct RemoteTime {
    #[serde(rename = "dateTime")]
    date_time: String,
}

impl ClockClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: service_http(),
            url: config.time_api_url.clone(),
            timezone: config.timezone,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current wall-clock time in the assistant's timezone.
    pub async fn now(&self) -> DateTime<Tz> {
        match self.remote_now().await {
            Some(now) => now,
            None => {
                tracing::debug!("time service unavailable, using local clock");
                Utc::now().with_timezone(&self.timezone)
            }
        }
    }

    /// Current calendar date in the assistant's timezone.
    pub async fn today(&self) -> NaiveDate {
        self.now().await.date_naive()
    }

    async fn remote_now(&self) -> Option<DateTime<Tz>> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("timeZone", self.timezone.name())])
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let remote: RemoteTime = response.json().await.ok()?;
        let naive =
            NaiveDateTime::parse_from_str(remote.date_time.trim(), "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        self.timezone.from_local_datetime(&naive).earliest()
    }
}

/// Timezone for a named city, defaulting to the Indian locale the assistant
/// ships with.
pub fn timezone_for_city(city: &str) -> Tz {
    match city.trim().to_lowercase().as_str() {
        "delhi" | "kolkata" | "mumbai" => chrono_tz::Asia::Kolkata,
        "new york" => chrono_tz::America::New_York,
        "los angeles" => chrono_tz::America::Los_Angeles,
        "london" => chrono_tz::Europe::London,
        "paris" => chrono_tz::Europe::Paris,
        "tokyo" => chrono_tz::Asia::Tokyo,
        _ => chrono_tz::Asia::Kolkata,
    }
}
