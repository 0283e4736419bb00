//! Task store adapter.
//!
//! Resolves (or lazily creates) the default task list, then creates or lists
//! tasks against it. Every public method returns a [`ToolResult`]; remote
//! failures are captured, never raised.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;

use crate::draft::TaskDraft;
use crate::intent::RetrievalWindow;
use crate::provider::Config;

use super::errors::ToolError;
use super::types::ToolResult;
use super::{expect_success, localize, service_http, CANONICAL_DUE_TIME};

/// Title of the list created when the account has none.
const DEFAULT_LIST_TITLE: &str = "Assistant Tasks";

const SERVICE: &str = "tasks";

pub struct TaskStoreClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    timezone: Tz,
}

#[derive(Debug, Deserialize)]
struct TaskLists {
    #[serde(default)]
    items: Vec<TaskListEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskListEntry {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct RemoteTasks {
    #[serde(default)]
    items: Vec<RemoteTask>,
}

#[derive(Debug, Deserialize)]
struct RemoteTask {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    due: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedTask {
    id: String,
}

impl TaskStoreClient {
    pub fn new(config: &Config, access_token: impl Into<String>) -> Self {
        Self {
            http: service_http(),
            base_url: config.tasks_base_url.clone(),
            access_token: access_token.into(),
            timezone: config.timezone,
        }
    }

    /// Create a task from a draft. The echoed `task` field in a successful
    /// payload matches the submitted draft exactly.
    pub async fn create(&self, draft: &TaskDraft) -> ToolResult {
        match self.try_create(draft).await {
            Ok(payload) => ToolResult::ok(payload),
            Err(e) => e.into(),
        }
    }

    /// List tasks from the default list, filtered by the retrieval window.
    pub async fn list(&self, window: RetrievalWindow, today: NaiveDate) -> ToolResult {
        match self.try_list(window, today).await {
            Ok(payload) => ToolResult::ok(payload),
            Err(e) => e.into(),
        }
    }

    // ─── Internals ──────────────────────────────────────────────────────

    /// First existing list wins; an account with none gets a fresh one.
    async fn default_list(&self) -> Result<TaskListEntry, ToolError> {
        let url = format!("{}/users/@me/lists", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&url, e))?;
        let response = expect_success(SERVICE, response).await?;
        let lists: TaskLists = response.json().await.map_err(|e| ToolError::InvalidResponse {
            service: SERVICE,
            reason: e.to_string(),
        })?;

        if let Some(first) = lists.items.into_iter().next() {
            return Ok(first);
        }

        tracing::info!(title = DEFAULT_LIST_TITLE, "no task lists found, creating default");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "title": DEFAULT_LIST_TITLE }))
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&url, e))?;
        let response = expect_success(SERVICE, response).await?;
        response.json().await.map_err(|e| ToolError::InvalidResponse {
            service: SERVICE,
            reason: e.to_string(),
        })
    }

    async fn try_create(&self, draft: &TaskDraft) -> Result<serde_json::Value, ToolError> {
        let list = self.default_list().await?;

        // Canonical 10:00 local unless the draft carries an explicit time.
        let due = localize(
            self.timezone,
            draft.due,
            draft.time.unwrap_or(CANONICAL_DUE_TIME),
        );

        let url = format!("{}/lists/{}/tasks", self.base_url, list.id);
        let body = json!({
            "title": draft.title,
            "notes": draft.notes,
            "due": due,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&url, e))?;
        let response = expect_success(SERVICE, response).await?;
        let created: CreatedTask =
            response.json().await.map_err(|e| ToolError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        tracing::info!(task_id = %created.id, title = %draft.title, "task created");
        Ok(json!({
            "message": format!("Task '{}' created successfully", draft.title),
            "task": serde_json::to_value(draft).unwrap_or_default(),
            "id": created.id,
        }))
    }

    async fn try_list(
        &self,
        window: RetrievalWindow,
        today: NaiveDate,
    ) -> Result<serde_json::Value, ToolError> {
        let list = self.default_list().await?;
        let url = format!("{}/lists/{}/tasks", self.base_url, list.id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&url, e))?;
        let response = expect_success(SERVICE, response).await?;
        let remote: RemoteTasks =
            response.json().await.map_err(|e| ToolError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        let tasks: Vec<serde_json::Value> = remote
            .items
            .into_iter()
            .filter(|t| window_matches(&window, t.due.as_deref(), today))
            .map(|t| {
                json!({
                    "title": t.title,
                    "status": t.status.unwrap_or_else(|| "needsAction".to_string()),
                    "due": t.due,
                    "notes": t.notes,
                })
            })
            .collect();

        Ok(json!({
            "task_list": list.title,
            "tasks": tasks,
        }))
    }
}

/// Apply the retrieval window to a task's due timestamp (date-prefix match).
fn window_matches(window: &RetrievalWindow, due: Option<&str>, today: NaiveDate) -> bool {
    if window.today_only {
        return due_on(due, today);
    }
    if window.tomorrow_only {
        return due_on(due, today + chrono::Duration::days(1));
    }
    if window.upcoming_only {
        return match due.and_then(parse_due_date) {
            Some(date) => date >= today,
            None => false,
        };
    }
    true
}

fn due_on(due: Option<&str>, date: NaiveDate) -> bool {
    due.is_some_and(|d| d.starts_with(&date.format("%Y-%m-%d").to_string()))
}

fn parse_due_date(due: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(due.get(..10)?, "%Y-%m-%d").ok()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
