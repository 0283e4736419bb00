//! Session facade — the per-request entry point.
//!
//! Validates the request, routes the utterance, and drives the phase
//! controller. Nothing escapes: every path, including provider and tool
//! failures, terminates in a well-formed stream event sequence.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::draft::{render_event, render_task, DraftBuilder};
use crate::intent::{self, Intent, RetrievalWindow};
use crate::provider::{ProviderClient, ProviderKind, ProviderRegistry};
use crate::stream::{PhaseController, PhaseMode, StreamEvent};
use crate::tools::{CalendarClient, ClockClient, TaskStoreClient, ToolResult, WebSearchClient};

use super::prompts;

// ─── Constants ───────────────────────────────────────────────────────────────

/// How long a web search may run before the caller gets a progress note.
const SEARCH_NOTE_DELAY: Duration = Duration::from_secs(1);

/// Hard budget for the web search augmentation.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

// ─── Request ─────────────────────────────────────────────────────────────────

/// One inbound request. The transport layer owns framing; this is just the
/// payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub websearch: bool,
    #[serde(default)]
    pub reasoning: bool,
    #[serde(default)]
    pub access_token: Option<String>,
}

// ─── ChatSession ─────────────────────────────────────────────────────────────

/// Top-level handler: one instance serves many requests, borrowing shared
/// provider connections from the registry.
pub struct ChatSession {
    registry: Arc<ProviderRegistry>,
    clock: ClockClient,
    search: Option<WebSearchClient>,
}

impl ChatSession {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        let config = registry.config();
        Self {
            clock: ClockClient::from_config(config),
            search: WebSearchClient::from_config(config),
            registry,
        }
    }

    /// Handle one request, emitting the full event sequence on `out`.
    ///
    /// Never returns an error; a dropped receiver cancels relaying but not
    /// resource cleanup.
    pub async fn handle(&self, request: ChatRequest, out: mpsc::Sender<StreamEvent>) {
        let mut controller = PhaseController::new(out);

        if request.content.trim().is_empty() {
            controller
                .fail_validation("The message is empty. Please say what you need.")
                .await;
            return;
        }

        let routing = intent::route(&request.content);
        tracing::info!(
            intent = ?routing.intent,
            websearch = request.websearch,
            reasoning = request.reasoning,
            "request routed"
        );

        if routing.intent.is_side_effecting()
            && request.access_token.as_deref().map_or(true, |t| t.trim().is_empty())
        {
            controller
                .fail_validation(
                    "This request needs an access token for your task and calendar account.",
                )
                .await;
            return;
        }

        let provider = match self
            .registry
            .get(ProviderKind::from_request(&request.model))
        {
            Ok(provider) => provider,
            Err(e) => {
                tracing::error!(error = %e, "provider unavailable before any phase");
                controller.fail_validation(&e.user_message()).await;
                return;
            }
        };

        if routing.intent == Intent::Informational {
            self.informational(&request, &provider, &mut controller).await;
        } else {
            self.tool_flow(&request, routing.intent, routing.window, &provider, &mut controller)
                .await;
        }
        controller.finish();
    }

    // ─── Informational flow ─────────────────────────────────────────────

    async fn informational(
        &self,
        request: &ChatRequest,
        provider: &ProviderClient,
        controller: &mut PhaseController,
    ) {
        let first_mode = if request.reasoning {
            PhaseMode::Reasoning
        } else {
            PhaseMode::Direct
        };

        let web_context = if request.websearch {
            self.websearch_context(&request.content, first_mode, controller).await
        } else {
            String::new()
        };

        if request.reasoning {
            let prompt = prompts::chain_of_thought(&request.content);
            let reasoning = match provider.stream(vec![crate::provider::ChatMessage::user(prompt)]).await {
                Ok(stream) => controller.run_stream_phase(PhaseMode::Reasoning, stream).await,
                Err(e) => {
                    controller
                        .fail_phase(PhaseMode::Reasoning, &e.user_message(), &e.to_string())
                        .await;
                    return;
                }
            };
            if !reasoning.completed {
                return;
            }

            let prompt = prompts::final_answer(&reasoning.text, &web_context);
            match provider.stream(vec![crate::provider::ChatMessage::user(prompt)]).await {
                Ok(stream) => {
                    controller.run_stream_phase(PhaseMode::Answer, stream).await;
                }
                Err(e) => {
                    controller
                        .fail_phase(PhaseMode::Answer, &e.user_message(), &e.to_string())
                        .await;
                }
            }
        } else {
            let prompt = prompts::direct(&request.content, &web_context);
            match provider.stream(vec![crate::provider::ChatMessage::user(prompt)]).await {
                Ok(stream) => {
                    controller.run_stream_phase(PhaseMode::Direct, stream).await;
                }
                Err(e) => {
                    controller
                        .fail_phase(PhaseMode::Direct, &e.user_message(), &e.to_string())
                        .await;
                }
            }
        }
    }

    /// Run the web search augmentation before the first phase. A slow search
    /// surfaces a best-effort progress note; a failed one degrades to an
    /// empty context block.
    async fn websearch_context(
        &self,
        query: &str,
        upcoming_mode: PhaseMode,
        controller: &mut PhaseController,
    ) -> String {
        let Some(search) = &self.search else {
            tracing::debug!("websearch requested but not configured");
            return String::new();
        };

        let fut = search.search(query);
        futures::pin_mut!(fut);

        let result = match tokio::time::timeout(SEARCH_NOTE_DELAY, &mut fut).await {
            Ok(result) => result,
            Err(_) => {
                controller
                    .progress_note(upcoming_mode, "🌐 Searching the web…")
                    .await;
                match tokio::time::timeout(SEARCH_TIMEOUT, fut).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!("web search timed out, continuing without context");
                        return String::new();
                    }
                }
            }
        };

        match result {
            Ok(snippets) => format!("Web search context:\n{snippets}"),
            Err(e) => {
                tracing::warn!(error = %e, "web search failed, continuing without context");
                String::new()
            }
        }
    }

    // ─── Tool flow ──────────────────────────────────────────────────────

    async fn tool_flow(
        &self,
        request: &ChatRequest,
        intent: Intent,
        window: RetrievalWindow,
        provider: &ProviderClient,
        controller: &mut PhaseController,
    ) {
        // Validated non-empty before this point.
        let token = request.access_token.clone().unwrap_or_default();
        let config = self.registry.config();
        let today = self.clock.today().await;
        let builder = DraftBuilder::new(provider, today);

        let mut blocks = Vec::new();
        match intent {
            Intent::CreateTask => {
                let tasks = TaskStoreClient::new(config, token.as_str());
                create_task(&builder, &tasks, &request.content, &mut blocks).await;
            }
            Intent::CreateEvent => {
                let calendar = CalendarClient::new(config, token.as_str());
                create_event(&builder, &calendar, &request.content, &mut blocks).await;
            }
            Intent::CreateBoth => {
                let tasks = TaskStoreClient::new(config, token.as_str());
                let calendar = CalendarClient::new(config, token.as_str());
                create_task(&builder, &tasks, &request.content, &mut blocks).await;
                create_event(&builder, &calendar, &request.content, &mut blocks).await;
            }
            Intent::RetrieveTasks => {
                let tasks = TaskStoreClient::new(config, token.as_str());
                blocks.push(render_task_list(tasks.list(window, today).await));
            }
            Intent::RetrieveEvents => {
                let calendar = CalendarClient::new(config, token.as_str());
                blocks.push(render_event_list(calendar.list(window, today, None).await));
            }
            Intent::RetrieveBoth => {
                let tasks = TaskStoreClient::new(config, token.as_str());
                let calendar = CalendarClient::new(config, token.as_str());
                blocks.push(render_task_list(tasks.list(window, today).await));
                blocks.push(render_event_list(calendar.list(window, today, None).await));
            }
            Intent::Informational => {}
        }

        controller.run_tool_phase(blocks).await;
    }
}

// ─── Tool phase content ──────────────────────────────────────────────────────

async fn create_task(
    builder: &DraftBuilder<'_>,
    tasks: &TaskStoreClient,
    utterance: &str,
    blocks: &mut Vec<String>,
) {
    let draft = builder.task(utterance).await;
    blocks.push(render_task(&draft));
    blocks.push(result_line("task", tasks.create(&draft).await));
}

async fn create_event(
    builder: &DraftBuilder<'_>,
    calendar: &CalendarClient,
    utterance: &str,
    blocks: &mut Vec<String>,
) {
    let draft = builder.event(utterance).await;
    blocks.push(render_event(&draft));
    blocks.push(result_line("event", calendar.create(&draft).await));
}

/// One line summarizing a create invocation. Failures stay inline — the tool
/// phase still closes with a normal `end`.
fn result_line(noun: &str, result: ToolResult) -> String {
    if result.success {
        let message = result
            .payload
            .as_ref()
            .and_then(|p| p.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("The {noun} was created successfully"));
        let link = result
            .payload
            .as_ref()
            .and_then(|p| p.get("calendar_link"))
            .and_then(|l| l.as_str())
            .filter(|l| !l.is_empty());
        match link {
            Some(link) => format!("✅ {message}\n🔗 {link}"),
            None => format!("✅ {message}"),
        }
    } else {
        format!(
            "⚠️ Could not create the {noun}: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}

fn render_task_list(result: ToolResult) -> String {
    if !result.success {
        return format!(
            "⚠️ Could not fetch your tasks: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    let payload = result.payload.unwrap_or_default();
    let tasks = payload
        .get("tasks")
        .and_then(|t| t.as_array())
        .cloned()
        .unwrap_or_default();
    if tasks.is_empty() {
        return "📝 No tasks found.".to_string();
    }
    let mut lines = vec![format!("📝 **Your tasks** ({}):", tasks.len())];
    for task in &tasks {
        let title = task.get("title").and_then(|v| v.as_str()).unwrap_or("Untitled");
        let status = task.get("status").and_then(|v| v.as_str()).unwrap_or("needsAction");
        let marker = if status == "completed" { "✅" } else { "⬜" };
        match task.get("due").and_then(|v| v.as_str()) {
            Some(due) => lines.push(format!("{marker} {title} — due {due}")),
            None => lines.push(format!("{marker} {title}")),
        }
    }
    lines.join("\n")
}

fn render_event_list(result: ToolResult) -> String {
    if !result.success {
        return format!(
            "⚠️ Could not fetch your events: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    let payload = result.payload.unwrap_or_default();
    let events = payload
        .get("events")
        .and_then(|e| e.as_array())
        .cloned()
        .unwrap_or_default();
    if events.is_empty() {
        return "📅 No events found.".to_string();
    }
    let mut lines = vec![format!("📅 **Your events** ({}):", events.len())];
    for event in &events {
        let title = event.get("title").and_then(|v| v.as_str()).unwrap_or("Untitled Event");
        let start = event.get("start").and_then(|v| v.as_str()).unwrap_or("");
        let location = event.get("location").and_then(|v| v.as_str()).unwrap_or("");
        let mut line = format!("• {title}");
        if !start.is_empty() {
            line.push_str(&format!(" — {start}"));
        }
        if !location.is_empty() {
            line.push_str(&format!(" ({location})"));
        }
        lines.push(line);
    }
    lines.join("\n")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Config;
    use crate::stream::EventType;

    fn session() -> ChatSession {
        let config = Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("test-key".to_string()),
            // Unroutable endpoints keep every network path failing fast.
            "GEMINI_BASE_URL" => Some("http://127.0.0.1:1/v1".to_string()),
            "TASKS_API_URL" => Some("http://127.0.0.1:1/tasks".to_string()),
            "CALENDAR_API_URL" => Some("http://127.0.0.1:1/calendar".to_string()),
            "TIME_API_URL" => Some("http://127.0.0.1:1/time".to_string()),
            _ => None,
        })
        .unwrap();
        ChatSession::new(Arc::new(ProviderRegistry::new(config)))
    }

    fn request(content: &str) -> ChatRequest {
        ChatRequest {
            content: content.to_string(),
            model: String::new(),
            websearch: false,
            reasoning: false,
            access_token: None,
        }
    }

    async fn run(session: &ChatSession, request: ChatRequest) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        session.handle(request, tx).await;
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn test_empty_utterance_single_error() {
        let session = session();
        let events = run(&session, request("   ")).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EventType::Error);
        assert!(events[0].mode.is_none());
    }

    #[tokio::test]
    async fn test_side_effect_intent_requires_token() {
        let session = session();
        let events = run(&session, request("remind me to buy milk tomorrow")).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EventType::Error);
        assert!(events[0]
            .text
            .as_deref()
            .unwrap_or_default()
            .contains("access token"));
    }

    #[tokio::test]
    async fn test_informational_provider_down_is_well_formed() {
        let session = session();
        let events = run(&session, request("why is the sky blue?")).await;
        // start(direct), content(human readable), error(direct)
        let shape: Vec<EventType> = events.iter().map(|e| e.event).collect();
        assert_eq!(shape, vec![EventType::Start, EventType::Content, EventType::Error]);
        assert!(events.iter().all(|e| e.mode == Some(PhaseMode::Direct)));
    }

    #[tokio::test]
    async fn test_tool_flow_with_unreachable_store_still_ends_normally() {
        let session = session();
        let mut req = request("remind me to buy milk tomorrow at 6pm");
        req.access_token = Some("tok".to_string());
        let events = run(&session, req).await;

        assert_eq!(events.first().map(|e| e.event), Some(EventType::Start));
        assert_eq!(events.first().and_then(|e| e.mode), Some(PhaseMode::Tool));
        // Draft render + failure line are inline content; terminal is a
        // normal end because the conversation itself succeeded.
        assert_eq!(events.last().map(|e| e.event), Some(EventType::End));
        let body: String = events
            .iter()
            .filter_map(|e| e.text.clone())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(body.contains("buy milk"));
        assert!(body.contains("Could not create the task"));
    }

    #[tokio::test]
    async fn test_unknown_model_defaults_to_gemini() {
        let session = session();
        let mut req = request("hello there");
        req.model = "something-else".to_string();
        let events = run(&session, req).await;
        // Still routed to a phase (gemini has a key configured).
        assert_eq!(events.first().map(|e| e.event), Some(EventType::Start));
    }

    #[test]
    fn test_result_line_success_and_failure() {
        let ok = ToolResult::ok(serde_json::json!({"message": "Task 'x' created successfully"}));
        assert!(result_line("task", ok).starts_with("✅"));

        let err = ToolResult::err("401 unauthorized");
        let line = result_line("task", err);
        assert!(line.starts_with("⚠️"));
        assert!(line.contains("401"));
    }

    #[test]
    fn test_render_task_list_empty() {
        let result = ToolResult::ok(serde_json::json!({"task_list": "Default", "tasks": []}));
        assert_eq!(render_task_list(result), "📝 No tasks found.");
    }

    #[test]
    fn test_render_event_list_lines() {
        let result = ToolResult::ok(serde_json::json!({"events": [
            {"title": "Kickoff", "start": "2026-08-06T14:00:00", "location": "Google Meet"},
        ]}));
        let out = render_event_list(result);
        assert!(out.contains("Kickoff"));
        assert!(out.contains("2026-08-06T14:00:00"));
    }
}
