//! Intent routing — classifies an utterance into exactly one intent.
//!
//! The router is an ordered table of named rules evaluated top-down; the
//! first rule whose predicate matches wins. There is no scoring and no
//! backtracking, which keeps classification total, deterministic, and
//! testable without a model call.
//!
//! Precedence when task and event keywords collide: combined rules first,
//! then retrieval rules, then task creation, then event creation. So
//! "remind me to call mum" is a task even though "call" is an event verb.

// ─── Types ───────────────────────────────────────────────────────────────────

/// What the user wants done with this utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CreateTask,
    CreateEvent,
    CreateBoth,
    RetrieveTasks,
    RetrieveEvents,
    RetrieveBoth,
    Informational,
}

impl Intent {
    /// Whether fulfilling this intent mutates or reads an external store.
    pub fn is_side_effecting(&self) -> bool {
        !matches!(self, Intent::Informational)
    }

    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            Intent::RetrieveTasks | Intent::RetrieveEvents | Intent::RetrieveBoth
        )
    }
}

/// Time-window sub-flags for retrieval intents. Set by an independent scan of
/// the utterance; orthogonal to the primary intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrievalWindow {
    pub today_only: bool,
    pub tomorrow_only: bool,
    pub upcoming_only: bool,
}

/// The routing decision for one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routing {
    pub intent: Intent,
    pub window: RetrievalWindow,
}

// ─── Rule table ──────────────────────────────────────────────────────────────

struct Rule {
    name: &'static str,
    matches: fn(&str) -> bool,
    intent: Intent,
}

const RULES: &[Rule] = &[
    Rule {
        name: "combined-retrieve",
        matches: is_combined_retrieve,
        intent: Intent::RetrieveBoth,
    },
    Rule {
        name: "combined-create",
        matches: is_combined_create,
        intent: Intent::CreateBoth,
    },
    Rule {
        name: "retrieve-tasks",
        matches: is_task_retrieve,
        intent: Intent::RetrieveTasks,
    },
    Rule {
        name: "retrieve-events",
        matches: is_event_retrieve,
        intent: Intent::RetrieveEvents,
    },
    Rule {
        name: "create-task",
        matches: is_task_create,
        intent: Intent::CreateTask,
    },
    Rule {
        name: "create-event",
        matches: is_event_create,
        intent: Intent::CreateEvent,
    },
];

/// Classify one utterance. Total: every input maps to some intent, with
/// `Informational` as the default.
pub fn route(utterance: &str) -> Routing {
    let lower = utterance.trim().to_lowercase();
    let window = scan_window(&lower);

    if let Some(intent) = bare_word_intent(&lower) {
        tracing::debug!(rule = "bare-word", ?intent, "routed");
        return Routing { intent, window };
    }

    for rule in RULES {
        if (rule.matches)(&lower) {
            tracing::debug!(rule = rule.name, intent = ?rule.intent, "routed");
            return Routing {
                intent: rule.intent,
                window,
            };
        }
    }

    Routing {
        intent: Intent::Informational,
        window,
    }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

const RETRIEVAL_VERBS: &[&str] = &["show", "list", "get", "view", "check", "what"];
const TASK_NOUNS: &[&str] = &["task", "tasks", "reminder", "reminders", "todo", "todos"];
const EVENT_NOUNS: &[&str] = &["event", "events", "meeting", "meetings", "calendar"];
const COMBINED_NOUNS: &[&str] = &["schedule", "agenda", "everything"];

/// Substring markers that introduce a task creation.
const TASK_CREATE_MARKERS: &[&str] = &[
    "remind me to",
    "create task",
    "create a task",
    "set task",
    "set a task",
    "add task",
    "add a task",
    "set reminder",
    "set a reminder",
    "create reminder",
    "create a reminder",
];

/// Substring markers that introduce an event creation.
const EVENT_CREATE_MARKERS: &[&str] = &[
    "schedule meeting",
    "schedule a meeting",
    "schedule an event",
    "schedule event",
    "create meeting",
    "create a meeting",
    "create event",
    "create an event",
    "set meeting",
    "set a meeting",
    "set up a meeting",
    "set event",
    "schedule a call",
    "set up a call",
];

/// Single verbs that read as an event even without a marker phrase.
const EVENT_VERBS: &[&str] = &["interview", "sync", "standup", "1:1"];

/// Word-boundary containment; phrases with spaces fall back to substring.
fn contains_word(text: &str, word: &str) -> bool {
    if word.contains(' ') || word.contains(':') {
        return text.contains(word);
    }
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}

fn any_word(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| contains_word(text, w))
}

fn any_marker(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

fn has_retrieval_verb(text: &str) -> bool {
    any_word(text, RETRIEVAL_VERBS) || text.contains("do i have")
}

fn is_combined_retrieve(text: &str) -> bool {
    has_retrieval_verb(text) && any_word(text, COMBINED_NOUNS)
}

/// Both a task marker and an event marker in one utterance: create both
/// records rather than guessing which one the user meant.
fn is_combined_create(text: &str) -> bool {
    any_marker(text, TASK_CREATE_MARKERS) && any_marker(text, EVENT_CREATE_MARKERS)
}

fn is_task_retrieve(text: &str) -> bool {
    has_retrieval_verb(text) && any_word(text, TASK_NOUNS)
}

fn is_event_retrieve(text: &str) -> bool {
    has_retrieval_verb(text) && any_word(text, EVENT_NOUNS)
}

fn is_task_create(text: &str) -> bool {
    any_marker(text, TASK_CREATE_MARKERS)
}

fn is_event_create(text: &str) -> bool {
    any_marker(text, EVENT_CREATE_MARKERS) || any_word(text, EVENT_VERBS)
}

/// A bare single-word utterance maps straight to the matching retrieval
/// intent — "tasks" means "show my tasks".
fn bare_word_intent(text: &str) -> Option<Intent> {
    if text.split_whitespace().count() != 1 {
        return None;
    }
    let word = text.trim_end_matches(['?', '!', '.']);
    if TASK_NOUNS.contains(&word) {
        Some(Intent::RetrieveTasks)
    } else if EVENT_NOUNS.contains(&word) {
        Some(Intent::RetrieveEvents)
    } else if COMBINED_NOUNS.contains(&word) {
        Some(Intent::RetrieveBoth)
    } else {
        None
    }
}

/// Independent scan for the retrieval window flags.
fn scan_window(text: &str) -> RetrievalWindow {
    RetrievalWindow {
        today_only: contains_word(text, "today") || contains_word(text, "tonight"),
        tomorrow_only: contains_word(text, "tomorrow") || contains_word(text, "tmr"),
        upcoming_only: contains_word(text, "upcoming")
            || text.contains("next week")
            || text.contains("this week"),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
