//! Draft layer — structured task/event candidates and the builder that
//! produces them.
//!
//! - `types`: the draft records and reminder shapes
//! - `builder`: model elaboration with a deterministic extraction fallback
//! - `json_scan`: loose JSON decoding of model output
//! - `render`: human-readable summaries streamed during the tool phase

pub mod builder;
pub mod json_scan;
pub mod render;
pub mod types;

pub use builder::DraftBuilder;
pub use render::{render_event, render_task};
pub use types::{EventDraft, Reminder, ReminderMethod, TaskDraft};
