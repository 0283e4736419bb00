//! Stream layer — the event model and the phase controller that sequences it.

pub mod controller;
pub mod event;

pub use controller::{Phase, PhaseController, PhaseOutcome};
pub use event::{EventType, PhaseMode, StreamEvent};
