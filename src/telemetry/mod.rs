//! Interaction capture.
//!
//! # PRIVACY INVARIANT
//! Entries carry the event type and the target's tag, id and class only.
//! Never event payloads such as typed text or pointer coordinates.
//!
//! # HOST SAFETY
//! Nothing reachable from a listener may panic or return an error into the
//! host's event dispatch. Failures are reported through `tracing` and dropped.

pub mod entry;
pub mod events;
pub mod recorder;

pub use entry::{
    DiagnosticKind, DiagnosticRecord, EntryPayload, InteractionRecord, LogEntry, UNKNOWN_USER,
};
pub use events::{ElementInfo, EventHub, EventTarget, Handler, InteractionEvent};
pub use recorder::{InteractionRecorder, RecorderState};
