use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Identity stamped on entries written before resolution finished.
pub const UNKNOWN_USER: &str = "unknown-user";

/// What was interacted with. Captured synchronously at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    /// Tag name of the event target, as reported by the element.
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_class: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    /// Endpoint answered, but not with a usable name.
    IdentificationFailure,
    /// Endpoint could not be talked to (or answered garbage).
    IdentificationError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,
    pub details: String,
}

impl DiagnosticRecord {
    pub fn failure(details: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::IdentificationFailure,
            details: details.into(),
        }
    }

    pub fn error(details: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::IdentificationError,
            details: details.into(),
        }
    }
}

/// The one thing a log entry carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPayload {
    Interaction(InteractionRecord),
    Diagnostic(DiagnosticRecord),
}

/// One persisted record. Exactly one of `interaction` / `error` is set when
/// built through [`LogEntry::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub user_id: String,
    /// ISO-8601, UTC, millisecond precision.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<InteractionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DiagnosticRecord>,
}

impl LogEntry {
    pub fn new(user_id: impl Into<String>, payload: EntryPayload) -> Self {
        Self::at(user_id, Utc::now(), payload)
    }

    pub fn at(user_id: impl Into<String>, when: DateTime<Utc>, payload: EntryPayload) -> Self {
        let (interaction, error) = match payload {
            EntryPayload::Interaction(record) => (Some(record), None),
            EntryPayload::Diagnostic(record) => (None, Some(record)),
        };
        Self {
            user_id: user_id.into(),
            timestamp: when.to_rfc3339_opts(SecondsFormat::Millis, true),
            interaction,
            error,
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        self.error.is_some()
    }
}
