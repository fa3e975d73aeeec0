//! Notification event format

use crate::context::IdentityContext;
use crate::tools::ToolStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Which half of the lifecycle pair an event is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Executing,
    Completed,
}

/// Terminal outcome carried by a COMPLETED notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// The tool returned a value (possibly summarized)
    Success { value: Value },

    /// The tool failed, panicked, or was cancelled
    Error { error: String },
}

impl CompletionOutcome {
    pub fn success(value: Value) -> Self {
        CompletionOutcome::Success { value }
    }

    pub fn error(error: impl Into<String>) -> Self {
        CompletionOutcome::Error {
            error: error.into(),
        }
    }

    pub fn status(&self) -> ToolStatus {
        match self {
            CompletionOutcome::Success { .. } => ToolStatus::Success,
            CompletionOutcome::Error { .. } => ToolStatus::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CompletionOutcome::Error { .. })
    }
}

/// One lifecycle event as seen by a notification consumer
///
/// Each event copies the identity fields it needs, so events from different
/// requests never share state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub tool_name: String,
    pub subject_id: String,
    pub conversation_id: String,
    pub run_id: String,

    /// `{"status": "executing"}` or the serialized [`CompletionOutcome`]
    pub payload: Value,

    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    /// Build an EXECUTING event
    pub fn executing(identity: &IdentityContext, tool_name: &str) -> Self {
        Self::new(
            EventKind::Executing,
            identity,
            tool_name,
            json!({ "status": "executing" }),
        )
    }

    /// Build a COMPLETED event
    pub fn completed(
        identity: &IdentityContext,
        tool_name: &str,
        outcome: &CompletionOutcome,
    ) -> Self {
        let payload = serde_json::to_value(outcome).unwrap_or_default();
        Self::new(EventKind::Completed, identity, tool_name, payload)
    }

    fn new(kind: EventKind, identity: &IdentityContext, tool_name: &str, payload: Value) -> Self {
        Self {
            kind,
            tool_name: tool_name.to_string(),
            subject_id: identity.subject_id().to_string(),
            conversation_id: identity.conversation_id().to_string(),
            run_id: identity.run_id().to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Outcome status of a COMPLETED event, read back from the payload
    pub fn outcome_status(&self) -> Option<&str> {
        match self.kind {
            EventKind::Completed => self.payload.get("status").and_then(Value::as_str),
            EventKind::Executing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executing_event_copies_identity() {
        let identity = IdentityContext::new("user-7", "conv-3", "run-9");
        let event = NotificationEvent::executing(&identity, "search");

        assert_eq!(event.kind, EventKind::Executing);
        assert_eq!(event.tool_name, "search");
        assert_eq!(event.subject_id, "user-7");
        assert_eq!(event.conversation_id, "conv-3");
        assert_eq!(event.run_id, "run-9");
        assert_eq!(event.payload["status"], "executing");
        assert!(event.outcome_status().is_none());
    }

    #[test]
    fn test_completed_payload_shape() {
        let identity = IdentityContext::new("u", "c", "r");

        let ok = NotificationEvent::completed(
            &identity,
            "echo",
            &CompletionOutcome::success(json!({"a": 1})),
        );
        assert_eq!(ok.payload, json!({"status": "success", "value": {"a": 1}}));
        assert_eq!(ok.outcome_status(), Some("success"));

        let failed =
            NotificationEvent::completed(&identity, "boom", &CompletionOutcome::error("boom"));
        assert_eq!(failed.payload, json!({"status": "error", "error": "boom"}));
        assert_eq!(failed.outcome_status(), Some("error"));
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(CompletionOutcome::success(json!(1)).status(), ToolStatus::Success);
        assert!(CompletionOutcome::error("x").is_error());
    }
}
