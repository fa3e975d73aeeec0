//! Notification channel contract

use super::error::NotifyError;
use super::event::{CompletionOutcome, EventKind, NotificationEvent};
use crate::context::IdentityContext;
use async_trait::async_trait;
use std::sync::Arc;

/// Sink for invocation lifecycle events
///
/// One channel is usually shared by every dispatcher in a process, so
/// implementations must accept concurrent calls. Each call is self-contained
/// and carries its own identity; no cross-call ordering is implied.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// A tool is about to run
    async fn notify_executing(
        &self,
        identity: &IdentityContext,
        tool_name: &str,
    ) -> Result<(), NotifyError>;

    /// A tool finished, failed, or was abandoned
    async fn notify_completed(
        &self,
        identity: &IdentityContext,
        tool_name: &str,
        outcome: &CompletionOutcome,
    ) -> Result<(), NotifyError>;
}

/// Shared handle to a notification channel
pub type SharedChannel = Arc<dyn NotificationChannel>;

/// Channel that turns every event into a log line
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    fn log(event: &NotificationEvent) {
        match event.kind {
            EventKind::Executing => tracing::info!(
                tool = %event.tool_name,
                subject_id = %event.subject_id,
                run_id = %event.run_id,
                conversation_id = %event.conversation_id,
                "Tool executing"
            ),
            EventKind::Completed => tracing::info!(
                tool = %event.tool_name,
                subject_id = %event.subject_id,
                run_id = %event.run_id,
                conversation_id = %event.conversation_id,
                status = event.outcome_status().unwrap_or("unknown"),
                "Tool completed"
            ),
        }
    }
}

#[async_trait]
impl NotificationChannel for TracingNotifier {
    async fn notify_executing(
        &self,
        identity: &IdentityContext,
        tool_name: &str,
    ) -> Result<(), NotifyError> {
        Self::log(&NotificationEvent::executing(identity, tool_name));
        Ok(())
    }

    async fn notify_completed(
        &self,
        identity: &IdentityContext,
        tool_name: &str,
        outcome: &CompletionOutcome,
    ) -> Result<(), NotifyError> {
        Self::log(&NotificationEvent::completed(identity, tool_name, outcome));
        Ok(())
    }
}
