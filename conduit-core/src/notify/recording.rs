//! In-memory notification channel

use super::error::NotifyError;
use super::event::{CompletionOutcome, EventKind, NotificationEvent};
use super::traits::NotificationChannel;
use crate::context::IdentityContext;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Channel that records every event it receives
///
/// Useful for tests and for callers that want to inspect the lifecycle of a
/// request after it finishes.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events in arrival order
    pub async fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().await.clone()
    }

    /// Events for one tool name in arrival order
    pub async fn events_for(&self, tool_name: &str) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.tool_name == tool_name)
            .cloned()
            .collect()
    }

    /// Number of events of `kind`
    pub async fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }

    /// Drop all recorded events
    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }

    async fn push(&self, event: NotificationEvent) {
        self.events.lock().await.push(event);
    }
}

#[async_trait]
impl NotificationChannel for RecordingNotifier {
    async fn notify_executing(
        &self,
        identity: &IdentityContext,
        tool_name: &str,
    ) -> Result<(), NotifyError> {
        self.push(NotificationEvent::executing(identity, tool_name))
            .await;
        Ok(())
    }

    async fn notify_completed(
        &self,
        identity: &IdentityContext,
        tool_name: &str,
        outcome: &CompletionOutcome,
    ) -> Result<(), NotifyError> {
        self.push(NotificationEvent::completed(identity, tool_name, outcome))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_filters() {
        let recorder = RecordingNotifier::new();
        let identity = IdentityContext::new("u", "c", "r");

        recorder.notify_executing(&identity, "a").await.unwrap();
        recorder.notify_executing(&identity, "b").await.unwrap();
        recorder
            .notify_completed(&identity, "a", &CompletionOutcome::error("nope"))
            .await
            .unwrap();

        assert_eq!(recorder.len().await, 3);
        assert_eq!(recorder.events_for("a").await.len(), 2);
        assert_eq!(recorder.count(EventKind::Executing).await, 2);
        assert_eq!(recorder.count(EventKind::Completed).await, 1);

        recorder.clear().await;
        assert!(recorder.is_empty().await);
    }
}
