//! mpsc-backed notification channel
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_core::notify::{ChannelNotifier, event_channel};
//!
//! let (tx, mut rx) = event_channel(100);
//! let channel = Arc::new(ChannelNotifier::new(tx));
//!
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{} {:?}", event.tool_name, event.kind);
//!     }
//! });
//! ```

use super::error::NotifyError;
use super::event::{CompletionOutcome, NotificationEvent};
use super::traits::NotificationChannel;
use crate::context::IdentityContext;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sender half of an event channel
pub type EventSender = mpsc::Sender<NotificationEvent>;

/// Receiver half of an event channel
pub type EventReceiver = mpsc::Receiver<NotificationEvent>;

/// Creates a new event channel with the specified buffer capacity.
pub fn event_channel(buffer_size: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(buffer_size.max(1))
}

/// Notification channel that forwards events to an [`EventReceiver`]
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: EventSender,
}

impl ChannelNotifier {
    pub fn new(sender: EventSender) -> Self {
        Self { sender }
    }

    async fn send(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| NotifyError::Closed)
    }
}

#[async_trait]
impl NotificationChannel for ChannelNotifier {
    async fn notify_executing(
        &self,
        identity: &IdentityContext,
        tool_name: &str,
    ) -> Result<(), NotifyError> {
        self.send(NotificationEvent::executing(identity, tool_name))
            .await
    }

    async fn notify_completed(
        &self,
        identity: &IdentityContext,
        tool_name: &str,
        outcome: &CompletionOutcome,
    ) -> Result<(), NotifyError> {
        self.send(NotificationEvent::completed(identity, tool_name, outcome))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::EventKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut rx) = event_channel(8);
        let notifier = ChannelNotifier::new(tx);
        let identity = IdentityContext::new("u", "c", "r");

        notifier.notify_executing(&identity, "echo").await.unwrap();
        notifier
            .notify_completed(&identity, "echo", &CompletionOutcome::success(json!(1)))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::Executing);
        assert_eq!(second.kind, EventKind::Completed);
        assert_eq!(second.outcome_status(), Some("success"));
    }

    #[tokio::test]
    async fn test_closed_receiver() {
        let (tx, rx) = event_channel(1);
        drop(rx);
        let notifier = ChannelNotifier::new(tx);
        let identity = IdentityContext::new("u", "c", "r");

        let err = notifier.notify_executing(&identity, "echo").await.unwrap_err();
        assert!(matches!(err, NotifyError::Closed));
    }
}
