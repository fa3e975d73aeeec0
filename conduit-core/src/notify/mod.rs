//! Lifecycle notifications for tool invocations
//!
//! Every invocation the engine attempts produces an EXECUTING event before the
//! tool runs and a COMPLETED event after it settles. This module defines the
//! channel contract those events go through and the implementations shipped
//! with the crate:
//! - [`ChannelNotifier`] forwards events into a tokio mpsc stream
//! - [`RecordingNotifier`] keeps events in memory for inspection
//! - [`TracingNotifier`] writes one structured log line per event

mod channel;
mod error;
mod event;
mod recording;
mod traits;

pub use channel::{ChannelNotifier, EventReceiver, EventSender, event_channel};
pub use error::NotifyError;
pub use event::{CompletionOutcome, EventKind, NotificationEvent};
pub use recording::RecordingNotifier;
pub use traits::{NotificationChannel, SharedChannel, TracingNotifier};
