//! Error types for notification delivery

use thiserror::Error;

/// Notification channel errors
///
/// The engine logs these and carries on; a failed notification never changes
/// the outcome of the invocation it describes.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The receiving side has gone away
    #[error("Notification channel closed")]
    Closed,

    /// Transport-specific failure
    #[error("Notification transport error: {0}")]
    Transport(String),
}
