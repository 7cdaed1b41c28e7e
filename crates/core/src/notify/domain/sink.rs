use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification channel is closed")]
    Closed,
}

/// Receives the serialized result record of one pipeline tick.
///
/// Transport semantics (queue, topic, delivery guarantees) live behind this
/// seam and are not part of the core.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, payload: &str) -> Result<(), NotifyError>;
}
