use crossbeam_channel::{Receiver, Sender};

use crate::notify::domain::sink::{NotificationSink, NotifyError};

/// Hands payloads to a consumer thread over a bounded channel.
///
/// Keeps slow publishers from blocking pipeline ticks indefinitely: the
/// pipelines produce, one drain thread forwards to wherever results go.
pub struct ChannelNotificationSink {
    tx: Sender<String>,
}

impl ChannelNotificationSink {
    pub fn bounded(capacity: usize) -> (Self, Receiver<String>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn publish(&self, payload: &str) -> Result<(), NotifyError> {
        self.tx
            .send(payload.to_string())
            .map_err(|_| NotifyError::Closed)
    }
}
