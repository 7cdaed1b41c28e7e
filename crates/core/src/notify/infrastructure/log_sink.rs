use crate::notify::domain::sink::{NotificationSink, NotifyError};

/// Writes each payload to the log. Useful for standalone runs and tests
/// where no message broker is wired up.
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn publish(&self, payload: &str) -> Result<(), NotifyError> {
        log::info!("validation result: {payload}");
        Ok(())
    }
}
