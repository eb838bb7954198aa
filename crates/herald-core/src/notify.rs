use herald_types::models::MessageRecord;
use tracing::debug;

/// Outbound notification dispatch (webhooks, push) lives outside this core.
/// Write paths invoke the sink fire-and-forget with the finalized record
/// after a successful store mutation; implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: &str, message: &MessageRecord);
}

/// Default sink: log and drop.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, kind: &str, message: &MessageRecord) {
        debug!("notification: {} message {}", kind, message.id);
    }
}
