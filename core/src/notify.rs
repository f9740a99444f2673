//! Outbound notification contract.
//!
//! Notifications are best-effort observability (volume statistics, playback
//! markers). Implementations swallow and log their own transport failures;
//! nothing here may propagate an error back into the engine.

use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, topic: &str, payload: &str);
}

/// Default sink: writes notifications to the log and nowhere else. Useful
/// when no transport is configured, and as the quiet half of a fan-out.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, topic: &str, payload: &str) {
        debug!(target: "notify", %topic, %payload, "notification");
    }
}
