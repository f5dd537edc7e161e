//! Lifecycle notifications from the reconnect loop.

use txstream_core::StreamError;

/// Receives lifecycle events from the background task.
///
/// `on_connect` fires on the first successful subscription of a stream's
/// lifetime, `on_reconnect` on every later one. `on_error` fires once per
/// failed attempt or ended session. All methods run on the background task
/// and must not block.
pub trait StreamListener: Send + Sync {
    fn on_connect(&self) {}

    fn on_reconnect(&self) {}

    fn on_error(&self, _error: &StreamError) {}
}

/// Default listener: reports every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl StreamListener for LoggingListener {
    fn on_connect(&self) {
        tracing::info!("connected to tx stream");
    }

    fn on_reconnect(&self) {
        tracing::info!("reconnected to tx stream");
    }

    fn on_error(&self, error: &StreamError) {
        tracing::warn!(error = %error, "tx stream error");
    }
}
