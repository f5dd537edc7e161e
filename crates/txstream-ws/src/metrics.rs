//! Counters maintained by the reconnect loop.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, shared between the background task and observers.
#[derive(Debug, Default)]
pub struct StreamMetrics {
    forwarded: AtomicU64,
    duplicates: AtomicU64,
    connect_failures: AtomicU64,
    session_errors: AtomicU64,
    reconnects: AtomicU64,
}

/// Point-in-time copy of [`StreamMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Transactions pushed to the output channel.
    pub forwarded: u64,
    /// Transactions dropped as already seen.
    pub duplicates: u64,
    /// Failed dial or subscribe attempts.
    pub connect_failures: u64,
    /// Subscribed sessions that ended with an error.
    pub session_errors: u64,
    /// Successful subscriptions after the first.
    pub reconnects: u64,
}

impl StreamMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            session_errors: self.session_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_session_error(&self) {
        self.session_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let m = StreamMetrics::default();
        m.record_forwarded();
        m.record_forwarded();
        m.record_duplicate();
        m.record_reconnect();
        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                forwarded: 2,
                duplicates: 1,
                reconnects: 1,
                ..Default::default()
            }
        );
    }
}
