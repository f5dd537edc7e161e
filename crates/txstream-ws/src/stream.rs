//! Connection lifecycle controller.
//!
//! ```text
//!            ┌────────────── backoff sleep ◄─────────────┐
//!            ▼                                           │ error
//! Disconnected ──► Connect (dial + subscribe) ───────────┤
//!                        │ ok                            │
//!                        ▼                               │
//!                   Subscribed ──► Consuming ────────────┘
//!             (connect / reconnect)   read → decode → validate → dedup → forward
//! ```
//!
//! A single background task runs the whole state machine. It only stops when
//! the shutdown token is cancelled or the consumer drops its [`TxFeed`].

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use txstream_core::notification::is_rejection;
use txstream_core::{
    parse_transaction, Backoff, DedupCache, StreamError, Transaction, SUBSCRIBE_REQUEST,
};

use crate::config::StreamConfig;
use crate::connector::{FeedConnection, FeedConnector, WsConnector};
use crate::listener::{LoggingListener, StreamListener};
use crate::metrics::StreamMetrics;

/// Upper bound on a graceful close before the connection is just dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

enum SessionEnd {
    Failed(StreamError),
    Shutdown,
    ConsumerGone,
}

/// Long-lived subscription to the pending-transaction feed.
///
/// # Usage
/// ```no_run
/// # async fn example() -> Result<(), txstream_core::StreamError> {
/// use futures::StreamExt;
/// use tokio_util::sync::CancellationToken;
/// use txstream_ws::{StreamConfig, TxStream};
///
/// let config = StreamConfig::builder().account("account-id", "secret-hash").build()?;
/// let shutdown = CancellationToken::new();
/// let mut feed = TxStream::new(config)?.start(shutdown.clone());
/// while let Some(tx) = feed.next().await {
///     println!("{}", tx.hash);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TxStream {
    config: StreamConfig,
    connector: Arc<dyn FeedConnector>,
    listener: Arc<dyn StreamListener>,
    metrics: Arc<StreamMetrics>,
}

impl TxStream {
    /// Build a stream over WebSocket. Fails only on configuration problems,
    /// before any network activity.
    pub fn new(config: StreamConfig) -> Result<Self, StreamError> {
        let connector = WsConnector::new(&config)?;
        Ok(Self::with_connector(config, Arc::new(connector)))
    }

    /// Build a stream over any transport.
    pub fn with_connector(config: StreamConfig, connector: Arc<dyn FeedConnector>) -> Self {
        Self {
            config,
            connector,
            listener: Arc::new(LoggingListener),
            metrics: Arc::default(),
        }
    }

    /// Replace the default [`LoggingListener`].
    pub fn with_listener(mut self, listener: Arc<dyn StreamListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Shared counters, readable while the stream runs.
    pub fn metrics(&self) -> Arc<StreamMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Spawn the reconnect loop and return the consumer side.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self, shutdown: CancellationToken) -> TxFeed {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity());
        let task = tokio::spawn(self.run(tx, shutdown));
        TxFeed { rx, task }
    }

    async fn run(self, out: mpsc::Sender<Transaction>, shutdown: CancellationToken) {
        let mut backoff = Backoff::new(self.config.backoff().clone());
        let mut seen = DedupCache::new(self.config.dedup_ttl(), self.config.dedup_capacity());
        let mut subscribed_once = false;
        let url = self.connector.endpoint().to_string();

        loop {
            if out.is_closed() {
                tracing::info!("tx consumer dropped, stopping");
                break;
            }

            tracing::info!(url = %url, attempt = backoff.attempt() + 1, "connecting to tx stream");
            let attempt = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = out.closed() => {
                    tracing::info!("tx consumer dropped, stopping");
                    break;
                }
                res = self.subscribe() => res,
            };

            let mut conn = match attempt {
                Ok(conn) => conn,
                Err(e) => {
                    self.metrics.record_connect_failure();
                    self.listener.on_error(&e);
                    if !self.pause(&mut backoff, &out, &shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            backoff.reset();
            if subscribed_once {
                self.metrics.record_reconnect();
                self.listener.on_reconnect();
            } else {
                subscribed_once = true;
                self.listener.on_connect();
            }
            tracing::info!(url = %url, "subscribed to newTxs");

            let end = self.consume(conn.as_mut(), &mut seen, &out, &shutdown).await;
            if tokio::time::timeout(CLOSE_TIMEOUT, conn.close()).await.is_err() {
                tracing::debug!(url = %url, "close timed out, dropping connection");
            }

            match end {
                SessionEnd::Failed(e) => {
                    self.metrics.record_session_error();
                    self.listener.on_error(&e);
                    if !self.pause(&mut backoff, &out, &shutdown).await {
                        break;
                    }
                }
                SessionEnd::Shutdown => break,
                SessionEnd::ConsumerGone => {
                    tracing::info!("tx consumer dropped, stopping");
                    break;
                }
            }
        }

        tracing::info!(url = %url, "tx stream stopped");
    }

    /// Dial and perform the subscribe handshake on a fresh connection.
    async fn subscribe(&self) -> Result<Box<dyn FeedConnection>, StreamError> {
        let mut conn = self.connector.connect().await?;
        match handshake(conn.as_mut()).await {
            Ok(()) => Ok(conn),
            Err(e) => {
                if tokio::time::timeout(CLOSE_TIMEOUT, conn.close()).await.is_err() {
                    tracing::debug!(
                        url = %self.connector.endpoint(),
                        "close timed out, dropping connection"
                    );
                }
                Err(e)
            }
        }
    }

    async fn consume(
        &self,
        conn: &mut dyn FeedConnection,
        seen: &mut DedupCache,
        out: &mpsc::Sender<Transaction>,
        shutdown: &CancellationToken,
    ) -> SessionEnd {
        loop {
            let text = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SessionEnd::Shutdown,
                _ = out.closed() => return SessionEnd::ConsumerGone,
                msg = conn.next_message() => match msg {
                    Ok(text) => text,
                    Err(e) => return SessionEnd::Failed(e),
                },
            };

            let tx = match parse_transaction(&text) {
                Ok(tx) => tx,
                Err(e) => {
                    tracing::debug!(error = %e, len = text.len(), "rejecting inbound message");
                    return SessionEnd::Failed(e);
                }
            };

            if !seen.check_and_insert(&tx.hash, Instant::now().into_std()) {
                self.metrics.record_duplicate();
                tracing::trace!(hash = %tx.hash, "duplicate tx dropped");
                continue;
            }

            // Blocks while the channel is full: a slow consumer stalls the feed.
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SessionEnd::Shutdown,
                sent = out.send(tx) => {
                    if sent.is_err() {
                        return SessionEnd::ConsumerGone;
                    }
                }
            }
            self.metrics.record_forwarded();
        }
    }

    /// Sleep for the next backoff delay. Returns `false` if shut down or the
    /// consumer went away meanwhile.
    async fn pause(
        &self,
        backoff: &mut Backoff,
        out: &mpsc::Sender<Transaction>,
        shutdown: &CancellationToken,
    ) -> bool {
        let delay = backoff.next_delay();
        tracing::debug!(
            delay_ms = delay.as_millis() as u64,
            failures = backoff.attempt(),
            "backing off before reconnect"
        );
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => false,
            _ = out.closed() => {
                tracing::info!("tx consumer dropped, stopping");
                false
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

async fn handshake(conn: &mut dyn FeedConnection) -> Result<(), StreamError> {
    conn.send_text(SUBSCRIBE_REQUEST).await?;
    let response = conn.next_message().await?;
    if is_rejection(&response) {
        return Err(StreamError::HandshakeRejected { response });
    }
    tracing::debug!(response = %response, "subscribe acknowledged");
    Ok(())
}

/// Consumer side of a started [`TxStream`].
///
/// Yields validated, deduplicated transactions in arrival order. Ends once
/// the background task stops.
pub struct TxFeed {
    rx: mpsc::Receiver<Transaction>,
    task: JoinHandle<()>,
}

impl TxFeed {
    pub async fn recv(&mut self) -> Option<Transaction> {
        self.rx.recv().await
    }

    /// Stop consuming and wait for the background task to exit.
    /// Dropping the receiver stops the task even without cancellation.
    pub async fn join(self) -> Result<(), JoinError> {
        let TxFeed { rx, task } = self;
        drop(rx);
        task.await
    }
}

impl Stream for TxFeed {
    type Item = Transaction;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
