//! Transport seam between the lifecycle controller and the socket.
//!
//! The controller only sees [`FeedConnector`] and [`FeedConnection`]; the
//! WebSocket implementation lives here so tests can substitute a scripted
//! transport.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};

use txstream_core::{ConfigError, StreamError};

use crate::config::{Auth, StreamConfig};

/// One established transport connection. Owned by a single session and
/// never reused after it ends.
#[async_trait]
pub trait FeedConnection: Send {
    /// Send one text message.
    async fn send_text(&mut self, text: &str) -> Result<(), StreamError>;

    /// Wait for the next data message. Control frames are skipped; a close
    /// frame or end of stream is [`StreamError::Closed`].
    async fn next_message(&mut self) -> Result<String, StreamError>;

    /// Close the connection, ignoring errors.
    async fn close(&mut self);
}

/// Opens a brand-new [`FeedConnection`] per attempt.
#[async_trait]
pub trait FeedConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn FeedConnection>, StreamError>;

    /// Endpoint identifier for logs.
    fn endpoint(&self) -> &str;
}

/// [`FeedConnector`] over `tokio-tungstenite`, with header-token or
/// client-certificate authentication.
pub struct WsConnector {
    url: String,
    authorization: Option<HeaderValue>,
    tls: Option<native_tls::TlsConnector>,
}

impl WsConnector {
    /// Prepare a connector for `config`. The TLS identity is assembled here,
    /// so a malformed certificate fails before any dial.
    pub fn new(config: &StreamConfig) -> Result<Self, ConfigError> {
        let (authorization, tls) = match config.auth() {
            Auth::Certificate { certificate, insecure } => {
                let identity =
                    native_tls::Identity::from_pkcs8(certificate.cert_pem(), certificate.key_pem())
                        .map_err(|e| ConfigError::Tls(e.to_string()))?;
                let tls = native_tls::TlsConnector::builder()
                    .identity(identity)
                    .danger_accept_invalid_certs(*insecure)
                    .danger_accept_invalid_hostnames(*insecure)
                    .build()
                    .map_err(|e| ConfigError::Tls(e.to_string()))?;
                (None, Some(tls))
            }
            Auth::Token(token) => {
                let value = HeaderValue::from_str(token)
                    .map_err(|e| ConfigError::Tls(format!("invalid authorization header: {e}")))?;
                (Some(value), None)
            }
        };

        Ok(Self {
            url: config.endpoint().to_string(),
            authorization,
            tls,
        })
    }
}

#[async_trait]
impl FeedConnector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn FeedConnection>, StreamError> {
        let connect_err = |reason: String| StreamError::Connect {
            url: self.url.clone(),
            reason,
        };

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| connect_err(e.to_string()))?;
        if let Some(value) = &self.authorization {
            request.headers_mut().insert(AUTHORIZATION, value.clone());
        }

        let connector = self.tls.clone().map(Connector::NativeTls);
        let (ws, _) = connect_async_tls_with_config(request, None, false, connector)
            .await
            .map_err(|e| connect_err(e.to_string()))?;

        tracing::debug!(url = %self.url, "WebSocket established");
        Ok(Box::new(WsConnection { ws }))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

struct WsConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), StreamError> {
        self.ws
            .send(Message::Text(text.to_owned()))
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))
    }

    async fn next_message(&mut self) -> Result<String, StreamError> {
        loop {
            match self.ws.next().await {
                None => return Err(StreamError::Closed),
                Some(Err(e)) => return Err(StreamError::Transport(e.to_string())),
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data).map_err(|e| {
                        StreamError::Transport(format!("binary frame is not UTF-8: {e}"))
                    })
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "close frame received");
                    return Err(StreamError::Closed);
                }
                // tungstenite answers pings itself
                Some(Ok(_)) => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::trace!(error = %e, "error while closing WebSocket");
        }
    }
}
