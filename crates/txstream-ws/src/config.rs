//! Stream configuration.
//!
//! [`StreamConfig`] is immutable and validated once by
//! [`StreamConfigBuilder::build`]: authentication is resolved, the endpoint
//! is chosen and parsed, and limits are clamped before anything dials.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use url::Url;

use txstream_core::{BackoffConfig, ConfigError};

/// Default endpoint for account/secret (header token) access.
pub const TOKEN_ENDPOINT: &str = "wss://api.blxrbdn.com/ws";
/// Default endpoint for client-certificate access.
pub const CERT_ENDPOINT: &str = "wss://eth.feed.blxrbdn.com:28333";

/// Certificate file name inside a certificate directory.
pub const CERT_FILE: &str = "external_gateway_cert.pem";
/// Private key file name inside a certificate directory.
pub const KEY_FILE: &str = "external_gateway_key.pem";

pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_DEDUP_CAPACITY: usize = 100_000;

/// PEM-encoded client certificate and PKCS#8 private key.
#[derive(Clone)]
pub struct ClientCertificate {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl ClientCertificate {
    pub fn from_pem(cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    /// Load [`CERT_FILE`] and [`KEY_FILE`] from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read(&path).map_err(|source| ConfigError::Certificate { path, source })
        };
        Ok(Self {
            cert_pem: read(CERT_FILE)?,
            key_pem: read(KEY_FILE)?,
        })
    }

    pub fn cert_pem(&self) -> &[u8] {
        &self.cert_pem
    }

    pub fn key_pem(&self) -> &[u8] {
        &self.key_pem
    }
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Resolved authentication method.
#[derive(Clone)]
pub enum Auth {
    /// Mutual TLS with a client certificate.
    Certificate {
        certificate: ClientCertificate,
        /// Skip server certificate and hostname verification.
        insecure: bool,
    },
    /// `Authorization` header value.
    Token(String),
}

impl Auth {
    /// Header token: `base64(account_id + ":" + secret_hash)`.
    pub fn token(account_id: &str, secret_hash: &str) -> Self {
        Self::Token(BASE64.encode(format!("{account_id}:{secret_hash}")))
    }

    /// Endpoint used when no override is configured.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Certificate { .. } => CERT_ENDPOINT,
            Self::Token(_) => TOKEN_ENDPOINT,
        }
    }

    pub fn is_certificate(&self) -> bool {
        matches!(self, Self::Certificate { .. })
    }

    /// `Authorization` header value, token mode only.
    pub fn header_value(&self) -> Option<&str> {
        match self {
            Self::Token(token) => Some(token),
            Self::Certificate { .. } => None,
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Certificate { certificate, insecure } => f
                .debug_struct("Certificate")
                .field("certificate", certificate)
                .field("insecure", insecure)
                .finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

/// Validated, immutable stream configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    auth: Auth,
    endpoint: Url,
    backoff: BackoffConfig,
    channel_capacity: usize,
    dedup_ttl: Duration,
    dedup_capacity: usize,
}

impl StreamConfig {
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::default()
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    /// Capacity of the output channel; a full channel stalls the read loop.
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn dedup_ttl(&self) -> Duration {
        self.dedup_ttl
    }

    pub fn dedup_capacity(&self) -> usize {
        self.dedup_capacity
    }
}

/// Builder for [`StreamConfig`].
///
/// When both a certificate and an account are supplied the certificate wins.
#[derive(Clone, Default)]
pub struct StreamConfigBuilder {
    certificate: Option<ClientCertificate>,
    cert_dir: Option<PathBuf>,
    account: Option<(String, String)>,
    url: Option<String>,
    insecure: bool,
    backoff: Option<BackoffConfig>,
    channel_capacity: Option<usize>,
    dedup_ttl: Option<Duration>,
    dedup_capacity: Option<usize>,
}

impl StreamConfigBuilder {
    /// Authenticate with an account id and secret hash header.
    pub fn account(mut self, account_id: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        self.account = Some((account_id.into(), secret_hash.into()));
        self
    }

    /// Authenticate with an in-memory client certificate.
    pub fn certificate(mut self, certificate: ClientCertificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Authenticate with the certificate pair stored in `dir`.
    /// Files are read by [`build`](Self::build).
    pub fn cert_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cert_dir = Some(dir.into());
        self
    }

    /// Endpoint override. An empty string keeps the default endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Skip server verification in certificate mode.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    pub fn dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = Some(ttl);
        self
    }

    pub fn dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<StreamConfig, ConfigError> {
        let certificate = match (self.certificate, self.cert_dir) {
            (Some(cert), _) => Some(cert),
            (None, Some(dir)) => Some(ClientCertificate::from_dir(dir)?),
            (None, None) => None,
        };

        let auth = match (certificate, self.account) {
            (Some(certificate), _) => Auth::Certificate {
                certificate,
                insecure: self.insecure,
            },
            (None, Some((account_id, secret_hash))) => Auth::token(&account_id, &secret_hash),
            (None, None) => return Err(ConfigError::NoAuthentication),
        };

        let raw = self
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| auth.default_endpoint().to_string());
        let endpoint = parse_endpoint(&raw)?;

        Ok(StreamConfig {
            auth,
            endpoint,
            backoff: self.backoff.unwrap_or_default(),
            channel_capacity: self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY).max(1),
            dedup_ttl: self.dedup_ttl.unwrap_or(DEFAULT_DEDUP_TTL),
            dedup_capacity: self.dedup_capacity.unwrap_or(DEFAULT_DEDUP_CAPACITY).max(1),
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}', expected ws or wss"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert() -> ClientCertificate {
        ClientCertificate::from_pem(b"cert".to_vec(), b"key".to_vec())
    }

    #[test]
    fn no_auth_is_rejected() {
        let err = StreamConfig::builder().url("wss://example.com/ws").build().unwrap_err();
        assert!(matches!(err, ConfigError::NoAuthentication));
    }

    #[test]
    fn account_token_is_base64_of_pair() {
        let cfg = StreamConfig::builder().account("acct", "s3cret").build().unwrap();
        // base64("acct:s3cret")
        assert_eq!(cfg.auth().header_value(), Some("YWNjdDpzM2NyZXQ="));
        assert_eq!(cfg.endpoint().as_str(), TOKEN_ENDPOINT);
    }

    #[test]
    fn certificate_takes_precedence_over_account() {
        let cfg = StreamConfig::builder()
            .account("acct", "s3cret")
            .certificate(cert())
            .insecure(true)
            .build()
            .unwrap();
        assert!(cfg.auth().is_certificate());
        assert!(matches!(cfg.auth(), Auth::Certificate { insecure: true, .. }));
        assert_eq!(cfg.auth().header_value(), None);
        assert_eq!(cfg.endpoint().as_str(), "wss://eth.feed.blxrbdn.com:28333/");
    }

    #[test]
    fn explicit_url_overrides_default() {
        let cfg = StreamConfig::builder()
            .account("a", "b")
            .url("ws://127.0.0.1:9000/feed")
            .build()
            .unwrap();
        assert_eq!(cfg.endpoint().as_str(), "ws://127.0.0.1:9000/feed");
    }

    #[test]
    fn empty_url_means_default() {
        let cfg = StreamConfig::builder().account("a", "b").url("").build().unwrap();
        assert_eq!(cfg.endpoint().as_str(), TOKEN_ENDPOINT);
    }

    #[test]
    fn non_websocket_url_is_rejected() {
        let err = StreamConfig::builder()
            .account("a", "b")
            .url("https://api.example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));

        let err = StreamConfig::builder().account("a", "b").url("::nope").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn missing_cert_dir_fails_build() {
        let err = StreamConfig::builder()
            .cert_dir("/nonexistent/txstream-certs")
            .build()
            .unwrap_err();
        match err {
            ConfigError::Certificate { path, .. } => assert!(path.ends_with(CERT_FILE)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn defaults_and_clamping() {
        let cfg = StreamConfig::builder()
            .account("a", "b")
            .channel_capacity(0)
            .build()
            .unwrap();
        assert_eq!(cfg.channel_capacity(), 1);
        assert_eq!(cfg.dedup_ttl(), DEFAULT_DEDUP_TTL);
        assert_eq!(cfg.dedup_capacity(), DEFAULT_DEDUP_CAPACITY);
        assert_eq!(cfg.backoff(), &BackoffConfig::default());
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = StreamConfig::builder().account("acct", "s3cret").build().unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("YWNjdDpzM2NyZXQ="));
        assert!(dbg.contains("<redacted>"));
    }
}
