//! txstream CLI — print the pending-transaction feed as JSON lines.
//!
//! Usage:
//! ```bash
//! # Header-token access
//! ACCOUNT_ID=... SECRET_HASH=... txstream > txs.jsonl
//!
//! # Client-certificate access against a custom gateway
//! CERT_DIR=./certs WS_URL=wss://127.0.0.1:28333 INSECURE=1 txstream
//! ```
//!
//! Environment:
//! - `ACCOUNT_ID`, `SECRET_HASH` — account credentials (required unless `CERT_DIR` is set)
//! - `CERT_DIR`  — directory holding `external_gateway_cert.pem` / `external_gateway_key.pem`
//! - `WS_URL`    — endpoint override
//! - `INSECURE`  — skip server verification in certificate mode
//! - `RUST_LOG`  — log filter (default `info`), `LOG_JSON=1` for JSON logs on stderr

use std::env;
use std::io::{self, Write};
use std::process;

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use txstream_ws::{StreamConfig, TxStream};

#[tokio::main]
async fn main() {
    init_tracing(env_flag("LOG_JSON"));

    if let Err(e) = run().await {
        tracing::error!(error = %format!("{e:#}"), "txstream failed");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = config_from_env()?;
    let stream = TxStream::new(config).context("failed to prepare tx stream")?;

    let shutdown = CancellationToken::new();
    let mut feed = stream.start(shutdown.clone());

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
        }
        ctrl_c.cancel();
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    while let Some(tx) = feed.recv().await {
        serde_json::to_writer(&mut out, &tx).context("failed to encode transaction")?;
        out.write_all(b"\n").context("failed to write to stdout")?;
        out.flush().context("failed to flush stdout")?;
    }
    drop(out);

    feed.join().await.context("stream task panicked")?;
    Ok(())
}

fn config_from_env() -> anyhow::Result<StreamConfig> {
    let mut builder = StreamConfig::builder();

    let cert_dir = env_var("CERT_DIR");
    match (env_var("ACCOUNT_ID"), env_var("SECRET_HASH")) {
        (Some(account_id), Some(secret_hash)) => {
            builder = builder.account(account_id, secret_hash);
        }
        (None, _) if cert_dir.is_none() => bail!("ACCOUNT_ID not set in environment"),
        (_, None) if cert_dir.is_none() => bail!("SECRET_HASH not set in environment"),
        _ => {}
    }
    // a certificate takes precedence over account credentials
    if let Some(dir) = cert_dir {
        builder = builder.cert_dir(dir).insecure(env_flag("INSECURE"));
    }

    if let Some(url) = env_var("WS_URL") {
        builder = builder.url(url);
    }

    builder.build().context("invalid stream configuration")
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_flag(name: &str) -> bool {
    matches!(
        env_var(name).as_deref(),
        Some("1" | "true" | "TRUE" | "yes")
    )
}

/// Logs go to stderr; stdout carries only transactions.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .init();
    }
}
