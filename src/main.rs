//! User sign-up confirmation service.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /api/auth/sign-up
//!     ──────────────────────▶ http ──create_user──▶ store (NEW)
//!                               │
//!                               └──enqueue──▶ confirmation queue (bounded)
//!                                                   │
//!                                                   ▼
//!                                         confirmation worker
//!                                   PROCESSING → record → mail → PENDING
//!
//!     GET /api/users/confirm/{nonce}
//!     ──────────────────────▶ http ──confirm──▶ store (CONFIRMED)
//!
//!     SIGINT/SIGTERM ─▶ shutdown coordinator
//!                       close queue → drain worker → cancel → server stops
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use confirm_service::config::load_config;
use confirm_service::lifecycle::{Lifecycle, Signals};
use confirm_service::mail;
use confirm_service::observability::{logging, metrics};
use confirm_service::store::MemoryStore;

#[derive(Parser)]
#[command(name = "confirm-service")]
#[command(about = "User sign-up and email confirmation service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    tracing::info!("confirm-service v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_url = %config.app.base_url,
        queue_capacity = config.confirmation.queue_capacity,
        mail_transport = ?config.mail.transport,
        drain_timeout_secs = config.shutdown.drain_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let store = Arc::new(MemoryStore::new());
    let mailer = mail::from_config(&config.mail)?;
    let mut signals = Signals::install()?;

    let running = Lifecycle::new(config)
        .start(store, mailer, async move { signals.recv().await })
        .await?;
    let report = running.wait().await?;

    if let Some(worker) = report.worker {
        tracing::info!(
            processed = worker.processed(),
            abandoned = worker.abandoned,
            "Confirmation worker stopped"
        );
    }
    tracing::info!(
        drained = report.shutdown.drained,
        elapsed = ?report.shutdown.elapsed,
        "graceful shutdown"
    );
    Ok(())
}
