//! Cloud provider runtime CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   provider-runtime <command>
//!          │
//!          ▼
//!   ┌─────────────┐    ┌──────────────────┐    ┌────────────────────┐
//!   │  lifecycle  │───▶│       api        │───▶│  http::transport   │───▶ control plane
//!   │ wait/delete │    │ ControlPlane     │    │ retries.rs         │
//!   │   cleanup   │    │ Client           │    │ backoff.rs         │
//!   └──────┬──────┘    └──────────────────┘    └────────────────────┘
//!          │                                             ▲
//!          ▼                                             │
//!   ┌─────────────┐    ┌──────────────────┐              │
//!   │   polling   │    │   credentials    │──────────────┘
//!   │  poller.rs  │    │ expiring cache   │───▶ storage client ───▶ object storage
//!   └─────────────┘    └──────────────────┘
//!
//!   Cross-cutting: config (TOML), observability (tracing, metrics),
//!                  shutdown (Ctrl-C → cancellation tokens)
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use provider_runtime::api::{ControlPlaneClient, ResourceKind};
use provider_runtime::config::{load_config, ProviderConfig};
use provider_runtime::credentials::{ExpiringResourceCache, HttpCredentialIssuer};
use provider_runtime::lifecycle::{listen_for_ctrl_c, BulkCleanup, ResourceLifecycle, Shutdown};
use provider_runtime::observability::{logging, metrics};
use provider_runtime::polling::ConvergencePoller;
use provider_runtime::storage::ObjectStorageClientFactory;

#[derive(Parser)]
#[command(name = "provider-runtime")]
#[command(about = "Manage and wait on cloud provider resources", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "provider.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a resource to become ready (or gone)
    Wait {
        kind: ResourceKind,
        id: String,
        /// Wait for the resource to disappear instead
        #[arg(long)]
        gone: bool,
    },
    /// Delete a resource and wait until it is gone
    Delete { kind: ResourceKind, id: String },
    /// Delete every resource of a kind whose name starts with a prefix
    Cleanup {
        kind: ResourceKind,
        #[arg(long)]
        prefix: String,
    },
    /// Check that a bucket is reachable with a freshly issued key
    StorageCheck {
        bucket: String,
        /// Storage zone (defaults to `storage.default_zone`)
        #[arg(long)]
        zone: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        config = %cli.config.display(),
        endpoint = %config.api.endpoint,
        max_attempts = config.retries.max_attempts,
        poll_interval_ms = config.polling.interval_ms,
        "provider-runtime v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();
    listen_for_ctrl_c(shutdown.clone());

    let result = run(cli.command, &config, &shutdown).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}

async fn run(
    command: Commands,
    config: &ProviderConfig,
    shutdown: &Shutdown,
) -> Result<(), Box<dyn std::error::Error>> {
    let api = ControlPlaneClient::new(&config.api, config.retries.clone())?;
    let lifecycle = Arc::new(ResourceLifecycle::new(
        api.clone(),
        ConvergencePoller::new(config.polling.interval()),
        config.polling.timeout(),
    ));
    let cancel = shutdown.subscribe();

    match command {
        Commands::Wait { kind, id, gone } => {
            let converged = if gone {
                lifecycle.wait_gone(kind, &id, &cancel).await?
            } else {
                lifecycle.wait_ready(kind, &id, &cancel).await?
            };
            println!("{} {}: {}", kind, id, converged.observation);
        }
        Commands::Delete { kind, id } => {
            lifecycle.delete_and_wait(kind, &id, &cancel).await?;
            println!("{} {}: deleted", kind, id);
        }
        Commands::Cleanup { kind, prefix } => {
            let report = BulkCleanup::new(lifecycle, &config.cleanup)
                .run(kind, &prefix, &cancel)
                .await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "kind": kind.label(),
                "deleted": report.deleted,
                "skipped": report.skipped,
            }))?);
        }
        Commands::StorageCheck { bucket, zone } => {
            let zone = zone.unwrap_or_else(|| config.storage.default_zone.clone());
            let factory =
                ObjectStorageClientFactory::new(&config.storage.endpoint_template, api.transport().clone());
            let cache = ExpiringResourceCache::new(
                Arc::new(HttpCredentialIssuer::new(api, cancel.clone())),
                factory,
                config.storage.credential_ttl(),
                config.storage.refresh_margin(),
            );

            let pair = cache.acquire(&zone).await?;
            let exists = pair.client().head_bucket(&bucket, &cancel).await?;
            println!(
                "{} in {}: {} (key {} expires {})",
                bucket,
                zone,
                if exists { "reachable" } else { "not found" },
                pair.credential().access_key,
                pair.credential().expires_at
            );
        }
    }

    Ok(())
}
