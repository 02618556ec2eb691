//! Offline Sync - an offline caching proxy with background reconciliation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_sync::{create_router, App, Config, HttpFetcher};

/// Connect timeout of the shared network client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Main entry point for the offline sync proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open partition storage and wire the components
/// 4. Run the install sequence (seed partitions)
/// 5. Run the activation sequence (purge, restore, start scheduler, drain)
/// 6. Serve the control routes and the interception proxy
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_sync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Offline Sync Proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: origin={}, version={}, port={}, network_timeout={}ms, periodic_sync={}s",
        config.app_origin,
        config.cache_version,
        config.server_port,
        config.network_timeout_ms,
        config.periodic_sync_secs
    );
    let port = config.server_port;

    let fetcher = HttpFetcher::with_connect_timeout(CONNECT_TIMEOUT)
        .context("Failed to build network client")?;
    let mut app = App::build(config, Arc::new(fetcher))
        .await
        .context("Failed to open partition storage")?;

    let installed = app.install().await;
    info!(
        "Seeded {} core resource(s) and {} page(s)",
        installed.core.cached, installed.pages.cached
    );

    let activation = app.activate().await;
    info!(
        "Purged {} stale partition(s), replayed {} of {} pending request(s)",
        activation.purged.len(),
        activation.drained.replayed,
        activation.restored
    );

    let router = create_router(app.state());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(activation.scheduler))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the scheduler.
async fn shutdown_signal(scheduler: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = scheduler {
        handle.abort();
        warn!("Reconciliation scheduler aborted");
    }
}
