use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sprinkler_core::clock::SystemClock;
use sprinkler_gpio::{MemoryPinDriver, PinDriver, SysfsPinDriver, ZoneMap};
use sprinkler_runtime::ZoneRuntime;
use sprinkler_store::ScheduleStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sprinkler_api::config::{GpioBackend, ServerConfig};
use sprinkler_api::engine::dispatcher::ScheduleDispatcher;
use sprinkler_api::router::build_app_router;
use sprinkler_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sprinkler_api=debug,sprinkler_runtime=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Arc::new(ServerConfig::from_env()?);
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- GPIO ---
    let zones = ZoneMap::new(config.gpio.pins.clone(), &config.gpio.deny)
        .context("Invalid SPRINKLER_GPIO_PINS")?;

    let driver: Arc<dyn PinDriver> = match config.gpio.backend {
        GpioBackend::Sysfs => Arc::new(
            SysfsPinDriver::open(&config.gpio.sysfs_root, zones.pins(), config.gpio.active_low)
                .context("Failed to initialise GPIO pins")?,
        ),
        GpioBackend::Memory => {
            tracing::warn!("Using in-memory GPIO backend; no valves will move");
            Arc::new(MemoryPinDriver::new(zones.pins()))
        }
    };
    tracing::info!(backend = driver.backend(), zones = zones.len(), "GPIO driver ready");

    let runtime = ZoneRuntime::new(driver, zones);
    runtime
        .reset_all_outputs()
        .context("Failed to de-energize zone outputs")?;

    // --- Schedule store ---
    let store = Arc::new(
        ScheduleStore::open(&config.schedules_path)
            .await
            .context("Failed to open schedule store")?,
    );

    // --- Schedule dispatcher ---
    let dispatcher = Arc::new(ScheduleDispatcher::new(
        Arc::clone(&runtime),
        Arc::clone(&store),
        Arc::new(SystemClock),
        Duration::from_secs(config.poll_interval_secs),
    ));
    let dispatch_cancel = CancellationToken::new();
    let dispatch_failed = CancellationToken::new();
    let dispatch_handle = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        let cancel = dispatch_cancel.clone();
        let failed = dispatch_failed.clone();
        async move {
            let result = dispatcher.run(cancel).await;
            if result.is_err() {
                failed.cancel();
            }
            result
        }
    });

    // --- Router ---
    let state = AppState::new(
        Arc::clone(&config),
        Arc::clone(&runtime),
        store,
        dispatcher,
    );
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(dispatch_failed))
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    dispatch_cancel.cancel();
    let dispatch_result = dispatch_handle.await;

    let stopped = runtime.shutdown_all().await;
    tracing::info!(stopped, "All zones de-energized");

    dispatch_result
        .context("Schedule dispatcher task panicked")?
        .context("Schedule dispatcher failed")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal, or for the dispatcher to fail, to initiate
/// graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd).
async fn shutdown_signal(dispatch_failed: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
        () = dispatch_failed.cancelled() => {
            tracing::error!("Schedule dispatcher stopped, shutting down");
        }
    }
}
