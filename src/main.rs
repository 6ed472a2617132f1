//! RenderHub Server: asynchronous report rendering with a content-addressed cache.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use renderhub_cache::CacheStore;
use renderhub_core::config::AppConfig;
use renderhub_core::error::AppError;
use renderhub_core::traits::{Clock, Compressor, SystemClock};
use renderhub_worker::compression::{FallbackCompressor, ZipCompressor};
use renderhub_worker::render::{CompressingRenderer, JsonLinesRenderer};
use renderhub_worker::{JobRegistry, Reaper, RenderExecutor, Scheduler};

#[tokio::main]
async fn main() {
    let env = std::env::var("RENDERHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Build the renderer table.
fn build_executor() -> RenderExecutor {
    let compressor: Arc<dyn Compressor> = Arc::new(FallbackCompressor::new(
        Arc::new(ZipCompressor::deflated()),
        Arc::new(ZipCompressor::stored()),
    ));

    let mut executor = RenderExecutor::new();
    executor.register(Arc::new(JsonLinesRenderer::new("jsonl")));
    executor.register(Arc::new(CompressingRenderer::new(
        Arc::new(JsonLinesRenderer::new("batch")),
        compressor,
    )));
    executor
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting RenderHub v{}", env!("CARGO_PKG_VERSION"));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // ── Step 1: Open the artifact cache ──────────────────────────
    let cache = Arc::new(CacheStore::open(&config.cache, Arc::clone(&clock)).await?);
    tracing::info!(root = %cache.root().display(), "Cache ready");

    // ── Step 2: Job registry and renderers ───────────────────────
    let registry = Arc::new(JobRegistry::new());
    let executor = build_executor();

    // ── Step 3: Scheduler and worker pool ────────────────────────
    let (scheduler, runner) = Scheduler::new(
        &config.worker,
        executor,
        Arc::clone(&registry),
        Arc::clone(&cache),
        Arc::clone(&clock),
    );
    let scheduler = Arc::new(scheduler);

    // ── Step 4: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Start background tasks ───────────────────────────
    let worker_handle = tokio::spawn(runner.run(shutdown_rx.clone()));

    let reaper = Reaper::new(
        Arc::clone(&cache),
        Arc::clone(&registry),
        config.reaper.clone(),
        Arc::clone(&clock),
    );
    let reaper_handle = tokio::spawn(reaper.run(shutdown_rx.clone()));

    // ── Step 6: Build and start HTTP server ──────────────────────
    let grace = Duration::from_secs(config.worker.shutdown_grace_seconds);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = renderhub_api::AppState::new(Arc::new(config), scheduler, cache);
    let app = renderhub_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("RenderHub server listening on {}", addr);

    // ── Step 7: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 8: Wait for background tasks ────────────────────────
    tracing::info!("Waiting for background tasks to complete...");
    let _ = tokio::time::timeout(grace + Duration::from_secs(1), worker_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper_handle).await;

    tracing::info!("RenderHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
