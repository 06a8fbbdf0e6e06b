mod config;
mod routes;

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hearth=debug,hearth_db=info,hearth_scheduler=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Restore state and replay deferred work before accepting requests.
    let booted = hearth_scheduler::boot(&config.boot).await?;
    info!(
        "Snapshots every {:?} to {}",
        config.boot.snapshot_period,
        booted.artifact.path().display()
    );

    let app = Router::new()
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(booted.store.clone());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Hearth listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Pending timers are dropped with the runtime; write what we have once
    // the loop can no longer overwrite it.
    booted.persistence.stop().await;
    let bytes = hearth_scheduler::persistence::save_snapshot(&booted.store, &booted.artifact).await?;
    info!("Final snapshot written ({} bytes)", bytes);

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
