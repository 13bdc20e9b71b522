use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jamvote::{
    api, auth, broadcast,
    state::{
        export::{load_snapshot, save_snapshot, StoreConfig},
        AppState,
    },
};

fn bind_addr_from_env() -> SocketAddr {
    let fallback = SocketAddr::from(([0, 0, 0, 0], 8080));
    match std::env::var("BIND_ADDR") {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!(
                "Invalid BIND_ADDR '{}' ({}), using {}",
                raw,
                e,
                fallback
            );
            fallback
        }),
        Err(_) => fallback,
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jamvote=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting jamvote...");

    let auth_config = auth::AuthConfig::from_env();
    let store_config = StoreConfig::from_env();

    let state = Arc::new(AppState::new());

    if let Some(path) = &store_config.snapshot_path {
        match load_snapshot(&state, path).await {
            Ok(true) => {}
            Ok(false) => tracing::info!("No snapshot at {}, starting empty", path.display()),
            Err(e) => {
                // Never overwrite a snapshot we could not read
                tracing::error!("Could not load snapshot {}: {}", path.display(), e);
                return Err(std::io::Error::other(e.to_string()));
            }
        }
    }

    if let Err(e) = state.seed_admin(&auth_config).await {
        tracing::error!("Failed to seed admin account: {}", e);
    }

    broadcast::spawn_live_tally_broadcaster(state.clone());
    if let Some(path) = &store_config.snapshot_path {
        broadcast::spawn_snapshot_writer(
            state.clone(),
            path.clone(),
            store_config.snapshot_interval,
        );
    }

    let app = api::router(state.clone());

    let addr = bind_addr_from_env();
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &store_config.snapshot_path {
        match save_snapshot(&state, path).await {
            Ok(()) => tracing::info!("Final snapshot written to {}", path.display()),
            Err(e) => tracing::error!("Final snapshot failed: {}", e),
        }
    }

    Ok(())
}
