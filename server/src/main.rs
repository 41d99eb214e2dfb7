mod app;
mod config;
mod error;
mod routes;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, ParcelStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let fixture_path = config::fixture_path();
    let parcels = match ParcelStore::load(&fixture_path).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "failed to load parcel fixture");
            return;
        }
    };
    if parcels.is_empty() {
        tracing::warn!(path = %fixture_path.display(), "parcel fixture contains no features");
    }
    tracing::info!(
        parcels = parcels.len(),
        path = %fixture_path.display(),
        "Parcel fixture loaded"
    );

    let app = app::build_app(AppState::new(parcels));

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!(static_dir = %config::static_dir().display(), "Landview server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
