//! Application entry point and server initialization
//!
//! Loads configuration, initializes logging and the database, then serves the
//! router until SIGINT/SIGTERM.

use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use linklens::config::Config;
use linklens::database::{init_db, AppState};
use linklens::oauth::GoogleProvider;
use linklens::route::create_app;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("linklens=debug,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    if config.google.client_id.is_empty() {
        tracing::warn!("GOOGLE_CLIENT_ID is not set, OAuth login will fail");
    }

    let db = init_db(&config.database_url).expect("Failed to initialize database");

    let state = AppState {
        db: Arc::new(db),
        identity: Arc::new(GoogleProvider::new(config.google.clone())),
        config: Arc::new(config.clone()),
    };

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server running at http://localhost:{}", config.port);
    tracing::info!("Using database: {}", config.database_url);

    // Peer addresses are needed to attribute clicks to client IPs
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Resolves on Ctrl+C (SIGINT) or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server");
}
