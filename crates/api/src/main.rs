use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poker_api::config::ServerConfig;
use poker_api::router::build_app_router;
use poker_api::state::AppState;
use poker_api::ws::auto_reveal::AutoRevealScheduler;
use poker_api::ws::Hub;
use poker_api::background;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poker_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://poker.db".to_string());

    let pool = poker_db::create_pool(&database_url)
        .await
        .expect("Failed to open database");
    tracing::info!("Database connection pool created");

    poker_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    poker_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Hub & schedulers ---
    let hub = Arc::new(Hub::new());
    let auto_reveal = Arc::new(AutoRevealScheduler::new());

    // --- Background cleanup ---
    let cleanup_cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(background::room_cleanup::run(
        pool.clone(),
        cleanup_cancel.clone(),
    ));

    // --- App state & router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        hub,
        auto_reveal,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cleanup_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await;
    tracing::info!("Room cleanup job stopped");
}

/// Resolve when SIGINT (or SIGTERM on Unix) arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
