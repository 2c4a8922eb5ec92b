use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use cupid_common::{config::AppConfig, db::DbPool, db::Repository, metrics};
use cupid_gateway::responder::{GroqResponder, MockResponder, Responder};
use cupid_gateway::{create_router, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Course Cupid gateway v{}", cupid_common::VERSION);

    // Initialize metrics; the recorder must be in place before the
    // descriptions are registered, or they land on the no-op recorder
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repo = Repository::from_config(db, &config.database);

    // Pick the reply backend. Without an API key the gateway runs with the
    // local canned responder so the chat flow stays usable in development.
    let responder: Arc<dyn Responder> = if config.use_mock_responder() {
        info!("No responder API key configured, using mock responder");
        Arc::new(MockResponder)
    } else {
        Arc::new(GroqResponder::new(config.responder.clone()))
    };

    let config = Arc::new(config);
    let state = AppState::new(config.clone(), repo, responder);

    // Build the router, with the Prometheus scrape endpoint alongside
    let metrics_route = Router::new().route(
        "/metrics",
        get(move || {
            let handle = prometheus.clone();
            async move { handle.render() }
        }),
    );
    let app = create_router(state).merge(metrics_route);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
