use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;

use crate::config::Config;
use crate::metrics::ServerMetrics;
use crate::persistence::PersistencePort;
use crate::server::RaceCoordinator;

use super::handler::websocket_handler;

/// Builds the Axum router: `/ws` for the protocol, `/health` and `/metrics`
/// for operational visibility.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<RaceCoordinator>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("no valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics_handler(State(coordinator): State<Arc<RaceCoordinator>>) -> axum::Json<crate::metrics::MetricsSnapshot> {
    axum::Json(coordinator.metrics().snapshot())
}

/// Builds the coordinator, wires the heartbeat sweep, and serves until the
/// process is stopped.
pub async fn run_server(
    addr: SocketAddr,
    config: Config,
    persistence: Arc<dyn PersistencePort>,
    cors_origins: String,
) -> anyhow::Result<()> {
    let metrics = Arc::new(ServerMetrics::new());
    let coordinator = RaceCoordinator::new(config, persistence, metrics);
    coordinator.spawn_heartbeat();

    let app = create_router(&cors_origins).with_state(coordinator);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "starting race coordinator");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
