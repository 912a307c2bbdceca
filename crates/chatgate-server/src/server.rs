//! `GatewayServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chatgate_core::ProviderSelection;
use chatgate_llm::{BackendSet, ProviderHealthTracker};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::metrics::HTTP_REQUESTS_TOTAL;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers and session tasks.
#[derive(Clone)]
pub struct AppState {
    /// Live transports.
    pub registry: Arc<ConnectionRegistry>,
    /// Hosted and local backends.
    pub backends: BackendSet,
    /// Provider every new session starts on.
    pub default_provider: ProviderSelection,
    /// Provider error-rate tracker.
    pub health: Arc<ProviderHealthTracker>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cancelled on shutdown.
    pub shutdown: CancellationToken,
    /// Session task tracking for shutdown drain.
    coordinator: Arc<ShutdownCoordinator>,
    metrics_handle: PrometheusHandle,
}

/// The chat gateway server.
pub struct GatewayServer {
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    backends: BackendSet,
    default_provider: ProviderSelection,
    health: Arc<ProviderHealthTracker>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics_handle: PrometheusHandle,
}

impl GatewayServer {
    /// Create a server. `default_provider` seeds every new session's
    /// selection.
    pub fn new(
        config: ServerConfig,
        backends: BackendSet,
        default_provider: ProviderSelection,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(ConnectionRegistry::new()),
            backends,
            default_provider,
            health: Arc::new(ProviderHealthTracker::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics_handle,
        }
    }

    fn state(&self) -> AppState {
        AppState {
            registry: self.registry.clone(),
            backends: self.backends.clone(),
            default_provider: self.default_provider,
            health: self.health.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.token(),
            coordinator: self.shutdown.clone(),
            metrics_handle: self.metrics_handle.clone(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws/{session_id}", get(ws_handler))
            .route("/api/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state())
    }

    /// Bind and serve in a background task until shutdown is signalled.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(%addr, default_provider = self.default_provider.name(), "chatgate server listening");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
        });
        Ok((addr, handle))
    }

    /// Connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Provider health tracker.
    pub fn health(&self) -> &Arc<ProviderHealthTracker> {
        &self.health
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Provider new sessions start on.
    pub fn default_provider(&self) -> ProviderSelection {
        self.default_provider
    }
}

/// GET /ws/{session_id}
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let tracker = state.coordinator.tracker().clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| tracker.track_future(run_ws_session(socket, session_id, state)))
        .into_response()
}

/// GET /api/health
async fn health_handler() -> Json<HealthResponse> {
    counter!(HTTP_REQUESTS_TOTAL, "path" => "/health").increment(1);
    Json(health::health_check())
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    crate::metrics::render(&state.metrics_handle)
}
