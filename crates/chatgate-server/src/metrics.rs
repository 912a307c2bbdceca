//! Prometheus recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Call once at startup before any metric is recorded. The handle renders the
/// `/metrics` body.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// HTTP requests total (counter, labels: path).
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connections displaced by a reconnect with the same session id (counter).
pub const WS_CONNECTIONS_REPLACED_TOTAL: &str = "ws_connections_replaced_total";
/// Broadcast drops total (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Provider requests total (counter, labels: provider).
pub const PROVIDER_REQUESTS_TOTAL: &str = "provider_requests_total";
/// Provider errors total (counter, labels: provider, kind).
pub const PROVIDER_ERRORS_TOTAL: &str = "provider_errors_total";
/// Sessions forced from the hosted provider to the local fallback (counter).
pub const PROVIDER_FAILOVERS_TOTAL: &str = "provider_failovers_total";
/// Provider request duration seconds (histogram, labels: provider).
pub const PROVIDER_REQUEST_DURATION_SECONDS: &str = "provider_request_duration_seconds";
/// Provider degraded state (gauge, labels: provider). 1 = degraded, 0 = healthy.
pub const PROVIDER_DEGRADED: &str = chatgate_llm::health::PROVIDER_DEGRADED;
