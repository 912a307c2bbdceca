//! Liveness probe.

use serde::Serialize;

/// Body of `GET /api/health`. Always `{"status":"ok"}` while the process
/// is serving.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: &'static str,
}

/// Build the health response.
pub fn health_check() -> HealthResponse {
    HealthResponse { status: "ok" }
}
