use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pawmatch_shared::{HealthCheck, HealthResponse, HealthStatus};
use std::sync::Arc;

use crate::routes::blocking;
use crate::store::Store;
use crate::AppState;

/// Health check that probes the entity store.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let probe = blocking(&state, |state| state.store.ping()).await;
    let checks = vec![HealthCheck::from_result("store", probe)];

    let response = HealthResponse::healthy("pawmatch-api", env!("CARGO_PKG_VERSION")).with_checks(checks);

    let status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
