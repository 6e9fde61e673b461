use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Routes left out of the request metrics.
const UNTRACKED_ROUTES: &[&str] = &["/health", "/metrics"];

/// Route label for a request. Unmatched requests share one label so that ids in raw
/// paths (`/pets/{uuid}`) never become series of their own.
fn route_label(matched_path: Option<&str>) -> Option<String> {
    match matched_path {
        Some(route) if UNTRACKED_ROUTES.contains(&route) => None,
        Some(route) => Some(route.to_string()),
        None => Some("unmatched".to_string()),
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(route) = route_label(matched_path.as_ref().map(MatchedPath::as_str)) else {
        return next.run(req).await;
    };

    let start = Instant::now();
    let method = req.method().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status();

    let labels = [
        ("method", method),
        ("route", route),
        ("status", status.as_u16().to_string()),
        ("class", status_class(status).to_string()),
    ];

    counter!("pawmatch_http_requests_total", &labels).increment(1);
    histogram!("pawmatch_http_request_duration_seconds", &labels).record(duration);

    response
}

/// Installs the global Prometheus recorder. Call once per process.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// A handle backed by a recorder that is not installed globally, for tests and tools.
pub fn detached_metrics_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
