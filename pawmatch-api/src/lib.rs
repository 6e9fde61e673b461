use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use config::AppConfig;
use store::Backend;

pub struct AppState {
    pub store: Backend,
    pub config: AppConfig,
    pub metrics_handle: PrometheusHandle,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    use routes::{discover, health, likes, matches, messages, pets};

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/me", get(pets::me))
        .route("/pets", get(pets::list_pets).post(pets::create_pet))
        .route(
            "/pets/:id",
            get(pets::get_pet).patch(pets::update_pet).delete(pets::delete_pet),
        )
        .route("/pets/:id/select", post(pets::select_pet))
        .route("/pets/:id/images", get(pets::list_images).post(pets::add_image))
        .route("/discover", get(discover::discover))
        .route("/likes", post(likes::send_like))
        .route("/passes", post(likes::send_pass))
        .route("/matches", get(matches::list_matches))
        .route("/matches/:id", get(matches::get_match))
        .route(
            "/matches/:id/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/matches/:id/messages/read", patch(messages::mark_read))
        .layer(middleware::from_fn(pawmatch_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
