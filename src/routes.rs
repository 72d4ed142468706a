//! Route definitions for the coordinator query service

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::*;
use crate::state::AppState;

// Read-only status routes
pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_greeting))
        .route("/flights", get(list_flights))
        .route("/eventIndex", get(event_index))
        .route("/health", get(health_check))
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    status_routes()
        .layer(build_cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
