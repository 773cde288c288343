use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use crate::tts::TtsService;

/// Covers reference-audio uploads, which outgrow axum's 2 MiB default.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub struct AppState {
    pub tts: TtsService,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/tts", post(handlers::tts))
        .route("/tts/upload", post(handlers::tts_upload))
        .route("/health", get(handlers::health))
        .route("/tags", get(handlers::tags));

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/", ServeDir::new("static").append_index_html_on_directories(true))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
