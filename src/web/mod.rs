//! HTTP surface - axum router, shared state and JSON endpoints.

/// Conversion of failures into HTTP responses
pub mod error;
/// Multipart form decoding
pub mod forms;
mod handlers;
/// JSON response shapes and notices
pub mod views;

use crate::{config::AppConfig, images::ImageGateway};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: Arc<DatabaseConnection>,
    /// The configured image host
    pub gateway: ImageGateway,
    /// Resolved configuration
    pub config: Arc<AppConfig>,
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::catalog::index))
        .route("/health", get(handlers::health))
        .route(
            "/add",
            get(handlers::products::add_form).post(handlers::products::add),
        )
        .route(
            "/edit/:id",
            get(handlers::products::edit_form).post(handlers::products::edit),
        )
        .route("/delete/:id", post(handlers::products::delete))
        .route("/upload", post(handlers::uploads::upload))
        .route(
            "/diagnostics/:provider",
            get(handlers::diagnostics::diagnostics),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
