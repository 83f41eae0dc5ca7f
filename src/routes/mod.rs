//! Route modules for Menu Vision Server

pub mod extract;
pub mod health;
pub mod menu;
pub mod parse;
pub mod proxy;
pub mod resolve;
pub mod upload;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{method_not_allowed, AppError, Result};
use crate::state::AppState;

/// Route the image proxy is mounted on
pub const IMAGE_PROXY_ROUTE: &str = "/api/image-proxy";

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_body = state.config().server.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .route("/api/upload", post(upload::upload_image).fallback(method_not_allowed))
        .route("/api/extract-text", post(extract::extract_text).fallback(method_not_allowed))
        .route("/api/parse-menu", post(parse::parse_menu).fallback(method_not_allowed))
        .route(
            "/api/resolve-dish-image",
            post(resolve::resolve_dish_image).fallback(method_not_allowed),
        )
        .route(IMAGE_PROXY_ROUTE, get(proxy::proxy_image).fallback(method_not_allowed))
        .route("/api/menu", post(menu::process_menu).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Unwrap a JSON body, turning malformed bodies into 400s
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// A required, non-blank string field
fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}
