//! Image proxy route
//!
//! GET /api/image-proxy?url=... - relays a validated third-party image or
//! redirects to the placeholder. Never answers with an error status.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::proxy::{FetchedImage, ProxiedImage};
use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=86400, stale-while-revalidate=43200";

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

pub async fn proxy_image(
    State(state): State<AppState>,
    query: Option<Query<ProxyQuery>>,
) -> Response {
    let url = query
        .and_then(|Query(query)| query.url)
        .unwrap_or_default();

    match state.validator().fetch_image(&url).await {
        ProxiedImage::Image(image) => {
            let placeholder = state.validator().policy().placeholder().to_string();
            image_response(image).unwrap_or_else(|| Redirect::temporary(&placeholder).into_response())
        }
        ProxiedImage::Redirect(target) => Redirect::temporary(&target).into_response(),
    }
}

fn image_response(image: FetchedImage) -> Option<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, image.content_type)
        .header(header::CONTENT_LENGTH, image.data.len())
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, HEAD")
        .body(Body::from(image.data))
        .map_err(|e| tracing::warn!("Failed to build proxy response: {}", e))
        .ok()
}
