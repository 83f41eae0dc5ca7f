//! Text extraction route
//!
//! POST /api/extract-text - `{imageUrl}` → `{text}`

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::AppState;

use super::{json_body, required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub image_url: Option<String>,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub text: String,
}

pub async fn extract_text(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>> {
    let request = json_body(payload)?;
    let image_url = required(request.image_url, "Image URL is required.")?;

    let text = state.extractor().extract_text(&image_url).await?;
    Ok(Json(ExtractResponse { text }))
}
