//! Dish image route
//!
//! POST /api/resolve-dish-image - `{name}` → `{info: url}`. Search failures
//! answer with the placeholder, never with an error status.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::AppState;

use super::{json_body, required};

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub info: String,
}

pub async fn resolve_dish_image(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<ResolveResponse>> {
    let request = json_body(payload)?;
    let name = required(request.name, "Dish name is required.")?;

    let info = state.resolver().resolve_dish_image(&name).await;
    Ok(Json(ResolveResponse { info }))
}
