//! Menu parsing route
//!
//! POST /api/parse-menu - `{text}` → `{menu}`

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::MenuItem;
use crate::state::AppState;

use super::{json_body, required};

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub text: Option<String>,
}

#[derive(Serialize)]
pub struct ParseResponse {
    pub menu: Vec<MenuItem>,
}

pub async fn parse_menu(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ParseRequest>, JsonRejection>,
) -> Result<Json<ParseResponse>> {
    let request = json_body(payload)?;
    let text = required(request.text, "Text is required.")?;

    let menu = state.parser().parse_menu(&text).await?;
    Ok(Json(ParseResponse { menu }))
}
