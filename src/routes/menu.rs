//! Full pipeline route
//!
//! POST /api/menu - multipart field `image`; uploads, transcribes, parses
//! and illustrates the menu in one call.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::{EnrichedMenu, PipelineError, ProcessStep, StepId};
use crate::state::AppState;

use super::upload::read_image_field;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PipelineErrorResponse {
    error: &'static str,
    message: String,
    step: StepId,
    steps: Vec<ProcessStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = Json(PipelineErrorResponse {
            error: "pipeline_error",
            message: self.to_string(),
            step: self.step,
            steps: self.steps,
            source_image_url: self.source_image_url,
            text: self.text,
        });

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub async fn process_menu(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<std::result::Result<Json<EnrichedMenu>, PipelineError>> {
    let upload = read_image_field(multipart).await?;
    Ok(state.pipeline().run(upload).await.map(Json))
}
