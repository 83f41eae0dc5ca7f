//! Upload route
//!
//! POST /api/upload - store a menu photo, multipart field `image`

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::pipeline::MenuUpload;
use crate::state::AppState;

/// Multipart field carrying the photo
pub const IMAGE_FIELD: &str = "image";

#[derive(Serialize)]
pub struct UploadResponse {
    pub url: String,
}

pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let upload = read_image_field(multipart).await?;

    let url = state
        .store()
        .store(upload.data, &upload.content_type, &upload.file_name)
        .await?;

    Ok(Json(UploadResponse { url }))
}

/// Pull the `image` field out of a multipart body
pub(crate) async fn read_image_field(mut multipart: Multipart) -> Result<MenuUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Unhandled(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("menu").to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .to_string()
            });

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Unhandled(e.body_text()))?;

        if data.is_empty() {
            return Err(AppError::BadRequest("No file uploaded.".to_string()));
        }

        tracing::debug!(
            file_name = %file_name,
            content_type = %content_type,
            size = data.len(),
            "Received menu image"
        );

        return Ok(MenuUpload {
            data: data.to_vec(),
            content_type,
            file_name,
        });
    }

    Err(AppError::BadRequest("No file uploaded.".to_string()))
}
