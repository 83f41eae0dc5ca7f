//! Error types for the Menu Vision server

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::llm::{ExtractionError, MenuParseError};
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Method '{0}' not allowed")]
    MethodNotAllowed(Method),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    MenuParse(#[from] MenuParseError),

    /// Failures outside the handlers' own logic (body decoding and the like)
    #[error("Sorry something went wrong! {0}")]
    Unhandled(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Storage(_)
            | AppError::Extraction(_)
            | AppError::MenuParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unhandled(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::MethodNotAllowed(_) => "method_not_allowed",
            AppError::Storage(_) => "storage_error",
            AppError::Extraction(_) => "extraction_error",
            AppError::MenuParse(MenuParseError::Parse(_)) => "parse_error",
            AppError::MenuParse(MenuParseError::Upstream(_)) => "upstream_error",
            AppError::Unhandled(_) => "unhandled_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, "{}", self);
        } else {
            tracing::debug!(status = %status, "{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.error_type(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Fallback for routes hit with an unsupported method
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method)
}
