//! Storage types

use async_trait::async_trait;
use uuid::Uuid;

/// Key prefix for uploaded menu photos
pub const MENU_KEY_PREFIX: &str = "menus";

/// Storage-specific errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Image storage is not configured")]
    NotConfigured,

    #[error("Upload of {key} failed: {message}")]
    UploadFailed { key: String, message: String },
}

/// Anything that can host an uploaded image under a public URL
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the image and return a URL the vision model can fetch
    async fn store(
        &self,
        data: Vec<u8>,
        content_type: &str,
        original_name: &str,
    ) -> Result<String, StorageError>;
}

/// Store installed when no storage credentials are configured
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn store(
        &self,
        _data: Vec<u8>,
        _content_type: &str,
        _original_name: &str,
    ) -> Result<String, StorageError> {
        Err(StorageError::NotConfigured)
    }
}

/// Build a collision-resistant object key for an uploaded file
pub fn object_key(original_name: &str) -> String {
    format!(
        "{}/{}-{}",
        MENU_KEY_PREFIX,
        Uuid::new_v4(),
        sanitize_file_name(original_name)
    )
}

/// Reduce a client-supplied file name to a safe key segment
pub fn sanitize_file_name(name: &str) -> String {
    // Browsers on Windows may send the full path
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim_matches('.');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}
