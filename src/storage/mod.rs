//! Storage module for uploaded menu photos
//!
//! Supports AWS S3 and S3-compatible backends (MinIO, R2, B2).

mod s3_client;
mod types;

pub use s3_client::{public_url, S3Client};
pub use types::*;
