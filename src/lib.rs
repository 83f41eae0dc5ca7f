//! Menu Vision Server Library
//!
//! Turns a photo of a restaurant menu into a list of dishes, each with a
//! validated photo served through this server's own image proxy.
//! The server binary is in main.rs.
//!
//! # Modules
//!
//! - `storage`: Uploaded photo storage (S3-compatible)
//! - `llm`: Vision transcription and menu structuring via a chat model
//! - `search`: Dish image search with provider fallback
//! - `proxy`: Image validation and proxying
//! - `pipeline`: Step-by-step orchestration of a whole run
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod proxy;
pub mod routes;
pub mod search;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
