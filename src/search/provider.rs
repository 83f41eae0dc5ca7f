//! Image search providers
//!
//! Defines the provider trait and the Google / Bing implementations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::SearchConfig;

/// Search errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Rate limited by {0}")]
    RateLimited(&'static str),

    #[error("{provider} returned status {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider} request failed: {message}")]
    Request { provider: &'static str, message: String },
}

/// Image search provider trait
#[async_trait]
pub trait ImageSearchProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &'static str;

    /// Candidate image URLs, best first
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError>;
}

fn check_status(provider: &'static str, status: StatusCode) -> Result<(), SearchError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SearchError::RateLimited(provider));
    }
    if !status.is_success() {
        return Err(SearchError::Status {
            provider,
            status: status.as_u16(),
        });
    }
    Ok(())
}

fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default search client: {}", e);
            Client::new()
        })
}

// ============================================================================
// Google Custom Search
// ============================================================================

const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Google Custom Search JSON API (image mode)
pub struct GoogleImageSearch {
    client: Client,
    api_key: String,
    search_engine_id: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    link: Option<String>,
}

impl GoogleImageSearch {
    pub fn new(api_key: &str, search_engine_id: &str, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.to_string(),
            search_engine_id: search_engine_id.to_string(),
            endpoint: GOOGLE_ENDPOINT.to_string(),
        }
    }

    /// Build from configuration; `None` when credentials are missing
    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        match (&config.google_api_key, &config.google_search_engine_id) {
            (Some(key), Some(cx)) => Some(Self::new(key, cx, config.timeout_secs)),
            _ => None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl ImageSearchProvider for GoogleImageSearch {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let request_error = |e: reqwest::Error| SearchError::Request {
            provider: "google",
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.search_engine_id.as_str()),
                ("q", query),
                ("searchType", "image"),
                ("num", "5"),
                ("safe", "active"),
                ("imgSize", "medium"),
                ("imgType", "photo"),
                ("filter", "1"),
            ])
            .send()
            .await
            .map_err(request_error)?;

        check_status("google", response.status())?;

        let body: GoogleResponse = response.json().await.map_err(request_error)?;
        Ok(body.items.into_iter().filter_map(|item| item.link).collect())
    }
}

// ============================================================================
// Bing Image Search
// ============================================================================

/// Bing Image Search v7
pub struct BingImageSearch {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct BingResponse {
    #[serde(default)]
    value: Vec<BingImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingImage {
    content_url: Option<String>,
}

impl BingImageSearch {
    pub fn new(api_key: &str, endpoint: &str, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Build from configuration; `None` when the key is missing
    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        config
            .bing_api_key
            .as_deref()
            .map(|key| Self::new(key, &config.bing_endpoint, config.timeout_secs))
    }
}

#[async_trait]
impl ImageSearchProvider for BingImageSearch {
    fn name(&self) -> &'static str {
        "bing"
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let request_error = |e: reqwest::Error| SearchError::Request {
            provider: "bing",
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("count", "10"),
                ("offset", "0"),
                ("safeSearch", "Moderate"),
                ("imageType", "Photo"),
            ])
            .send()
            .await
            .map_err(request_error)?;

        check_status("bing", response.status())?;

        let body: BingResponse = response.json().await.map_err(request_error)?;
        Ok(body
            .value
            .into_iter()
            .filter_map(|image| image.content_url)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check_status("bing", StatusCode::OK).is_ok());
        assert!(matches!(
            check_status("bing", StatusCode::TOO_MANY_REQUESTS),
            Err(SearchError::RateLimited("bing"))
        ));
        assert!(matches!(
            check_status("google", StatusCode::FORBIDDEN),
            Err(SearchError::Status { status: 403, .. })
        ));
    }

    #[test]
    fn test_providers_need_credentials() {
        let mut config = SearchConfig::default();
        assert!(GoogleImageSearch::from_config(&config).is_none());
        assert!(BingImageSearch::from_config(&config).is_none());

        config.google_api_key = Some("key".to_string());
        assert!(GoogleImageSearch::from_config(&config).is_none());

        config.google_search_engine_id = Some("cx".to_string());
        config.bing_api_key = Some("bing".to_string());
        assert!(GoogleImageSearch::from_config(&config).is_some());
        assert!(BingImageSearch::from_config(&config).is_some());
    }

    #[test]
    fn test_response_shapes() {
        let google: GoogleResponse =
            serde_json::from_str(r#"{"items":[{"link":"https://a/1.jpg"},{"title":"no link"}]}"#).unwrap();
        assert_eq!(google.items.len(), 2);
        assert_eq!(google.items[0].link.as_deref(), Some("https://a/1.jpg"));

        let empty: GoogleResponse = serde_json::from_str(r#"{"kind":"customsearch#search"}"#).unwrap();
        assert!(empty.items.is_empty());

        let bing: BingResponse =
            serde_json::from_str(r#"{"value":[{"contentUrl":"https://b/1.jpg"}]}"#).unwrap();
        assert_eq!(bing.value[0].content_url.as_deref(), Some("https://b/1.jpg"));
    }

    #[tokio::test]
    async fn test_providers_against_local_server() {
        use std::collections::HashMap;

        use axum::{extract::Query, http::HeaderMap, routing::get, Json, Router};

        let app = Router::new()
            .route(
                "/google",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params.get("searchType").map(String::as_str), Some("image"));
                    assert_eq!(params.get("cx").map(String::as_str), Some("cx"));
                    Json(serde_json::json!({
                        "items": [
                            { "link": format!("https://img.example.com/{}.jpg", params["q"].replace(' ', "-")) },
                            { "title": "no link" }
                        ]
                    }))
                }),
            )
            .route(
                "/bing",
                get(|headers: HeaderMap| async move {
                    assert!(headers.contains_key("Ocp-Apim-Subscription-Key"));
                    axum::http::StatusCode::TOO_MANY_REQUESTS
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let google = GoogleImageSearch::new("key", "cx", 5).with_endpoint(&format!("http://{addr}/google"));
        assert_eq!(
            google.search("tacos food").await.unwrap(),
            vec!["https://img.example.com/tacos-food.jpg".to_string()]
        );

        let bing = BingImageSearch::new("key", &format!("http://{addr}/bing"), 5);
        assert!(matches!(bing.search("tacos").await, Err(SearchError::RateLimited("bing"))));
    }
}
