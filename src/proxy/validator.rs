//! Image validator
//!
//! Probes candidate images with a HEAD request and downloads them for the
//! proxy endpoint under the same timeout, redirect and size caps.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE},
    redirect, Client, Url,
};

use crate::config::ProxyConfig;

use super::policy::{is_private_host, Precheck, SafeUrl, UrlPolicy};

/// Reasons an image is refused. Never leaves this module as an error: every
/// variant ends up as the placeholder.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Rejected url: {0}")]
    Rejected(&'static str),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Not an image: {0:?}")]
    NotAnImage(Option<String>),

    #[error("Image too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Image downloaded for relaying
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// What the proxy endpoint should answer with
#[derive(Debug)]
pub enum ProxiedImage {
    Image(FetchedImage),
    Redirect(String),
}

/// Checks a candidate image URL
///
/// Shared by the proxy endpoint and the dish image resolver.
#[async_trait]
pub trait CandidateValidator: Send + Sync {
    /// Never fails; unusable URLs come back as the placeholder
    async fn validate(&self, url: &str) -> SafeUrl;

    fn policy(&self) -> &UrlPolicy;
}

/// HEAD response facts the validator cares about
#[derive(Debug)]
struct ImageProbe {
    content_type: String,
}

/// HTTP-backed validator
pub struct ImageValidator {
    client: Client,
    policy: UrlPolicy,
    max_image_bytes: u64,
}

impl ImageValidator {
    pub fn new(config: &ProxyConfig, policy: UrlPolicy) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(redirect_policy(config.max_redirects, policy.allows_private_hosts()))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            policy,
            max_image_bytes: config.max_image_bytes,
        })
    }

    pub fn policy(&self) -> &UrlPolicy {
        &self.policy
    }

    /// Validate `url` and rewrite it to the proxy endpoint
    pub async fn resolve_safe_url(&self, url: &str) -> SafeUrl {
        let remote = match self.policy.precheck(url) {
            Precheck::Placeholder => return self.policy.placeholder_url(),
            Precheck::Local => return SafeUrl::Local(url.trim().to_string()),
            Precheck::Rejected(reason) => {
                tracing::debug!(url = %url, reason = reason, "Image url rejected");
                return self.policy.placeholder_url();
            }
            Precheck::Remote(remote) => remote,
        };

        match self.probe(&remote).await {
            Ok(probe) => {
                tracing::debug!(url = %remote, content_type = %probe.content_type, "Image validated");
                SafeUrl::Proxied(self.policy.proxy_url(remote.as_str()))
            }
            Err(e) => {
                tracing::debug!(url = %remote, error = %e, "Image validation failed");
                self.policy.placeholder_url()
            }
        }
    }

    /// Validate and download `url` for the proxy endpoint
    pub async fn fetch_image(&self, url: &str) -> ProxiedImage {
        let remote = match self.policy.precheck(url) {
            Precheck::Remote(remote) => remote,
            Precheck::Local => return ProxiedImage::Redirect(url.trim().to_string()),
            Precheck::Placeholder => {
                return ProxiedImage::Redirect(self.policy.placeholder().to_string())
            }
            Precheck::Rejected(reason) => {
                tracing::warn!(url = %url, reason = reason, "Missing or invalid proxy url");
                return ProxiedImage::Redirect(self.policy.placeholder().to_string());
            }
        };

        let result = async {
            let probe = self.probe(&remote).await?;
            self.download(&remote, probe).await
        }
        .await;

        match result {
            Ok(image) => {
                tracing::debug!(
                    url = %remote,
                    content_type = %image.content_type,
                    size = image.data.len(),
                    "Proxying image"
                );
                ProxiedImage::Image(image)
            }
            Err(e) => {
                tracing::warn!(url = %remote, error = %e, "Proxy fetch failed, using placeholder");
                ProxiedImage::Redirect(self.policy.placeholder().to_string())
            }
        }
    }

    async fn probe(&self, url: &Url) -> Result<ImageProbe, ProxyError> {
        let response = self.client.head(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(ProxyError::Status(response.status().as_u16()));
        }

        let content_type = image_content_type(response.headers())?;
        self.check_declared_size(response.headers())?;

        Ok(ImageProbe { content_type })
    }

    async fn download(&self, url: &Url, probe: ImageProbe) -> Result<FetchedImage, ProxyError> {
        let mut response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(ProxyError::Status(response.status().as_u16()));
        }

        let content_type = match response.headers().get(CONTENT_TYPE) {
            Some(_) => image_content_type(response.headers())?,
            None => probe.content_type,
        };
        self.check_declared_size(response.headers())?;

        // Headers can lie; count the bytes that actually arrive
        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let size = (data.len() + chunk.len()) as u64;
            if size > self.max_image_bytes {
                return Err(ProxyError::TooLarge {
                    size,
                    max: self.max_image_bytes,
                });
            }
            data.extend_from_slice(&chunk);
        }

        Ok(FetchedImage { content_type, data })
    }

    fn check_declared_size(&self, headers: &HeaderMap) -> Result<(), ProxyError> {
        let declared = declared_length(headers);
        if declared > self.max_image_bytes {
            return Err(ProxyError::TooLarge {
                size: declared,
                max: self.max_image_bytes,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CandidateValidator for ImageValidator {
    async fn validate(&self, url: &str) -> SafeUrl {
        self.resolve_safe_url(url).await
    }

    fn policy(&self) -> &UrlPolicy {
        &self.policy
    }
}

/// Bounded redirects that never hop onto a private address
fn redirect_policy(max_redirects: usize, allow_private_hosts: bool) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.error("too many redirects")
        } else if !allow_private_hosts && is_private_host(attempt.url()) {
            attempt.error("redirect to a private address")
        } else {
            attempt.follow()
        }
    })
}

fn image_content_type(headers: &HeaderMap) -> Result<String, ProxyError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string());

    match content_type {
        Some(ct) if ct.to_ascii_lowercase().starts_with("image/") => Ok(ct),
        other => Err(ProxyError::NotAnImage(other)),
    }
}

/// Declared body size; absent or unparsable counts as zero
fn declared_length(headers: &HeaderMap) -> u64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}
