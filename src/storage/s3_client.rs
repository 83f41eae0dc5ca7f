//! S3-compatible storage client
//!
//! Wraps the AWS SDK for uploading menu photos.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};

use crate::config::StorageConfig;

use super::types::{object_key, ImageStore, StorageError};

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    config: StorageConfig,
}

impl S3Client {
    /// Create a new S3 client from configuration
    pub async fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "menu-vision",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region_of(config)))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .endpoint_url(endpoint)
                .force_path_style(true); // Required for MinIO and other S3-compatible services
        }

        let client = Client::from_conf(builder.build());

        // Test connection by checking if bucket exists
        match client.head_bucket().bucket(&config.bucket).send().await {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", config.bucket);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt uploads anyway.",
                    config.bucket,
                    e
                );
            }
        }

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Upload an object
    pub async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

#[async_trait]
impl ImageStore for S3Client {
    async fn store(
        &self,
        data: Vec<u8>,
        content_type: &str,
        original_name: &str,
    ) -> Result<String, StorageError> {
        let key = object_key(original_name);
        let size = data.len();

        self.put_object(&key, data, content_type).await?;

        tracing::info!(
            bucket = %self.config.bucket,
            key = %key,
            size = size,
            content_type = %content_type,
            "Menu image stored"
        );

        Ok(public_url(&self.config, &key))
    }
}

fn region_of(config: &StorageConfig) -> String {
    config
        .region
        .clone()
        .unwrap_or_else(|| "us-east-1".to_string())
}

/// Public URL an object is reachable under
pub fn public_url(config: &StorageConfig, key: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    if let Some(base) = &config.public_url {
        return format!("{}/{}", base.trim_end_matches('/'), encoded_key);
    }

    if let Some(endpoint) = &config.endpoint {
        return format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            config.bucket,
            encoded_key
        );
    }

    format!(
        "https://{}.s3.{}.amazonaws.com/{}",
        config.bucket,
        region_of(config),
        encoded_key
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StorageConfig {
        StorageConfig {
            bucket: "menus-bucket".to_string(),
            access_key: "key".to_string(),
            secret_key: "secret".to_string(),
            region: Some("eu-west-1".to_string()),
            endpoint: None,
            public_url: None,
        }
    }

    #[test]
    fn test_public_url_aws() {
        let url = public_url(&test_config(), "menus/abc-menu.jpg");
        assert_eq!(
            url,
            "https://menus-bucket.s3.eu-west-1.amazonaws.com/menus/abc-menu.jpg"
        );
    }

    #[test]
    fn test_public_url_custom_endpoint() {
        let mut config = test_config();
        config.endpoint = Some("http://localhost:9000/".to_string());

        let url = public_url(&config, "menus/abc-menu.jpg");
        assert_eq!(url, "http://localhost:9000/menus-bucket/menus/abc-menu.jpg");
    }

    #[test]
    fn test_public_url_prefers_public_base() {
        let mut config = test_config();
        config.endpoint = Some("http://localhost:9000".to_string());
        config.public_url = Some("https://cdn.example.com".to_string());

        let url = public_url(&config, "menus/a b.jpg");
        assert_eq!(url, "https://cdn.example.com/menus/a%20b.jpg");
    }

    #[test]
    fn test_repeated_uploads_get_distinct_absolute_urls() {
        let config = test_config();
        let first = public_url(&config, &object_key("menu.png"));
        let second = public_url(&config, &object_key("menu.png"));

        assert_ne!(first, second);
        assert!(reqwest::Url::parse(&first).is_ok());
        assert!(reqwest::Url::parse(&second).is_ok());
    }
}
