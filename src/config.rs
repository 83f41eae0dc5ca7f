//! Configuration management for Menu Vision Server
//!
//! Every external collaborator is optional: a missing credential disables the
//! matching adapter instead of stopping the process.

use std::env;
use std::time::Duration;

/// Default fallback image shown whenever no validated dish photo exists
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "https://www.svgrepo.com/show/475115/fast-food.svg";

/// Default path of the image proxy endpoint
pub const DEFAULT_PROXY_PATH: &str = "/api/image-proxy";

/// Default model API (OpenAI-compatible chat completions)
pub const DEFAULT_MODEL_API_URL: &str = "https://api.together.xyz/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: Option<StorageConfig>,
    pub models: ModelConfig,
    pub search: SearchConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin this server is reachable under, e.g. `https://menu.example.com`
    pub public_origin: Option<String>,
    /// Maximum accepted request body size
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// Custom S3-compatible endpoint (MinIO, R2, ...)
    pub endpoint: Option<String>,
    /// Public base URL objects are served from, if different from the endpoint
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub vision_model: String,
    pub parser_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub bing_api_key: Option<String>,
    pub bing_endpoint: String,
    /// Appended to dish names to bias results toward food photography
    pub query_suffix: String,
    pub timeout_secs: u64,
    /// Number of resolved dish images to remember (0 disables the cache)
    pub cache_size: usize,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub placeholder_url: String,
    pub proxy_path: String,
    pub max_image_bytes: u64,
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Let the proxy reach loopback and private-network hosts
    pub allow_private_hosts: bool,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_origin: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            api_url: DEFAULT_MODEL_API_URL.to_string(),
            api_key: None,
            vision_model: "meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo".to_string(),
            parser_model: "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            google_api_key: None,
            google_search_engine_id: None,
            bing_api_key: None,
            bing_endpoint: "https://api.bing.microsoft.com/v7.0/images/search".to_string(),
            query_suffix: "dish food recipe".to_string(),
            timeout_secs: 5,
            cache_size: 256,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            placeholder_url: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            proxy_path: DEFAULT_PROXY_PATH.to_string(),
            max_image_bytes: 5 * 1024 * 1024,
            timeout_secs: 5,
            max_redirects: 3,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            allow_private_hosts: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            storage: None,
            models: ModelConfig::default(),
            search: SearchConfig::default(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_defaults = ServerConfig::default();
        let model_defaults = ModelConfig::default();
        let search_defaults = SearchConfig::default();
        let proxy_defaults = ProxyConfig::default();

        let storage = match (
            non_empty("S3_UPLOAD_BUCKET"),
            non_empty("S3_UPLOAD_KEY"),
            non_empty("S3_UPLOAD_SECRET"),
        ) {
            (Some(bucket), Some(access_key), Some(secret_key)) => Some(StorageConfig {
                bucket,
                access_key,
                secret_key,
                region: non_empty("S3_UPLOAD_REGION"),
                endpoint: non_empty("S3_ENDPOINT"),
                public_url: non_empty("S3_PUBLIC_URL"),
            }),
            _ => None,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(server_defaults.host),
                port: parse_var("SERVER_PORT", server_defaults.port)?,
                public_origin: non_empty("PUBLIC_ORIGIN")
                    .map(|origin| origin.trim_end_matches('/').to_string()),
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", server_defaults.max_upload_bytes)?,
            },
            storage,
            models: ModelConfig {
                api_url: env::var("TOGETHER_API_URL").unwrap_or(model_defaults.api_url),
                api_key: non_empty("TOGETHER_API_KEY"),
                vision_model: env::var("VISION_MODEL").unwrap_or(model_defaults.vision_model),
                parser_model: env::var("PARSER_MODEL").unwrap_or(model_defaults.parser_model),
                timeout_secs: parse_var("MODEL_TIMEOUT_SECS", model_defaults.timeout_secs)?,
            },
            search: SearchConfig {
                google_api_key: non_empty("GOOGLE_API_KEY"),
                google_search_engine_id: non_empty("GOOGLE_SEARCH_ENGINE_ID"),
                bing_api_key: non_empty("BING_API_KEY"),
                bing_endpoint: env::var("BING_API_ENDPOINT").unwrap_or(search_defaults.bing_endpoint),
                query_suffix: env::var("SEARCH_QUERY_SUFFIX").unwrap_or(search_defaults.query_suffix),
                timeout_secs: search_defaults.timeout_secs,
                cache_size: parse_var("RESOLVER_CACHE_SIZE", search_defaults.cache_size)?,
            },
            proxy: ProxyConfig {
                placeholder_url: env::var("PLACEHOLDER_IMAGE_URL")
                    .unwrap_or(proxy_defaults.placeholder_url),
                proxy_path: env::var("PROXY_PATH").unwrap_or(proxy_defaults.proxy_path),
                allow_private_hosts: parse_var(
                    "ALLOW_PRIVATE_IMAGE_HOSTS",
                    proxy_defaults.allow_private_hosts,
                )?,
                ..proxy_defaults
            },
        })
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
