//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::llm::{ChatClient, LlmError, LlmMenuParser, MenuParser, TextExtractor, VisionTextExtractor};
use crate::pipeline::MenuPipeline;
use crate::proxy::{ImageValidator, ProxyError, UrlPolicy};
use crate::search::{
    BingImageSearch, DishImageResolver, GoogleImageSearch, ImageResolver, ImageSearchProvider,
    ResolutionCache, ResolverConfig,
};
use crate::storage::{DisabledImageStore, ImageStore, S3Client};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize model client: {0}")]
    ModelClient(#[from] LlmError),

    #[error("Failed to initialize image validator: {0}")]
    Validator(#[from] ProxyError),
}

/// The adapters a running server is built from
pub struct Adapters {
    pub store: Arc<dyn ImageStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub parser: Arc<dyn MenuParser>,
    pub resolver: Arc<dyn DishImageResolver>,
    pub validator: Arc<ImageValidator>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: Arc<dyn ImageStore>,
    extractor: Arc<dyn TextExtractor>,
    parser: Arc<dyn MenuParser>,
    resolver: Arc<dyn DishImageResolver>,
    validator: Arc<ImageValidator>,
    pipeline: MenuPipeline,
}

impl AppState {
    /// Assemble state from already constructed adapters
    pub fn new(config: Config, adapters: Adapters) -> Self {
        let pipeline = MenuPipeline::new(
            Arc::clone(&adapters.store),
            Arc::clone(&adapters.extractor),
            Arc::clone(&adapters.parser),
            Arc::clone(&adapters.resolver),
            adapters.validator.policy().clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store: adapters.store,
                extractor: adapters.extractor,
                parser: adapters.parser,
                resolver: adapters.resolver,
                validator: adapters.validator,
                pipeline,
            }),
        }
    }

    /// Build the production adapters described by `config`
    ///
    /// Missing credentials disable the matching adapter instead of failing.
    pub async fn from_config(config: Config) -> Result<Self, StateError> {
        let store: Arc<dyn ImageStore> = match &config.storage {
            Some(storage) => Arc::new(S3Client::new(storage).await),
            None => {
                tracing::warn!("S3 credentials not configured; uploads will fail");
                Arc::new(DisabledImageStore)
            }
        };

        let chat = ChatClient::new(&config.models)?;
        if !chat.is_configured() {
            tracing::warn!("TOGETHER_API_KEY not configured; text extraction and parsing will fail");
        }
        let extractor = Arc::new(VisionTextExtractor::new(chat.clone(), &config.models.vision_model));
        let parser = Arc::new(LlmMenuParser::new(chat, &config.models.parser_model));

        let policy = UrlPolicy::from_config(&config);
        let validator = Arc::new(ImageValidator::new(&config.proxy, policy)?);

        let mut providers: Vec<Arc<dyn ImageSearchProvider>> = Vec::new();
        match GoogleImageSearch::from_config(&config.search) {
            Some(google) => providers.push(Arc::new(google)),
            None => tracing::warn!("Google search credentials not configured"),
        }
        match BingImageSearch::from_config(&config.search) {
            Some(bing) => providers.push(Arc::new(bing)),
            None => tracing::warn!("Bing API key not configured"),
        }

        let resolver = ImageResolver::new(
            providers,
            validator.clone(),
            ResolverConfig::from_config(&config.search),
        )
        .with_cache(ResolutionCache::with_capacity(config.search.cache_size));
        tracing::info!(providers = ?resolver.provider_names(), "Image resolver ready");

        Ok(Self::new(
            config,
            Adapters {
                store,
                extractor,
                parser,
                resolver: Arc::new(resolver),
                validator,
            },
        ))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn store(&self) -> &dyn ImageStore {
        self.inner.store.as_ref()
    }

    pub fn extractor(&self) -> &dyn TextExtractor {
        self.inner.extractor.as_ref()
    }

    pub fn parser(&self) -> &dyn MenuParser {
        self.inner.parser.as_ref()
    }

    pub fn resolver(&self) -> &dyn DishImageResolver {
        self.inner.resolver.as_ref()
    }

    pub fn validator(&self) -> &ImageValidator {
        &self.inner.validator
    }

    pub fn pipeline(&self) -> &MenuPipeline {
        &self.inner.pipeline
    }
}
