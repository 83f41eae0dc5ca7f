//! Dish image resolver
//!
//! Walks the providers in order, validates candidates through the shared
//! [`CandidateValidator`] and returns the first usable proxied URL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::config::SearchConfig;
use crate::proxy::{CandidateValidator, Precheck, SafeUrl};

use super::cache::ResolutionCache;
use super::provider::{ImageSearchProvider, SearchError};

/// Words skipped when shortening a dish name
const STOP_WORDS: &[&str] = &[
    "the", "and", "with", "con", "del", "las", "los", "al", "de", "el", "en", "la", "y",
];

/// Resolver tuning
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Appended to the dish name to bias toward food photography
    pub query_suffix: String,
    /// Qualifier used with the shortened last-resort query
    pub fallback_qualifier: String,
    /// Upper bound of the random pause between candidate checks
    pub candidate_delay: Duration,
    /// Upper bound of the random pause before each provider after the first
    pub provider_delay: Duration,
    /// Pause before retrying a rate-limited provider
    pub rate_limit_backoff: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            query_suffix: "dish food recipe".to_string(),
            fallback_qualifier: "food".to_string(),
            candidate_delay: Duration::from_millis(100),
            provider_delay: Duration::from_millis(1000),
            rate_limit_backoff: Duration::from_secs(2),
        }
    }
}

impl ResolverConfig {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            query_suffix: config.query_suffix.clone(),
            ..Self::default()
        }
    }

    /// Same settings with every pause removed
    pub fn without_delays(self) -> Self {
        Self {
            candidate_delay: Duration::ZERO,
            provider_delay: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            ..self
        }
    }
}

/// Turns a dish name into an image URL; never fails
#[async_trait]
pub trait DishImageResolver: Send + Sync {
    async fn resolve_dish_image(&self, dish_name: &str) -> String;
}

/// Provider fallback chain
pub struct ImageResolver {
    providers: Vec<Arc<dyn ImageSearchProvider>>,
    validator: Arc<dyn CandidateValidator>,
    config: ResolverConfig,
    cache: Option<ResolutionCache>,
}

impl ImageResolver {
    pub fn new(
        providers: Vec<Arc<dyn ImageSearchProvider>>,
        validator: Arc<dyn CandidateValidator>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            providers,
            validator,
            config,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<ResolutionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve a dish name, keeping track of how the result was obtained
    pub async fn resolve(&self, dish_name: &str) -> SafeUrl {
        let dish_name = dish_name.trim();
        if dish_name.is_empty() || self.providers.is_empty() {
            return self.validator.policy().placeholder_url();
        }

        if let Some(cache) = &self.cache {
            if let Some(found) = cache.get(dish_name).await {
                tracing::debug!(dish = %dish_name, "Dish image served from cache");
                return found;
            }
        }

        let query = format!("{} {}", dish_name, self.config.query_suffix);

        for (index, provider) in self.providers.iter().enumerate() {
            if index > 0 {
                jitter(self.config.provider_delay).await;
            }

            let candidates = self.search_provider(provider.as_ref(), &query).await;
            if let Some(found) = self.first_valid(provider.name(), &candidates).await {
                return self.remember(dish_name, found).await;
            }
            tracing::info!(
                dish = %dish_name,
                provider = provider.name(),
                candidates = candidates.len(),
                "No usable image, trying next provider"
            );
        }

        // Last resort: a shorter, more generic query against the final provider
        if let Some(provider) = self.providers.last() {
            let query = simplified_query(dish_name, &self.config.fallback_qualifier);
            jitter(self.config.provider_delay).await;

            tracing::info!(dish = %dish_name, query = %query, "Trying simplified search");
            let candidates = self.search_provider(provider.as_ref(), &query).await;
            if let Some(found) = self.first_valid(provider.name(), &candidates).await {
                return self.remember(dish_name, found).await;
            }
        }

        tracing::info!(dish = %dish_name, "All image searches failed, using placeholder");
        self.validator.policy().placeholder_url()
    }

    /// Search once, retrying a single time after a rate limit. Errors count
    /// as "no results".
    async fn search_provider(&self, provider: &dyn ImageSearchProvider, query: &str) -> Vec<String> {
        let result = match provider.search(query).await {
            Err(SearchError::RateLimited(name)) => {
                tracing::warn!(
                    provider = name,
                    backoff_ms = self.config.rate_limit_backoff.as_millis() as u64,
                    "Rate limit hit, waiting before retry"
                );
                tokio::time::sleep(self.config.rate_limit_backoff).await;
                provider.search(query).await
            }
            other => other,
        };

        match result {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Image search failed");
                Vec::new()
            }
        }
    }

    /// First candidate that passes a real probe. Only absolute http(s)
    /// candidates are considered; relative or same-origin results from a
    /// provider are not search hits.
    async fn first_valid(&self, provider: &'static str, candidates: &[String]) -> Option<SafeUrl> {
        let remote = candidates
            .iter()
            .filter(|candidate| matches!(self.validator.policy().precheck(candidate), Precheck::Remote(_)));

        for (index, candidate) in remote.enumerate() {
            if index > 0 {
                jitter(self.config.candidate_delay).await;
            }

            let checked = self.validator.validate(candidate).await;
            if matches!(checked, SafeUrl::Proxied(_)) {
                tracing::debug!(provider = provider, candidate = %candidate, "Found valid image");
                return Some(checked);
            }
        }
        None
    }

    async fn remember(&self, dish_name: &str, found: SafeUrl) -> SafeUrl {
        if let Some(cache) = &self.cache {
            cache.insert(dish_name, found.clone()).await;
        }
        found
    }
}

#[async_trait]
impl DishImageResolver for ImageResolver {
    async fn resolve_dish_image(&self, dish_name: &str) -> String {
        self.resolve(dish_name).await.into_string()
    }
}

/// First significant word of the dish name plus a generic qualifier
pub fn simplified_query(dish_name: &str, qualifier: &str) -> String {
    let words: Vec<String> = dish_name
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect();

    let word = words
        .iter()
        .find(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .or_else(|| words.first())
        .map(String::as_str)
        .unwrap_or(dish_name);

    format!("{} {}", word, qualifier)
}

async fn jitter(max: Duration) {
    if max.is_zero() {
        return;
    }
    let millis = rand::rng().random_range(0..=max.as_millis() as u64);
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::proxy::UrlPolicy;

    const PLACEHOLDER: &str = "https://cdn.example.com/placeholder.svg";

    /// Accepts any URL containing "good"
    struct StubValidator {
        policy: UrlPolicy,
        checks: AtomicUsize,
    }

    impl StubValidator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                policy: UrlPolicy::new(PLACEHOLDER, "/api/image-proxy", None),
                checks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CandidateValidator for StubValidator {
        async fn validate(&self, url: &str) -> SafeUrl {
            self.checks.fetch_add(1, Ordering::SeqCst);
            if url.contains("good") {
                SafeUrl::Proxied(self.policy.proxy_url(url))
            } else {
                self.policy.placeholder_url()
            }
        }

        fn policy(&self) -> &UrlPolicy {
            &self.policy
        }
    }

    enum Reply {
        Results(Vec<&'static str>),
        RateLimited,
        Failure,
    }

    /// Replies are consumed in order; the last one repeats
    struct StubProvider {
        name: &'static str,
        replies: std::sync::Mutex<Vec<Reply>>,
        queries: std::sync::Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn new(name: &'static str, replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                name,
                replies: std::sync::Mutex::new(replies),
                queries: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageSearchProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.remove(0)
            } else {
                match &replies[0] {
                    Reply::Results(urls) => Reply::Results(urls.clone()),
                    Reply::RateLimited => Reply::RateLimited,
                    Reply::Failure => Reply::Failure,
                }
            };
            match reply {
                Reply::Results(urls) => Ok(urls.into_iter().map(String::from).collect()),
                Reply::RateLimited => Err(SearchError::RateLimited(self.name)),
                Reply::Failure => Err(SearchError::Status {
                    provider: self.name,
                    status: 500,
                }),
            }
        }
    }

    fn resolver(providers: Vec<Arc<StubProvider>>, validator: Arc<StubValidator>) -> ImageResolver {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn ImageSearchProvider>)
            .collect();
        ImageResolver::new(providers, validator, ResolverConfig::default().without_delays())
    }

    #[tokio::test]
    async fn test_falls_through_to_secondary() {
        let primary = StubProvider::new("primary", vec![Reply::Results(vec![])]);
        let secondary = StubProvider::new("secondary", vec![Reply::Results(vec!["https://img/good.jpg"])]);
        let resolver = resolver(vec![primary.clone(), secondary.clone()], StubValidator::new());

        let url = resolver.resolve_dish_image("Tacos").await;

        assert_eq!(url, "/api/image-proxy?url=https%3A%2F%2Fimg%2Fgood.jpg");
        assert_eq!(primary.queries(), vec!["Tacos dish food recipe"]);
        assert_eq!(secondary.queries(), vec!["Tacos dish food recipe"]);
    }

    #[tokio::test]
    async fn test_everything_empty_gives_placeholder() {
        let primary = StubProvider::new("primary", vec![Reply::Results(vec![])]);
        let secondary = StubProvider::new("secondary", vec![Reply::Results(vec![])]);
        let resolver = resolver(vec![primary.clone(), secondary.clone()], StubValidator::new());

        assert_eq!(resolver.resolve_dish_image("Tacos al pastor").await, PLACEHOLDER);
        // Simplified retry goes to the secondary provider only
        assert_eq!(primary.queries().len(), 1);
        assert_eq!(
            secondary.queries(),
            vec!["Tacos al pastor dish food recipe", "Tacos food"]
        );
    }

    #[tokio::test]
    async fn test_provider_errors_are_swallowed() {
        let primary = StubProvider::new("primary", vec![Reply::Failure]);
        let secondary = StubProvider::new("secondary", vec![Reply::Failure]);
        let resolver = resolver(vec![primary, secondary], StubValidator::new());

        assert_eq!(resolver.resolve_dish_image("Soup").await, PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_first_valid_candidate_wins() {
        let validator = StubValidator::new();
        let primary = StubProvider::new(
            "primary",
            vec![Reply::Results(vec![
                "https://img/bad.html",
                "https://img/good-1.jpg",
                "https://img/good-2.jpg",
            ])],
        );
        let resolver = resolver(vec![primary], validator.clone());

        let url = resolver.resolve_dish_image("Flan").await;

        assert!(url.contains("good-1"));
        assert_eq!(validator.checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_once() {
        let primary = StubProvider::new(
            "primary",
            vec![Reply::RateLimited, Reply::Results(vec!["https://img/good.jpg"])],
        );
        let secondary = StubProvider::new("secondary", vec![Reply::Results(vec![])]);
        let resolver = resolver(vec![primary.clone(), secondary.clone()], StubValidator::new());

        let url = resolver.resolve_dish_image("Paella").await;

        assert!(url.starts_with("/api/image-proxy?url="));
        assert_eq!(primary.queries().len(), 2);
        assert!(secondary.queries().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_is_bounded() {
        let primary = StubProvider::new("primary", vec![Reply::RateLimited]);
        let secondary = StubProvider::new("secondary", vec![Reply::Results(vec!["https://img/good.jpg"])]);
        let resolver = resolver(vec![primary.clone(), secondary], StubValidator::new());

        let url = resolver.resolve_dish_image("Paella").await;

        assert!(url.contains("good"));
        assert_eq!(primary.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_name_and_no_providers() {
        let resolver_without_providers = resolver(vec![], StubValidator::new());
        assert_eq!(resolver_without_providers.resolve_dish_image("Tacos").await, PLACEHOLDER);

        let provider = StubProvider::new("primary", vec![Reply::Results(vec!["https://img/good.jpg"])]);
        let resolver = resolver(vec![provider.clone()], StubValidator::new());
        assert_eq!(resolver.resolve_dish_image("   ").await, PLACEHOLDER);
        assert!(provider.queries().is_empty());
    }

    #[tokio::test]
    async fn test_cache_skips_providers() {
        let provider = StubProvider::new("primary", vec![Reply::Results(vec!["https://img/good.jpg"])]);
        let resolver = resolver(vec![provider.clone()], StubValidator::new())
            .with_cache(ResolutionCache::with_capacity(8));

        let first = resolver.resolve_dish_image("Tacos").await;
        let second = resolver.resolve_dish_image("tacos").await;

        assert_eq!(first, second);
        assert_eq!(provider.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_keeps_proxied_variant() {
        let provider = StubProvider::new("primary", vec![Reply::Results(vec!["https://img/good.jpg"])]);
        let resolver = resolver(vec![provider], StubValidator::new())
            .with_cache(ResolutionCache::with_capacity(8));

        let first = resolver.resolve("Tacos").await;
        let cached = resolver.resolve("Tacos").await;

        assert!(matches!(first, SafeUrl::Proxied(_)));
        assert_eq!(cached, first);
    }

    #[tokio::test]
    async fn test_relative_candidates_are_not_hits() {
        let validator = StubValidator::new();
        let primary = StubProvider::new(
            "primary",
            vec![Reply::Results(vec![
                "/good/local.jpg",
                "/\\evil.example.org/good.jpg",
                "//evil.example.org/good.jpg",
            ])],
        );
        let resolver = resolver(vec![primary], validator.clone());

        assert_eq!(resolver.resolve_dish_image("Flan").await, PLACEHOLDER);
        assert_eq!(validator.checks.load(Ordering::SeqCst), 0);
    }

    /// Candidates checked with a real HTTP probe against a local server
    #[tokio::test]
    async fn test_real_validator_probes_candidates() {
        use axum::{http::header, routing::get, Router};

        use crate::config::ProxyConfig;
        use crate::proxy::{ImageValidator, UrlPolicy};

        struct FixedProvider(Vec<String>);

        #[async_trait]
        impl ImageSearchProvider for FixedProvider {
            fn name(&self) -> &'static str {
                "fixed"
            }

            async fn search(&self, _query: &str) -> Result<Vec<String>, SearchError> {
                Ok(self.0.clone())
            }
        }

        let app = Router::new()
            .route("/menu.html", get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }))
            .route("/flan.jpg", get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], vec![0xFFu8, 0xD8, 0xFF]) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let image = format!("http://{addr}/flan.jpg");
        let provider = FixedProvider(vec![
            format!("http://{addr}/menu.html"),
            format!("http://{addr}/missing.jpg"),
            image.clone(),
        ]);

        let policy = UrlPolicy::new(PLACEHOLDER, "/api/image-proxy", None).with_private_hosts(true);
        let validator = Arc::new(ImageValidator::new(&ProxyConfig::default(), policy).unwrap());
        let providers: Vec<Arc<dyn ImageSearchProvider>> = vec![Arc::new(provider)];
        let resolver = ImageResolver::new(
            providers,
            validator.clone(),
            ResolverConfig::default().without_delays(),
        );

        let found = resolver.resolve("Flan").await;
        assert_eq!(found, SafeUrl::Proxied(validator.policy().proxy_url(&image)));
    }

    #[tokio::test]
    async fn test_placeholder_is_not_cached() {
        let provider = StubProvider::new("primary", vec![Reply::Results(vec![])]);
        let resolver = resolver(vec![provider.clone()], StubValidator::new())
            .with_cache(ResolutionCache::with_capacity(8));

        resolver.resolve_dish_image("Tacos").await;
        resolver.resolve_dish_image("Tacos").await;

        // Full query plus simplified query, twice
        assert_eq!(provider.queries().len(), 4);
    }

    #[test]
    fn test_simplified_query() {
        assert_eq!(simplified_query("Tacos al pastor", "food"), "Tacos food");
        assert_eq!(simplified_query("El Burrito Loco", "food"), "Burrito food");
        assert_eq!(simplified_query("Té", "food"), "Té food");
        assert_eq!(simplified_query("\"Pho\" bowl", "food"), "Pho food");
    }
}
