//! Stub adapters shared by the pipeline and route tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::llm::{ExtractionError, MenuItem, MenuParseError, MenuParser, TextExtractor};
use crate::proxy::{ImageValidator, UrlPolicy};
use crate::search::DishImageResolver;
use crate::state::{Adapters, AppState};
use crate::storage::{ImageStore, StorageError};

pub const PLACEHOLDER: &str = "https://cdn.example.com/placeholder.svg";
pub const STORED_URL: &str = "https://bucket.example.com/menus/photo.jpg";

/// Test servers listen on loopback, so private hosts are allowed here
pub fn config() -> Config {
    let mut config = Config::default();
    config.proxy.placeholder_url = PLACEHOLDER.to_string();
    config.proxy.allow_private_hosts = true;
    config
}

pub fn policy() -> UrlPolicy {
    UrlPolicy::from_config(&config())
}

#[derive(Default)]
pub struct StubStore {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ImageStore for StubStore {
    async fn store(
        &self,
        _data: Vec<u8>,
        _content_type: &str,
        original_name: &str,
    ) -> Result<String, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StorageError::UploadFailed {
                key: format!("menus/{}", original_name),
                message: "connection reset".to_string(),
            });
        }
        Ok(STORED_URL.to_string())
    }
}

pub struct StubExtractor {
    pub text: Option<String>,
    pub calls: AtomicUsize,
}

impl StubExtractor {
    pub fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract_text(&self, _image_url: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| ExtractionError::Upstream("model unavailable".to_string()))
    }
}

pub struct StubParser {
    pub items: Option<Vec<MenuItem>>,
    pub calls: AtomicUsize,
}

impl StubParser {
    pub fn returning(items: Vec<MenuItem>) -> Self {
        Self {
            items: Some(items),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            items: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MenuParser for StubParser {
    async fn parse_menu(&self, _raw_text: &str) -> Result<Vec<MenuItem>, MenuParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.items
            .clone()
            .ok_or_else(|| MenuParseError::Parse("expected value at line 1 column 1".to_string()))
    }
}

/// Answers with a fixed URL per dish; `panic_on` makes that dish blow up
pub struct StubResolver {
    pub answer: String,
    pub panic_on: Option<String>,
    pub calls: AtomicUsize,
}

impl StubResolver {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            panic_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn panicking_on(mut self, dish: &str) -> Self {
        self.panic_on = Some(dish.to_string());
        self
    }
}

#[async_trait]
impl DishImageResolver for StubResolver {
    async fn resolve_dish_image(&self, dish_name: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on.as_deref() == Some(dish_name) {
            panic!("resolver crashed on {}", dish_name);
        }
        self.answer.clone()
    }
}

pub fn validator() -> Arc<ImageValidator> {
    Arc::new(ImageValidator::new(&config().proxy, policy()).unwrap())
}

/// State wired entirely with stubs
pub fn app_state(
    store: StubStore,
    extractor: StubExtractor,
    parser: StubParser,
    resolver: StubResolver,
) -> AppState {
    AppState::new(
        config(),
        Adapters {
            store: Arc::new(store),
            extractor: Arc::new(extractor),
            parser: Arc::new(parser),
            resolver: Arc::new(resolver),
            validator: validator(),
        },
    )
}
