//! Menu pipeline orchestrator
//!
//! upload → ocr → parse run strictly in sequence and any failure there ends
//! the run. The search step fans out one resolution task per dish and waits
//! for all of them; a failed dish only loses its own image.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::llm::{MenuItem, MenuParser, TextExtractor};
use crate::proxy::UrlPolicy;
use crate::search::DishImageResolver;
use crate::storage::ImageStore;

use super::types::{EnrichedMenu, MenuUpload, PipelineError, PipelineProgress, StepId};

/// Outputs collected so far, kept when a later step fails
#[derive(Default)]
struct Partial {
    source_image_url: Option<String>,
    text: Option<String>,
}

pub struct MenuPipeline {
    store: Arc<dyn ImageStore>,
    extractor: Arc<dyn TextExtractor>,
    parser: Arc<dyn MenuParser>,
    resolver: Arc<dyn DishImageResolver>,
    policy: UrlPolicy,
}

impl MenuPipeline {
    pub fn new(
        store: Arc<dyn ImageStore>,
        extractor: Arc<dyn TextExtractor>,
        parser: Arc<dyn MenuParser>,
        resolver: Arc<dyn DishImageResolver>,
        policy: UrlPolicy,
    ) -> Self {
        Self {
            store,
            extractor,
            parser,
            resolver,
            policy,
        }
    }

    /// Run the whole pipeline for one uploaded photo
    pub async fn run(&self, upload: MenuUpload) -> Result<EnrichedMenu, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("menu_pipeline", run_id = %run_id);
        self.run_steps(upload).instrument(span).await
    }

    async fn run_steps(&self, upload: MenuUpload) -> Result<EnrichedMenu, PipelineError> {
        let mut progress = PipelineProgress::new();
        let mut partial = Partial::default();

        tracing::info!(
            file_name = %upload.file_name,
            size = upload.data.len(),
            "Menu pipeline started"
        );

        progress.start(StepId::Upload);
        let source_image_url = match self
            .store
            .store(upload.data, &upload.content_type, &upload.file_name)
            .await
        {
            Ok(url) => url,
            Err(e) => return Err(abort(progress, StepId::Upload, e.to_string(), partial)),
        };
        progress.complete(StepId::Upload);
        partial.source_image_url = Some(source_image_url.clone());

        progress.start(StepId::Ocr);
        let text = match self.extractor.extract_text(&source_image_url).await {
            Ok(text) => text,
            Err(e) => return Err(abort(progress, StepId::Ocr, e.to_string(), partial)),
        };
        progress.complete(StepId::Ocr);
        partial.text = Some(text.clone());

        progress.start(StepId::Parse);
        let items = match self.parser.parse_menu(&text).await {
            Ok(items) => items,
            Err(e) => {
                tracing::debug!(retryable = e.is_retryable(), "Menu parse failed");
                return Err(abort(progress, StepId::Parse, e.to_string(), partial));
            }
        };
        progress.complete(StepId::Parse);

        progress.start(StepId::Search);
        let items = self.enrich(items).await;
        progress.complete(StepId::Search);

        tracing::info!(items = items.len(), "Menu pipeline completed");

        Ok(EnrichedMenu {
            source_image_url,
            text,
            items,
            steps: progress.into_steps(),
        })
    }

    /// Attach an image to every dish; order is preserved
    pub async fn enrich(&self, items: Vec<MenuItem>) -> Vec<MenuItem> {
        let handles: Vec<_> = items
            .iter()
            .map(|item| {
                let resolver = Arc::clone(&self.resolver);
                let name = item.name.clone();
                let span = tracing::debug_span!("resolve_dish", dish = %name);
                tokio::spawn(
                    async move { resolver.resolve_dish_image(&name).await }.instrument(span),
                )
            })
            .collect();

        let results = futures::future::join_all(handles).await;

        items
            .into_iter()
            .zip(results)
            .map(|(mut item, result)| {
                let url = match result {
                    Ok(url) if self.policy.is_trusted(&url) => url,
                    Ok(url) => {
                        tracing::warn!(dish = %item.name, url = %url, "Resolver returned an unproxied url");
                        self.policy.placeholder().to_string()
                    }
                    Err(e) => {
                        tracing::warn!(dish = %item.name, error = %e, "Dish image resolution failed");
                        self.policy.placeholder().to_string()
                    }
                };
                item.image_url = Some(url);
                item
            })
            .collect()
    }
}

fn abort(mut progress: PipelineProgress, step: StepId, message: String, partial: Partial) -> PipelineError {
    progress.fail(step);
    tracing::error!(step = %step, error = %message, "Menu pipeline failed");

    PipelineError {
        step,
        message,
        steps: progress.into_steps(),
        source_image_url: partial.source_image_url,
        text: partial.text,
    }
}
