//! Image collection pipeline: fan-out scrape, then select.
//!
//! generate_queries -> scrape (fan-out) -> select -> rewrite? -> upload (settled)

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::prompts::{parse_queries, query_user_prompt, QUERY_SYSTEM_PROMPT};
use super::upload::Uploader;
use crate::cancellation::CancellationToken;
use crate::config::{CollectionSettings, EngineConfig};
use crate::context::{PipelineContext, StatusHandle};
use crate::core::PipelineInput;
use crate::errors::GenflowError;
use crate::events::{noop_sink, EventSink};
use crate::execution::{UnitOfWorkExecutor, UnitOptions};
use crate::fallback::{parse_json_content, FallbackCompletionClient};
use crate::fanout::FanOutGatherRunner;
use crate::gateways::{BestEffortRewriter, CompletionRequest, Gateways, ScraperGateway};
use crate::selection::{Candidate, SelectionEngine};

/// Pipeline name used in status and events.
pub const COLLECTION_PIPELINE: &str = "image_collection";

const QUERY_TIMEOUT: Duration = Duration::from_secs(60);
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(120);
const IMAGES_FOLDER: &str = "pinterest/images";

/// Input for an image collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCollectionInput {
    /// Auth and rewrite settings.
    #[serde(flatten)]
    pub base: PipelineInput,
    /// What the images should be about.
    pub prompt: String,
    /// Overrides the configured number of images.
    #[serde(default)]
    pub num_images: Option<usize>,
}

impl ImageCollectionInput {
    /// Creates an input for `prompt`.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the auth and rewrite settings.
    #[must_use]
    pub fn with_base(mut self, base: PipelineInput) -> Self {
        self.base = base;
        self
    }
}

/// Result of an image collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCollectionOutput {
    /// Selected images; `url` is the permanent storage URL.
    pub images: Vec<Candidate>,
    /// Queries sent to the scraper.
    pub queries_used: Vec<String>,
    /// Candidates returned by all scrapes, before dedup.
    pub total_scraped: usize,
    /// Candidates left after dedup.
    pub unique_candidates: usize,
    /// Best-effort degradations (rewrite failures, dropped uploads).
    pub warnings: Vec<String>,
}

struct CollectionStages {
    scraper: Arc<dyn ScraperGateway>,
    fallback: FallbackCompletionClient,
    rewriter: Option<BestEffortRewriter>,
    uploader: Uploader,
    executor: UnitOfWorkExecutor,
    engine: SelectionEngine,
    settings: CollectionSettings,
}

impl CollectionStages {
    async fn generate_queries(&self, topic: &str) -> Result<Vec<String>, GenflowError> {
        let request = CompletionRequest::prompt(
            query_user_prompt(topic, self.settings.num_queries),
            Some(QUERY_SYSTEM_PROMPT),
        )
        .with_model(self.settings.query_model.clone())
        .with_temperature(self.settings.query_temperature)
        .with_max_tokens(self.settings.query_max_tokens)
        .json();

        let fallback = &self.fallback;
        let request = &request;
        let response = self
            .executor
            .run(
                "generate_queries",
                &UnitOptions::fast(QUERY_TIMEOUT),
                move |_| fallback.complete(request),
            )
            .await?;

        let parsed = parse_json_content(&response.value.content).unwrap_or_else(|e| {
            warn!(model = %response.served_by, error = %e, "Query response was not JSON");
            Value::Null
        });
        Ok(parse_queries(&parsed, topic, self.settings.num_queries))
    }

    async fn scrape(&self, queries: &[String]) -> Result<Vec<Candidate>, GenflowError> {
        let runner = FanOutGatherRunner::new("scrape")
            .with_cancellation(self.executor.cancellation().clone());
        let pages = self.settings.pages_per_query;

        let ops = queries.iter().cloned().map(|query| {
            let scraper = self.scraper.clone();
            let executor = self.executor.clone();
            async move {
                let scraper = &scraper;
                let q = query.as_str();
                let candidates = executor
                    .run("scrape", &UnitOptions::fast(SCRAPE_TIMEOUT), move |_| {
                        scraper.scrape(q, pages)
                    })
                    .await?;
                info!(query = %query, count = candidates.len(), "Query returned candidates");
                Ok::<_, GenflowError>(candidates)
            }
        });

        let outcome = runner.gather(ops).await?;
        for failure in &outcome.failures {
            warn!(
                query = %queries[failure.index],
                error = %failure.error,
                "Query failed"
            );
        }

        let all: Vec<Candidate> = outcome.into_values().into_iter().flatten().collect();
        info!(total = all.len(), "Total candidates scraped");
        Ok(all)
    }

    async fn rewrite(
        &self,
        input: &ImageCollectionInput,
        mut images: Vec<Candidate>,
    ) -> Result<(Vec<Candidate>, Option<String>), GenflowError> {
        let rewriter = self
            .rewriter
            .as_ref()
            .ok_or_else(|| GenflowError::config("rewrite enabled but no rewrite gateway configured"))?;

        let urls: Vec<String> = images
            .iter()
            .map(|c| c.url().unwrap_or_default().to_string())
            .collect();
        let outcome = rewriter
            .rewrite_images(&urls, input.base.rewrite_device)
            .await;

        for (image, url) in images.iter_mut().zip(outcome.value) {
            image.url = Some(url);
        }
        Ok((images, outcome.warning))
    }

    async fn upload(&self, images: Vec<Candidate>) -> (Vec<Candidate>, Vec<String>) {
        if images.is_empty() {
            return (images, Vec::new());
        }

        let urls: Vec<String> = images
            .iter()
            .map(|c| c.url().unwrap_or_default().to_string())
            .collect();
        let results = self.uploader.upload_settled(urls, IMAGES_FOLDER).await;

        let mut uploaded = Vec::with_capacity(images.len());
        let mut warnings = Vec::new();
        for (mut image, result) in images.into_iter().zip(results) {
            match result {
                Ok(url) => {
                    image.url = Some(url);
                    uploaded.push(image);
                }
                Err(e) => {
                    let id = image.id.clone().unwrap_or_default();
                    warn!(id = %id, error = %e, "Failed to upload image");
                    warnings.push(format!("Failed to upload image {id}: {e}"));
                }
            }
        }
        (uploaded, warnings)
    }
}

/// Collects a diverse, persisted image set for a topic.
///
/// One instance serves one invocation; a second `run` is rejected.
pub struct ImageCollectionPipeline {
    ctx: PipelineContext,
    stages: CollectionStages,
}

impl std::fmt::Debug for ImageCollectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCollectionPipeline")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl ImageCollectionPipeline {
    /// Builds the pipeline from collaborators and engine settings.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] if the scraper, completion or
    /// storage gateway is missing.
    pub fn new(gateways: &Gateways, config: &EngineConfig) -> Result<Self, GenflowError> {
        Self::with_observers(gateways, config, noop_sink(), Arc::new(CancellationToken::new()))
    }

    /// Like [`new`](Self::new) with an event sink and a shared token.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_observers(
        gateways: &Gateways,
        config: &EngineConfig,
        events: Arc<dyn EventSink>,
        cancel: Arc<CancellationToken>,
    ) -> Result<Self, GenflowError> {
        let executor = UnitOfWorkExecutor::new()
            .with_event_sink(events.clone())
            .with_cancellation(cancel.clone());

        let stages = CollectionStages {
            scraper: gateways.scraper()?.clone(),
            fallback: FallbackCompletionClient::new(
                gateways.completion()?.clone(),
                config.completion.policy(),
            ),
            rewriter: gateways
                .rewrite()
                .ok()
                .map(|gateway| BestEffortRewriter::new(gateway.clone())),
            uploader: Uploader::new(gateways.storage()?.clone(), executor.clone()),
            executor,
            engine: SelectionEngine::new(),
            settings: config.collection.clone(),
        };

        let ctx = PipelineContext::new(COLLECTION_PIPELINE, config.auth.gate())
            .with_event_sink(events)
            .with_cancellation(cancel);

        Ok(Self { ctx, stages })
    }

    /// Replaces the selection engine.
    #[must_use]
    pub fn with_selection_engine(mut self, engine: SelectionEngine) -> Self {
        self.stages.engine = engine;
        self
    }

    /// Returns a read-only status view.
    #[must_use]
    pub fn status_handle(&self) -> StatusHandle {
        self.ctx.status_handle()
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> Arc<CancellationToken> {
        self.ctx.cancellation().clone()
    }

    /// Requests cancellation; takes effect at the next suspension point.
    pub fn cancel(&self, reason: &str) {
        self.ctx.cancellation().cancel(reason);
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// - [`GenflowError::Authentication`] before any step runs.
    /// - [`GenflowError::Validation`] for an empty prompt.
    /// - [`GenflowError::AggregateFanOut`] if every scrape failed.
    /// - Any other step error.
    pub async fn run(
        &mut self,
        input: &ImageCollectionInput,
    ) -> Result<ImageCollectionOutput, GenflowError> {
        let (ctx, stages) = (&mut self.ctx, &self.stages);
        ctx.start(&input.base).await?;

        let topic = input.prompt.trim();
        if topic.is_empty() {
            let e = GenflowError::validation("prompt must not be empty");
            ctx.fail(&e.to_string()).await;
            return Err(e);
        }
        let num_images = input.num_images.unwrap_or(stages.settings.num_images);

        let queries = ctx
            .step(
                "generate_queries",
                "Generate Search Queries",
                10,
                stages.generate_queries(topic),
            )
            .await?;
        ctx.set_output("queries", json!(queries));

        let scraped = ctx
            .step("scrape", "Collecting Images", 50, stages.scrape(&queries))
            .await?;
        let total_scraped = scraped.len();

        let (selected, report) = ctx
            .step("select", "Select Best Images", 70, async {
                Ok::<_, GenflowError>(stages.engine.select_scored(&scraped, num_images))
            })
            .await?;
        ctx.set_output("selection", json!(report));
        let mut images: Vec<Candidate> = selected.into_iter().map(|s| s.candidate).collect();

        let mut warnings = Vec::new();
        if input.base.rewrite_enabled {
            let (rewritten, warning) = ctx
                .step(
                    "rewrite",
                    "Rewrite Images",
                    80,
                    stages.rewrite(input, images),
                )
                .await?;
            images = rewritten;
            warnings.extend(warning);
        } else {
            ctx.skip("rewrite", "Rewrite Images", 80, "rewrite disabled")
                .await?;
        }

        let (images, upload_warnings) = ctx
            .step("upload", "Save Images", 90, async move {
                Ok::<_, GenflowError>(stages.upload(images).await)
            })
            .await?;
        warnings.extend(upload_warnings);

        ctx.complete().await;

        Ok(ImageCollectionOutput {
            images,
            queries_used: queries,
            total_scraped,
            unique_candidates: report.unique,
            warnings,
        })
    }
}
