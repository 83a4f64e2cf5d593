//! Scripted gateway doubles.
//!
//! Each double records its calls so tests can assert on call counts and
//! arguments without reaching for a mocking framework.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::RewriteDevice;
use crate::errors::{GenflowError, ProviderError};
use crate::gateways::{
    CompletionGateway, CompletionRequest, CompletionResponse, GeneratedMedia, GenerationGateway,
    GenerationKind, GenerationRequest, ModelConfig, RewriteGateway, ScraperGateway, StorageGateway,
    StoredObject, UploadRequest, UploadSource,
};
use crate::selection::Candidate;

/// Completion double answering from per-model scripts.
///
/// Scripted results for a model are consumed in order; once exhausted the
/// default content (if any) is returned, otherwise a non-transient provider
/// error.
#[derive(Debug, Default)]
pub struct ScriptedCompletionGateway {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, GenflowError>>>>,
    default_content: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedCompletionGateway {
    /// Creates an empty double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `content` for any unscripted call.
    #[must_use]
    pub fn with_default(mut self, content: impl Into<String>) -> Self {
        self.default_content = Some(content.into());
        self
    }

    /// Queues a successful response for `model`.
    #[must_use]
    pub fn respond(self, model: &str, content: impl Into<String>) -> Self {
        self.push(model, Ok(content.into()));
        self
    }

    /// Queues a failure for `model`.
    #[must_use]
    pub fn fail(self, model: &str, error: GenflowError) -> Self {
        self.push(model, Err(error));
        self
    }

    fn push(&self, model: &str, result: Result<String, GenflowError>) {
        self.scripts
            .lock()
            .entry(model.to_string())
            .or_default()
            .push_back(result);
    }

    /// Models called, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls made for `model`.
    #[must_use]
    pub fn call_count(&self, model: &str) -> usize {
        self.calls.lock().iter().filter(|m| *m == model).count()
    }

    /// Total number of calls.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedCompletionGateway {
    async fn complete(
        &self,
        _request: &CompletionRequest,
        config: &ModelConfig,
    ) -> Result<CompletionResponse, GenflowError> {
        self.calls.lock().push(config.model.clone());

        let scripted = self
            .scripts
            .lock()
            .get_mut(&config.model)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Ok(content)) => Ok(CompletionResponse::new(content, config.model.clone())),
            Some(Err(error)) => Err(error),
            None => match &self.default_content {
                Some(content) => Ok(CompletionResponse::new(content.clone(), config.model.clone())),
                None => Err(ProviderError::new(
                    "scripted",
                    "BadRequestError",
                    format!("no scripted response for {}", config.model),
                )
                .into()),
            },
        }
    }
}

/// Generation double returning deterministic URLs per kind.
#[derive(Debug, Default)]
pub struct StaticGenerationGateway {
    failures: Mutex<HashMap<GenerationKind, GenflowError>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StaticGenerationGateway {
    /// Creates a double where every kind succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every request of `kind` fail with `error`.
    #[must_use]
    pub fn failing(self, kind: GenerationKind, error: GenflowError) -> Self {
        self.failures.lock().insert(kind, error);
        self
    }

    /// Requests received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests of `kind`.
    #[must_use]
    pub fn call_count(&self, kind: GenerationKind) -> usize {
        self.requests.lock().iter().filter(|r| r.kind == kind).count()
    }
}

#[async_trait]
impl GenerationGateway for StaticGenerationGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedMedia, GenflowError> {
        let n = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        if let Some(error) = self.failures.lock().get(&request.kind) {
            return Err(error.clone());
        }

        let ext = match request.kind {
            GenerationKind::Image => "png",
            _ => "mp4",
        };
        let model = request.model.clone().unwrap_or_else(|| "default".into());
        Ok(GeneratedMedia::new(
            format!("https://gen.test/{}/{n}.{ext}", request.kind),
            model,
        ))
    }
}

/// Scraper double answering from per-query scripts.
///
/// Unscripted queries return an empty page.
#[derive(Debug, Default)]
pub struct ScriptedScraperGateway {
    results: Mutex<HashMap<String, Result<Vec<Candidate>, GenflowError>>>,
    queries: Mutex<Vec<(String, u32)>>,
}

impl ScriptedScraperGateway {
    /// Creates an empty double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `candidates` for `query`.
    #[must_use]
    pub fn with_results(self, query: &str, candidates: Vec<Candidate>) -> Self {
        self.results.lock().insert(query.to_string(), Ok(candidates));
        self
    }

    /// Fails `query` with `error`.
    #[must_use]
    pub fn failing(self, query: &str, error: GenflowError) -> Self {
        self.results.lock().insert(query.to_string(), Err(error));
        self
    }

    /// `(query, pages)` pairs received.
    #[must_use]
    pub fn queries(&self) -> Vec<(String, u32)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ScraperGateway for ScriptedScraperGateway {
    async fn scrape(&self, query: &str, pages: u32) -> Result<Vec<Candidate>, GenflowError> {
        self.queries.lock().push((query.to_string(), pages));
        self.results
            .lock()
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Rewrite double that tags URLs with `?rewritten`.
#[derive(Debug, Default)]
pub struct RecordingRewriteGateway {
    error: Option<GenflowError>,
    image_calls: AtomicUsize,
    video_calls: AtomicUsize,
}

impl RecordingRewriteGateway {
    /// Creates a double that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a double that always fails with `error`.
    #[must_use]
    pub fn failing(error: GenflowError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Number of image rewrite calls.
    #[must_use]
    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    /// Number of video rewrite calls.
    #[must_use]
    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    /// Total rewrite calls.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.image_calls() + self.video_calls()
    }
}

#[async_trait]
impl RewriteGateway for RecordingRewriteGateway {
    async fn rewrite_images(
        &self,
        urls: &[String],
        _device: Option<RewriteDevice>,
    ) -> Result<Vec<String>, GenflowError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(urls.iter().map(|u| format!("{u}?rewritten")).collect())
    }

    async fn rewrite_video(
        &self,
        url: &str,
        _playback_speed: f32,
        _device: Option<RewriteDevice>,
    ) -> Result<String, GenflowError> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(format!("{url}?rewritten"))
    }
}

/// Storage double serving objects from `https://storage.test/{key}`.
#[derive(Debug, Default)]
pub struct RecordingStorageGateway {
    failing_sources: Mutex<HashSet<String>>,
    uploads: Mutex<Vec<UploadRequest>>,
}

impl RecordingStorageGateway {
    /// Creates a double where every upload succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails uploads whose source URL is `url`.
    #[must_use]
    pub fn failing_for(self, url: impl Into<String>) -> Self {
        self.failing_sources.lock().insert(url.into());
        self
    }

    /// Upload requests received, in order.
    #[must_use]
    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.uploads.lock().clone()
    }

    /// Number of upload calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.uploads.lock().len()
    }
}

#[async_trait]
impl StorageGateway for RecordingStorageGateway {
    async fn upload(&self, request: &UploadRequest) -> Result<StoredObject, GenflowError> {
        self.uploads.lock().push(request.clone());

        if let UploadSource::Url(url) = &request.source {
            if self.failing_sources.lock().contains(url) {
                return Err(GenflowError::validation(format!("source not reachable: {url}")));
            }
        }

        Ok(StoredObject {
            url: format!("https://storage.test/{}", request.key),
            key: request.key.clone(),
        })
    }
}
