//! Persisting generated media.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::GenflowError;
use crate::execution::{UnitOfWorkExecutor, UnitOptions};
use crate::fanout::FanOutGatherRunner;
use crate::gateways::{StorageGateway, StoredObject, UploadRequest, UploadSource};

/// Per-attempt upload timeout.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

const KNOWN_EXTENSIONS: [&str; 11] = [
    "mp4", "webm", "mov", "png", "jpg", "jpeg", "webp", "gif", "mp3", "wav", "ogg",
];

/// Maps a MIME type (parameters allowed) to a file extension; `bin` if unknown.
#[must_use]
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let base = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match base.as_str() {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/wav" => "wav",
        "audio/ogg" => "ogg",
        _ => "bin",
    }
}

/// Reads a known media extension from the URL path.
#[must_use]
pub fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let without_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    let (_, path) = without_scheme.split_once('/')?;
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    KNOWN_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Picks the extension for an upload source.
#[must_use]
pub fn infer_extension(source: &UploadSource) -> String {
    match source {
        UploadSource::Url(url) => extension_from_url(url).unwrap_or_else(|| "bin".into()),
        UploadSource::Bytes { content_type, .. } => {
            extension_for_content_type(content_type).to_string()
        }
    }
}

/// `{folder}/{YYYY/MM/DD}/{12 hex chars}.{extension}`.
#[must_use]
pub fn storage_key(folder: &str, extension: &str) -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    format!(
        "{}/{}/{id}.{extension}",
        folder.trim_end_matches('/'),
        Utc::now().format("%Y/%m/%d")
    )
}

/// One named output to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Key in the returned map.
    pub name: String,
    /// Temporary source URL.
    pub url: String,
    /// Destination folder.
    pub folder: String,
}

impl UploadTarget {
    /// Creates a target.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            folder: folder.into(),
        }
    }
}

/// Uploads media through the storage gateway as retried units of work.
#[derive(Clone)]
pub struct Uploader {
    storage: Arc<dyn StorageGateway>,
    executor: UnitOfWorkExecutor,
    options: UnitOptions,
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Uploader {
    /// Creates an uploader on the fast tier with a two-minute timeout.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageGateway>, executor: UnitOfWorkExecutor) -> Self {
        Self {
            storage,
            executor,
            options: UnitOptions::fast(UPLOAD_TIMEOUT),
        }
    }

    /// Replaces the unit options.
    #[must_use]
    pub fn with_options(mut self, options: UnitOptions) -> Self {
        self.options = options;
        self
    }

    /// Persists `source` under a fresh key in `folder`.
    ///
    /// # Errors
    ///
    /// Returns the storage error after the retry policy is exhausted.
    pub async fn upload(
        &self,
        source: UploadSource,
        folder: &str,
    ) -> Result<StoredObject, GenflowError> {
        let request = UploadRequest {
            key: storage_key(folder, &infer_extension(&source)),
            source,
        };
        let storage = &self.storage;
        let request = &request;
        let stored = self
            .executor
            .run("storage.upload", &self.options, move |_| storage.upload(request))
            .await?;
        info!(key = %stored.key, "Uploaded to storage");
        Ok(stored)
    }

    /// Persists the media at `url` and returns its permanent URL.
    ///
    /// # Errors
    ///
    /// See [`upload`](Self::upload).
    pub async fn upload_output(&self, url: &str, folder: &str) -> Result<String, GenflowError> {
        self.upload(UploadSource::Url(url.to_string()), folder)
            .await
            .map(|stored| stored.url)
    }

    /// Uploads every target in parallel; returns `name -> permanent URL`.
    ///
    /// # Errors
    ///
    /// Returns the lowest-index failure if any upload fails, or
    /// [`GenflowError::Cancelled`] if the token fired.
    pub async fn upload_outputs(
        &self,
        targets: Vec<UploadTarget>,
    ) -> Result<HashMap<String, String>, GenflowError> {
        let runner = FanOutGatherRunner::new("upload_outputs")
            .with_cancellation(self.executor.cancellation().clone());

        let ops = targets.into_iter().map(|target| {
            let uploader = self.clone();
            async move {
                let url = uploader.upload_output(&target.url, &target.folder).await?;
                Ok::<_, GenflowError>((target.name, url))
            }
        });

        let mut outcome = runner.gather(ops).await?;
        if !outcome.failures.is_empty() {
            let first = outcome.failures.remove(0);
            warn!(index = first.index, error = %first.error, "Output upload failed");
            return Err(first.error);
        }
        Ok(outcome.into_values().into_iter().collect())
    }

    /// Uploads every URL in parallel; each slot holds the permanent URL or
    /// the upload's error.
    pub async fn upload_settled(
        &self,
        urls: Vec<String>,
        folder: &str,
    ) -> Vec<Result<String, GenflowError>> {
        let runner = FanOutGatherRunner::new("upload_settled")
            .with_cancellation(self.executor.cancellation().clone());

        let count = urls.len();
        let ops = urls.into_iter().map(|url| {
            let uploader = self.clone();
            let folder = folder.to_string();
            async move { uploader.upload_output(&url, &folder).await }
        });

        let outcome = runner.gather_settled(ops).await;
        let mut slots: Vec<Option<Result<String, GenflowError>>> =
            (0..count).map(|_| None).collect();
        for (index, url) in outcome.results {
            slots[index] = Some(Ok(url));
        }
        for failure in outcome.failures {
            slots[failure.index] = Some(Err(failure.error));
        }
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(GenflowError::Internal("upload slot not filled".into())))
            })
            .collect()
    }
}
