//! Per-request image pipeline: fetch, compress, upload, record.
//!
//! Each upload spawns one run on its own tokio task. Within a run, products
//! and their URLs are processed strictly in order. The request is saved once,
//! at the end, so progress is not visible while a run is in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::{RequestStore, StoreError};
use crate::models::request::{ImageRequest, InvalidTransition};
use crate::services::compression::{CompressionError, Compressor, OUTPUT_CONTENT_TYPE};
use crate::services::credentials::{AccessToken, AuthError, CredentialProvider};
use crate::services::csv_ingest::CsvError;
use crate::services::csv_rewrite::{append_output_urls, output_url_map};
use crate::services::fetch::{FetchError, ImageFetcher};
use crate::services::storage::{ImageStore, StorageError};

pub struct ImagePipeline {
    store: Arc<dyn RequestStore>,
    credentials: Arc<dyn CredentialProvider>,
    images: Arc<dyn ImageStore>,
    fetcher: ImageFetcher,
    compressor: Compressor,
}

impl ImagePipeline {
    pub fn new(
        store: Arc<dyn RequestStore>,
        credentials: Arc<dyn CredentialProvider>,
        images: Arc<dyn ImageStore>,
        fetcher: ImageFetcher,
        compressor: Compressor,
    ) -> Self {
        Self {
            store,
            credentials,
            images,
            fetcher,
            compressor,
        }
    }

    /// Run the pipeline for `request_id` in the background.
    ///
    /// A run that stops on a systemic error marks the request failed.
    pub fn spawn(self: &Arc<Self>, request_id: String, csv_path: PathBuf) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = pipeline.run(&request_id, &csv_path).await {
                tracing::error!(request_id = %request_id, error = %e, "Pipeline run aborted");
                metrics::counter!("pipeline_runs_failed").increment(1);
                pipeline.record_failure(&request_id, &e).await;
            }
        })
    }

    /// Process every image of a request, then save it and rewrite its CSV.
    pub async fn run(&self, request_id: &str, csv_path: &Path) -> Result<ImageRequest, PipelineError> {
        let start = Instant::now();
        let mut request = self
            .store
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| PipelineError::RequestNotFound(request_id.to_string()))?;

        tracing::info!(
            request_id = %request_id,
            products = request.products.len(),
            jpeg_quality = self.compressor.quality(),
            "Starting image pipeline"
        );

        let token = self.credentials.authorize().await?;
        tracing::debug!(
            request_id = %request_id,
            expires_at = %token.expires_at,
            "Authorized with remote storage"
        );

        for product in &mut request.products {
            let mut output_urls = Vec::with_capacity(product.input_urls.len());
            for url in &product.input_urls {
                match self.process_url(&token, url).await {
                    Ok(output_url) => {
                        metrics::counter!("images_processed_total").increment(1);
                        output_urls.push(output_url);
                    }
                    Err(e) => {
                        metrics::counter!("images_failed_total").increment(1);
                        tracing::warn!(
                            request_id = %request_id,
                            serial_number = ?product.serial_number,
                            url = %url,
                            error = %e,
                            "Image processing failed, skipping"
                        );
                    }
                }
            }
            product.output_urls = output_urls;
        }

        request.complete()?;
        self.store.save(&request).await?;

        metrics::counter!("pipeline_runs_completed").increment(1);
        metrics::histogram!("pipeline_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(
            request_id = %request_id,
            outcome = ?request.outcome(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Image pipeline completed"
        );

        if let Err(e) = self.rewrite_csv(&request, csv_path).await {
            tracing::warn!(
                request_id = %request_id,
                path = %csv_path.display(),
                error = %e,
                "Failed to rewrite CSV with output URLs"
            );
        }

        Ok(request)
    }

    async fn process_url(&self, token: &AccessToken, url: &str) -> Result<String, ImageError> {
        tracing::debug!(url = %url, "Processing image");
        let source = self.fetcher.fetch(url).await?;

        let compressor = self.compressor;
        let compressed = tokio::task::spawn_blocking(move || compressor.compress(&source))
            .await
            .map_err(|e| ImageError::Task(e.to_string()))??;

        let file_name = format!("{}.jpg", Uuid::new_v4());
        let output_url = self
            .images
            .upload(token, &file_name, compressed, OUTPUT_CONTENT_TYPE)
            .await?;

        tracing::debug!(url = %url, output_url = %output_url, "Image uploaded");
        Ok(output_url)
    }

    async fn rewrite_csv(&self, request: &ImageRequest, csv_path: &Path) -> Result<usize, CsvError> {
        let urls = output_url_map(&request.products);
        let path = csv_path.to_path_buf();
        tokio::task::spawn_blocking(move || append_output_urls(&path, &urls))
            .await
            .map_err(|e| CsvError::Io(std::io::Error::other(e)))?
    }

    async fn record_failure(&self, request_id: &str, error: &PipelineError) {
        let mut request = match self.store.find_by_id(request_id).await {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Could not load request to mark it failed");
                return;
            }
        };

        if request.fail(error.to_string()).is_err() {
            return;
        }
        if let Err(e) = self.store.save(&request).await {
            tracing::error!(request_id = %request_id, error = %e, "Could not mark request failed");
        }
    }
}

/// Failure of a single image. Logged and skipped; the run continues.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Upload(#[from] StorageError),

    #[error("Compression task failed: {0}")]
    Task(String),
}

/// Failure that stops a whole run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Request {0} not found")]
    RequestNotFound(String),

    #[error("Authorization with remote storage failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Request store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}
