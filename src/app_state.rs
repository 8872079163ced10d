use std::path::PathBuf;
use std::sync::Arc;

use crate::db::RequestStore;
use crate::services::pipeline::ImagePipeline;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RequestStore>,
    pub pipeline: Arc<ImagePipeline>,
    pub upload_dir: Arc<PathBuf>,
    /// Largest accepted CSV file part, in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RequestStore>,
        pipeline: ImagePipeline,
        upload_dir: impl Into<PathBuf>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            pipeline: Arc::new(pipeline),
            upload_dir: Arc::new(upload_dir.into()),
            max_upload_bytes,
        }
    }
}
