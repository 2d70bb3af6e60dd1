use std::sync::Arc;

use crate::config::Config;
use crate::customizer::processor::DocumentProcessor;
use crate::customizer::upload::UploadLimits;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Stateless engine shared by single and batch requests.
    pub processor: Arc<DocumentProcessor>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let processor = Arc::new(DocumentProcessor::new(config.engine_config()));
        Self { config, processor }
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_file_bytes: self.config.max_upload_bytes(),
            max_batch_files: self.config.max_batch_files,
        }
    }
}
