use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::extraction::ExtractionService;
use crate::ocr::TextRecognizer;
use crate::upload::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Initialized once at startup; every request sees the same outcome.
    pub recognizer: Arc<dyn TextRecognizer>,
    pub extraction: ExtractionService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, recognizer: Arc<dyn TextRecognizer>) -> Self {
        let config = Arc::new(config);
        let store = UploadStore::new(config.upload.dir.clone());
        let extraction =
            ExtractionService::new(store, Arc::clone(&recognizer), config.ocr.clone());

        Self {
            config,
            recognizer,
            extraction,
            started_at: Utc::now(),
        }
    }
}
