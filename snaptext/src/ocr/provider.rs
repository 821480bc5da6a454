use std::sync::Arc;

use async_trait::async_trait;
use leptess::LepTess;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{parse_ocr_provider_model, OcrConfig};
use crate::error::{Result, SnaptextError};

use super::api::VisionOcrClient;
use super::TextRecognizer;

enum OcrBackend {
    /// Tesseract needs `&mut self` per call, so the handle is serialized.
    Local { tesseract: Arc<Mutex<LepTess>> },
    Api { client: VisionOcrClient },
    Unavailable { reason: String },
}

/// Process-wide recognition engine, constructed once at startup.
pub struct OcrProvider {
    backend: OcrBackend,
}

fn create_tesseract(languages: &str) -> std::result::Result<LepTess, String> {
    LepTess::new(None, languages).map_err(|e| e.to_string())
}

/// Run blocking `work` with exclusive access to `engine`.
///
/// The lock is taken before the blocking task is spawned, so a caller that
/// gives up while queued never leaves work behind on the blocking pool.
pub(crate) async fn run_exclusive<E, R, F>(engine: &Arc<Mutex<E>>, work: F) -> Result<R>
where
    E: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut E) -> Result<R> + Send + 'static,
{
    let mut guard = Arc::clone(engine).lock_owned().await;
    tokio::task::spawn_blocking(move || work(&mut guard))
        .await
        .map_err(|e| SnaptextError::Ocr(format!("OCR task panicked: {e}")))?
}

impl OcrProvider {
    /// Initialize the configured backend.
    ///
    /// Never fails: an engine that cannot be brought up leaves the provider
    /// in the `Unavailable` state and the service runs degraded.
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let (provider, model) = parse_ocr_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "local" => match create_tesseract(&config.languages) {
                Ok(lt) => {
                    info!(languages = %config.languages, "Tesseract OCR initialized");
                    OcrBackend::Local {
                        tesseract: Arc::new(Mutex::new(lt)),
                    }
                }
                Err(e) => {
                    let reason = format!("Tesseract not available: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
            remote => match VisionOcrClient::new(remote, model, config) {
                Ok(client) => {
                    info!(provider = remote, model, "Vision OCR API backend initialized");
                    OcrBackend::Api { client }
                }
                Err(e) => {
                    let reason = format!("{remote} OCR backend unavailable: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
        };

        Ok(Self { backend })
    }

    /// A provider that is permanently degraded.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
        }
    }
}

#[async_trait]
impl TextRecognizer for OcrProvider {
    fn engine(&self) -> &str {
        match &self.backend {
            OcrBackend::Local { .. } => "tesseract",
            OcrBackend::Api { client } => client.provider(),
            OcrBackend::Unavailable { .. } => "unavailable",
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            OcrBackend::Unavailable { reason } => Some(reason.as_str()),
            _ => None,
        }
    }

    async fn recognize(&self, image: &[u8]) -> Result<String> {
        match &self.backend {
            OcrBackend::Local { tesseract } => {
                let bytes = image.to_vec();
                let text = run_exclusive(tesseract, move |lt| {
                    lt.set_image_from_mem(&bytes)
                        .map_err(|e| SnaptextError::Ocr(format!("Failed to set image: {e}")))?;
                    lt.get_utf8_text()
                        .map_err(|e| SnaptextError::Ocr(format!("Failed to extract text: {e}")))
                })
                .await?;

                Ok(text.trim().to_string())
            }
            OcrBackend::Api { client } => client.ocr(image).await,
            OcrBackend::Unavailable { reason } => {
                Err(SnaptextError::OcrUnavailable(reason.clone()))
            }
        }
    }
}
