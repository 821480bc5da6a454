//! The request lifecycle around one recognition call: persist the upload,
//! verify and optionally preprocess it, recognize, and remove the transient
//! file on every exit path.
//!
//! Recognition problems never fail the request. An unavailable engine, an
//! engine error or a timeout all produce a successful result carrying
//! diagnostic placeholder text with `degraded` set.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image::DynamicImage;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::OcrConfig;
use crate::error::{Result, SnaptextError};
use crate::ocr::{load_image, prepare_for_ocr, TextRecognizer};
use crate::upload::{TransientFile, UploadStore, UploadedImage};

pub const NO_TEXT_PLACEHOLDER: &str = "[No text detected in image]";

const MESSAGE_EXTRACTED: &str = "Text extracted successfully";
const MESSAGE_NO_TEXT: &str = "No text detected in image";
const MESSAGE_UNAVAILABLE: &str = "OCR engine unavailable, returned placeholder text";
const MESSAGE_FAILED: &str = "OCR extraction failed, returned diagnostic text";

/// Outcome of one extraction request, as sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ExtractionResult {
    pub success: bool,
    /// Recognized text, or a diagnostic placeholder when `degraded`.
    pub text: String,
    pub message: String,
    /// True when the engine was unavailable or failed.
    pub degraded: bool,
    /// Sanitized client filename, for display only.
    pub filename: String,
}

pub fn unavailable_placeholder(reason: &str) -> String {
    format!(
        "DEMO MODE: OCR engine not loaded.\n\n\
         Text recognition is unavailable on this server, so no text could be extracted.\n\
         Reason: {reason}\n\n\
         Check the server's OCR configuration and try again."
    )
}

pub fn failure_placeholder(err: &SnaptextError) -> String {
    format!(
        "OCR extraction attempted but failed.\n\n\
         Error: {err}\n\n\
         Possible causes:\n\
         - Image quality too low\n\
         - No text in image\n\
         - Unsupported language"
    )
}

#[derive(Clone)]
pub struct ExtractionService {
    store: UploadStore,
    recognizer: Arc<dyn TextRecognizer>,
    config: OcrConfig,
}

impl ExtractionService {
    pub fn new(store: UploadStore, recognizer: Arc<dyn TextRecognizer>, config: OcrConfig) -> Self {
        Self {
            store,
            recognizer,
            config,
        }
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// Run one validated upload through the full lifecycle.
    pub async fn extract(&self, image: UploadedImage) -> Result<ExtractionResult> {
        let request_id = Uuid::new_v4();

        let file = match self.store.persist(&image, request_id).await {
            Ok(file) => file,
            Err(e) => {
                error!(%request_id, error = %e, "Failed to save upload");
                return Err(e);
            }
        };
        info!(
            %request_id,
            storage_key = file.key(),
            filename = %image.sanitized_name,
            original_name = ?image.original_name,
            bytes = image.len(),
            "File saved"
        );

        let outcome = self.process(&file, request_id).await;

        if let Err(e) = file.cleanup().await {
            warn!(%request_id, error = %e, "Transient upload cleanup failed");
        }

        let (text, message, degraded) = outcome?;
        Ok(ExtractionResult {
            success: true,
            text,
            message: message.to_string(),
            degraded,
            filename: image.sanitized_name,
        })
    }

    /// Run a local image file through the same lifecycle as an upload.
    pub async fn extract_path(&self, path: &Path) -> Result<ExtractionResult> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            SnaptextError::Validation(format!("Failed to read {}: {e}", path.display()))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.extract(UploadedImage::new(name, Bytes::from(bytes))?).await
    }

    async fn process(
        &self,
        file: &TransientFile,
        request_id: Uuid,
    ) -> Result<(String, &'static str, bool)> {
        let stored = tokio::fs::read(file.path())
            .await
            .map_err(|e| SnaptextError::Storage(format!("Failed to read saved file: {e}")))?;

        let (img, stored) = tokio::task::spawn_blocking(move || -> Result<(DynamicImage, Vec<u8>)> {
            let (img, _) = load_image(&stored)?;
            Ok((img, stored))
        })
        .await
        .map_err(|e| SnaptextError::Internal(format!("Image task panicked: {e}")))??;

        if !self.recognizer.is_available() {
            let reason = self
                .recognizer
                .unavailable_reason()
                .unwrap_or("engine failed to initialize");
            info!(%request_id, "OCR not available, returning placeholder text");
            return Ok((unavailable_placeholder(reason), MESSAGE_UNAVAILABLE, true));
        }

        let prepared = if self.config.preprocess {
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || prepare_for_ocr(img, &config))
                .await
                .map_err(|e| SnaptextError::Internal(format!("Image task panicked: {e}")))??
        } else {
            stored
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let recognized = tokio::time::timeout(timeout, self.recognizer.recognize(&prepared))
            .await
            .unwrap_or_else(|_| Err(SnaptextError::OcrTimeout(self.config.timeout_secs)));

        match recognized {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    info!(%request_id, "No text detected");
                    Ok((NO_TEXT_PLACEHOLDER.to_string(), MESSAGE_NO_TEXT, false))
                } else {
                    info!(%request_id, chars = text.chars().count(), "Text extracted");
                    Ok((text.to_string(), MESSAGE_EXTRACTED, false))
                }
            }
            Err(SnaptextError::OcrUnavailable(reason)) => {
                warn!(%request_id, %reason, "OCR engine reported itself unavailable");
                Ok((unavailable_placeholder(&reason), MESSAGE_UNAVAILABLE, true))
            }
            Err(e) => {
                if e.is_recognition_failure() {
                    warn!(%request_id, error = %e, "OCR extraction failed");
                } else {
                    error!(%request_id, error = %e, "Unexpected error during OCR");
                }
                Ok((failure_placeholder(&e), MESSAGE_FAILED, true))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::ImageFormat;

    struct Fixed(&'static str);

    #[async_trait]
    impl TextRecognizer for Fixed {
        fn engine(&self) -> &str {
            "fixed"
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl TextRecognizer for Failing {
        fn engine(&self) -> &str {
            "failing"
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            Err(SnaptextError::Ocr("model exploded".to_string()))
        }
    }

    struct Slow;

    #[async_trait]
    impl TextRecognizer for Slow {
        fn engine(&self) -> &str {
            "slow"
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    fn png() -> Bytes {
        let mut out = Vec::new();
        DynamicImage::new_rgb8(32, 16)
            .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        Bytes::from(out)
    }

    fn service(dir: &std::path::Path, recognizer: Arc<dyn TextRecognizer>) -> ExtractionService {
        let config = OcrConfig {
            timeout_secs: 1,
            ..OcrConfig::default()
        };
        ExtractionService::new(UploadStore::new(dir), recognizer, config)
    }

    fn dir_is_empty(dir: &std::path::Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn returns_recognized_text_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::new(Fixed("  hello world \n")));

        let image = UploadedImage::new("receipt.png", png()).unwrap();
        let result = svc.extract(image).await.unwrap();

        assert!(result.success);
        assert!(!result.degraded);
        assert_eq!(result.text, "hello world");
        assert_eq!(result.message, "Text extracted successfully");
        assert_eq!(result.filename, "receipt.png");
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn empty_recognition_uses_no_text_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::new(Fixed("   ")));

        let result = svc
            .extract(UploadedImage::new("blank.png", png()).unwrap())
            .await
            .unwrap();
        assert_eq!(result.text, NO_TEXT_PLACEHOLDER);
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn unavailable_engine_is_degraded_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = crate::ocr::OcrProvider::unavailable("tessdata missing");
        let svc = service(tmp.path(), Arc::new(provider));

        let result = svc
            .extract(UploadedImage::new("a.png", png()).unwrap())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.degraded);
        assert!(result.text.starts_with("DEMO MODE"));
        assert!(result.text.contains("tessdata missing"));
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn engine_error_is_degraded_with_diagnostic() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::new(Failing));

        let result = svc
            .extract(UploadedImage::new("a.png", png()).unwrap())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.degraded);
        assert!(result.text.contains("model exploded"));
        assert_eq!(result.message, MESSAGE_FAILED);
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn slow_engine_times_out_into_degraded_result() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::new(Slow));

        let result = svc
            .extract(UploadedImage::new("a.png", png()).unwrap())
            .await
            .unwrap();
        assert!(result.degraded);
        assert!(result.text.contains("timed out after 1 seconds"));
    }

    #[tokio::test]
    async fn invalid_image_is_client_error_and_cleaned_up() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::new(Fixed("unused")));

        let image = UploadedImage::new("fake.png", Bytes::from_static(b"not a png")).unwrap();
        let err = svc.extract(image).await.unwrap_err();

        assert!(matches!(err, SnaptextError::InvalidImage(_)));
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn invalid_image_is_rejected_even_when_engine_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = crate::ocr::OcrProvider::unavailable("tessdata missing");
        let svc = service(tmp.path(), Arc::new(provider));

        let image = UploadedImage::new("fake.jpg", Bytes::from_static(b"nope")).unwrap();
        let err = svc.extract(image).await.unwrap_err();

        assert!(matches!(err, SnaptextError::InvalidImage(_)));
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn extract_path_reads_local_file() {
        let tmp = tempfile::tempdir().unwrap();
        let uploads = tmp.path().join("uploads");
        std::fs::create_dir(&uploads).unwrap();
        let source = tmp.path().join("page one.png");
        std::fs::write(&source, png()).unwrap();

        let svc = service(&uploads, Arc::new(Fixed("from disk")));
        let result = svc.extract_path(&source).await.unwrap();

        assert_eq!(result.text, "from disk");
        assert_eq!(result.filename, "page_one.png");
        assert!(source.exists());
        assert!(dir_is_empty(&uploads));
    }

    #[tokio::test]
    async fn extract_path_missing_file_is_validation_error() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path(), Arc::new(Fixed("unused")));

        let err = svc
            .extract_path(&tmp.path().join("absent.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, SnaptextError::Validation(_)));
    }

    #[tokio::test]
    async fn save_failure_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(&tmp.path().join("missing"), Arc::new(Fixed("unused")));

        let err = svc
            .extract(UploadedImage::new("a.png", png()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SnaptextError::Storage(_)));
    }
}
