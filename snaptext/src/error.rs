use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnaptextError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR timed out after {0} seconds")]
    OcrTimeout(u64),
}

impl SnaptextError {
    /// Client-side input problems. These never trigger recognition.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SnaptextError::Validation(_)
                | SnaptextError::UnsupportedFileType(_)
                | SnaptextError::InvalidImage(_)
                | SnaptextError::PayloadTooLarge(_)
        )
    }

    /// Failures of the recognition collaborator, served in degraded mode.
    pub fn is_recognition_failure(&self) -> bool {
        matches!(
            self,
            SnaptextError::Ocr(_) | SnaptextError::OcrUnavailable(_) | SnaptextError::OcrTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SnaptextError>;
