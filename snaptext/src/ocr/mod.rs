//! OCR (Optical Character Recognition) Module
//!
//! Wraps the external text-recognition engine behind a single trait so the
//! request handler never needs to know which engine is running, or whether
//! one is running at all.
//!
//! # Architecture
//!
//! - [`TextRecognizer`] is the seam the handler depends on
//! - [`OcrProvider`] implements it with one of three backends: local
//!   tesseract via leptess, an OpenAI-compatible vision API, or
//!   `Unavailable` when initialization failed at startup
//! - [`load_image`] and [`prepare_for_ocr`] are the stateless image steps
//!   that run before recognition
//!
//! # Usage
//!
//! ```rust,ignore
//! let provider = OcrProvider::new(&config.ocr)?;
//! let text = provider.recognize(&image_bytes).await?;
//! ```

mod api;
mod preprocessing;
mod provider;

use async_trait::async_trait;

use crate::error::Result;

pub use preprocessing::{load_image, prepare_for_ocr, preprocess_image, verify_image, ImageInfo};
pub use provider::OcrProvider;

/// An engine that turns image bytes into text.
///
/// Implementations must be safe to call from concurrent requests; engines
/// that need exclusive access serialize internally.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short engine identifier reported by the health endpoint.
    fn engine(&self) -> &str;

    /// Whether the engine initialized successfully at startup.
    fn is_available(&self) -> bool;

    /// Why the engine is unavailable, if it is.
    fn unavailable_reason(&self) -> Option<&str> {
        None
    }

    async fn recognize(&self, image: &[u8]) -> Result<String>;
}
