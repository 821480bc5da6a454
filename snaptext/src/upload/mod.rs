//! Upload handling: validation of the client's file, filename sanitising and
//! request-scoped storage in the upload directory.

mod filename;
mod store;

use bytes::Bytes;

use crate::error::{Result, SnaptextError};

pub use filename::{sanitize_filename, ImageExtension, ALLOWED_EXTENSIONS};
pub use store::{TransientFile, UploadStore};

/// One submitted image, owned by the request that received it.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Client-supplied name. Untrusted; only ever logged.
    pub original_name: String,
    pub sanitized_name: String,
    pub extension: ImageExtension,
    pub bytes: Bytes,
}

impl UploadedImage {
    /// Validate the client's filename and wrap the bytes.
    pub fn new(original_name: impl Into<String>, bytes: Bytes) -> Result<Self> {
        let original_name = original_name.into();

        if original_name.trim().is_empty() {
            return Err(SnaptextError::Validation("No file selected".to_string()));
        }

        let extension = ImageExtension::from_filename(&original_name).ok_or_else(|| {
            SnaptextError::UnsupportedFileType(format!(
                "Invalid file type. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        let sanitized_name = sanitize_filename(&original_name);

        Ok(Self {
            original_name,
            sanitized_name,
            extension,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
