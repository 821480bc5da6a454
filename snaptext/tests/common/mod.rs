#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use image::{DynamicImage, ImageFormat};

use snaptext::api::{create_router, AppState};
use snaptext::config::{Config, OcrConfig, ServerConfig, UploadConfig, DEFAULT_MAX_UPLOAD_BYTES};
use snaptext::error::{Result, SnaptextError};
use snaptext::ocr::TextRecognizer;

pub const BOUNDARY: &str = "snaptext-test-boundary";

/// Always returns the same text.
pub struct EchoRecognizer(pub &'static str);

#[async_trait]
impl TextRecognizer for EchoRecognizer {
    fn engine(&self) -> &str {
        "echo"
    }
    fn is_available(&self) -> bool {
        true
    }
    async fn recognize(&self, _image: &[u8]) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Reports the decoded dimensions of whatever it receives, so a caller can
/// tell which upload reached the engine.
pub struct DimensionRecognizer;

#[async_trait]
impl TextRecognizer for DimensionRecognizer {
    fn engine(&self) -> &str {
        "dimensions"
    }
    fn is_available(&self) -> bool {
        true
    }
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let decoded =
            image::load_from_memory(image).map_err(|e| SnaptextError::Ocr(e.to_string()))?;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok(format!("{}x{}", decoded.width(), decoded.height()))
    }
}

pub struct FailingRecognizer;

#[async_trait]
impl TextRecognizer for FailingRecognizer {
    fn engine(&self) -> &str {
        "failing"
    }
    fn is_available(&self) -> bool {
        true
    }
    async fn recognize(&self, _image: &[u8]) -> Result<String> {
        Err(SnaptextError::Ocr("tesseract returned garbage".to_string()))
    }
}

pub struct UnavailableRecognizer;

#[async_trait]
impl TextRecognizer for UnavailableRecognizer {
    fn engine(&self) -> &str {
        "unavailable"
    }
    fn is_available(&self) -> bool {
        false
    }
    fn unavailable_reason(&self) -> Option<&str> {
        Some("no tessdata installed")
    }
    async fn recognize(&self, _image: &[u8]) -> Result<String> {
        Err(SnaptextError::OcrUnavailable("no tessdata installed".to_string()))
    }
}

pub struct PanickingRecognizer;

#[async_trait]
impl TextRecognizer for PanickingRecognizer {
    fn engine(&self) -> &str {
        "panicking"
    }
    fn is_available(&self) -> bool {
        true
    }
    async fn recognize(&self, _image: &[u8]) -> Result<String> {
        panic!("engine crashed");
    }
}

pub fn test_config(upload_dir: &Path, max_body_bytes: usize) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        upload: UploadConfig {
            dir: upload_dir.to_path_buf(),
            max_body_bytes,
        },
        ocr: OcrConfig {
            timeout_secs: 5,
            ..OcrConfig::default()
        },
    }
}

pub fn app_with(upload_dir: &Path, recognizer: Arc<dyn TextRecognizer>) -> Router {
    app_with_limit(upload_dir, recognizer, DEFAULT_MAX_UPLOAD_BYTES)
}

pub fn app_with_limit(
    upload_dir: &Path,
    recognizer: Arc<dyn TextRecognizer>,
    max_body_bytes: usize,
) -> Router {
    let config = test_config(upload_dir, max_body_bytes);
    create_router(AppState::new(config, recognizer))
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode png fixture");
    out
}

/// One part of a multipart body. `filename` of `None` omits the attribute.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

pub fn file_part<'a>(filename: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name: "image",
        filename: Some(filename),
        content_type: "application/octet-stream",
        data,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/extract-text")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("build request")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .expect("read upload dir")
        .next()
        .is_none()
}
