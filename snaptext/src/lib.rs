//! Snaptext: upload an image, get its text back.
//!
//! The binary in `main.rs` wires these modules into an axum server; the
//! library surface exists so integration tests can build the same router
//! with a fake recognizer.

pub mod api;
pub mod config;
pub mod error;
pub mod extraction;
pub mod ocr;
pub mod upload;
