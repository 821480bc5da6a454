use axum::Json;
use utoipa::OpenApi;

use super::handlers;
use super::response;
use crate::extraction;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Snaptext API",
        version = "1.0.0",
        description = "Upload an image, get the text in it back.",
    ),
    paths(
        handlers::extract::extract_text,
        handlers::health::health_check,
    ),
    components(schemas(
        response::ErrorCode,
        response::ApiError,
        extraction::ExtractionResult,
        handlers::health::HealthData,
        handlers::health::OcrStatus,
    )),
    tags(
        (name = "extraction", description = "Image text extraction"),
        (name = "health", description = "Health check"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_both_endpoints() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/extract-text"));
        assert!(doc.paths.paths.contains_key("/api/health"));
    }
}
