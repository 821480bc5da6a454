use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::warn;

use crate::api::response::ApiResponse;
use crate::api::state::AppState;
use crate::error::SnaptextError;
use crate::extraction::ExtractionResult;
use crate::upload::UploadedImage;

/// Multipart field that carries the image.
pub const IMAGE_FIELD: &str = "image";

struct ImageField {
    file_name: Option<String>,
    bytes: Bytes,
}

fn map_multipart_error(err: MultipartError, max_bytes: usize) -> SnaptextError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SnaptextError::PayloadTooLarge(format!(
            "Request body exceeds the {max_bytes} byte limit"
        ))
    } else {
        SnaptextError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// Read every field so size limits apply to the whole body before any
/// processing starts.
async fn read_image_field(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ImageField, SnaptextError> {
    let mut image: Option<ImageField> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, max_bytes))?
    {
        let is_image = field.name() == Some(IMAGE_FIELD);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| map_multipart_error(e, max_bytes))?;

        if !is_image {
            continue;
        }
        if image.is_some() {
            return Err(SnaptextError::Validation(
                "Only one image may be uploaded per request".to_string(),
            ));
        }
        image = Some(ImageField { file_name, bytes });
    }

    image.ok_or_else(|| SnaptextError::Validation("No image file in request".to_string()))
}

/// `POST /api/extract-text`
#[utoipa::path(
    post,
    path = "/api/extract-text",
    tag = "extraction",
    request_body(content_type = "multipart/form-data", content = String, description = "Image file in the `image` field (png, jpg, jpeg, webp, bmp)"),
    responses(
        (status = 200, description = "Text extracted, possibly degraded placeholder text", body = ExtractionResult),
        (status = 400, description = "Missing, empty, unsupported or undecodable upload", body = crate::api::response::ApiError),
        (status = 413, description = "Request body too large", body = crate::api::response::ApiError),
        (status = 500, description = "Storage or unexpected failure", body = crate::api::response::ApiError),
    )
)]
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResponse<ExtractionResult> {
    let max_bytes = state.config.upload.max_body_bytes;

    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected non-multipart upload");
            return SnaptextError::Validation(format!(
                "Expected a multipart/form-data request: {}",
                rejection.body_text()
            ))
            .into();
        }
    };

    let field = match read_image_field(&mut multipart, max_bytes).await {
        Ok(field) => field,
        Err(e) => {
            warn!(error = %e, "Rejected upload");
            return e.into();
        }
    };

    let image = match UploadedImage::new(field.file_name.unwrap_or_default(), field.bytes) {
        Ok(image) => image,
        Err(e) => {
            warn!(error = %e, "Rejected upload");
            return e.into();
        }
    };

    match state.extraction.extract(image).await {
        Ok(result) => ApiResponse::success(result),
        Err(e) => {
            if e.is_client_error() {
                warn!(error = %e, "Rejected upload after saving");
            }
            e.into()
        }
    }
}

/// `OPTIONS /api/extract-text` without CORS request headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
