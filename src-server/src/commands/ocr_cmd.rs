//! OCR Command

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use crate::ocr::{analyze_receipt, ReceiptExtraction, ReceiptImage};
use crate::AppState;
use super::error::ApiError;

/// POST /ocr
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ReceiptExtraction>, ApiError> {
    let backend = state.ocr.clone().ok_or_else(|| {
        ApiError::Configuration("Gemini API configuration missing. Set GEMINI_API_KEY".to_string())
    })?;

    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                field
                    .file_name()
                    .and_then(|name| mime_guess::from_path(name).first())
                    .map(|mime| mime.to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {}", e)))?;
        image = Some(ReceiptImage {
            mime_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let image = image
        .filter(|image| !image.bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    let extraction = analyze_receipt(backend.as_ref(), &state.config.ocr_models, &image).await?;
    log::info!(
        "Receipt analyzed: {} / {}",
        extraction.merchant_name.as_deref().unwrap_or("?"),
        extraction.category.as_str()
    );
    Ok(Json(extraction))
}
