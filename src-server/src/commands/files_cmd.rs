//! File Commands
//!
//! Receipt upload, proxy download and deletion.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::storage::{proxy_url, receipt_path, storage_path_from};
use crate::AppState;
use super::error::ApiError;

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    month: Option<String>,
    category: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        ApiError::BadRequest(format!("Invalid form data: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("receipt").to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            "month" => form.month = Some(field.text().await.map_err(bad_form)?),
            "category" => form.category = Some(field.text().await.map_err(bad_form)?),
            _ => {}
        }
    }
    Ok(form)
}

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let form = read_upload_form(multipart).await?;

    let missing = || ApiError::BadRequest("File, month or category missing.".to_string());
    let (file_name, bytes) = form.file.ok_or_else(missing)?;
    let month = form.month.filter(|m| !m.trim().is_empty()).ok_or_else(missing)?;
    let category = form.category.filter(|c| !c.trim().is_empty()).ok_or_else(missing)?;

    let path = receipt_path(
        month.trim(),
        &category,
        &file_name,
        chrono::Utc::now().timestamp_millis(),
    )?;
    state.receipts.save(&path, &bytes).await?;

    Ok(Json(json!({ "success": true, "path": proxy_url(&path) })))
}

/// GET /files?path=...
pub async fn get_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("File path is missing.".to_string()))?;

    let bytes = state.receipts.read(&path).await.map_err(|e| {
        log::warn!("File fetch error for {}: {}", path, e);
        ApiError::NotFound("File not found or access denied.".to_string())
    })?;

    let mime_type = mime_guess::from_path(&path).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, mime_type.to_string()),
            (CACHE_CONTROL, IMMUTABLE_CACHE.to_string()),
        ],
        bytes,
    )
        .into_response())
}

/// POST /delete
pub async fn delete_file(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let path = request
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("File path is missing.".to_string()))?;

    let storage_path = storage_path_from(&path);
    let removed = state.receipts.remove(&storage_path).await?;

    Ok(Json(json!({ "success": true, "deleted": storage_path, "removed": removed })))
}
