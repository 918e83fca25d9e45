// handlers/protected/documents.rs - document upload and download
//
// Metadata reads, updates and the soft delete go through the generic
// resource handlers; this file covers the two routes that move content.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::resources::{ensure_case, not_found};
use crate::app::AppState;
use crate::database::models::document::sanitize_file_name;
use crate::database::models::{Document, NewDocument};
use crate::error::{ApiError, FieldErrors};
use crate::handlers::{JsonBody, RecordId};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantContext};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: Option<String>,
    /// Standard base64, optionally as a `data:<mime>;base64,` URL
    pub content_base64: String,
    pub description: Option<String>,
    pub case_id: Option<Uuid>,
}

/// Decode the payload, accepting a data URL prefix. A MIME type found in the
/// prefix is returned alongside the bytes.
pub(crate) fn decode_content(encoded: &str) -> Result<(Vec<u8>, Option<String>), ApiError> {
    let encoded = encoded.trim();
    let (mime, data) = match encoded.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((meta, data)) => {
            let mime = meta.strip_suffix(";base64").filter(|m| !m.is_empty()).map(str::to_string);
            (mime, data)
        }
        None => (None, encoded),
    };

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|_| ApiError::invalid_field("content_base64", "Content is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ApiError::invalid_field("content_base64", "Document content is empty"));
    }
    Ok((bytes, mime))
}

/**
 * POST /api/documents - Upload a document as base64 JSON
 *
 * Expected Input:
 * ```json
 * {
 *   "file_name": "demanda.pdf",           // Required
 *   "mime_type": "application/pdf",       // Optional
 *   "content_base64": "JVBERi0xLjQK...",  // Required
 *   "description": "Escrito de demanda",  // Optional
 *   "case_id": "uuid"                     // Optional, same tenant
 * }
 * ```
 *
 * Responds 201 with the metadata (size, sha256 checksum); the content is
 * only ever returned by the download route.
 */
pub async fn upload(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(input): JsonBody<UploadRequest>,
) -> ApiResult<Document> {
    if input.file_name.trim().is_empty() {
        let mut errors = FieldErrors::new();
        errors.insert("file_name".to_string(), "This field is required".to_string());
        return Err(errors.into());
    }
    let (content, data_url_mime) = decode_content(&input.content_base64)?;
    ensure_case(&state, tenant.tenant_id, input.case_id).await?;

    let mime_type = input
        .mime_type
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .or(data_url_mime)
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    let document = state
        .repositories
        .documents
        .create(
            tenant.tenant_id,
            NewDocument {
                case_id: input.case_id,
                file_name: input.file_name,
                mime_type,
                description: input.description,
                content,
                uploaded_by: Some(auth.id),
            },
        )
        .await?;

    info!(
        "Document {} ({} bytes) uploaded by {} on tenant {}",
        document.id, document.size_bytes, auth.id, tenant.tenant.subdomain
    );
    Ok(ApiResponse::created(document))
}

/// GET /api/documents/:id/download - raw content with the stored MIME type
pub async fn download(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    RecordId(id): RecordId,
) -> Result<Response, ApiError> {
    let document = state
        .repositories
        .documents
        .get(tenant.tenant_id, id)
        .await?
        .ok_or_else(not_found::<Document>)?;

    let content_type = HeaderValue::from_str(&document.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE));
    let disposition = format!("attachment; filename=\"{}\"", sanitize_file_name(&document.file_name));
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"document\""));

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        Body::from(document.content),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_base64_decodes() {
        let (bytes, mime) = decode_content("aG9sYQ==").unwrap();
        assert_eq!(bytes, b"hola");
        assert!(mime.is_none());
    }

    #[test]
    fn data_url_prefix_supplies_mime() {
        let (bytes, mime) = decode_content("data:text/plain;base64,aG9sYQ==").unwrap();
        assert_eq!(bytes, b"hola");
        assert_eq!(mime.as_deref(), Some("text/plain"));
    }

    #[test]
    fn garbage_and_empty_are_rejected() {
        assert!(decode_content("not base64!").is_err());
        assert!(decode_content("").is_err());
    }
}
