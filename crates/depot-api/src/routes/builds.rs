//! # Build Routes
//!
//! The current-build slot over HTTP. Query and download are public; upload
//! and delete sit behind the admin token.

use std::path::Path as StdPath;

use axum::body::Body;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use depot_core::{ArtifactName, ValidationError};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

use super::with_slot;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_multipart, multipart_error};
use crate::state::AppState;

/// Multipart field carrying the archive.
pub const UPLOAD_FIELD: &str = "zip";

const CURRENT_FILE_FAILED: &str = "Failed to get current file information";
const UPLOAD_FAILED: &str = "Failed to upload file";
const DELETE_FAILED: &str = "Failed to delete file";
const DOWNLOAD_FAILED: &str = "Failed to read file";

// -- DTOs ---------------------------------------------------------------------

/// Current build, or `null` when the slot is empty.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentFileResponse {
    pub file_name: Option<String>,
}

/// Query failure. Carries `fileName: null` alongside the error so clients
/// that only read `fileName` still see an empty slot.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentFileFailure {
    pub error: String,
    pub file_name: Option<String>,
}

/// Multipart upload form.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// The archive; its file name must end in `.zip`.
    #[schema(value_type = String, format = Binary)]
    zip: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_name: String,
    pub message: String,
}

/// Optional delete body. The named file is not used for targeting: delete
/// always removes whatever the pointer names.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}

// -- Handlers -----------------------------------------------------------------

/// GET /api/current-file
#[utoipa::path(
    get,
    path = "/api/current-file",
    tag = "builds",
    responses(
        (status = 200, description = "Current build name, or null", body = CurrentFileResponse),
        (status = 500, description = "Storage fault", body = CurrentFileFailure),
    )
)]
pub async fn current_file(State(state): State<AppState>) -> Response {
    match with_slot(&state, CURRENT_FILE_FAILED, |slot| slot.current()).await {
        Ok(current) => Json(CurrentFileResponse {
            file_name: current.map(String::from),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "current-file query failed");
            let body = CurrentFileFailure {
                error: err.public_message(),
                file_name: None,
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// POST /api/upload
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "builds",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Build stored and made current", body = UploadResponse),
        (status = 400, description = "Missing file or invalid name", body = ErrorBody),
        (status = 401, description = "Missing or invalid admin token", body = ErrorBody),
        (status = 413, description = "Upload too large", body = ErrorBody),
        (status = 500, description = "Storage fault", body = ErrorBody),
    ),
    security(("bearer" = []))
)]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = extract_multipart(multipart)?;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        // A plain text field named `zip` carries no file name and counts as absent.
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            break;
        };
        // Reject a bad name before any bytes are read.
        ArtifactName::new(&file_name)?;

        let staged = with_slot(&state, UPLOAD_FAILED, |slot| slot.staging_path()).await?;
        if let Err(err) = stream_to_file(&mut field, &staged).await {
            if let Err(e) = tokio::fs::remove_file(&staged).await.or_else(ignore_missing) {
                tracing::warn!(path = %staged.display(), error = %e, "failed to remove staged upload");
            }
            return Err(err);
        }

        let receipt = with_slot(&state, UPLOAD_FAILED, move |slot| {
            slot.upload_staged(&file_name, &staged)
        })
        .await?;

        return Ok(Json(UploadResponse {
            success: true,
            file_name: receipt.file_name.into(),
            message: "File uploaded successfully".into(),
        }));
    }

    Err(ValidationError::MissingFile.into())
}

fn ignore_missing(e: std::io::Error) -> std::io::Result<()> {
    if e.kind() == std::io::ErrorKind::NotFound {
        Ok(())
    } else {
        Err(e)
    }
}

/// Write a multipart field to `path` chunk by chunk, so the upload is never
/// held in memory whole.
async fn stream_to_file(field: &mut Field<'_>, path: &StdPath) -> Result<(), AppError> {
    let io_error = |e: std::io::Error| AppError::internal(UPLOAD_FAILED, e);

    let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk).await.map_err(io_error)?;
    }
    file.flush().await.map_err(io_error)?;
    file.sync_all().await.map_err(io_error)
}

/// DELETE /api/Delete
#[utoipa::path(
    delete,
    path = "/api/Delete",
    tag = "builds",
    request_body(content = DeleteRequest, description = "Optional; the named file is ignored", content_type = "application/json"),
    responses(
        (status = 200, description = "Current build deleted, or nothing to delete", body = DeleteResponse),
        (status = 401, description = "Missing or invalid admin token", body = ErrorBody),
        (status = 500, description = "Storage fault", body = ErrorBody),
    ),
    security(("bearer" = []))
)]
pub async fn delete_current(
    State(state): State<AppState>,
    body: Option<Json<DeleteRequest>>,
) -> Result<Json<DeleteResponse>, AppError> {
    if let Some(Json(DeleteRequest {
        file_name: Some(requested),
    })) = &body
    {
        tracing::debug!(requested = %requested, "delete resolves through the pointer; requested name ignored");
    }

    let outcome = with_slot(&state, DELETE_FAILED, |slot| slot.delete_current()).await?;
    Ok(Json(DeleteResponse {
        message: outcome.message(),
    }))
}

/// GET /uploads/{file_name}
#[utoipa::path(
    get,
    path = "/uploads/{file_name}",
    tag = "builds",
    params(("file_name" = String, Path, description = "Name of the current build")),
    responses(
        (status = 200, description = "Archive bytes as application/zip"),
        (status = 404, description = "Not the current build", body = ErrorBody),
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let current = with_slot(&state, DOWNLOAD_FAILED, |slot| slot.current_path()).await?;
    let (name, path) = match current {
        Some((name, path)) if name.as_str() == file_name => (name, path),
        _ => return Err(AppError::NotFound("File not found".into())),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        // Deleted between the pointer read and the open.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".into()))
        }
        Err(e) => return Err(AppError::internal(DOWNLOAD_FAILED, e)),
    };
    let len = file
        .metadata()
        .await
        .map_err(|e| AppError::internal(DOWNLOAD_FAILED, e))?
        .len();

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    let disposition = format!("attachment; filename=\"{}\"", name.as_str().replace('"', "_"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

