use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::files::{UploadResponse, UploadedFile},
    handlers::parse_id,
    middleware::AuthUser,
    services::ServiceError,
    AppState,
};

/// `inline; filename="..."` with anything outside printable ASCII replaced.
fn content_disposition(filename: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    HeaderValue::from_str(&format!("inline; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

/// Upload attachments to a project
///
/// Multipart form with a `projectId` field and one or more `files` parts.
/// The batch is all-or-nothing.
#[utoipa::path(
    post,
    path = "/files/upload",
    responses(
        (status = 201, description = "Files uploaded", body = UploadResponse),
        (status = 400, description = "Validation failed; details lists each rejected file", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    tag = "Files",
    security(("bearer_auth" = []))
)]
pub async fn upload_files(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let files = state.uploads.upload(&mut multipart).await?;
    tracing::debug!(count = files.len(), by = %user.0.username, "Upload accepted");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Files uploaded successfully".to_string(),
            files: files.iter().map(UploadedFile::from).collect(),
        }),
    ))
}

/// Stream a file's bytes
#[utoipa::path(
    get,
    path = "/files/{id}",
    params(("id" = String, Path, description = "File id")),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    tag = "Files"
)]
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, ServiceError::FileNotFound)?;
    let (file, stream) = state.files.open(id).await?;

    let content_type = HeaderValue::from_str(&file.mimetype)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition(&file.filename)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Redirect to the file's storage locator
#[utoipa::path(
    get,
    path = "/files/{id}/download",
    params(("id" = String, Path, description = "File id")),
    responses(
        (status = 302, description = "Redirect to the stored object"),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    tag = "Files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, ServiceError::FileNotFound)?;
    let file = state.files.find(id).await?;

    let location = HeaderValue::from_str(&file.path).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Stored locator is not a valid header: {}", e))
    })?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

#[utoipa::path(
    delete,
    path = "/files/{id}",
    params(("id" = String, Path, description = "File id")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    tag = "Files",
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, ServiceError::FileNotFound)?;
    state.files.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
