use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::projects::{CreateProjectRequest, ListProjectsQuery, UpdateProjectRequest},
    handlers::parse_id,
    middleware::AuthUser,
    services::ServiceError,
    utils::{QueryParams, ValidatedJson},
    AppState,
};

/// List projects, newest first
#[utoipa::path(
    get,
    path = "/projects",
    params(ListProjectsQuery),
    responses(
        (status = 200, description = "Page of projects", body = ProjectListResponse)
    ),
    tag = "Projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListProjectsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.projects.list(&query).await?;
    Ok(Json(res))
}

/// Get one project with its file metadata
#[utoipa::path(
    get,
    path = "/projects/{id}",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project", body = ProjectResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "Projects"
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, ServiceError::ProjectNotFound)?;
    let res = state.projects.get(id).await?;
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "Projects",
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.projects.create(req).await?;
    tracing::debug!(project_id = %res.id, by = %user.0.username, "Project created via API");
    Ok((StatusCode::CREATED, Json(res)))
}

/// Partially update a project
#[utoipa::path(
    put,
    path = "/projects/{id}",
    params(("id" = String, Path, description = "Project id")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "Projects",
    security(("bearer_auth" = []))
)]
pub async fn update_project(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, ServiceError::ProjectNotFound)?;
    let res = state.projects.update(id, req).await?;
    Ok(Json(res))
}

/// Delete a project, its file records and their stored objects
#[utoipa::path(
    delete,
    path = "/projects/{id}",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "Projects",
    security(("bearer_auth" = []))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, ServiceError::ProjectNotFound)?;
    state.projects.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
