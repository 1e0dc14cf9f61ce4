use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Project, ProjectFile};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListProjectsQuery {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size, 1..=100
    pub limit: Option<i64>,
}

impl ListProjectsQuery {
    /// Returns `(page, limit)` with defaults applied and out-of-range values clamped.
    pub fn normalized(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    #[schema(example = "Sales dashboard")]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    #[schema(example = "Power BI report over regional sales")]
    pub description: String,

    #[serde(default)]
    #[schema(example = json!(["power-bi", "sql"]))]
    pub tags: Vec<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,

    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: Uuid,
    pub filename: String,
    pub mimetype: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&ProjectFile> for FileSummary {
    fn from(file: &ProjectFile) -> Self {
        Self {
            id: file.id,
            filename: file.filename.clone(),
            mimetype: file.mimetype.clone(),
            size: file.size,
            created_at: file.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub files: Vec<FileSummary>,
}

impl ProjectResponse {
    pub fn new(project: Project, files: &[ProjectFile]) -> Self {
        Self {
            id: project.id,
            title: project.title,
            description: project.description,
            tags: project.tags,
            created_at: project.created_at,
            updated_at: project.updated_at,
            files: files.iter().map(FileSummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectResponse>,
    pub pagination: Pagination,
}
