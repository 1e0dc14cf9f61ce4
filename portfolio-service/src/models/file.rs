use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for an uploaded attachment. The bytes live in object storage under `stored_name`.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectFile {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Name as supplied by the uploader
    pub filename: String,
    /// Storage key
    pub stored_name: String,
    pub mimetype: String,
    pub size: i64,
    /// Public locator returned by the storage backend
    pub path: String,
    pub created_at: DateTime<Utc>,
}
