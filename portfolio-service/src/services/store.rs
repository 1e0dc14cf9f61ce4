//! Persistence seams. `Database` backs them with PostgreSQL; `InMemoryStore`
//! backs them with maps for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Project, ProjectFile, RefreshToken, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Fails with `AppError::Conflict` when the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Creates the user or replaces the password of an existing one.
    async fn upsert_user_password(&self, user: &User) -> Result<User, AppError>;

    /// Returns false when no such user exists.
    async fn set_verification_code(
        &self,
        user_id: Uuid,
        code: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AppError>;

    /// Clears the code in the same step that matches it. Returns true only
    /// for the one caller whose code matched and had not expired at `now`.
    async fn consume_verification_code(
        &self,
        user_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError>;

    async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, AppError>;

    /// Returns the number of records removed.
    async fn delete_refresh_tokens_by_hash(&self, token_hash: &str) -> Result<u64, AppError>;

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Newest first. Returns the page and the total project count.
    async fn list_projects(&self, offset: i64, limit: i64)
        -> Result<(Vec<Project>, i64), AppError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, AppError>;

    async fn insert_project(&self, project: &Project) -> Result<(), AppError>;

    /// Returns false when the project does not exist.
    async fn update_project(&self, project: &Project) -> Result<bool, AppError>;

    /// Removes the project and its file records. Returns false when it did not exist.
    async fn delete_project(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn insert_file(&self, file: &ProjectFile) -> Result<(), AppError>;

    async fn find_file(&self, id: Uuid) -> Result<Option<ProjectFile>, AppError>;

    async fn delete_file(&self, id: Uuid) -> Result<bool, AppError>;

    /// Newest first within each project.
    async fn files_for_projects(&self, project_ids: &[Uuid]) -> Result<Vec<ProjectFile>, AppError>;
}

/// Everything the service persists, behind one object-safe trait.
#[async_trait]
pub trait Store: UserStore + RefreshTokenStore + ProjectStore + FileStore {
    async fn health_check(&self) -> Result<(), AppError>;
}
