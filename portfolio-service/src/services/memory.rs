use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::models::{Project, ProjectFile, RefreshToken, User};
use crate::services::store::{FileStore, ProjectStore, RefreshTokenStore, Store, UserStore};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<Uuid, RefreshToken>,
    projects: HashMap<Uuid, Project>,
    files: HashMap<Uuid, ProjectFile>,
}

/// Map-backed store with the same semantics as the PostgreSQL schema
/// (unique usernames, cascading project deletes).
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("In-memory store lock poisoned")))
    }

    pub fn refresh_token_count(&self) -> usize {
        self.tables
            .lock()
            .map(|t| t.refresh_tokens.len())
            .unwrap_or_default()
    }

    pub fn file_count(&self) -> usize {
        self.tables.lock().map(|t| t.files.len()).unwrap_or_default()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().map(|t| t.users.len()).unwrap_or_default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(anyhow::anyhow!("Username already exists")));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn upsert_user_password(&self, user: &User) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables
            .users
            .values_mut()
            .find(|u| u.username == user.username)
        {
            existing.password_hash = user.password_hash.clone();
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn set_verification_code(
        &self,
        user_id: Uuid,
        code: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.verification_code = code.map(str::to_string);
                user.verification_expires_at = expires_at;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_verification_code(
        &self,
        user_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(false);
        };
        let live = matches!(
            (&user.verification_code, user.verification_expires_at),
            (Some(stored), Some(expires_at))
                if bool::from(stored.as_bytes().ct_eq(code.as_bytes())) && now < expires_at
        );
        if live {
            user.verification_code = None;
            user.verification_expires_at = None;
            user.updated_at = now;
        }
        Ok(live)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        self.lock()?.refresh_tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, AppError> {
        Ok(self
            .lock()?
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn delete_refresh_tokens_by_hash(&self, token_hash: &str) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, t| t.token_hash != token_hash);
        Ok((before - tables.refresh_tokens.len()) as u64)
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, t| t.expires_at > now);
        Ok((before - tables.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn list_projects(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Project>, i64), AppError> {
        let tables = self.lock()?;
        let mut projects: Vec<Project> = tables.projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = projects.len() as i64;
        let page = projects
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        Ok((page, total))
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        Ok(self.lock()?.projects.get(&id).cloned())
    }

    async fn insert_project(&self, project: &Project) -> Result<(), AppError> {
        self.lock()?.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn update_project(&self, project: &Project) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        match tables.projects.get_mut(&project.id) {
            Some(existing) => {
                *existing = project.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }
        tables.files.retain(|_, f| f.project_id != id);
        Ok(true)
    }
}

#[async_trait]
impl FileStore for InMemoryStore {
    async fn insert_file(&self, file: &ProjectFile) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        if !tables.projects.contains_key(&file.project_id) {
            return Err(AppError::NotFound(anyhow::anyhow!("Project not found")));
        }
        tables.files.insert(file.id, file.clone());
        Ok(())
    }

    async fn find_file(&self, id: Uuid) -> Result<Option<ProjectFile>, AppError> {
        Ok(self.lock()?.files.get(&id).cloned())
    }

    async fn delete_file(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.lock()?.files.remove(&id).is_some())
    }

    async fn files_for_projects(&self, project_ids: &[Uuid]) -> Result<Vec<ProjectFile>, AppError> {
        let tables = self.lock()?;
        let mut files: Vec<ProjectFile> = tables
            .files
            .values()
            .filter(|f| project_ids.contains(&f.project_id))
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}
