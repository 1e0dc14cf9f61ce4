use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::dtos::projects::{
    CreateProjectRequest, ListProjectsQuery, Pagination, ProjectListResponse, ProjectResponse,
    UpdateProjectRequest,
};
use crate::models::{Project, ProjectFile};
use crate::services::store::{FileStore, ProjectStore};
use crate::services::{ServiceError, Storage, Store};

#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn Store>,
    storage: Arc<dyn Storage>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn Store>, storage: Arc<dyn Storage>) -> Self {
        Self { store, storage }
    }

    pub async fn list(&self, query: &ListProjectsQuery) -> Result<ProjectListResponse, ServiceError> {
        let (page, limit) = query.normalized();
        let offset = (page - 1).saturating_mul(limit);

        let (projects, total) = self.store.list_projects(offset, limit).await?;

        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        let mut files_by_project: HashMap<Uuid, Vec<ProjectFile>> = HashMap::new();
        if !ids.is_empty() {
            for file in self.store.files_for_projects(&ids).await? {
                files_by_project.entry(file.project_id).or_default().push(file);
            }
        }

        let projects = projects
            .into_iter()
            .map(|project| {
                let files = files_by_project.remove(&project.id).unwrap_or_default();
                ProjectResponse::new(project, &files)
            })
            .collect();

        Ok(ProjectListResponse {
            projects,
            pagination: Pagination::new(page, limit, total),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<ProjectResponse, ServiceError> {
        let project = self
            .store
            .find_project(id)
            .await?
            .ok_or(ServiceError::ProjectNotFound)?;
        let files = self.store.files_for_projects(&[id]).await?;
        Ok(ProjectResponse::new(project, &files))
    }

    pub async fn create(&self, req: CreateProjectRequest) -> Result<ProjectResponse, ServiceError> {
        let project = Project::new(req.title, req.description, req.tags);
        self.store.insert_project(&project).await?;

        tracing::info!(project_id = %project.id, "Project created");
        Ok(ProjectResponse::new(project, &[]))
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateProjectRequest,
    ) -> Result<ProjectResponse, ServiceError> {
        let mut project = self
            .store
            .find_project(id)
            .await?
            .ok_or(ServiceError::ProjectNotFound)?;

        if let Some(title) = req.title {
            project.title = title;
        }
        if let Some(description) = req.description {
            project.description = description;
        }
        if let Some(tags) = req.tags {
            project.tags = tags;
        }
        project.updated_at = Utc::now();

        if !self.store.update_project(&project).await? {
            return Err(ServiceError::ProjectNotFound);
        }

        let files = self.store.files_for_projects(&[id]).await?;
        tracing::info!(project_id = %id, "Project updated");
        Ok(ProjectResponse::new(project, &files))
    }

    /// File records go with the project; their stored objects are removed best effort.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let files = self.store.files_for_projects(&[id]).await?;

        if !self.store.delete_project(id).await? {
            return Err(ServiceError::ProjectNotFound);
        }

        for file in &files {
            if let Err(e) = self.storage.delete(&file.stored_name).await {
                tracing::warn!(
                    project_id = %id,
                    file_id = %file.id,
                    key = %file.stored_name,
                    error = %e,
                    "Failed to delete stored object for removed project"
                );
            }
        }

        tracing::info!(project_id = %id, files = files.len(), "Project deleted");
        Ok(())
    }
}
