//! Multipart attachment uploads.
//!
//! A request is handled in two phases. `stage` streams every file part to the
//! scratch directory while counting bytes. `commit` validates the whole batch
//! and only then writes objects and records. Any failure in either phase
//! removes every temp file of the batch, and a failure while persisting also
//! removes what this batch already wrote.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::models::ProjectFile;
use crate::services::file_validation::{extension_of, sanitize_filename, validate_file};
use crate::services::store::{FileStore, ProjectStore};
use crate::services::{Storage, Store};

pub const PROJECT_ID_FIELD: &str = "projectId";

/// A file part written to the scratch directory.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
    pub temp_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct StagedBatch {
    pub project_id: Option<String>,
    pub files: Vec<StagedFile>,
}

impl StagedBatch {
    /// Removes every temp file of the batch. Missing files are ignored.
    pub async fn cleanup(&self) {
        for file in &self.files {
            remove_temp(&file.temp_path).await;
        }
    }
}

async fn remove_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temp upload");
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(anyhow::anyhow!("Invalid multipart body: {}", e.body_text()))
    }
}

fn is_file_field(name: &str) -> bool {
    name == "files" || name == "files[]"
}

#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn Store>,
    storage: Arc<dyn Storage>,
    config: UploadConfig,
}

impl UploadPipeline {
    pub async fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn Storage>,
        config: UploadConfig,
    ) -> Result<Self, AppError> {
        fs::create_dir_all(&config.temp_dir).await?;
        Ok(Self {
            store,
            storage,
            config,
        })
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    pub fn max_files(&self) -> usize {
        self.config.max_files
    }

    /// Stages and commits one multipart request.
    pub async fn upload(&self, multipart: &mut Multipart) -> Result<Vec<ProjectFile>, AppError> {
        let batch = self.stage(multipart).await?;
        self.commit(batch).await
    }

    /// Streams the request's file parts to disk. On error nothing is left behind.
    pub async fn stage(&self, multipart: &mut Multipart) -> Result<StagedBatch, AppError> {
        let mut batch = StagedBatch::default();
        match self.stage_into(multipart, &mut batch).await {
            Ok(()) => Ok(batch),
            Err(e) => {
                batch.cleanup().await;
                Err(e)
            }
        }
    }

    async fn stage_into(
        &self,
        multipart: &mut Multipart,
        batch: &mut StagedBatch,
    ) -> Result<(), AppError> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == PROJECT_ID_FIELD {
                let value = field.text().await.map_err(multipart_error)?;
                batch.project_id = Some(value.trim().to_string());
            } else if is_file_field(&name) {
                if batch.files.len() >= self.config.max_files {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Too many files. Maximum is {} per upload",
                        self.config.max_files
                    )));
                }
                self.stage_file(field, batch).await?;
            }
        }
        Ok(())
    }

    async fn stage_file(&self, mut field: Field<'_>, batch: &mut StagedBatch) -> Result<(), AppError> {
        let filename = field.file_name().unwrap_or("file").to_string();
        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let temp_path = self.config.temp_dir.join(format!(
            "{}-{}",
            Uuid::new_v4(),
            sanitize_filename(&filename)
        ));

        let mut out = fs::File::create(&temp_path).await?;
        // Registered before writing so a failed write still gets cleaned up
        batch.files.push(StagedFile {
            filename: filename.clone(),
            mimetype,
            size: 0,
            temp_path,
        });

        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len() as u64;
            if size > self.config.max_file_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "File '{}' exceeds the maximum size of {} bytes",
                    filename, self.config.max_file_size
                )));
            }
            out.write_all(&chunk).await?;
        }
        out.flush().await?;

        if let Some(staged) = batch.files.last_mut() {
            staged.size = size;
        }
        Ok(())
    }

    /// Validates the batch as a whole, then persists it. Temp files are
    /// removed whatever the outcome.
    pub async fn commit(&self, batch: StagedBatch) -> Result<Vec<ProjectFile>, AppError> {
        let result = self.persist(&batch).await;
        batch.cleanup().await;

        match &result {
            Ok(files) => {
                metrics::counter!("portfolio_files_uploaded_total").increment(files.len() as u64);
            }
            Err(e) => {
                metrics::counter!("portfolio_upload_failures_total").increment(1);
                tracing::info!(error = %e, files = batch.files.len(), "Upload rejected");
            }
        }

        result
    }

    async fn persist(&self, batch: &StagedBatch) -> Result<Vec<ProjectFile>, AppError> {
        if batch.files.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("No files uploaded")));
        }

        let project_id = batch
            .project_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Project ID is required")))?;
        let project_id = Uuid::parse_str(project_id)
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid project ID")))?;

        if self.store.find_project(project_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Project not found")));
        }

        let details: Vec<String> = batch
            .files
            .iter()
            .filter_map(|file| {
                validate_file(
                    &file.filename,
                    &file.mimetype,
                    file.size,
                    self.config.max_file_size,
                )
                .err()
                .map(|reason| format!("{}: {}", file.filename, reason))
            })
            .collect();
        if !details.is_empty() {
            return Err(AppError::InvalidInput {
                message: "File validation failed".to_string(),
                details,
            });
        }

        let mut written_keys: Vec<String> = Vec::new();
        let mut records: Vec<ProjectFile> = Vec::new();

        for file in &batch.files {
            if let Err(e) = self
                .persist_file(project_id, file, &mut written_keys, &mut records)
                .await
            {
                tracing::error!(
                    project_id = %project_id,
                    filename = %file.filename,
                    error = %e,
                    "Upload failed midway, rolling back batch"
                );
                self.roll_back(&written_keys, &records).await;
                return Err(e);
            }
        }

        tracing::info!(project_id = %project_id, count = records.len(), "Files uploaded");
        Ok(records)
    }

    async fn persist_file(
        &self,
        project_id: Uuid,
        file: &StagedFile,
        written_keys: &mut Vec<String>,
        records: &mut Vec<ProjectFile>,
    ) -> Result<(), AppError> {
        let id = Uuid::new_v4();
        let key = format!("projects/{}{}", id, extension_of(&file.filename));

        let uploaded = self
            .storage
            .upload(&key, &file.temp_path, &file.mimetype)
            .await;
        remove_temp(&file.temp_path).await;
        let locator = uploaded?;
        written_keys.push(key.clone());

        let record = ProjectFile {
            id,
            project_id,
            filename: file.filename.clone(),
            stored_name: key,
            mimetype: file.mimetype.clone(),
            size: file.size as i64,
            path: locator,
            created_at: chrono::Utc::now(),
        };
        self.store.insert_file(&record).await?;
        records.push(record);
        Ok(())
    }

    async fn roll_back(&self, written_keys: &[String], records: &[ProjectFile]) {
        for record in records {
            if let Err(e) = self.store.delete_file(record.id).await {
                tracing::warn!(file_id = %record.id, error = %e, "Failed to remove file record during rollback");
            }
        }
        for key in written_keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to remove stored object during rollback");
            }
        }
    }
}
