use std::sync::Arc;
use uuid::Uuid;

use crate::models::ProjectFile;
use crate::services::storage::ByteStream;
use crate::services::store::FileStore;
use crate::services::{ServiceError, Storage, Store};

#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn Store>,
    storage: Arc<dyn Storage>,
}

impl FileService {
    pub fn new(store: Arc<dyn Store>, storage: Arc<dyn Storage>) -> Self {
        Self { store, storage }
    }

    pub async fn find(&self, id: Uuid) -> Result<ProjectFile, ServiceError> {
        self.store
            .find_file(id)
            .await?
            .ok_or(ServiceError::FileNotFound)
    }

    /// Metadata plus a stream of the stored bytes.
    pub async fn open(&self, id: Uuid) -> Result<(ProjectFile, ByteStream), ServiceError> {
        let file = self.find(id).await?;
        let stream = self.storage.download(&file.stored_name).await?;
        Ok((file, stream))
    }

    /// Storage failures are logged; the record is removed regardless.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let file = self.find(id).await?;

        if let Err(e) = self.storage.delete(&file.stored_name).await {
            tracing::warn!(
                file_id = %id,
                key = %file.stored_name,
                error = %e,
                "Failed to delete stored object"
            );
        }

        if !self.store.delete_file(id).await? {
            return Err(ServiceError::FileNotFound);
        }

        tracing::info!(file_id = %id, project_id = %file.project_id, "File deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;
    use crate::services::store::ProjectStore;
    use crate::services::{InMemoryStore, LocalStorage};
    use axum::body::Bytes;
    use chrono::Utc;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_open_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(dir.path().join("objects"), "http://localhost/storage")
                .await
                .unwrap(),
        );
        let store = Arc::new(InMemoryStore::new());
        let service = FileService::new(store.clone(), storage.clone());

        let project = Project::new("p".into(), "d".into(), vec![]);
        store.insert_project(&project).await.unwrap();

        let source = dir.path().join("notes.txt");
        tokio::fs::write(&source, b"hello").await.unwrap();
        let path = storage
            .upload("projects/n.txt", &source, "text/plain")
            .await
            .unwrap();

        let file = ProjectFile {
            id: Uuid::new_v4(),
            project_id: project.id,
            filename: "notes.txt".into(),
            stored_name: "projects/n.txt".into(),
            mimetype: "text/plain".into(),
            size: 5,
            path,
            created_at: Utc::now(),
        };
        store.insert_file(&file).await.unwrap();

        let (meta, stream) = service.open(file.id).await.unwrap();
        assert_eq!(meta.filename, "notes.txt");
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"hello");

        service.delete(file.id).await.unwrap();
        assert_eq!(store.file_count(), 0);
        assert!(matches!(service.delete(file.id).await, Err(ServiceError::FileNotFound)));
    }
}
