use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::ProjectFile;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedFile {
    pub id: Uuid,
    pub filename: String,
    pub size: i64,
    pub mimetype: String,
}

impl From<&ProjectFile> for UploadedFile {
    fn from(file: &ProjectFile) -> Self {
        Self {
            id: file.id,
            filename: file.filename.clone(),
            size: file.size,
            mimetype: file.mimetype.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "Files uploaded successfully")]
    pub message: String,
    pub files: Vec<UploadedFile>,
}
