use async_trait::async_trait;
use axum::body::Bytes;
use futures::{Stream, TryStreamExt};
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::fs;
use tokio_util::io::ReaderStream;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Object storage for uploaded attachments.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Copies the file at `source` to `key` and returns its public locator.
    async fn upload(&self, key: &str, source: &Path, content_type: &str)
        -> Result<String, AppError>;

    async fn download(&self, key: &str) -> Result<ByteStream, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        if !is_safe_key(key) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid storage key: {}",
                key
            )));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> Result<String, AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(source, &path).await?;
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn download(&self, key: &str) -> Result<ByteStream, AppError> {
        let path = self.resolve(key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(anyhow::anyhow!(
                    "Stored object not found"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Supabase Storage over its REST API.
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: Secret<String>,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(
        base_url: &str,
        service_key: Secret<String>,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket: bucket.into(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        request.bearer_auth(key).header("apikey", key)
    }

    async fn failure(action: &str, response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return AppError::NotFound(anyhow::anyhow!("Stored object not found"));
        }
        AppError::InternalError(anyhow::anyhow!(
            "Supabase {} failed with {}: {}",
            action,
            status,
            body
        ))
    }
}

fn transport_error(action: &str, e: reqwest::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("Supabase {} request failed: {}", action, e))
}

#[async_trait]
impl Storage for SupabaseStorage {
    async fn upload(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> Result<String, AppError> {
        if !is_safe_key(key) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid storage key: {}",
                key
            )));
        }

        let file = fs::File::open(source).await?;
        let length = file.metadata().await?.len();

        let response = self
            .authorized(self.client.post(self.object_url(key)))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, length)
            .header("x-upsert", "false")
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| transport_error("upload", e))?;

        if !response.status().is_success() {
            return Err(Self::failure("upload", response).await);
        }

        Ok(self.public_url(key))
    }

    async fn download(&self, key: &str) -> Result<ByteStream, AppError> {
        let response = self
            .authorized(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| transport_error("download", e))?;

        if !response.status().is_success() {
            return Err(Self::failure("download", response).await);
        }

        Ok(Box::pin(
            response.bytes_stream().map_err(std::io::Error::other),
        ))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let response = self
            .authorized(
                self.client
                    .delete(format!("{}/storage/v1/object/{}", self.base_url, self.bucket)),
            )
            .json(&serde_json::json!({ "prefixes": [key] }))
            .send()
            .await
            .map_err(|e| transport_error("delete", e))?;

        if !response.status().is_success() {
            return Err(Self::failure("delete", response).await);
        }

        Ok(())
    }
}
