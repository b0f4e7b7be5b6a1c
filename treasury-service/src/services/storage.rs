//! File storage abstraction over an S3-compatible object store and the
//! local filesystem, with temp-file staging and promotion.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use treasury_core::error::AppError;
use uuid::Uuid;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    async fn exists(&self, key: &str) -> bool;
    fn url_for(&self, key: &str) -> String;
    fn backend(&self) -> &'static str;
}

/// Result of a completed upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub url: String,
    pub key: String,
    pub storage: String,
}

/// A file staged under the `temp/` subtree, awaiting promotion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub key: String,
    pub file_name: String,
}

/// Strip accents and anything outside `[a-z0-9.-]` so keys are safe on
/// every backend.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
            'ñ' | 'Ñ' => 'n',
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' => c,
            _ => '_',
        })
        .collect::<String>()
        .to_lowercase()
}

/// Deterministic key scheme: `{folder}/{year}/{month}/{timestamp}-{name}`.
pub fn generate_file_key(folder: &str, file_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{:02}/{}-{}",
        folder,
        now.year(),
        now.month(),
        now.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

/// Content type detection by extension, for uploads that arrive without one.
pub fn content_type_for(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    match lower.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv",
        Some("xlsx") => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
        _ => "application/octet-stream",
    }
}

/// High-level store used by the handlers: key naming, temp staging and
/// promotion on top of a backend.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<dyn Storage>,
}

impl FileStore {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self { inner }
    }

    pub async fn upload(
        &self,
        data: Vec<u8>,
        folder: &str,
        original_name: &str,
        content_type: &str,
    ) -> Result<StoredFile, AppError> {
        let key = generate_file_key(folder, original_name, Utc::now());
        self.inner.put(&key, data, content_type).await?;
        tracing::info!(key = %key, backend = self.inner.backend(), "File uploaded");
        Ok(StoredFile {
            url: self.inner.url_for(&key),
            key,
            storage: self.inner.backend().to_string(),
        })
    }

    /// Stage an upload under `temp/` until the caller confirms it.
    pub async fn stage_temp(
        &self,
        data: Vec<u8>,
        original_name: &str,
    ) -> Result<StagedFile, AppError> {
        let key = format!("temp/{}-{}", Uuid::new_v4(), sanitize_file_name(original_name));
        self.inner
            .put(&key, data, content_type_for(original_name))
            .await?;
        Ok(StagedFile {
            key,
            file_name: original_name.to_string(),
        })
    }

    /// Promote a staged temp file to its permanent location: read, write
    /// under the final key, then delete the original. The temp copy is
    /// removed last so a failed promotion never loses the file.
    pub async fn promote_temp(
        &self,
        temp_key: &str,
        folder: &str,
        original_name: &str,
    ) -> Result<StoredFile, AppError> {
        let data = self.inner.get(temp_key).await?;
        let stored = self
            .upload(data, folder, original_name, content_type_for(original_name))
            .await?;
        self.inner.delete(temp_key).await?;
        Ok(stored)
    }

    pub async fn temp_exists(&self, temp_key: &str) -> bool {
        self.inner.exists(temp_key).await
    }

    pub async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        self.inner.get(key).await
    }
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<(), AppError> {
        let path = self.base_path.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let data = fs::read(self.base_path.join(key)).await?;
        Ok(data)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.base_path.join(key);
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        self.base_path.join(key).exists()
    }

    fn url_for(&self, key: &str) -> String {
        format!("/uploads/{}", key)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String, public_base_url: Option<String>) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::StorageError(anyhow::anyhow!("S3 upload failed: {}", e)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::StorageError(anyhow::anyhow!("S3 download failed: {}", e)))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| {
                AppError::StorageError(anyhow::anyhow!("S3 body collection failed: {}", e))
            })?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::StorageError(anyhow::anyhow!("S3 delete failed: {}", e)))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .is_ok()
    }

    fn url_for(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("s3://{}/{}", self.bucket, key),
        }
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}
