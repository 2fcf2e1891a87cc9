use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{BlobError, BlobRef, BlobResult, Upload};

/// Prefix every reference produced by the local store carries
pub const BLOB_REF_PREFIX: &str = "uploads";

/// Storage for uploaded binaries, addressed by opaque references
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write the upload under a fresh unique name. Never overwrites an existing blob.
    async fn store(&self, upload: &Upload) -> BlobResult<BlobRef>;

    /// Remove a blob. Deleting a missing blob succeeds.
    async fn delete(&self, blob: &BlobRef) -> BlobResult<()>;

    /// Whether the referenced blob currently exists
    async fn exists(&self, blob: &BlobRef) -> bool;

    /// Public URL the static file server answers for this blob
    fn url_for(&self, blob: &BlobRef) -> String;
}

/// Blob store backed by a directory on local disk
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_url_prefix: String,
    max_file_size: usize,
}

impl LocalBlobStore {
    /// `public_base_url` may be empty for root-relative URLs; `public_path` is where the
    /// upload directory is mounted (e.g. `/uploads`).
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: &str,
        public_path: &str,
        max_file_size: usize,
    ) -> Self {
        let public_path = format!("/{}", public_path.trim_matches('/'));
        Self {
            root: root.into(),
            public_url_prefix: format!("{}{}", public_base_url.trim_end_matches('/'), public_path),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a reference to its file path, rejecting anything that would leave the root
    pub fn resolve(&self, blob: &BlobRef) -> BlobResult<PathBuf> {
        let invalid = || BlobError::InvalidReference {
            reference: blob.to_string(),
        };

        let file_name = blob
            .as_str()
            .strip_prefix(BLOB_REF_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(invalid)?;

        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !file_name.contains('\\') => {
                Ok(self.root.join(name))
            }
            _ => Err(invalid()),
        }
    }

    fn generate_file_name(upload: &Upload) -> String {
        let field: String = upload
            .field
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        let field = if field.is_empty() { "file".to_string() } else { field };

        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        format!(
            "{}-{}-{}{}",
            field,
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8],
            extension
        )
    }

    /// Write `bytes` to a freshly created file. On failure the partial file is removed,
    /// since no reference to it ever reaches the caller.
    async fn write_or_discard<W>(path: &Path, writer: &mut W, bytes: &[u8]) -> BlobResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let written = async {
            writer.write_all(bytes).await?;
            writer.flush().await
        }
        .await;

        match written {
            Ok(()) => Ok(()),
            Err(e) => {
                match fs::remove_file(path).await {
                    Ok(()) => {}
                    Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
                    Err(cleanup) => {
                        warn!(path = %path.display(), error = %cleanup, "Failed to remove partial blob")
                    }
                }
                Err(Self::io_error(path, e))
            }
        }
    }

    fn io_error(path: &Path, source: std::io::Error) -> BlobError {
        BlobError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    #[instrument(skip(self, upload), fields(field = %upload.field, size = upload.len()))]
    async fn store(&self, upload: &Upload) -> BlobResult<BlobRef> {
        if upload.len() > self.max_file_size {
            return Err(BlobError::TooLarge {
                size: upload.len(),
                max: self.max_file_size,
            });
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::io_error(&self.root, e))?;

        let mut attempts = 0;
        let (file_name, mut file) = loop {
            let file_name = Self::generate_file_name(upload);
            let path = self.root.join(&file_name);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (file_name, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempts < 3 => attempts += 1,
                Err(e) => return Err(Self::io_error(&path, e)),
            }
        };

        let path = self.root.join(&file_name);
        Self::write_or_discard(&path, &mut file, &upload.bytes).await?;

        let blob = BlobRef::new(format!("{}/{}", BLOB_REF_PREFIX, file_name));
        info!(blob = %blob, "Blob stored");
        Ok(blob)
    }

    #[instrument(skip(self), fields(blob = %blob))]
    async fn delete(&self, blob: &BlobRef) -> BlobResult<()> {
        let path = self.resolve(blob)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Blob already absent");
                Ok(())
            }
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    async fn exists(&self, blob: &BlobRef) -> bool {
        match self.resolve(blob) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    fn url_for(&self, blob: &BlobRef) -> String {
        match blob
            .as_str()
            .strip_prefix(BLOB_REF_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(file_name) => format!("{}/{}", self.public_url_prefix, file_name),
            None => format!("{}/{}", self.public_url_prefix, blob.as_str().trim_start_matches('/')),
        }
    }
}
