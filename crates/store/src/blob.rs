use crate::{BlobStorage, UploadResult};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// ディレクトリにファイルとして保存するストレージ。URL は `file://` 形式
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, reference: &str) -> Result<PathBuf> {
        if reference.is_empty()
            || reference.contains('/')
            || reference.contains('\\')
            || reference.contains("..")
        {
            anyhow::bail!("Invalid blob reference: {:?}", reference);
        }
        Ok(self.root.join(reference))
    }
}

#[async_trait::async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(&self, reference: &str, data: Vec<u8>) -> Result<UploadResult> {
        let path = self.path_for(reference)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create blob directory {}", self.root.display()))?;

        let size = data.len();
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write blob {}", path.display()))?;

        tracing::debug!("Uploaded blob {} ({} bytes)", reference, size);
        Ok(UploadResult {
            reference: reference.to_string(),
            size,
        })
    }

    async fn download_url(&self, upload: &UploadResult) -> Result<String> {
        let path = self.path_for(&upload.reference)?;
        let absolute = tokio::fs::canonicalize(&path)
            .await
            .with_context(|| format!("Blob {} does not exist", upload.reference))?;
        Ok(file_url(&absolute))
    }
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}
