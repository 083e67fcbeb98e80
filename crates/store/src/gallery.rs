use crate::{GallerySaver, SaveReceipt};
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::PathBuf;

/// 画像 URL の中身を端末のギャラリー（ここではディレクトリ）へ保存する
///
/// - `http://` / `https://` はダウンロードする
/// - `file://` はローカルファイルをコピーする
pub struct DirectoryGallery {
    client: Client,
    dir: PathBuf,
}

impl DirectoryGallery {
    pub fn new(client: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let res = self
                .client
                .get(url)
                .send()
                .await
                .context("Image download failed")?
                .error_for_status()
                .context("Image download returned an error status")?;
            let bytes = res.bytes().await.context("Failed to read image body")?;
            Ok(bytes.to_vec())
        } else if let Some(path) = url.strip_prefix("file://") {
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path))
        } else {
            anyhow::bail!("Unsupported image URL: {}", url)
        }
    }
}

/// URL 末尾からファイル名を取り出す（クエリは除く）
fn file_name_from_url(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next()?;
    without_query
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

#[async_trait::async_trait]
impl GallerySaver for DirectoryGallery {
    async fn save(&self, url: &str) -> Result<SaveReceipt> {
        let data = self.fetch(url).await?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create gallery {}", self.dir.display()))?;

        let name = format!(
            "{}-{}",
            uuid::Uuid::new_v4().simple(),
            file_name_from_url(url).unwrap_or("image")
        );
        let path = self.dir.join(name);
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("Saved {} to {}", url, path.display());
        Ok(SaveReceipt {
            message: "Saved to gallery".to_string(),
        })
    }
}
