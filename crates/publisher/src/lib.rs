//! 新規投稿の作成と、投稿画像のギャラリー保存

pub mod gallery;

pub use gallery::save_pictures;

use anyhow::{Context, Result};
use diary_core::{extract_hashtags, POSTS_COLLECTION};
use futures_util::future::try_join_all;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use store::{server_timestamp, BlobStorage, DocumentWriter, IdentityProvider};
use toast::{Notify, ToastMessage};

pub const PUBLISHED_MESSAGE: &str = "Add new post successfully";

/// 投稿に添付する画像（選択済みの画像データそのもの）
///
/// サーバー側のファイルを参照する形式は受け付けない。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPost {
    pub caption: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub images: Vec<ImageUpload>,
}

pub struct PostPublisher {
    blobs: Arc<dyn BlobStorage>,
    writer: Arc<dyn DocumentWriter>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notify>,
}

impl PostPublisher {
    pub fn new(
        blobs: Arc<dyn BlobStorage>,
        writer: Arc<dyn DocumentWriter>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notify>,
    ) -> Self {
        Self {
            blobs,
            writer,
            identity,
            notifier,
        }
    }

    /// 投稿を作成する
    ///
    /// 結果はトーストで通知し、失敗は呼び出し元へ返さない。
    /// 作成できた場合はドキュメント ID を返す。
    pub async fn publish(&self, new_post: NewPost) -> Option<String> {
        match self.try_publish(new_post).await {
            Ok(id) => {
                tracing::info!("Post {} created", id);
                self.notifier
                    .notify(ToastMessage::success(PUBLISHED_MESSAGE));
                Some(id)
            }
            Err(e) => {
                tracing::error!("Failed to create post: {:#}", e);
                self.notifier
                    .notify(ToastMessage::error(format!("Post failed: {:#}", e)));
                None
            }
        }
    }

    async fn try_publish(&self, new_post: NewPost) -> Result<String> {
        let hashtags = extract_hashtags(&new_post.caption);

        let uploads = try_join_all(new_post.images.into_iter().map(|image| {
            let data = image.bytes;
            let reference = uuid::Uuid::new_v4().to_string();
            let blobs = self.blobs.clone();
            async move { blobs.upload(&reference, data).await }
        }))
        .await
        .context("Image upload failed")?;

        let urls = try_join_all(uploads.iter().map(|upload| self.blobs.download_url(upload)))
            .await
            .context("Failed to resolve image URL")?;

        // アップロードは済んでいても、閲覧者がいなければ書き込まない
        let viewer = self
            .identity
            .current_viewer()
            .context("No signed-in user")?;

        let fields = json!({
            "images": urls,
            "owner_email": viewer.email,
            "is_private": new_post.is_private,
            "caption": new_post.caption,
            "created_at": server_timestamp(),
            "comments": [],
            "hashtags": hashtags,
        });

        self.writer
            .create_document(POSTS_COLLECTION, fields)
            .await
            .context("Failed to write post")
    }
}
