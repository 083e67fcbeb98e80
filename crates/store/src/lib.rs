//! 外部サービス（ドキュメントストア・ファイルストレージ・認証・ギャラリー）との境界
//!
//! フィード側はここで定義したトレイトだけに依存する。
//! ローカル実行用の実装として SQLite ストア、ディレクトリ保存のストレージ、
//! ギャラリーを同梱している。

pub mod blob;
pub mod gallery;
pub mod sqlite;

use anyhow::Result;
use diary_core::ViewerIdentity;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use blob::LocalBlobStorage;
pub use gallery::DirectoryGallery;
pub use sqlite::SqliteDocumentStore;

const SERVER_TIMESTAMP_KEY: &str = ".sv";

/// 書き込み時にストア側の現在時刻へ置き換えられるフィールド値
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get(SERVER_TIMESTAMP_KEY))
        .and_then(|v| v.as_str())
        == Some("timestamp")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// ある時点のコレクション全件（差分ではない）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Snapshot(Snapshot),
    /// 配信が途絶えた。この後イベントは届かない
    Error(String),
}

/// コレクション監視の購読ハンドル
///
/// `unsubscribe` で所有権ごと手放すため、解除は一度しか起きない。
/// 解除せずに drop した場合も同様に購読は閉じられる。
pub struct Subscription {
    events: mpsc::Receiver<StoreEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<StoreEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// 次のイベントを待つ。送信側が閉じていれば `None`
    pub async fn next_event(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.events.close();
        self.cancel.cancel();
        tracing::debug!("Subscription closed");
    }
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// 購読開始時と変更のたびに `StoreEvent::Snapshot` が届く
    async fn subscribe(&self, collection: &str) -> Result<Subscription>;
}

#[async_trait::async_trait]
pub trait DocumentWriter: Send + Sync {
    /// 新規ドキュメントを作成し、採番された ID を返す
    async fn create_document(&self, collection: &str, fields: Value) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub reference: String,
    pub size: usize,
}

#[async_trait::async_trait]
pub trait BlobStorage: Send + Sync {
    async fn upload(&self, reference: &str, data: Vec<u8>) -> Result<UploadResult>;

    async fn download_url(&self, upload: &UploadResult) -> Result<String>;
}

pub trait IdentityProvider: Send + Sync {
    fn current_viewer(&self) -> Option<ViewerIdentity>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReceipt {
    pub message: String,
}

#[async_trait::async_trait]
pub trait GallerySaver: Send + Sync {
    async fn save(&self, url: &str) -> Result<SaveReceipt>;
}

/// 設定値で決まる閲覧者
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    viewer: Option<ViewerIdentity>,
}

impl StaticIdentity {
    pub fn new(viewer: Option<ViewerIdentity>) -> Self {
        Self { viewer }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_viewer(&self) -> Option<ViewerIdentity> {
        self.viewer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_timestamp_marker() {
        assert!(is_server_timestamp(&server_timestamp()));
        assert!(!is_server_timestamp(&json!({ "seconds": 1, "nanoseconds": 0 })));
        assert!(!is_server_timestamp(&json!("timestamp")));
    }

    #[test]
    fn test_static_identity() {
        assert_eq!(StaticIdentity::new(None).current_viewer(), None);

        let identity = StaticIdentity::new(Some(ViewerIdentity::new("x@x.com")));
        assert_eq!(
            identity.current_viewer(),
            Some(ViewerIdentity::new("x@x.com"))
        );
    }

    /// unsubscribe 後は送信側から見てチャネルが閉じているか検証
    #[tokio::test]
    async fn test_unsubscribe_closes_channel_and_cancels() {
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let subscription = Subscription::new(rx, cancel.clone());

        subscription.unsubscribe();

        assert!(cancel.is_cancelled());
        assert!(tx
            .send(StoreEvent::Snapshot(Snapshot::default()))
            .await
            .is_err());
    }
}
