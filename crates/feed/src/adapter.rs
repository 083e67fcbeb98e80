use crate::logic;
use diary_core::{Post, POSTS_COLLECTION};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use store::{DocumentStore, IdentityProvider, Snapshot, StoreEvent, Subscription};
use tokio::time::Instant;

/// 購読が切れたときの再接続方針。既定では再接続しない
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    Never,
    FixedDelay { delay: Duration, max_attempts: u32 },
}

impl RetryPolicy {
    /// `attempt` 回目（1始まり）の再接続までの待ち時間。諦める場合は `None`
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            RetryPolicy::Never => None,
            RetryPolicy::FixedDelay {
                delay,
                max_attempts,
            } => (attempt <= max_attempts).then_some(delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Connecting,
    Connected,
    Disconnected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    /// 閲覧者で絞り込み、新しい順に並べた投稿一覧
    Base(Vec<Post>),
    Disconnected(String),
}

/// 投稿コレクションの購読と、スナップショットから表示元一覧への変換
pub struct PostStoreAdapter {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    retry: RetryPolicy,
    subscription: Option<Subscription>,
    connect_now: bool,
    retry_at: Option<Instant>,
    failures: u32,
}

impl PostStoreAdapter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            identity,
            retry,
            subscription: None,
            connect_now: true,
            retry_at: None,
            failures: 0,
        }
    }

    /// 次のイベントを待つ
    ///
    /// 未接続なら購読を開始し、再接続待ちなら期限まで待つ。
    /// 再接続しない状態になったら以後は完了しない。
    pub async fn next_event(&mut self) -> AdapterEvent {
        loop {
            if let Some(subscription) = self.subscription.as_mut() {
                let event = subscription.next_event().await;
                return match event {
                    Some(StoreEvent::Snapshot(snapshot)) => {
                        self.failures = 0;
                        AdapterEvent::Base(self.ingest(snapshot))
                    }
                    Some(StoreEvent::Error(reason)) => self.disconnect(reason),
                    None => self.disconnect("subscription ended".to_string()),
                };
            }

            if !self.connect_now {
                match self.retry_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            }

            let result = self.store.subscribe(POSTS_COLLECTION).await;
            self.connect_now = false;
            self.retry_at = None;
            match result {
                Ok(subscription) => {
                    tracing::info!(
                        "Watching {} (attempt {})",
                        POSTS_COLLECTION,
                        self.failures + 1
                    );
                    self.subscription = Some(subscription);
                }
                Err(e) => return self.disconnect(format!("{:#}", e)),
            }
        }
    }

    fn disconnect(&mut self, reason: String) -> AdapterEvent {
        self.subscription = None;
        self.failures += 1;
        self.retry_at = self
            .retry
            .delay_for(self.failures)
            .map(|delay| Instant::now() + delay);

        match self.retry_at {
            Some(_) => tracing::warn!(
                "Post watch lost ({}), retry #{} scheduled",
                reason,
                self.failures
            ),
            None => tracing::error!("Post watch lost ({}), not retrying", reason),
        }
        AdapterEvent::Disconnected(reason)
    }

    /// スナップショット全件を投稿に変換し、閲覧者で絞り込んで並べる
    fn ingest(&self, snapshot: Snapshot) -> Vec<Post> {
        let posts: Vec<Post> = snapshot
            .documents
            .into_iter()
            .filter_map(|doc| match Post::from_document(&doc.id, doc.data) {
                Ok(post) => Some(post),
                Err(e) => {
                    tracing::warn!("Skipping malformed post: {:#}", e);
                    None
                }
            })
            .collect();

        let viewer = self.identity.current_viewer();
        let visible = logic::filter_visible(&posts, viewer.as_ref());
        tracing::debug!(
            "Snapshot: {} posts, {} visible to {:?}",
            posts.len(),
            visible.len(),
            viewer.as_ref().map(|v| v.email.as_str())
        );
        logic::sort_posts(visible)
    }

    /// 購読を閉じる。以後イベントは届かず、再接続もしない
    pub fn close(&mut self) {
        self.connect_now = false;
        self.retry_at = None;
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::info!("Post watch closed");
        }
    }
}
