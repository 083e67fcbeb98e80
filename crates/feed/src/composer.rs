//! フィードの組み立て
//!
//! 1つのタスクがフィードの状態をすべて所有し、次の入力を順に処理する。
//!
//! - ストアからのスナップショット（全件差し替え）
//! - 検索クエリの変更
//! - スクロール操作（開始・末尾到達）
//! - ページ取得の完了
//! - 検索デバウンスの発火
//!
//! 表示一覧は常に「最新の元一覧 + 最新のクエリ」から作り直す。部分更新はしない。

use crate::adapter::{AdapterEvent, Connectivity, PostStoreAdapter, RetryPolicy};
use crate::cursor::{FeedCursor, PageRequest, PageSource, DEFAULT_PAGE_SIZE};
use crate::debounce::{SearchFilter, DEFAULT_SEARCH_DEBOUNCE};
use crate::logic;
use anyhow::{Context, Result};
use diary_core::{Comment, Post};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use store::{DocumentStore, IdentityProvider};
use toast::{Notify, ToastMessage};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub debounce: Duration,
    pub page_size: usize,
    pub retry: RetryPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_SEARCH_DEBOUNCE,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::Never,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    SetQuery(String),
    ScrollBegin,
    EndReached,
}

/// 画面に渡すフィードの読み取り用ビュー
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeedView {
    /// 描画対象の投稿（表示一覧の先頭 window 件）
    pub posts: Vec<Post>,
    /// 検索後の表示一覧の件数
    pub total: usize,
    pub query: String,
    pub loading_more: bool,
    pub connectivity: Connectivity,
    /// 表示一覧を作り直した回数
    pub generation: u64,
}

impl FeedView {
    pub fn post(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    /// コメントを古い順で返す。表示中でない投稿なら `None`
    pub fn sorted_comments(&self, id: &str) -> Option<Vec<Comment>> {
        self.post(id)
            .map(|post| logic::sort_comments(post.comments.clone()))
    }
}

/// 組み立てタスクへの操作口
pub struct FeedHandle {
    commands: mpsc::Sender<FeedCommand>,
    view: watch::Receiver<FeedView>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    pub async fn send(&self, command: FeedCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .context("Feed composer is not running")
    }

    pub async fn set_query(&self, query: impl Into<String>) -> Result<()> {
        self.send(FeedCommand::SetQuery(query.into())).await
    }

    pub async fn begin_gesture(&self) -> Result<()> {
        self.send(FeedCommand::ScrollBegin).await
    }

    pub async fn end_reached(&self) -> Result<()> {
        self.send(FeedCommand::EndReached).await
    }

    pub fn view(&self) -> FeedView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedView> {
        self.view.clone()
    }

    /// 停止する。保留中のデバウンスは破棄され、購読は閉じられる
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.await.context("Feed composer task panicked")?;
        }
        Ok(())
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct FeedComposer {
    adapter: PostStoreAdapter,
    search: SearchFilter,
    cursor: FeedCursor,
    pages: Arc<dyn PageSource>,
    notifier: Arc<dyn Notify>,
    base: Vec<Post>,
    displayed: Vec<Post>,
    connectivity: Connectivity,
    generation: u64,
    view_tx: watch::Sender<FeedView>,
}

impl FeedComposer {
    pub fn spawn(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        pages: Arc<dyn PageSource>,
        notifier: Arc<dyn Notify>,
        config: FeedConfig,
    ) -> FeedHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view_rx) = watch::channel(FeedView::default());
        let cancel = CancellationToken::new();

        let composer = FeedComposer {
            adapter: PostStoreAdapter::new(store, identity, config.retry),
            search: SearchFilter::new(config.debounce),
            cursor: FeedCursor::new(config.page_size),
            pages,
            notifier,
            base: Vec::new(),
            displayed: Vec::new(),
            connectivity: Connectivity::Connecting,
            generation: 0,
            view_tx,
        };

        let task = tokio::spawn(composer.run(commands_rx, cancel.clone()));

        FeedHandle {
            commands: commands_tx,
            view: view_rx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<FeedCommand>, cancel: CancellationToken) {
        tracing::info!("Feed composer started");
        let (page_tx, mut page_rx) = mpsc::unbounded_channel::<Result<()>>();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.adapter.next_event() => self.on_adapter_event(event),
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command, &page_tx),
                    None => break,
                },
                _ = self.search.fired() => self.refilter(),
                Some(result) = page_rx.recv() => self.on_page_loaded(result),
            }
        }

        self.search.cancel();
        self.adapter.close();
        tracing::info!("Feed composer stopped");
    }

    fn on_adapter_event(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::Base(posts) => {
                self.base = posts;
                self.connectivity = Connectivity::Connected;
                if self.search.query().is_empty() {
                    // 空クエリの検索は元一覧そのものなので待たずに反映する
                    self.search.cancel();
                    self.refilter();
                } else {
                    self.search.base_changed();
                    self.publish();
                }
            }
            AdapterEvent::Disconnected(reason) => {
                self.notifier
                    .notify(ToastMessage::error(format!("Connection lost: {}", reason)));
                self.connectivity = Connectivity::Disconnected(reason);
                self.publish();
            }
        }
    }

    fn on_command(&mut self, command: FeedCommand, page_tx: &mpsc::UnboundedSender<Result<()>>) {
        match command {
            FeedCommand::SetQuery(query) => {
                tracing::debug!("Search query changed: {:?}", query);
                self.search.set_query(query);
                self.publish();
            }
            FeedCommand::ScrollBegin => self.cursor.begin_gesture(),
            FeedCommand::EndReached => {
                if let Some(request) = self.cursor.end_reached() {
                    self.fetch_page(request, page_tx.clone());
                    self.publish();
                }
            }
        }
    }

    fn fetch_page(&self, request: PageRequest, page_tx: mpsc::UnboundedSender<Result<()>>) {
        let pages = self.pages.clone();
        tracing::debug!(
            "Loading more posts (offset {}, size {})",
            request.offset,
            request.size
        );
        tokio::spawn(async move {
            let result = pages.fetch_page(request.offset, request.size).await;
            // 停止後に完了した場合は捨てる
            let _ = page_tx.send(result);
        });
    }

    fn on_page_loaded(&mut self, result: Result<()>) {
        self.cursor.finish_request(&result);
        if let Err(e) = &result {
            self.notifier
                .notify(ToastMessage::error(format!("Failed to load more posts: {}", e)));
        }
        self.publish();
    }

    fn refilter(&mut self) {
        self.displayed = self.search.apply(&self.base);
        self.generation += 1;
        tracing::debug!(
            "Feed recomputed: {} of {} posts match {:?}",
            self.displayed.len(),
            self.base.len(),
            self.search.query()
        );
        self.publish();
    }

    fn publish(&self) {
        let view = FeedView {
            posts: self.cursor.materialize(&self.displayed).to_vec(),
            total: self.displayed.len(),
            query: self.search.query().to_string(),
            loading_more: self.cursor.loading_more(),
            connectivity: self.connectivity.clone(),
            generation: self.generation,
        };
        self.view_tx.send_replace(view);
    }
}
