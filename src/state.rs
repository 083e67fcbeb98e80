use crate::ui::UiStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diary_core::UserProfile;
use feed::{FeedComposer, FeedConfig, FeedHandle, LocalPageSource, RetryPolicy};
use publisher::PostPublisher;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::{BlobStorage, DocumentStore, DocumentWriter, GallerySaver, IdentityProvider};

/// 環境変数から読み込む設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub blob_dir: PathBuf,
    pub gallery_dir: PathBuf,
    pub viewer_email: Option<String>,
    pub search_debounce: Duration,
    pub page_size: usize,
    pub retry: RetryPolicy,
    pub love_begin: DateTime<Utc>,
    pub couple_users: Vec<UserProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "sqlite:data/diary.db".to_string(),
            blob_dir: PathBuf::from("data/blobs"),
            gallery_dir: PathBuf::from("data/gallery"),
            viewer_email: None,
            search_debounce: feed::debounce::DEFAULT_SEARCH_DEBOUNCE,
            page_size: feed::cursor::DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::Never,
            love_begin: anniversary::default_love_begin(),
            couple_users: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `lookup` で値を引き、無い項目は既定値にする。値の形式が不正ならエラー
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(v) => v.parse().with_context(|| format!("Invalid PORT: {}", v))?,
            None => defaults.port,
        };
        let search_debounce = match get("SEARCH_DEBOUNCE_MS") {
            Some(v) => Duration::from_millis(
                v.parse()
                    .with_context(|| format!("Invalid SEARCH_DEBOUNCE_MS: {}", v))?,
            ),
            None => defaults.search_debounce,
        };
        let page_size = match get("FEED_PAGE_SIZE") {
            Some(v) => v
                .parse()
                .with_context(|| format!("Invalid FEED_PAGE_SIZE: {}", v))?,
            None => defaults.page_size,
        };
        let retry = match (get("STORE_RETRY_DELAY_MS"), get("STORE_RETRY_MAX_ATTEMPTS")) {
            (Some(delay), Some(attempts)) => RetryPolicy::FixedDelay {
                delay: Duration::from_millis(
                    delay
                        .parse()
                        .with_context(|| format!("Invalid STORE_RETRY_DELAY_MS: {}", delay))?,
                ),
                max_attempts: attempts.parse().with_context(|| {
                    format!("Invalid STORE_RETRY_MAX_ATTEMPTS: {}", attempts)
                })?,
            },
            _ => RetryPolicy::Never,
        };
        let love_begin = match get("LOVE_BEGIN") {
            Some(v) => DateTime::parse_from_rfc3339(&v)
                .with_context(|| format!("Invalid LOVE_BEGIN: {}", v))?
                .with_timezone(&Utc),
            None => defaults.love_begin,
        };
        let couple_users = match get("COUPLE_USERS") {
            Some(v) => serde_json::from_str(&v).context("Invalid COUPLE_USERS")?,
            None => defaults.couple_users,
        };

        Ok(Self {
            port,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            blob_dir: get("BLOB_DIR").map(PathBuf::from).unwrap_or(defaults.blob_dir),
            gallery_dir: get("GALLERY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.gallery_dir),
            viewer_email: get("VIEWER_EMAIL"),
            search_debounce,
            page_size,
            retry,
            love_begin,
            couple_users,
        })
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            debounce: self.search_debounce,
            page_size: self.page_size,
            retry: self.retry,
        }
    }
}

pub type SharedState = AppState;

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<FeedHandle>,
    pub ui: UiStore,
    pub publisher: Arc<PostPublisher>,
    pub gallery: Arc<dyn GallerySaver>,
    pub identity: Arc<dyn IdentityProvider>,
    pub love_begin: DateTime<Utc>,
}

impl AppState {
    /// フィードの組み立てタスクを起動し、各コンポーネントを束ねる
    pub fn new<S>(
        config: &AppConfig,
        store: Arc<S>,
        blobs: Arc<dyn BlobStorage>,
        gallery: Arc<dyn GallerySaver>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self
    where
        S: DocumentStore + DocumentWriter + 'static,
    {
        let ui = UiStore::new(config.couple_users.clone());
        let notifier = Arc::new(ui.clone());

        let feed = FeedComposer::spawn(
            store.clone(),
            identity.clone(),
            Arc::new(LocalPageSource),
            notifier.clone(),
            config.feed_config(),
        );
        let publisher = PostPublisher::new(blobs, store, identity.clone(), notifier);

        Self {
            feed: Arc::new(feed),
            ui,
            publisher: Arc::new(publisher),
            gallery,
            identity,
            love_begin: config.love_begin,
        }
    }
}
