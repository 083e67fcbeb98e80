use anyhow::Context;
use diary_core::ViewerIdentity;
use diary_feeds::app;
use diary_feeds::state::{AppConfig, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use store::{DirectoryGallery, LocalBlobStorage, SqliteDocumentStore, StaticIdentity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Log initialized");

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database: {}", config.database_url);
    let store = SqliteDocumentStore::connect(&config.database_url).await?;
    store.migrate().await.context("Failed to migrate document store")?;
    let store = Arc::new(store);

    let http_client = reqwest::Client::builder()
        .user_agent("DiaryFeeds/1.0")
        .build()
        .context("Failed to build HTTP client")?;

    let blobs = Arc::new(LocalBlobStorage::new(&config.blob_dir));
    let gallery = Arc::new(DirectoryGallery::new(http_client, &config.gallery_dir));

    match &config.viewer_email {
        Some(email) => tracing::info!("Viewing as {}", email),
        None => tracing::info!("No VIEWER_EMAIL set, showing public posts only"),
    }
    let identity = Arc::new(StaticIdentity::new(
        config.viewer_email.clone().map(ViewerIdentity::new),
    ));

    let app_state = AppState::new(&config, store, blobs, gallery, identity);
    let feed = app_state.feed.clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Diary feed server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let router = app(app_state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ルーターが破棄された後なら、最後の参照としてフィードを停止できる
    match Arc::try_unwrap(feed) {
        Ok(feed) => feed.shutdown().await?,
        Err(_) => tracing::warn!("Feed still referenced at shutdown, dropping"),
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
