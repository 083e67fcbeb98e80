//! SQLite によるドキュメントストア
//!
//! テーブル: `documents`
//!   - id         : TEXT PRIMARY KEY
//!   - collection : TEXT NOT NULL
//!   - data       : TEXT NOT NULL (JSON)
//!
//! 書き込みのたびに broadcast で変更を通知し、購読側はコレクション全件を読み直して送る。

use crate::{
    is_server_timestamp, Document, DocumentStore, DocumentWriter, Snapshot, StoreEvent,
    Subscription,
};
use anyhow::{Context, Result};
use diary_core::Timestamp;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

const CHANGE_CHANNEL_CAPACITY: usize = 64;
const SUBSCRIPTION_BUFFER: usize = 16;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    changes: broadcast::Sender<String>,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id         TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                data       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn notify_change(&self, collection: &str) {
        // 購読者がいなければ Err になるが問題ない
        let _ = self.changes.send(collection.to_string());
    }
}

async fn load_snapshot(pool: &SqlitePool, collection: &str) -> Result<Snapshot> {
    let rows = sqlx::query("SELECT id, data FROM documents WHERE collection = ? ORDER BY rowid")
        .bind(collection)
        .fetch_all(pool)
        .await
        .context("store: snapshot query failed")?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.try_get("id")?;
        let raw: String = row.try_get("data")?;
        let data = serde_json::from_str(&raw)
            .with_context(|| format!("store: document {} is not valid JSON", id))?;
        documents.push(Document { id, data });
    }

    Ok(Snapshot { documents })
}

/// スナップショットを送る。続行できなければ false
async fn send_snapshot(
    pool: &SqlitePool,
    collection: &str,
    tx: &mpsc::Sender<StoreEvent>,
) -> bool {
    match load_snapshot(pool, collection).await {
        Ok(snapshot) => {
            tracing::debug!(
                "Delivering snapshot of {} ({} documents)",
                collection,
                snapshot.documents.len()
            );
            tx.send(StoreEvent::Snapshot(snapshot)).await.is_ok()
        }
        Err(e) => {
            tracing::error!("Failed to load snapshot of {}: {:#}", collection, e);
            let _ = tx.send(StoreEvent::Error(format!("{:#}", e))).await;
            false
        }
    }
}

fn resolve_server_timestamps(fields: Value) -> Result<Value> {
    let Value::Object(mut map) = fields else {
        anyhow::bail!("Document fields must be a JSON object");
    };

    let now = serde_json::to_value(Timestamp::from_datetime(chrono::Utc::now()))?;
    for value in map.values_mut() {
        if is_server_timestamp(value) {
            *value = now.clone();
        }
    }

    Ok(Value::Object(map))
}

#[async_trait::async_trait]
impl DocumentWriter for SqliteDocumentStore {
    async fn create_document(&self, collection: &str, fields: Value) -> Result<String> {
        let data = resolve_server_timestamps(fields)?;
        let id = uuid::Uuid::new_v4().simple().to_string();

        sqlx::query("INSERT INTO documents (id, collection, data) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(collection)
            .bind(data.to_string())
            .execute(&self.pool)
            .await
            .context("store: insert query failed")?;

        tracing::info!("Created document {}/{}", collection, id);
        self.notify_change(collection);
        Ok(id)
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn subscribe(&self, collection: &str) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();

        // 初回読み込みより先に受信側を作り、その間の変更を取りこぼさない
        let mut changes = self.changes.subscribe();
        let pool = self.pool.clone();
        let collection = collection.to_string();
        let token = cancel.clone();
        tracing::info!("Subscribed to {}", collection);

        tokio::spawn(async move {
            if !send_snapshot(&pool, &collection, &tx).await {
                return;
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Watch on {} cancelled", collection);
                        break;
                    }
                    changed = changes.recv() => match changed {
                        Ok(c) if c == collection => {
                            if !send_snapshot(&pool, &collection, &tx).await {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("Watch on {} lagged by {} changes", collection, skipped);
                            if !send_snapshot(&pool, &collection, &tx).await {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            let _ = tx
                                .send(StoreEvent::Error("document store closed".to_string()))
                                .await;
                            break;
                        }
                    }
                }
            }
        });

        Ok(Subscription::new(rx, cancel))
    }
}
