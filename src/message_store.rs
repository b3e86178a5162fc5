// SQLite record of the live dashboard message id, one row per destination.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

use crate::dashboard::{DestinationId, MessageId, MessageIdStore};

pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dashboard_messages (
                destination_id INTEGER PRIMARY KEY,
                message_id INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageIdStore for SqliteMessageStore {
    #[instrument(skip(self), fields(repo = "message_store", operation = "load"))]
    async fn load(&self, destination: DestinationId) -> anyhow::Result<Option<MessageId>> {
        let row = sqlx::query("SELECT message_id FROM dashboard_messages WHERE destination_id = $1")
            .bind(destination as i64)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: i64 = row.try_get("message_id")?;
        Ok(Some(id as MessageId))
    }

    #[instrument(skip(self), fields(repo = "message_store", operation = "save"))]
    async fn save(&self, destination: DestinationId, message_id: MessageId) -> anyhow::Result<()> {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_millis() as i64;
        sqlx::query(
            "INSERT OR REPLACE INTO dashboard_messages (destination_id, message_id, updated_at) VALUES ($1, $2, $3)",
        )
        .bind(destination as i64)
        .bind(message_id as i64)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "message_store", operation = "clear"))]
    async fn clear(&self, destination: DestinationId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM dashboard_messages WHERE destination_id = $1")
            .bind(destination as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
