use crate::application::ports::{LocalStore, MetaStore, SyncQueue};
use crate::domain::entities::{CachedRecord, QueueEntry, QueueEntryDraft};
use crate::domain::value_objects::{EntityTable, RecordId};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::time::Duration;

use super::rows::QueueEntryRow;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// SQLite-backed implementation of the cache, queue, and meta ports.
/// Records are stored as JSON text; indexed lookups go through
/// `json_extract` against the table's index whitelist.
pub struct SqliteOfflineStore {
    pool: SqlitePool,
    max_attempts: u32,
}

impl SqliteOfflineStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Takes the queue retry limit from the sync configuration.
    pub fn from_config(pool: SqlitePool, config: &SyncConfig) -> Self {
        Self {
            pool,
            max_attempts: config.max_attempts,
        }
    }

    /// Wipes every cached table, the queue, and the meta table.
    pub async fn clear_all(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cached_records")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM sync_queue")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM sync_meta")
            .execute(&self.pool)
            .await?;
        tracing::info!("cleared all local data");
        Ok(())
    }

    fn decode_record(data: &str) -> Result<CachedRecord, AppError> {
        let value: Value = serde_json::from_str(data)?;
        CachedRecord::from_value(value).map_err(AppError::Database)
    }
}

#[async_trait]
impl LocalStore for SqliteOfflineStore {
    async fn get(&self, table: EntityTable, id: &str) -> Result<Option<CachedRecord>, AppError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT data FROM cached_records WHERE table_name = ?1 AND record_id = ?2",
        )
        .bind(table.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(data,)| Self::decode_record(&data)).transpose()
    }

    async fn get_all(&self, table: EntityTable) -> Result<Vec<CachedRecord>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM cached_records WHERE table_name = ?1 ORDER BY record_id",
        )
        .bind(table.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|(data,)| Self::decode_record(data))
            .collect()
    }

    async fn get_by_index(
        &self,
        table: EntityTable,
        index: &str,
        value: &str,
    ) -> Result<Vec<CachedRecord>, AppError> {
        if !table.indexes().contains(&index) {
            return Err(AppError::InvalidInput(format!(
                "No index '{index}' on table {table}"
            )));
        }
        // `index` is whitelisted above, never caller-controlled SQL.
        let sql = format!(
            "SELECT data FROM cached_records \
             WHERE table_name = ?1 AND json_extract(data, '$.{index}') = ?2 \
             ORDER BY record_id"
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(table.as_str())
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|(data,)| Self::decode_record(data))
            .collect()
    }

    async fn put(&self, table: EntityTable, record: CachedRecord) -> Result<String, AppError> {
        let mut record = record;
        let now = Utc::now();
        record.touch(now);
        let id = record.record_id().map_err(AppError::InvalidInput)?;
        let data = serde_json::to_string(record.as_object())?;

        sqlx::query(
            r#"
            INSERT INTO cached_records (table_name, record_id, data, local_updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(table_name, record_id) DO UPDATE SET
                data = excluded.data,
                local_updated_at = excluded.local_updated_at
            "#,
        )
        .bind(table.as_str())
        .bind(id.as_str())
        .bind(&data)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id.into())
    }

    async fn put_many(
        &self,
        table: EntityTable,
        records: Vec<CachedRecord>,
    ) -> Result<u32, AppError> {
        let now = Utc::now();
        let stamp = now.to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut written = 0u32;

        for mut record in records {
            record.touch(now);
            let id = record.record_id().map_err(AppError::InvalidInput)?;
            let data = serde_json::to_string(record.as_object())?;
            sqlx::query(
                r#"
                INSERT INTO cached_records (table_name, record_id, data, local_updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(table_name, record_id) DO UPDATE SET
                    data = excluded.data,
                    local_updated_at = excluded.local_updated_at
                "#,
            )
            .bind(table.as_str())
            .bind(id.as_str())
            .bind(&data)
            .bind(&stamp)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn delete(&self, table: EntityTable, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cached_records WHERE table_name = ?1 AND record_id = ?2")
            .bind(table.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self, table: EntityTable) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cached_records WHERE table_name = ?1")
            .bind(table.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self, table: EntityTable) -> Result<u64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM cached_records WHERE table_name = ?1")
                .bind(table.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl SyncQueue for SqliteOfflineStore {
    async fn enqueue(&self, draft: QueueEntryDraft) -> Result<i64, AppError> {
        let payload = draft
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO sync_queue (table_name, operation, payload, record_id, status, attempts, created_at)
            VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5)
            "#,
        )
        .bind(draft.table.as_str())
        .bind(draft.operation.as_str())
        .bind(payload)
        .bind(draft.record_id.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_pending(&self) -> Result<Vec<QueueEntry>, AppError> {
        let rows = sqlx::query_as::<_, QueueEntryRow>(
            "SELECT * FROM sync_queue WHERE status = 'pending' ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QueueEntry::try_from).collect()
    }

    async fn count_pending(&self) -> Result<u32, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sync_queue WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u32)
    }

    async fn mark_completed(&self, entry_id: i64) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sync_queue SET status = 'completed', completed_at = ?1 WHERE id = ?2",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(entry_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, entry_id: i64, error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sync_queue
            SET attempts = attempts + 1,
                last_error = ?2,
                status = CASE WHEN attempts + 1 >= ?3 THEN 'failed' ELSE status END
            WHERE id = ?1
            "#,
        )
        .bind(entry_id)
        .bind(error)
        .bind(self.max_attempts as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_completed_older_than(&self, age: Duration) -> Result<u32, AppError> {
        let age = ChronoDuration::from_std(age)
            .map_err(|e| AppError::InvalidInput(format!("Bad purge age: {e}")))?;
        let cutoff = (Utc::now() - age).to_rfc3339();
        // RFC 3339 UTC strings compare lexicographically in time order.
        let result = sqlx::query(
            "DELETE FROM sync_queue WHERE status = 'completed' AND completed_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as u32)
    }

    async fn discard_pending_for_record(
        &self,
        table: EntityTable,
        record_id: &RecordId,
    ) -> Result<u32, AppError> {
        let result = sqlx::query(
            "DELETE FROM sync_queue \
             WHERE table_name = ?1 AND record_id = ?2 AND status = 'pending'",
        )
        .bind(table.as_str())
        .bind(record_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as u32)
    }

    async fn merge_into_pending_create(
        &self,
        table: EntityTable,
        record_id: &RecordId,
        patch: &Map<String, Value>,
    ) -> Result<bool, AppError> {
        let row: Option<(i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT id, payload FROM sync_queue
            WHERE table_name = ?1 AND record_id = ?2
              AND operation = 'create' AND status = 'pending'
            ORDER BY id ASC LIMIT 1
            "#,
        )
        .bind(table.as_str())
        .bind(record_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((entry_id, payload)) = row else {
            return Ok(false);
        };
        let payload = payload.ok_or_else(|| {
            AppError::Database(format!("Create entry {entry_id} has no payload"))
        })?;

        let mut value: Value = serde_json::from_str(&payload)?;
        let Value::Object(ref mut map) = value else {
            return Err(AppError::Database(format!(
                "Create entry {entry_id} payload is not an object"
            )));
        };
        for (key, field) in patch {
            map.insert(key.clone(), field.clone());
        }

        sqlx::query("UPDATE sync_queue SET payload = ?1 WHERE id = ?2")
            .bind(serde_json::to_string(&value)?)
            .bind(entry_id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl MetaStore for SqliteOfflineStore {
    async fn get_meta(&self, key: &str) -> Result<Option<String>, AppError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT meta_value FROM sync_meta WHERE meta_key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_meta (meta_key, meta_value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(meta_key) DO UPDATE SET
                meta_value = excluded.meta_value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
