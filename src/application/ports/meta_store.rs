use crate::domain::value_objects::EntityTable;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Key/value bookkeeping alongside the cache; primarily the
/// last-successful-sync timestamp per table.
#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn get_meta(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set_meta(&self, key: &str, value: &str) -> Result<(), AppError>;

    async fn last_sync_time(&self, table: EntityTable) -> Result<Option<DateTime<Utc>>, AppError> {
        let raw = self.get_meta(&last_sync_key(table)).await?;
        match raw {
            Some(value) => {
                let parsed = DateTime::parse_from_rfc3339(&value)
                    .map_err(|e| AppError::Internal(format!("Bad last-sync timestamp: {e}")))?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    async fn record_sync_time(&self, table: EntityTable, at: DateTime<Utc>) -> Result<(), AppError> {
        self.set_meta(&last_sync_key(table), &at.to_rfc3339()).await
    }
}

fn last_sync_key(table: EntityTable) -> String {
    format!("last_sync_{table}")
}
