use crate::domain::value_objects::EntityTable;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Row-oriented CRUD surface of the hosted backend. Implementations wrap
/// the actual HTTP client; the sync core only sees rows and errors with a
/// message. Write calls return the authoritative row as stored server-side.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn select_all(&self, table: EntityTable) -> Result<Vec<Value>, AppError>;
    async fn select_by_id(&self, table: EntityTable, id: &str)
        -> Result<Option<Value>, AppError>;
    async fn insert(&self, table: EntityTable, record: Value) -> Result<Value, AppError>;
    async fn update(
        &self,
        table: EntityTable,
        id: &str,
        patch: Value,
    ) -> Result<Value, AppError>;
    async fn delete(&self, table: EntityTable, id: &str) -> Result<(), AppError>;
}
