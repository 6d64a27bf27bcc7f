use crate::domain::entities::CachedRecord;
use crate::domain::value_objects::EntityTable;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Persistent cache of domain records, keyed by primary id per table.
/// `put`/`put_many` overwrite whole records; callers supply the full
/// desired state. Storage failures propagate, the store never retries.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, table: EntityTable, id: &str) -> Result<Option<CachedRecord>, AppError>;
    async fn get_all(&self, table: EntityTable) -> Result<Vec<CachedRecord>, AppError>;
    /// Lookup by one of the table's secondary indexes (see
    /// `EntityTable::indexes`); unknown index names are rejected.
    async fn get_by_index(
        &self,
        table: EntityTable,
        index: &str,
        value: &str,
    ) -> Result<Vec<CachedRecord>, AppError>;
    /// Upsert; returns the record's id. Stamps `_localUpdatedAt`.
    async fn put(&self, table: EntityTable, record: CachedRecord) -> Result<String, AppError>;
    async fn put_many(
        &self,
        table: EntityTable,
        records: Vec<CachedRecord>,
    ) -> Result<u32, AppError>;
    async fn delete(&self, table: EntityTable, id: &str) -> Result<(), AppError>;
    async fn clear(&self, table: EntityTable) -> Result<(), AppError>;
    async fn count(&self, table: EntityTable) -> Result<u64, AppError>;
}
