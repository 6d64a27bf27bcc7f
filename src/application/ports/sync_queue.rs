use crate::domain::entities::{QueueEntry, QueueEntryDraft};
use crate::domain::value_objects::{EntityTable, RecordId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Map;
use std::time::Duration;

/// Durable, globally ordered log of pending mutations. Ordering is
/// load-bearing: a later entry may depend on an earlier one's
/// server-assigned id, so replay is strict FIFO across all tables.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Appends an entry and returns its sequence id.
    async fn enqueue(&self, draft: QueueEntryDraft) -> Result<i64, AppError>;
    /// Pending entries in ascending sequence order. Entries parked as
    /// failed are excluded.
    async fn list_pending(&self) -> Result<Vec<QueueEntry>, AppError>;
    async fn count_pending(&self) -> Result<u32, AppError>;
    async fn mark_completed(&self, entry_id: i64) -> Result<(), AppError>;
    /// Increments the attempt counter and records the error; once attempts
    /// reach the configured maximum the entry moves to failed.
    async fn mark_failed(&self, entry_id: i64, error: &str) -> Result<(), AppError>;
    /// Housekeeping sweep over completed entries.
    async fn purge_completed_older_than(&self, age: Duration) -> Result<u32, AppError>;
    /// Drops every pending entry targeting `record_id` (used when a
    /// never-synced record is deleted locally).
    async fn discard_pending_for_record(
        &self,
        table: EntityTable,
        record_id: &RecordId,
    ) -> Result<u32, AppError>;
    /// Folds `patch` into the payload of a pending create for `record_id`,
    /// if one exists. Returns false when there is nothing to merge into.
    async fn merge_into_pending_create(
        &self,
        table: EntityTable,
        record_id: &RecordId,
        patch: &Map<String, serde_json::Value>,
    ) -> Result<bool, AppError>;
}
