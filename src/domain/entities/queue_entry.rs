use crate::domain::value_objects::{EntityTable, Operation, QueueStatus, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One durable pending mutation. `id` is the auto-incrementing sequence
/// that defines global replay order across all tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub table: EntityTable,
    pub operation: Operation,
    pub payload: Option<Value>,
    pub record_id: RecordId,
    pub status: QueueStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for `SyncQueue::enqueue`; the store assigns sequence, status and
/// timestamps.
#[derive(Debug, Clone)]
pub struct QueueEntryDraft {
    pub table: EntityTable,
    pub operation: Operation,
    pub payload: Option<Value>,
    pub record_id: RecordId,
}

impl QueueEntryDraft {
    /// Full record payload, including a temporary id when created offline.
    pub fn create(table: EntityTable, record: Value, record_id: RecordId) -> Self {
        Self {
            table,
            operation: Operation::Create,
            payload: Some(record),
            record_id,
        }
    }

    /// Partial diff payload.
    pub fn update(table: EntityTable, patch: Value, record_id: RecordId) -> Self {
        Self {
            table,
            operation: Operation::Update,
            payload: Some(patch),
            record_id,
        }
    }

    pub fn delete(table: EntityTable, record_id: RecordId) -> Self {
        Self {
            table,
            operation: Operation::Delete,
            payload: None,
            record_id,
        }
    }
}
