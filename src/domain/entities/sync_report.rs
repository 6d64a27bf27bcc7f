use crate::domain::value_objects::EntityTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ERR_ALREADY_SYNCING: &str = "already syncing";
pub const ERR_OFFLINE: &str = "offline";

/// Aggregate outcome of draining the queue. Failures are per-entry and do
/// not abort the drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    pub processed: u32,
    pub failed: u32,
}

/// Outcome of refreshing one table during pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePull {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TablePull {
    pub fn ok(count: usize) -> Self {
        Self {
            success: true,
            count,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            count: 0,
            error: Some(error),
        }
    }
}

/// Per-table pull outcomes, keyed by table name when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullReport(pub BTreeMap<EntityTable, TablePull>);

impl PullReport {
    pub fn record(&mut self, table: EntityTable, outcome: TablePull) {
        self.0.insert(table, outcome);
    }

    pub fn table(&self, table: EntityTable) -> Option<&TablePull> {
        self.0.get(&table)
    }

    pub fn all_succeeded(&self) -> bool {
        self.0.values().all(|t| t.success)
    }
}

/// Result of a composite `sync()`. Never an Err: concurrent-sync and
/// offline conditions are structured outcomes, not exceptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull: Option<PullReport>,
}

impl SyncReport {
    pub fn completed(push: PushReport, pull: PullReport) -> Self {
        Self {
            success: true,
            error: None,
            push: Some(push),
            pull: Some(pull),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            push: None,
            pull: None,
        }
    }

    pub fn already_syncing() -> Self {
        Self::failed(ERR_ALREADY_SYNCING)
    }

    pub fn offline() -> Self {
        Self::failed(ERR_OFFLINE)
    }
}

/// Lifecycle events published by the engine for UI status widgets.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SyncEvent {
    Started,
    Completed(SyncReport),
    Failed(String),
}

/// Snapshot for status surfaces (connection banner, pending badge).
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub is_syncing: bool,
    pub pending_operations: u32,
    pub last_sync: BTreeMap<EntityTable, Option<DateTime<Utc>>>,
    pub auto_sync_active: bool,
}

/// Cached record counts per table plus queue depth.
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    pub records: BTreeMap<EntityTable, u64>,
    pub pending_sync: u32,
}
