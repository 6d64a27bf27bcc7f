//! Offline-first data layer for gym management clients.
//!
//! Reads and writes go through [`EntityRepository`], which serves from the
//! local SQLite cache whenever the backend is unreachable and queues
//! mutations for later replay. [`SyncEngine`] drains that queue and pulls
//! fresh server state once [`ConnectionMonitor`] reports connectivity.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{
    ConnectivityProbe, LocalStore, MetaStore, RemoteBackend, SyncQueue,
};
pub use application::services::{
    ConnectionMonitor, ConnectionStatus, EntityRepository, SyncContext, SyncEngine,
};
pub use domain::entities::{
    CachedRecord, EngineStatus, PullReport, PushReport, QueueEntry, QueueEntryDraft,
    StorageStats, SyncEvent, SyncReport,
};
pub use domain::value_objects::{EntityTable, Operation, QueueStatus, RecordId};
pub use infrastructure::connectivity::TcpProbe;
pub use infrastructure::database::{ConnectionPool, SqliteOfflineStore};
pub use shared::config::SyncConfig;
pub use shared::error::AppError;
