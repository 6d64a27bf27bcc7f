pub mod queue_entry;
pub mod record;
pub mod sync_report;

pub use queue_entry::{QueueEntry, QueueEntryDraft};
pub use record::{
    sanitize_for_wire, CachedRecord, FIELD_ID, FIELD_IS_OFFLINE, FIELD_LOCAL_UPDATED_AT,
};
pub use sync_report::{
    EngineStatus, PullReport, PushReport, StorageStats, SyncEvent, SyncReport, TablePull,
    ERR_ALREADY_SYNCING, ERR_OFFLINE,
};
