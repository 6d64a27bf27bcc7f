mod operation;
mod queue_status;
mod record_id;
mod table;

pub use operation::Operation;
pub use queue_status::QueueStatus;
pub use record_id::RecordId;
pub use table::EntityTable;
