pub mod connection_monitor;
pub mod context;
pub mod repository;
pub mod sync_engine;
pub mod test_support;

pub use connection_monitor::{ConnectionMonitor, ConnectionStatus};
pub use context::SyncContext;
pub use repository::EntityRepository;
pub use sync_engine::SyncEngine;
