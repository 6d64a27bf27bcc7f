use crate::application::ports::{LocalStore, MetaStore, RemoteBackend, SyncQueue};
use crate::application::services::connection_monitor::ConnectionMonitor;
use crate::shared::config::SyncConfig;
use std::sync::Arc;

/// Explicitly constructed bundle of the sync core's collaborators, injected
/// into facades and the engine. There are no module-level globals; build as
/// many independent contexts as you need (one per application instance, or
/// one per test).
#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn LocalStore>,
    pub queue: Arc<dyn SyncQueue>,
    pub meta: Arc<dyn MetaStore>,
    pub backend: Arc<dyn RemoteBackend>,
    pub monitor: Arc<ConnectionMonitor>,
    pub config: SyncConfig,
}

impl SyncContext {
    pub fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<dyn SyncQueue>,
        meta: Arc<dyn MetaStore>,
        backend: Arc<dyn RemoteBackend>,
        monitor: Arc<ConnectionMonitor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            queue,
            meta,
            backend,
            monitor,
            config,
        }
    }
}
