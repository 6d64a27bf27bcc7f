use crate::domain::value_objects::EntityTable;
use std::time::Duration;

/// Tuning knobs for the sync subsystem. Defaults mirror the production
/// constants: 30s timers, 5 attempts per queue entry, completed entries
/// retained for one hour.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Tables refreshed by every `pull()`.
    pub tracked_tables: Vec<EntityTable>,
    /// Interval between automatic `sync()` runs.
    pub sync_interval: Duration,
    /// Interval between connectivity re-checks.
    pub connectivity_interval: Duration,
    /// Attempts before a queue entry is parked as failed.
    pub max_attempts: u32,
    /// Completed queue entries older than this are purged.
    pub completed_retention: Duration,
    /// Wait after an offline->online transition before syncing, so the
    /// network has a moment to stabilize.
    pub reconnect_grace: Duration,
    /// Delay before the one-shot sync scheduled at auto-sync startup.
    pub initial_sync_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tracked_tables: vec![
                EntityTable::Members,
                EntityTable::MemberPayments,
                EntityTable::Classes,
            ],
            sync_interval: Duration::from_secs(30),
            connectivity_interval: Duration::from_secs(30),
            max_attempts: 5,
            completed_retention: Duration::from_secs(60 * 60),
            reconnect_grace: Duration::from_secs(2),
            initial_sync_delay: Duration::from_secs(3),
        }
    }
}
