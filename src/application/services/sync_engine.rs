use crate::application::services::context::SyncContext;
use crate::domain::entities::{
    sanitize_for_wire, CachedRecord, EngineStatus, PullReport, PushReport, QueueEntry,
    StorageStats, SyncEvent, SyncReport, TablePull,
};
use crate::domain::value_objects::{EntityTable, Operation};
use crate::shared::error::AppError;
use crate::shared::subscription::{Listeners, Subscription};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Bidirectional sync orchestrator: replays the pending queue against the
/// backend (push), then refreshes the tracked tables from it (pull).
/// `sync()` never returns an error — every outcome, including "already
/// syncing", is a structured report — and at most one sync runs at a time
/// process-wide.
pub struct SyncEngine {
    ctx: Arc<SyncContext>,
    in_flight: Arc<AtomicBool>,
    listeners: Listeners<SyncEvent>,
    auto_task: Mutex<Option<JoinHandle<()>>>,
    conn_watch: Mutex<Option<Subscription>>,
}

impl SyncEngine {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self {
            ctx,
            in_flight: Arc::new(AtomicBool::new(false)),
            listeners: Listeners::new(),
            auto_task: Mutex::new(None),
            conn_watch: Mutex::new(None),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn on_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Composite push-then-pull. Overlapping invocations collapse: callers
    /// arriving while a sync is in flight get an immediate "already
    /// syncing" report without touching the network.
    pub async fn sync(&self) -> SyncReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("sync already in progress, skipping");
            return SyncReport::already_syncing();
        }
        let _guard = InFlightGuard(&self.in_flight);

        if !self.ctx.monitor.is_online() {
            tracing::debug!("offline, cannot sync");
            return SyncReport::offline();
        }

        self.listeners.emit(&SyncEvent::Started);
        tracing::info!("sync started");

        match self.run_cycle().await {
            Ok(report) => {
                tracing::info!(
                    processed = report.push.map(|p| p.processed),
                    failed = report.push.map(|p| p.failed),
                    "sync completed"
                );
                self.listeners.emit(&SyncEvent::Completed(report.clone()));
                report
            }
            Err(err) => {
                tracing::error!(error = %err, "sync failed");
                self.listeners.emit(&SyncEvent::Failed(err.to_string()));
                SyncReport::failed(err.to_string())
            }
        }
    }

    async fn run_cycle(&self) -> Result<SyncReport, AppError> {
        // Local changes go out before fresh data comes in, so the pull
        // cannot overwrite a record whose mutation is still queued.
        let push = self.push().await?;
        let pull = self.pull().await?;
        Ok(SyncReport::completed(push, pull))
    }

    /// Replays pending queue entries strictly in sequence order. A failing
    /// entry is recorded and skipped, not fatal to the rest of the drain;
    /// local storage errors do abort and propagate.
    pub async fn push(&self) -> Result<PushReport, AppError> {
        let pending = self.ctx.queue.list_pending().await?;
        if pending.is_empty() {
            return Ok(PushReport::default());
        }
        tracing::info!(count = pending.len(), "processing pending operations");

        let mut report = PushReport::default();
        for entry in &pending {
            match self.process_entry(entry).await {
                Ok(()) => {
                    self.ctx.queue.mark_completed(entry.id).await?;
                    report.processed += 1;
                    tracing::debug!(
                        entry = entry.id,
                        table = %entry.table,
                        operation = %entry.operation,
                        "queue entry completed"
                    );
                }
                // Storage failures are not entry-specific; stop and report.
                Err(err @ AppError::Database(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(entry = entry.id, error = %err, "queue entry failed");
                    self.ctx.queue.mark_failed(entry.id, &err.to_string()).await?;
                    report.failed += 1;
                }
            }
        }

        let purged = self
            .ctx
            .queue
            .purge_completed_older_than(self.ctx.config.completed_retention)
            .await?;
        if purged > 0 {
            tracing::debug!(purged, "purged completed queue entries");
        }
        Ok(report)
    }

    async fn process_entry(&self, entry: &QueueEntry) -> Result<(), AppError> {
        match entry.operation {
            Operation::Create => {
                let payload = require_payload(entry)?;
                let is_temp = entry.record_id.is_temporary();
                // A temporary id must not reach the backend; dropping it
                // lets the server assign the real one.
                let clean = sanitize_for_wire(payload, is_temp);
                let created = self.ctx.backend.insert(entry.table, clean).await?;
                // A storage failure past this point leaves the entry
                // pending, so the next push inserts the row a second time;
                // the server does not deduplicate.
                if is_temp {
                    let record =
                        CachedRecord::from_value(created).map_err(AppError::InvalidInput)?;
                    self.ctx
                        .store
                        .delete(entry.table, entry.record_id.as_str())
                        .await?;
                    self.ctx.store.put(entry.table, record).await?;
                }
                Ok(())
            }
            Operation::Update => {
                let payload = require_payload(entry)?;
                let clean = sanitize_for_wire(payload, true);
                let updated = self
                    .ctx
                    .backend
                    .update(entry.table, entry.record_id.as_str(), clean)
                    .await?;
                // Server is authoritative after a write.
                let record = CachedRecord::from_value(updated).map_err(AppError::InvalidInput)?;
                self.ctx.store.put(entry.table, record).await?;
                Ok(())
            }
            Operation::Delete => {
                // Local deletion happened at enqueue time.
                self.ctx
                    .backend
                    .delete(entry.table, entry.record_id.as_str())
                    .await
            }
        }
    }

    /// Full-replace refresh of every tracked table. Backend failures are
    /// isolated per table; tables already pulled stay applied.
    pub async fn pull(&self) -> Result<PullReport, AppError> {
        let mut report = PullReport::default();
        for &table in &self.ctx.config.tracked_tables {
            match self.pull_table(table).await {
                Ok(count) => {
                    tracing::info!(table = %table, count, "pulled table");
                    report.record(table, TablePull::ok(count));
                }
                Err(err) if err.is_network() => {
                    tracing::warn!(table = %table, error = %err, "pull failed for table");
                    report.record(table, TablePull::failed(err.to_string()));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    async fn pull_table(&self, table: EntityTable) -> Result<usize, AppError> {
        let rows = self.ctx.backend.select_all(table).await?;
        let records = rows
            .into_iter()
            .map(CachedRecord::from_value)
            .collect::<Result<Vec<_>, String>>()
            .map_err(AppError::InvalidInput)?;
        let count = records.len();
        self.ctx.store.put_many(table, records).await?;
        self.ctx.meta.record_sync_time(table, Utc::now()).await?;
        Ok(count)
    }

    /// Starts the recurring sync task: one delayed initial sync, then one
    /// run per configured interval whenever currently online.
    pub fn start_auto_sync(self: &Arc<Self>) {
        let mut task = self.auto_task.lock().expect("auto_task poisoned");
        if task.is_some() {
            return;
        }
        let engine = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            tokio::time::sleep(engine.ctx.config.initial_sync_delay).await;
            if engine.ctx.monitor.is_online() {
                engine.sync().await;
            }
            let mut interval = tokio::time::interval(engine.ctx.config.sync_interval);
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                if engine.ctx.monitor.is_online() {
                    engine.sync().await;
                }
            }
        }));
        tracing::info!(
            interval_secs = self.ctx.config.sync_interval.as_secs(),
            "auto-sync started"
        );
    }

    pub fn stop_auto_sync(&self) {
        if let Some(handle) = self.auto_task.lock().expect("auto_task poisoned").take() {
            handle.abort();
            tracing::info!("auto-sync stopped");
        }
    }

    pub fn auto_sync_active(&self) -> bool {
        self.auto_task.lock().expect("auto_task poisoned").is_some()
    }

    /// Subscribes to the connectivity monitor: an offline→online transition
    /// schedules a sync after a short grace period instead of firing into a
    /// network that is still settling. Must be called from within the tokio
    /// runtime.
    pub fn watch_connectivity(self: &Arc<Self>) {
        let mut slot = self.conn_watch.lock().expect("conn_watch poisoned");
        if slot.is_some() {
            return;
        }
        let engine = Arc::clone(self);
        let grace = self.ctx.config.reconnect_grace;
        let runtime = tokio::runtime::Handle::current();
        let subscription = self.ctx.monitor.on_status_change(move |online| {
            if !online {
                return;
            }
            tracing::info!("connection restored, scheduling sync");
            let engine = Arc::clone(&engine);
            runtime.spawn(async move {
                tokio::time::sleep(grace).await;
                engine.sync().await;
            });
        });
        *slot = Some(subscription);
    }

    pub fn unwatch_connectivity(&self) {
        if let Some(sub) = self.conn_watch.lock().expect("conn_watch poisoned").take() {
            sub.unsubscribe();
        }
    }

    pub async fn status(&self) -> Result<EngineStatus, AppError> {
        let pending_operations = self.ctx.queue.count_pending().await?;
        let mut last_sync = BTreeMap::new();
        for &table in &self.ctx.config.tracked_tables {
            last_sync.insert(table, self.ctx.meta.last_sync_time(table).await?);
        }
        Ok(EngineStatus {
            is_syncing: self.is_syncing(),
            pending_operations,
            last_sync,
            auto_sync_active: self.auto_sync_active(),
        })
    }

    pub async fn storage_stats(&self) -> Result<StorageStats, AppError> {
        let mut records = BTreeMap::new();
        for table in EntityTable::ALL {
            records.insert(table, self.ctx.store.count(table).await?);
        }
        Ok(StorageStats {
            records,
            pending_sync: self.ctx.queue.count_pending().await?,
        })
    }
}

fn require_payload(entry: &QueueEntry) -> Result<&serde_json::Value, AppError> {
    entry.payload.as_ref().ok_or_else(|| {
        AppError::InvalidInput(format!(
            "{} entry {} has no payload",
            entry.operation, entry.id
        ))
    })
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
