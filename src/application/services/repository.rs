use crate::application::services::context::SyncContext;
use crate::domain::entities::{sanitize_for_wire, CachedRecord, QueueEntryDraft};
use crate::domain::value_objects::{EntityTable, RecordId};
use crate::shared::error::{AppError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Connectivity-aware facade over one cached table. Online, calls hit the
/// backend and the result is mirrored into the local cache; offline, writes
/// land locally and a queue entry records the pending mutation. Write
/// failures while online propagate to the caller — there is no silent
/// offline fallback on a failed online write.
pub struct EntityRepository {
    ctx: Arc<SyncContext>,
    table: EntityTable,
}

impl EntityRepository {
    pub fn new(ctx: Arc<SyncContext>, table: EntityTable) -> Self {
        Self { ctx, table }
    }

    pub fn members(ctx: Arc<SyncContext>) -> Self {
        Self::new(ctx, EntityTable::Members)
    }

    pub fn payments(ctx: Arc<SyncContext>) -> Self {
        Self::new(ctx, EntityTable::MemberPayments)
    }

    pub fn classes(ctx: Arc<SyncContext>) -> Self {
        Self::new(ctx, EntityTable::Classes)
    }

    pub fn bookings(ctx: Arc<SyncContext>) -> Self {
        Self::new(ctx, EntityTable::ClassBookings)
    }

    pub fn access_logs(ctx: Arc<SyncContext>) -> Self {
        Self::new(ctx, EntityTable::AccessLogs)
    }

    pub fn table(&self) -> EntityTable {
        self.table
    }

    pub async fn get_all(&self) -> Result<Vec<CachedRecord>> {
        if self.ctx.monitor.is_online() {
            match self.ctx.backend.select_all(self.table).await {
                Ok(rows) => {
                    let records = records_from_rows(rows)?;
                    self.ctx
                        .store
                        .put_many(self.table, records.clone())
                        .await?;
                    return Ok(records);
                }
                Err(err) if err.is_network() => {
                    tracing::warn!(table = %self.table, error = %err, "read fell back to cache");
                }
                Err(err) => return Err(err),
            }
        }
        self.ctx.store.get_all(self.table).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<CachedRecord>> {
        let record_id = RecordId::new(id.to_string()).map_err(AppError::InvalidInput)?;
        // Temporary ids exist only locally until their create is pushed.
        if record_id.is_temporary() || !self.ctx.monitor.is_online() {
            return self.ctx.store.get(self.table, id).await;
        }
        match self.ctx.backend.select_by_id(self.table, id).await {
            Ok(Some(row)) => {
                let record = record_from_row(row)?;
                self.ctx.store.put(self.table, record.clone()).await?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(err) if err.is_network() => {
                tracing::warn!(table = %self.table, error = %err, "read fell back to cache");
                self.ctx.store.get(self.table, id).await
            }
            Err(err) => Err(err),
        }
    }

    /// Secondary-index lookup. Always served from the cache, which is the
    /// indexed surface.
    pub async fn get_by_index(&self, index: &str, value: &str) -> Result<Vec<CachedRecord>> {
        self.ctx.store.get_by_index(self.table, index, value).await
    }

    pub async fn create(&self, record: Value) -> Result<CachedRecord> {
        let mut record = CachedRecord::from_value(record).map_err(AppError::InvalidInput)?;

        if self.ctx.monitor.is_online() {
            let created = self
                .ctx
                .backend
                .insert(self.table, sanitize_for_wire(&record.clone().into_value(), false))
                .await?;
            let created = record_from_row(created)?;
            self.ctx.store.put(self.table, created.clone()).await?;
            return Ok(created);
        }

        let temp_id = RecordId::temporary();
        record.set_id(&temp_id);
        record.mark_offline();
        record.touch(chrono::Utc::now());
        self.ctx.store.put(self.table, record.clone()).await?;
        self.ctx
            .queue
            .enqueue(QueueEntryDraft::create(
                self.table,
                record.clone().into_value(),
                temp_id.clone(),
            ))
            .await?;
        tracing::debug!(table = %self.table, id = %temp_id, "queued offline create");
        Ok(record)
    }

    pub async fn update(&self, id: &str, patch: Value) -> Result<CachedRecord> {
        let patch = patch_object(patch)?;
        let record_id = RecordId::new(id.to_string()).map_err(AppError::InvalidInput)?;

        if self.ctx.monitor.is_online() && !record_id.is_temporary() {
            let updated = self
                .ctx
                .backend
                .update(self.table, id, Value::Object(patch))
                .await?;
            let updated = record_from_row(updated)?;
            self.ctx.store.put(self.table, updated.clone()).await?;
            return Ok(updated);
        }

        let mut current = self
            .ctx
            .store
            .get(self.table, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{}: {id}", self.table)))?;
        current.apply_patch(&patch);
        current.mark_offline();
        self.ctx.store.put(self.table, current.clone()).await?;

        if record_id.is_temporary() {
            // The record has not reached the server yet; fold the change
            // into its pending create so one net operation leaves the
            // device.
            let merged = self
                .ctx
                .queue
                .merge_into_pending_create(self.table, &record_id, &patch)
                .await?;
            if merged {
                return Ok(current);
            }
        }
        self.ctx
            .queue
            .enqueue(QueueEntryDraft::update(
                self.table,
                Value::Object(patch),
                record_id,
            ))
            .await?;
        Ok(current)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let record_id = RecordId::new(id.to_string()).map_err(AppError::InvalidInput)?;

        if self.ctx.monitor.is_online() && !record_id.is_temporary() {
            self.ctx.backend.delete(self.table, id).await?;
            self.ctx.store.delete(self.table, id).await?;
            return Ok(());
        }

        self.ctx.store.delete(self.table, id).await?;
        if record_id.is_temporary() {
            // Never reached the server: dropping its pending entries is the
            // whole delete.
            let dropped = self
                .ctx
                .queue
                .discard_pending_for_record(self.table, &record_id)
                .await?;
            tracing::debug!(table = %self.table, id, dropped, "discarded queue entries for unsynced record");
        } else {
            self.ctx
                .queue
                .enqueue(QueueEntryDraft::delete(self.table, record_id))
                .await?;
        }
        Ok(())
    }
}

fn patch_object(patch: Value) -> Result<Map<String, Value>> {
    match patch {
        Value::Object(map) => Ok(map),
        other => Err(AppError::InvalidInput(format!(
            "Update patch must be a JSON object, got {other}"
        ))),
    }
}

fn record_from_row(row: Value) -> Result<CachedRecord> {
    CachedRecord::from_value(row).map_err(AppError::InvalidInput)
}

fn records_from_rows(rows: Vec<Value>) -> Result<Vec<CachedRecord>> {
    rows.into_iter().map(record_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ConnectivityProbe, LocalStore, MetaStore, RemoteBackend, SyncQueue,
    };
    use crate::application::services::connection_monitor::ConnectionMonitor;
    use crate::application::services::test_support::{FlagProbe, MockBackend};
    use crate::domain::value_objects::Operation;
    use crate::infrastructure::database::{ConnectionPool, SqliteOfflineStore};
    use crate::shared::config::SyncConfig;
    use serde_json::json;

    struct Fixture {
        ctx: Arc<SyncContext>,
        backend: Arc<MockBackend>,
        store: Arc<SqliteOfflineStore>,
        monitor: Arc<ConnectionMonitor>,
    }

    async fn fixture(online: bool) -> Fixture {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        let config = SyncConfig::default();
        let store = Arc::new(SqliteOfflineStore::from_config(
            pool.get_pool().clone(),
            &config,
        ));
        let backend = Arc::new(MockBackend::new());
        let monitor = Arc::new(ConnectionMonitor::new(
            Arc::new(FlagProbe::online()) as Arc<dyn ConnectivityProbe>,
            config.connectivity_interval,
        ));
        if online {
            monitor.signal_online();
        }
        let ctx = Arc::new(SyncContext::new(
            Arc::clone(&store) as Arc<dyn LocalStore>,
            Arc::clone(&store) as Arc<dyn SyncQueue>,
            Arc::clone(&store) as Arc<dyn MetaStore>,
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            Arc::clone(&monitor),
            config,
        ));
        Fixture {
            ctx,
            backend,
            store,
            monitor,
        }
    }

    #[tokio::test]
    async fn offline_create_is_immediately_readable() {
        let fx = fixture(false).await;
        let members = EntityRepository::members(Arc::clone(&fx.ctx));

        let created = members
            .create(json!({"full_name": "Ana Gomez", "gym_id": "g1", "status": "active"}))
            .await
            .unwrap();
        let id = created.id().unwrap().to_string();
        assert!(id.starts_with("temp_"));
        assert!(created.is_offline());
        assert!(created.local_updated_at().is_some());

        let fetched = members.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(fetched.get("full_name"), Some(&json!("Ana Gomez")));
        assert_eq!(members.get_all().await.unwrap().len(), 1);
        assert_eq!(
            members.get_by_index("gym_id", "g1").await.unwrap().len(),
            1
        );

        let pending = fx.store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, Operation::Create);
        assert_eq!(fx.backend.calls(), 0);
    }

    #[tokio::test]
    async fn offline_update_folds_into_the_pending_create() {
        let fx = fixture(false).await;
        let members = EntityRepository::members(Arc::clone(&fx.ctx));
        let created = members
            .create(json!({"full_name": "Ana Gomez", "status": "active"}))
            .await
            .unwrap();
        let id = created.id().unwrap().to_string();

        let updated = members
            .update(&id, json!({"status": "inactive"}))
            .await
            .unwrap();
        assert_eq!(updated.get("status"), Some(&json!("inactive")));

        // Still a single create; the patch rode along with it.
        let pending = fx.store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, Operation::Create);
        assert_eq!(
            pending[0].payload.as_ref().unwrap()["status"],
            json!("inactive")
        );
    }

    #[tokio::test]
    async fn offline_update_of_a_synced_record_enqueues_an_update() {
        let fx = fixture(false).await;
        fx.store
            .put(
                EntityTable::Members,
                CachedRecord::from_value(json!({"id": "m1", "status": "active"})).unwrap(),
            )
            .await
            .unwrap();
        let members = EntityRepository::members(Arc::clone(&fx.ctx));

        let updated = members
            .update("m1", json!({"status": "inactive"}))
            .await
            .unwrap();
        assert!(updated.is_offline());

        let pending = fx.store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, Operation::Update);
        assert_eq!(pending[0].record_id.as_str(), "m1");
    }

    #[tokio::test]
    async fn offline_update_of_a_missing_record_is_not_found() {
        let fx = fixture(false).await;
        let members = EntityRepository::members(Arc::clone(&fx.ctx));
        let result = members.update("ghost", json!({"status": "x"})).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_an_unsynced_record_leaves_no_trace() {
        let fx = fixture(false).await;
        let members = EntityRepository::members(Arc::clone(&fx.ctx));
        let created = members.create(json!({"full_name": "Ana"})).await.unwrap();
        let id = created.id().unwrap().to_string();
        members.update(&id, json!({"status": "active"})).await.unwrap();

        members.delete(&id).await.unwrap();
        assert!(members.get_by_id(&id).await.unwrap().is_none());
        assert_eq!(fx.store.count_pending().await.unwrap(), 0);
        assert_eq!(fx.backend.calls(), 0);
    }

    #[tokio::test]
    async fn offline_delete_of_a_synced_record_is_queued() {
        let fx = fixture(false).await;
        fx.store
            .put(
                EntityTable::Members,
                CachedRecord::from_value(json!({"id": "m1"})).unwrap(),
            )
            .await
            .unwrap();
        let members = EntityRepository::members(Arc::clone(&fx.ctx));

        members.delete("m1").await.unwrap();
        assert!(members.get_by_id("m1").await.unwrap().is_none());
        let pending = fx.store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, Operation::Delete);
    }

    #[tokio::test]
    async fn online_create_mirrors_the_server_row() {
        let fx = fixture(true).await;
        let members = EntityRepository::members(Arc::clone(&fx.ctx));

        let created = members
            .create(json!({"full_name": "Ana Gomez", "gym_id": "g1"}))
            .await
            .unwrap();
        let id = created.id().unwrap();
        assert!(!id.starts_with("temp_"));
        assert!(!created.is_offline());

        let cached = fx
            .store
            .get(EntityTable::Members, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.get("full_name"), Some(&json!("Ana Gomez")));
        assert_eq!(fx.store.count_pending().await.unwrap(), 0);
        assert_eq!(fx.backend.rows(EntityTable::Members).len(), 1);
    }

    #[tokio::test]
    async fn online_reads_refresh_the_cache() {
        let fx = fixture(true).await;
        fx.backend.seed(
            EntityTable::Members,
            vec![json!({"id": "m1", "full_name": "Ana", "gym_id": "g1"})],
        );
        let members = EntityRepository::members(Arc::clone(&fx.ctx));

        let all = members.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(fx.store.count(EntityTable::Members).await.unwrap(), 1);

        let one = members.get_by_id("m1").await.unwrap().unwrap();
        assert_eq!(one.get("full_name"), Some(&json!("Ana")));
    }

    #[tokio::test]
    async fn network_failure_on_read_falls_back_to_the_cache() {
        let fx = fixture(true).await;
        fx.store
            .put(
                EntityTable::Members,
                CachedRecord::from_value(json!({"id": "m1", "full_name": "Ana"})).unwrap(),
            )
            .await
            .unwrap();
        fx.backend.set_unreachable(true);
        let members = EntityRepository::members(Arc::clone(&fx.ctx));

        let all = members.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        let one = members.get_by_id("m1").await.unwrap().unwrap();
        assert_eq!(one.get("full_name"), Some(&json!("Ana")));
    }

    #[tokio::test]
    async fn network_failure_on_write_propagates() {
        let fx = fixture(true).await;
        fx.backend.set_unreachable(true);
        let members = EntityRepository::members(Arc::clone(&fx.ctx));

        let result = members.create(json!({"full_name": "Ana"})).await;
        assert!(matches!(result, Err(AppError::Network(_))));
        assert_eq!(fx.store.count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn indexed_lookups_never_touch_the_network() {
        let fx = fixture(true).await;
        fx.store
            .put(
                EntityTable::Members,
                CachedRecord::from_value(json!({"id": "m1", "gym_id": "g1"})).unwrap(),
            )
            .await
            .unwrap();
        let members = EntityRepository::members(Arc::clone(&fx.ctx));

        let hits = members.get_by_index("gym_id", "g1").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(fx.backend.calls(), 0);
    }

    #[tokio::test]
    async fn temporary_ids_are_read_locally_even_while_online() {
        let fx = fixture(false).await;
        let members = EntityRepository::members(Arc::clone(&fx.ctx));
        let created = members.create(json!({"full_name": "Ana"})).await.unwrap();
        let id = created.id().unwrap().to_string();

        fx.monitor.signal_online();
        let fetched = members.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(fetched.get("full_name"), Some(&json!("Ana")));
        assert_eq!(fx.backend.calls(), 0);
    }
}
