use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use veltronik_sync::application::services::test_support::{FlagProbe, MockBackend};
use veltronik_sync::{
    ConnectionMonitor, ConnectionPool, ConnectivityProbe, EntityRepository, EntityTable,
    LocalStore, MetaStore, RemoteBackend, SqliteOfflineStore, SyncConfig, SyncContext,
    SyncEngine, SyncQueue,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veltronik_sync=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

struct Harness {
    ctx: Arc<SyncContext>,
    backend: Arc<MockBackend>,
    store: Arc<SqliteOfflineStore>,
    monitor: Arc<ConnectionMonitor>,
}

async fn harness_with_pool(pool: &ConnectionPool, online: bool) -> Harness {
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
    Harness {
        ctx,
        backend,
        store,
        monitor,
    }
}

async fn harness(online: bool) -> Harness {
    let pool = ConnectionPool::from_memory().await.unwrap();
    pool.migrate().await.unwrap();
    harness_with_pool(&pool, online).await
}

/// A receptionist registers a member while the gym's connection is down,
/// keeps working against the local copy, and the record reaches the server
/// untouched once the connection returns.
#[tokio::test]
async fn offline_registration_reaches_the_server_after_reconnect() {
    init_tracing();
    let hx = harness(false).await;
    let members = EntityRepository::members(Arc::clone(&hx.ctx));

    let created = members
        .create(json!({
            "full_name": "Ana Gomez",
            "dni": "48291736",
            "gym_id": "g1",
            "status": "active"
        }))
        .await
        .unwrap();
    let temp_id = created.id().unwrap().to_string();
    assert!(temp_id.starts_with("temp_"));
    assert!(created.is_offline());

    // Fully usable from the cache while still offline.
    let fetched = members.get_by_id(&temp_id).await.unwrap().unwrap();
    assert_eq!(fetched.get("full_name"), Some(&json!("Ana Gomez")));
    assert_eq!(members.get_by_index("dni", "48291736").await.unwrap().len(), 1);
    assert_eq!(hx.store.count_pending().await.unwrap(), 1);
    assert_eq!(hx.backend.calls(), 0);

    hx.monitor.signal_online();
    let engine = SyncEngine::new(Arc::clone(&hx.ctx));
    let report = engine.sync().await;
    assert!(report.success);
    let push = report.push.unwrap();
    assert_eq!(push.processed, 1);
    assert_eq!(push.failed, 0);

    // The server minted the real id and received no bookkeeping fields.
    let rows = hx.backend.rows(EntityTable::Members);
    assert_eq!(rows.len(), 1);
    let server_id = rows[0]["id"].as_str().unwrap().to_string();
    assert!(!server_id.starts_with("temp_"));
    assert_eq!(rows[0]["full_name"], json!("Ana Gomez"));
    assert!(rows[0].get("_isOffline").is_none());
    assert!(rows[0].get("_localUpdatedAt").is_none());

    // Locally the temporary record was replaced by the server's copy.
    assert!(members.get_by_id(&temp_id).await.unwrap().is_none());
    let synced = hx
        .store
        .get(EntityTable::Members, &server_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!synced.is_offline());
    assert_eq!(hx.store.count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn edits_made_before_reconnect_ride_along_with_the_create() {
    init_tracing();
    let hx = harness(false).await;
    let members = EntityRepository::members(Arc::clone(&hx.ctx));

    let created = members
        .create(json!({"full_name": "Ana Gomez", "gym_id": "g1", "status": "active"}))
        .await
        .unwrap();
    let temp_id = created.id().unwrap().to_string();
    members
        .update(&temp_id, json!({"status": "inactive"}))
        .await
        .unwrap();
    assert_eq!(hx.store.count_pending().await.unwrap(), 1);

    hx.monitor.signal_online();
    let engine = SyncEngine::new(Arc::clone(&hx.ctx));
    assert!(engine.sync().await.success);

    let rows = hx.backend.rows(EntityTable::Members);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], json!("inactive"));
}

#[tokio::test]
async fn queued_work_survives_a_process_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("offline.db").display());

    {
        let pool = ConnectionPool::new(&url).await.unwrap();
        pool.migrate().await.unwrap();
        let hx = harness_with_pool(&pool, false).await;
        let members = EntityRepository::members(Arc::clone(&hx.ctx));
        members
            .create(json!({"full_name": "Ana Gomez", "gym_id": "g1"}))
            .await
            .unwrap();
        assert_eq!(hx.store.count_pending().await.unwrap(), 1);
        pool.close().await;
    }

    // A fresh process opens the same file and finds the pending work.
    let pool = ConnectionPool::new(&url).await.unwrap();
    pool.migrate().await.unwrap();
    let hx = harness_with_pool(&pool, true).await;
    assert_eq!(hx.store.count_pending().await.unwrap(), 1);
    assert_eq!(hx.store.count(EntityTable::Members).await.unwrap(), 1);

    let engine = SyncEngine::new(Arc::clone(&hx.ctx));
    let report = engine.sync().await;
    assert!(report.success);
    assert_eq!(report.push.unwrap().processed, 1);
    assert_eq!(hx.backend.rows(EntityTable::Members).len(), 1);
    assert_eq!(hx.store.count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn reconnect_signal_triggers_a_sync_after_the_grace_period() {
    init_tracing();
    let pool = ConnectionPool::from_memory().await.unwrap();
    pool.migrate().await.unwrap();
    let mut hx = harness_with_pool(&pool, false).await;
    Arc::get_mut(&mut hx.ctx).unwrap().config.reconnect_grace = Duration::from_millis(50);

    let members = EntityRepository::members(Arc::clone(&hx.ctx));
    members
        .create(json!({"full_name": "Ana Gomez", "gym_id": "g1"}))
        .await
        .unwrap();

    let engine = Arc::new(SyncEngine::new(Arc::clone(&hx.ctx)));
    engine.watch_connectivity();

    hx.monitor.signal_online();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(hx.store.count_pending().await.unwrap(), 0);
    assert_eq!(hx.backend.rows(EntityTable::Members).len(), 1);
    engine.unwatch_connectivity();
}
