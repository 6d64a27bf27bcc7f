use crate::application::ports::{ConnectivityProbe, RemoteBackend};
use crate::shared::error::AppError;
use crate::domain::value_objects::EntityTable;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory stand-in for the hosted backend. Rows live in per-table maps,
/// ids are minted as UUIDs, and failures can be injected globally or per
/// record id.
pub struct MockBackend {
    tables: Mutex<HashMap<EntityTable, BTreeMap<String, Value>>>,
    fail_all: AtomicBool,
    fail_ids: Mutex<HashSet<String>>,
    pub network_calls: AtomicU32,
    latency: Mutex<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            fail_all: AtomicBool::new(false),
            fail_ids: Mutex::new(HashSet::new()),
            network_calls: AtomicU32::new(0),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    pub fn seed(&self, table: EntityTable, rows: Vec<Value>) {
        let mut tables = self.tables.lock().unwrap();
        let entries = tables.entry(table).or_default();
        for row in rows {
            let id = row["id"].as_str().expect("seed row needs an id").to_string();
            entries.insert(id, row);
        }
    }

    pub fn rows(&self, table: EntityTable) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(&table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.fail_all.store(unreachable, Ordering::SeqCst);
    }

    /// Any insert/update/delete touching this id fails with a network error.
    pub fn fail_record(&self, id: &str) {
        self.fail_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_all.store(false, Ordering::SeqCst);
        self.fail_ids.lock().unwrap().clear();
    }

    /// Artificial delay per call, for overlap tests.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> u32 {
        self.network_calls.load(Ordering::SeqCst)
    }

    async fn gate(&self, id: Option<&str>) -> Result<(), AppError> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(AppError::Network("backend unreachable".to_string()));
        }
        if let Some(id) = id {
            if self.fail_ids.lock().unwrap().contains(id) {
                return Err(AppError::Network(format!("injected failure for {id}")));
            }
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteBackend for MockBackend {
    async fn select_all(&self, table: EntityTable) -> Result<Vec<Value>, AppError> {
        self.gate(None).await?;
        Ok(self.rows(table))
    }

    async fn select_by_id(
        &self,
        table: EntityTable,
        id: &str,
    ) -> Result<Option<Value>, AppError> {
        self.gate(Some(id)).await?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(&table)
            .and_then(|rows| rows.get(id))
            .cloned())
    }

    async fn insert(&self, table: EntityTable, record: Value) -> Result<Value, AppError> {
        let probe_id = record["id"].as_str().map(str::to_string);
        self.gate(probe_id.as_deref()).await?;
        let mut row = record;
        let id = match row["id"].as_str() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                row["id"] = Value::String(id.clone());
                id
            }
        };
        self.tables
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .insert(id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: EntityTable,
        id: &str,
        patch: Value,
    ) -> Result<Value, AppError> {
        self.gate(Some(id)).await?;
        let mut tables = self.tables.lock().unwrap();
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.get_mut(id))
            .ok_or_else(|| AppError::Network(format!("no row {id} in {table}")))?;
        if let (Value::Object(target), Value::Object(fields)) = (&mut *row, &patch) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: EntityTable, id: &str) -> Result<(), AppError> {
        self.gate(Some(id)).await?;
        if let Some(rows) = self.tables.lock().unwrap().get_mut(&table) {
            rows.remove(id);
        }
        Ok(())
    }
}

/// Probe backed by a plain flag, standing in for the platform signal.
pub struct FlagProbe(pub AtomicBool);

impl FlagProbe {
    pub fn online() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn offline() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn set(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for FlagProbe {
    async fn is_reachable(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
