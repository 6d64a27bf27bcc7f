use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_ID: &str = "id";
/// Stamped on every local write; never sent to the backend.
pub const FIELD_LOCAL_UPDATED_AT: &str = "_localUpdatedAt";
/// Present while the local copy diverges from the server.
pub const FIELD_IS_OFFLINE: &str = "_isOffline";

/// One cached domain record (member, payment, class, booking, access log).
/// Domain fields are opaque to the sync core; only the primary key and the
/// two local bookkeeping fields are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CachedRecord(Map<String, Value>);

impl CachedRecord {
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(format!("Record must be a JSON object, got {other}")),
        }
    }

    pub fn from_object(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(FIELD_ID).and_then(Value::as_str)
    }

    pub fn record_id(&self) -> Result<RecordId, String> {
        let id = self
            .id()
            .ok_or_else(|| "Record is missing an id".to_string())?;
        RecordId::new(id.to_string())
    }

    pub fn set_id(&mut self, id: &RecordId) {
        self.0
            .insert(FIELD_ID.to_string(), Value::String(id.to_string()));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.0.insert(field.to_string(), value);
    }

    /// Stamps the local-write timestamp.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.0.insert(
            FIELD_LOCAL_UPDATED_AT.to_string(),
            Value::String(at.to_rfc3339()),
        );
    }

    pub fn local_updated_at(&self) -> Option<&str> {
        self.0.get(FIELD_LOCAL_UPDATED_AT).and_then(Value::as_str)
    }

    pub fn mark_offline(&mut self) {
        self.0.insert(FIELD_IS_OFFLINE.to_string(), Value::Bool(true));
    }

    pub fn is_offline(&self) -> bool {
        self.0
            .get(FIELD_IS_OFFLINE)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Overlays `patch` onto this record, field by field. Last write wins;
    /// no deep merge.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Copy of the record without local bookkeeping fields, suitable for
    /// comparing against or sending to the backend.
    pub fn to_wire(&self) -> Value {
        sanitize_for_wire(&Value::Object(self.0.clone()), false)
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Strips `_localUpdatedAt` / `_isOffline` (and optionally `id`) from a
/// queued payload before it goes over the wire. Non-object payloads pass
/// through untouched.
pub fn sanitize_for_wire(payload: &Value, strip_id: bool) -> Value {
    match payload {
        Value::Object(map) => {
            let mut clean = map.clone();
            clean.remove(FIELD_LOCAL_UPDATED_AT);
            clean.remove(FIELD_IS_OFFLINE);
            if strip_id {
                clean.remove(FIELD_ID);
            }
            Value::Object(clean)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bookkeeping_fields_round_trip() {
        let mut record =
            CachedRecord::from_value(json!({"id": "m1", "full_name": "Ana Gomez"})).unwrap();
        assert!(!record.is_offline());

        record.touch(Utc::now());
        record.mark_offline();
        assert!(record.is_offline());
        assert!(record.local_updated_at().is_some());

        let wire = record.to_wire();
        assert_eq!(wire, json!({"id": "m1", "full_name": "Ana Gomez"}));
    }

    #[test]
    fn sanitize_can_drop_the_id_for_creates() {
        let payload = json!({
            "id": "temp_1700000000000_abc123xyz",
            "full_name": "Ana Gomez",
            "_localUpdatedAt": "2026-01-01T00:00:00Z",
            "_isOffline": true
        });
        let clean = sanitize_for_wire(&payload, true);
        assert_eq!(clean, json!({"full_name": "Ana Gomez"}));
    }

    #[test]
    fn patch_overlays_fields() {
        let mut record =
            CachedRecord::from_value(json!({"id": "m1", "status": "active", "dni": "123"}))
                .unwrap();
        let patch = json!({"status": "inactive"});
        record.apply_patch(patch.as_object().unwrap());
        assert_eq!(record.get("status"), Some(&json!("inactive")));
        assert_eq!(record.get("dni"), Some(&json!("123")));
    }

    #[test]
    fn rejects_non_object_records() {
        assert!(CachedRecord::from_value(json!(["not", "a", "record"])).is_err());
    }
}
