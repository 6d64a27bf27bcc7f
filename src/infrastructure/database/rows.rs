use crate::domain::entities::QueueEntry;
use crate::domain::value_objects::{EntityTable, Operation, QueueStatus, RecordId};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct QueueEntryRow {
    pub id: i64,
    pub table_name: String,
    pub operation: String,
    pub payload: Option<String>,
    pub record_id: String,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl TryFrom<QueueEntryRow> for QueueEntry {
    type Error = AppError;

    fn try_from(row: QueueEntryRow) -> Result<Self, Self::Error> {
        let payload = row
            .payload
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(QueueEntry {
            id: row.id,
            table: EntityTable::parse(&row.table_name).map_err(AppError::Database)?,
            operation: Operation::parse(&row.operation).map_err(AppError::Database)?,
            payload,
            record_id: RecordId::new(row.record_id).map_err(AppError::Database)?,
            status: QueueStatus::parse(&row.status).map_err(AppError::Database)?,
            attempts: row.attempts as u32,
            last_error: row.last_error,
            created_at: parse_timestamp(&row.created_at)?,
            completed_at: row
                .completed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Bad timestamp '{value}': {e}")))
}
