use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain tables mirrored into the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Members,
    MemberPayments,
    Classes,
    ClassBookings,
    AccessLogs,
}

impl EntityTable {
    pub const ALL: [EntityTable; 5] = [
        EntityTable::Members,
        EntityTable::MemberPayments,
        EntityTable::Classes,
        EntityTable::ClassBookings,
        EntityTable::AccessLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityTable::Members => "members",
            EntityTable::MemberPayments => "member_payments",
            EntityTable::Classes => "classes",
            EntityTable::ClassBookings => "class_bookings",
            EntityTable::AccessLogs => "access_logs",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "members" => Ok(EntityTable::Members),
            "member_payments" => Ok(EntityTable::MemberPayments),
            "classes" => Ok(EntityTable::Classes),
            "class_bookings" => Ok(EntityTable::ClassBookings),
            "access_logs" => Ok(EntityTable::AccessLogs),
            other => Err(format!("Unknown table: {other}")),
        }
    }

    /// Secondary index fields available for `get_by_index` lookups. Lookups
    /// against any other field are rejected, which also keeps the field name
    /// out of reach of SQL interpolation.
    pub fn indexes(&self) -> &'static [&'static str] {
        match self {
            EntityTable::Members => &["gym_id", "dni", "status", "updated_at"],
            EntityTable::MemberPayments => &["gym_id", "member_id", "payment_date"],
            EntityTable::Classes => &["gym_id", "day_of_week"],
            EntityTable::ClassBookings => &["gym_id", "class_id", "booking_date"],
            EntityTable::AccessLogs => &["gym_id", "member_id", "check_in_at"],
        }
    }
}

impl fmt::Display for EntityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_table() {
        for table in EntityTable::ALL {
            assert_eq!(EntityTable::parse(table.as_str()).unwrap(), table);
        }
        assert!(EntityTable::parse("invoices").is_err());
    }

    #[test]
    fn every_table_is_indexed_by_tenant() {
        for table in EntityTable::ALL {
            assert!(table.indexes().contains(&"gym_id"));
        }
    }
}
