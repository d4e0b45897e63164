use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "occupancy_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    Vacant,
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "property_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Standard,
    MultiUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Full,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entry_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Landlord {
    pub id: i64,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Property {
    pub id: i64,
    pub title: String,
    pub kind: PropertyKind,
    pub location: String,
    pub landlord_id: i64,
    /// Only present for standard properties; multi-unit containers price
    /// their child units instead.
    pub price: Option<f64>,
    pub status: OccupancyStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Unit {
    pub id: i64,
    pub property_id: i64,
    pub name: String,
    pub price: f64,
    pub status: OccupancyStatus,
    pub tenant_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: i64,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub property_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub lease_start_date: Option<NaiveDate>,
    pub lease_end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_assigned(&self) -> bool {
        self.property_id.is_some() || self.unit_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub tenant_id: i64,
    pub property_id: i64,
    pub unit_id: Option<i64>,
    pub amount: f64,
    pub payment_type: PaymentType,
    pub payment_method: String,
    pub payment_date: NaiveDate,
    pub balance_due: f64,
    pub credit: f64,
    pub debit: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One immutable credit or debit attributed to a landlord, outside the
/// payment table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub landlord_id: i64,
    pub entry_date: NaiveDate,
    pub narration: String,
    pub entry_type: EntryType,
    pub amount: f64,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}
