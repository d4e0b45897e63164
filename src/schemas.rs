use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::{EntryType, OccupancyStatus, PaymentType, PropertyKind};

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::Validation(format!("Validation failed: {errors}")))
}

pub fn clamp_limit_in_range(limit: i64, minimum: i64, maximum: i64) -> i64 {
    limit.clamp(minimum, maximum)
}

fn default_limit_100() -> i64 {
    100
}

fn default_payment_type_full() -> PaymentType {
    PaymentType::Full
}

fn default_property_kind_standard() -> PropertyKind {
    PropertyKind::Standard
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateLandlordInput {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(length(min = 1, max = 64))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreatePropertyInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default = "default_property_kind_standard")]
    pub kind: PropertyKind,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    pub landlord_id: i64,
    /// Required for standard properties, rejected for multi-unit ones.
    #[validate(range(exclusive_min = 0.0))]
    pub price: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateUnitInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(exclusive_min = 0.0))]
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateTenantInput {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(length(min = 1, max = 64))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssignTenantInput {
    pub tenant_id: i64,
    pub property_id: i64,
    pub unit_id: Option<i64>,
    pub lease_start_date: Option<NaiveDate>,
    pub lease_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RecordPaymentInput {
    pub tenant_id: i64,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    #[validate(length(min = 1, max = 64))]
    pub payment_method: String,
    /// Defaults to today when omitted.
    pub payment_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RenewLeaseInput {
    pub new_start_date: NaiveDate,
    pub new_end_date: NaiveDate,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    #[validate(length(min = 1, max = 64))]
    pub payment_method: String,
    /// Caller-supplied hint; the renewal path does not reclassify it
    /// against the outstanding-balance rules.
    #[serde(default = "default_payment_type_full")]
    pub payment_type: PaymentType,
    pub payment_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateLedgerEntryInput {
    pub entry_type: EntryType,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    #[validate(length(min = 1, max = 1000))]
    pub narration: String,
    #[validate(length(min = 1, max = 64))]
    pub payment_method: String,
    /// Defaults to today when omitted.
    pub entry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit_100")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertiesQuery {
    pub status: Option<OccupancyStatus>,
    #[serde(default = "default_limit_100")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitsQuery {
    pub status: Option<OccupancyStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsQuery {
    pub tenant_id: Option<i64>,
    #[serde(default = "default_limit_100")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Free-text match over tenant name, narration, and property title.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LandlordPath {
    pub landlord_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyPath {
    pub property_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantPath {
    pub tenant_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPath {
    pub payment_id: i64,
}

#[cfg(test)]
mod tests {
    use super::{clamp_limit_in_range, validate_input, CreateLedgerEntryInput, RecordPaymentInput};
    use crate::models::EntryType;

    #[test]
    fn clamps_limits() {
        assert_eq!(clamp_limit_in_range(0, 1, 500), 1);
        assert_eq!(clamp_limit_in_range(50, 1, 500), 50);
        assert_eq!(clamp_limit_in_range(9999, 1, 500), 500);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let input = RecordPaymentInput {
            tenant_id: 1,
            amount: 0.0,
            payment_method: "transfer".to_string(),
            payment_date: None,
            description: None,
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn accepts_manual_entry() {
        let input = CreateLedgerEntryInput {
            entry_type: EntryType::Debit,
            amount: 250.0,
            narration: "Plumbing repair".to_string(),
            payment_method: "cash".to_string(),
            entry_date: None,
        };
        assert!(validate_input(&input).is_ok());
    }
}
