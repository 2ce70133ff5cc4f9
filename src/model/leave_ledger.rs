use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_type::LeaveType;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEvent {
    Accrual,
    Consumption,
    Adjustment,
    Import,
    Expiry,
}

/// Append-only audit row. `amount` is the signed change to the balance:
/// positive credits the employee, negative debits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntry {
    pub id: u64,
    pub employee_id: u64,
    pub year: i32,
    pub leave_type: LeaveType,
    pub event: LedgerEvent,
    pub amount: f64,
    pub remarks: Option<String>,
    pub leave_request_id: Option<u64>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub employee_id: u64,
    pub year: i32,
    pub leave_type: LeaveType,
    pub event: LedgerEvent,
    pub amount: f64,
    pub remarks: Option<String>,
    pub leave_request_id: Option<u64>,
}
