//! Builders for ledger rows. Every entry carries the signed delta applied
//! to the employee's balance, never an absolute total.

use crate::model::leave_allocation::LeaveAllocation;
use crate::model::leave_ledger::{LedgerEvent, NewLedgerEntry};
use crate::model::leave_request::LeaveRequest;

fn entry(
    allocation: &LeaveAllocation,
    event: LedgerEvent,
    amount: f64,
    remarks: impl Into<String>,
    leave_request_id: Option<u64>,
) -> NewLedgerEntry {
    NewLedgerEntry {
        employee_id: allocation.employee_id,
        year: allocation.year,
        leave_type: allocation.leave_type,
        event,
        amount,
        remarks: Some(remarks.into()),
        leave_request_id,
    }
}

pub fn consumption(allocation: &LeaveAllocation, request: &LeaveRequest) -> NewLedgerEntry {
    entry(
        allocation,
        LedgerEvent::Consumption,
        -request.days_taken,
        format!(
            "Leave approved {} to {}",
            request.start_date, request.end_date
        ),
        Some(request.id),
    )
}

pub fn refund(
    allocation: &LeaveAllocation,
    request: &LeaveRequest,
    why: &str,
) -> NewLedgerEntry {
    entry(
        allocation,
        LedgerEvent::Adjustment,
        request.days_taken,
        format!("{} {} to {}", why, request.start_date, request.end_date),
        Some(request.id),
    )
}

/// Re-charge of an approved request whose day count changed on edit.
pub fn recharge(
    allocation: &LeaveAllocation,
    request_id: u64,
    extra_days: f64,
) -> NewLedgerEntry {
    entry(
        allocation,
        LedgerEvent::Adjustment,
        -extra_days,
        "Approved leave edited",
        Some(request_id),
    )
}

pub fn accrual(allocation: &LeaveAllocation, amount: f64, remarks: &str) -> NewLedgerEntry {
    entry(allocation, LedgerEvent::Accrual, amount, remarks, None)
}

pub fn adjustment(allocation: &LeaveAllocation, amount: f64, remarks: &str) -> NewLedgerEntry {
    entry(allocation, LedgerEvent::Adjustment, amount, remarks, None)
}

pub fn import(allocation: &LeaveAllocation, amount: f64, remarks: &str) -> NewLedgerEntry {
    entry(allocation, LedgerEvent::Import, amount, remarks, None)
}

pub fn expiry(allocation: &LeaveAllocation, amount: f64, remarks: &str) -> NewLedgerEntry {
    entry(allocation, LedgerEvent::Expiry, -amount, remarks, None)
}
