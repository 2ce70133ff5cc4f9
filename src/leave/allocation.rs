//! Balance arithmetic for allocations. Each function takes the current row
//! (if any) and returns the row to persist plus the ledger entry describing
//! the change, so the caller only has to write both inside one transaction.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::leave::ledger;
use crate::model::leave_allocation::LeaveAllocation;
use crate::model::leave_grade::LeavePolicy;
use crate::model::leave_ledger::NewLedgerEntry;
use crate::model::leave_type::LeaveType;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AllocationKey {
    pub employee_id: u64,
    pub year: i32,
    pub leave_type: LeaveType,
}

impl AllocationKey {
    /// Zeroed allocation for a key that has no row yet.
    pub fn blank(&self) -> LeaveAllocation {
        LeaveAllocation {
            id: 0,
            employee_id: self.employee_id,
            year: self.year,
            leave_type: self.leave_type,
            allocated: 0.0,
            used: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChange {
    pub allocation: LeaveAllocation,
    /// True when the row does not exist yet and must be inserted.
    pub created: bool,
    pub entry: Option<NewLedgerEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct AllocationPatch {
    #[schema(example = 22.0)]
    pub allocated: Option<f64>,
    #[schema(example = 4.5)]
    pub used: Option<f64>,
}

fn ensure_days(label: &str, value: f64) -> AppResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "{} must be a non-negative number of days",
            label
        )))
    }
}

fn ensure_within(allocated: f64, used: f64) -> AppResult<()> {
    if used > allocated {
        return Err(AppError::bad_request(
            "Used leave cannot exceed allocated leave",
        ));
    }
    Ok(())
}

fn change(
    allocation: LeaveAllocation,
    created: bool,
    entry: Option<NewLedgerEntry>,
) -> BalanceChange {
    BalanceChange {
        allocation,
        created,
        entry,
    }
}

/// Fresh allocation with `used = 0`. An existing row for the same
/// (employee, year, leave type) is a conflict, never an overwrite.
pub fn create(
    key: AllocationKey,
    existing: Option<&LeaveAllocation>,
    allocated: f64,
) -> AppResult<BalanceChange> {
    if existing.is_some() {
        return Err(AppError::bad_request(
            "Allocation already exists for this employee, year, and leave type",
        ));
    }
    ensure_days("Allocated", allocated)?;

    let mut allocation = key.blank();
    allocation.allocated = allocated;
    let entry = (allocated != 0.0)
        .then(|| ledger::accrual(&allocation, allocated, "Initial allocation"));
    Ok(change(allocation, true, entry))
}

pub fn apply_patch(
    current: &LeaveAllocation,
    patch: &AllocationPatch,
) -> AppResult<BalanceChange> {
    let allocated = patch.allocated.unwrap_or(current.allocated);
    let used = patch.used.unwrap_or(current.used);
    ensure_days("Allocated", allocated)?;
    ensure_days("Used", used)?;
    ensure_within(allocated, used)?;

    let mut updated = current.clone();
    updated.allocated = allocated;
    updated.used = used;

    let delta = updated.remaining() - current.remaining();
    let entry = (delta != 0.0).then(|| ledger::adjustment(&updated, delta, "Allocation edited"));
    Ok(change(updated, false, entry))
}

/// Consumed days can't be given back by deleting the row; returns the
/// entry that writes off whatever was still allocated.
pub fn ensure_deletable(current: &LeaveAllocation) -> AppResult<Option<NewLedgerEntry>> {
    if current.used > 0.0 {
        return Err(AppError::bad_request(
            "Cannot delete allocation that has been used",
        ));
    }
    Ok((current.allocated != 0.0)
        .then(|| ledger::adjustment(current, -current.allocated, "Allocation deleted")))
}

/// Grade-driven upsert: new rows start at `used = 0`, existing rows get
/// `allocated` overwritten and keep `used`.
pub fn upsert_from_policy(
    key: AllocationKey,
    existing: Option<&LeaveAllocation>,
    total_days: f64,
) -> AppResult<BalanceChange> {
    ensure_days("Policy total days", total_days)?;
    let (mut allocation, created) = match existing {
        Some(a) => (a.clone(), false),
        None => (key.blank(), true),
    };
    if total_days < allocation.used {
        return Err(AppError::bad_request(format!(
            "Policy quota {} is below the {} days already used",
            total_days, allocation.used
        )));
    }

    let delta = total_days - allocation.allocated;
    allocation.allocated = total_days;
    let entry =
        (delta != 0.0).then(|| ledger::accrual(&allocation, delta, "Allocated from leave grade"));
    Ok(change(allocation, created, entry))
}

/// Import overwrites both numbers. The ledger gets the change in
/// `remaining`, logged even when it is zero so every imported record
/// leaves a trace.
pub fn import(
    key: AllocationKey,
    existing: Option<&LeaveAllocation>,
    allocated: f64,
    used: f64,
) -> AppResult<BalanceChange> {
    ensure_days("Allocated", allocated)?;
    ensure_days("Used", used)?;
    ensure_within(allocated, used)?;

    let (before, created) = match existing {
        Some(a) => (a.clone(), false),
        None => (key.blank(), true),
    };
    let mut allocation = before.clone();
    allocation.allocated = allocated;
    allocation.used = used;

    let delta = allocation.remaining() - before.remaining();
    let remarks = format!(
        "Imported: allocated {} -> {}, used {} -> {}",
        before.allocated, allocated, before.used, used
    );
    let entry = ledger::import(&allocation, delta, &remarks);
    Ok(change(allocation, created, Some(entry)))
}

/// Manual adjustment. A credit raises `allocated`, a debit raises `used`.
pub fn adjust(
    key: AllocationKey,
    existing: Option<&LeaveAllocation>,
    amount: f64,
    remarks: Option<&str>,
) -> AppResult<BalanceChange> {
    if !amount.is_finite() || amount == 0.0 {
        return Err(AppError::bad_request(
            "Adjustment amount must be a non-zero number of days",
        ));
    }
    let (mut allocation, created) = match existing {
        Some(a) => (a.clone(), false),
        None => (key.blank(), true),
    };

    if amount > 0.0 {
        allocation.allocated += amount;
    } else {
        allocation.used += -amount;
        if allocation.used > allocation.allocated {
            return Err(AppError::bad_request(format!(
                "Insufficient leave balance. Available: {}, Requested: {}",
                allocation.allocated - (allocation.used + amount),
                -amount
            )));
        }
    }

    let entry = ledger::adjustment(
        &allocation,
        amount,
        remarks.unwrap_or("Manual adjustment"),
    );
    Ok(change(allocation, created, Some(entry)))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarryOutcome {
    /// Days credited to next year's allocation
    pub carried: f64,
    /// Days forfeited at year end
    pub expired: f64,
}

/// Splits what is left of a year into the part that rolls over and the
/// part that lapses, capped by the policy.
pub fn carry_over(remaining: f64, policy: Option<&LeavePolicy>) -> CarryOutcome {
    let remaining = remaining.max(0.0);
    let cap = match policy {
        Some(p) if p.carry_forward => p.max_carry_amount.max(0.0),
        _ => 0.0,
    };
    let carried = remaining.min(cap);
    CarryOutcome {
        carried,
        expired: remaining - carried,
    }
}

pub fn carry_remarks(from_year: i32) -> String {
    format!("Carried forward from {}", from_year)
}

pub fn expiry_remarks(from_year: i32) -> String {
    format!("Expired at end of {}", from_year)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rollover {
    pub outcome: CarryOutcome,
    /// Credit on the next year's allocation
    pub credit: Option<BalanceChange>,
    /// Forfeit logged against the closing year; its row is left as is
    pub expiry: Option<NewLedgerEntry>,
}

/// Year-end rollover of one closing allocation into the next year.
pub fn roll_over(
    closing: &LeaveAllocation,
    next: Option<&LeaveAllocation>,
    policy: Option<&LeavePolicy>,
) -> Rollover {
    let outcome = carry_over(closing.remaining(), policy);

    let credit = (outcome.carried > 0.0).then(|| {
        let (mut allocation, created) = match next {
            Some(a) => (a.clone(), false),
            None => {
                let key = AllocationKey {
                    employee_id: closing.employee_id,
                    year: closing.year + 1,
                    leave_type: closing.leave_type,
                };
                (key.blank(), true)
            }
        };
        allocation.allocated += outcome.carried;
        let entry = ledger::accrual(&allocation, outcome.carried, &carry_remarks(closing.year));
        change(allocation, created, Some(entry))
    });

    let expiry = (outcome.expired > 0.0)
        .then(|| ledger::expiry(closing, outcome.expired, &expiry_remarks(closing.year)));

    Rollover {
        outcome,
        credit,
        expiry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_ledger::LedgerEvent;

    fn key() -> AllocationKey {
        AllocationKey {
            employee_id: 7,
            year: 2024,
            leave_type: LeaveType::Annual,
        }
    }

    fn existing(allocated: f64, used: f64) -> LeaveAllocation {
        LeaveAllocation {
            id: 3,
            allocated,
            used,
            ..key().blank()
        }
    }

    #[test]
    fn create_starts_unused_and_logs_accrual() {
        let c = create(key(), None, 20.0).unwrap();
        assert!(c.created);
        assert_eq!(c.allocation.used, 0.0);
        assert_eq!(c.allocation.remaining(), 20.0);
        let entry = c.entry.unwrap();
        assert_eq!(entry.event, LedgerEvent::Accrual);
        assert_eq!(entry.amount, 20.0);
    }

    #[test]
    fn duplicate_create_fails_instead_of_overwriting() {
        let current = existing(20.0, 5.0);
        let err = create(key(), Some(&current), 30.0).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn patch_rejects_used_above_allocated() {
        let current = existing(10.0, 2.0);
        let patch = AllocationPatch {
            allocated: None,
            used: Some(11.0),
        };
        assert!(apply_patch(&current, &patch).is_err());

        let patch = AllocationPatch {
            allocated: Some(1.0),
            used: None,
        };
        assert!(apply_patch(&current, &patch).is_err());
    }

    #[test]
    fn patch_logs_remaining_delta() {
        let current = existing(10.0, 2.0);
        let patch = AllocationPatch {
            allocated: Some(12.0),
            used: Some(3.0),
        };
        let c = apply_patch(&current, &patch).unwrap();
        assert_eq!(c.allocation.remaining(), 9.0);
        assert_eq!(c.entry.unwrap().amount, 1.0);
    }

    #[test]
    fn delete_guarded_by_usage() {
        assert!(ensure_deletable(&existing(10.0, 0.5)).is_err());
        let entry = ensure_deletable(&existing(10.0, 0.0)).unwrap().unwrap();
        assert_eq!(entry.amount, -10.0);
        assert!(ensure_deletable(&existing(0.0, 0.0)).unwrap().is_none());
    }

    #[test]
    fn policy_upsert_keeps_used() {
        let current = existing(15.0, 4.0);
        let c = upsert_from_policy(key(), Some(&current), 20.0).unwrap();
        assert!(!c.created);
        assert_eq!(c.allocation.allocated, 20.0);
        assert_eq!(c.allocation.used, 4.0);
        assert_eq!(c.entry.unwrap().amount, 5.0);
    }

    #[test]
    fn policy_upsert_without_change_logs_nothing() {
        let current = existing(20.0, 4.0);
        let c = upsert_from_policy(key(), Some(&current), 20.0).unwrap();
        assert!(c.entry.is_none());
    }

    #[test]
    fn policy_upsert_refuses_quota_below_usage() {
        let current = existing(20.0, 12.0);
        assert!(upsert_from_policy(key(), Some(&current), 10.0).is_err());
    }

    #[test]
    fn import_overwrites_and_logs_delta_not_total() {
        let current = existing(20.0, 5.0);
        let c = import(key(), Some(&current), 25.0, 2.0).unwrap();
        assert_eq!(c.allocation.allocated, 25.0);
        assert_eq!(c.allocation.used, 2.0);
        let entry = c.entry.unwrap();
        assert_eq!(entry.event, LedgerEvent::Import);
        // remaining 15 -> 23
        assert_eq!(entry.amount, 8.0);
    }

    #[test]
    fn import_into_empty_slot_creates_row() {
        let c = import(key(), None, 12.0, 0.0).unwrap();
        assert!(c.created);
        assert_eq!(c.entry.unwrap().amount, 12.0);
    }

    #[test]
    fn positive_adjustment_credits_allocated() {
        let current = existing(20.0, 5.0);
        let c = adjust(key(), Some(&current), 2.0, None).unwrap();
        assert_eq!(c.allocation.allocated, 22.0);
        assert_eq!(c.allocation.used, 5.0);
        assert_eq!(c.entry.unwrap().amount, 2.0);
    }

    #[test]
    fn negative_adjustment_debits_used() {
        let current = existing(20.0, 5.0);
        let c = adjust(key(), Some(&current), -3.0, Some("Unrecorded absence")).unwrap();
        assert_eq!(c.allocation.allocated, 20.0);
        assert_eq!(c.allocation.used, 8.0);
        let entry = c.entry.unwrap();
        assert_eq!(entry.amount, -3.0);
        assert_eq!(entry.remarks.as_deref(), Some("Unrecorded absence"));
    }

    #[test]
    fn debit_beyond_balance_rejected() {
        let current = existing(5.0, 4.0);
        assert!(adjust(key(), Some(&current), -2.0, None).is_err());
        assert!(adjust(key(), None, -1.0, None).is_err());
    }

    #[test]
    fn zero_adjustment_rejected() {
        assert!(adjust(key(), None, 0.0, None).is_err());
    }

    fn policy(carry: bool, max: f64) -> LeavePolicy {
        LeavePolicy {
            id: 1,
            leave_grade_id: 1,
            leave_type: LeaveType::Annual,
            total_days: 20.0,
            carry_forward: carry,
            max_carry_amount: max,
        }
    }

    #[test]
    fn carry_over_is_capped() {
        let p = policy(true, 5.0);
        assert_eq!(
            carry_over(8.0, Some(&p)),
            CarryOutcome {
                carried: 5.0,
                expired: 3.0
            }
        );
        assert_eq!(
            carry_over(3.0, Some(&p)),
            CarryOutcome {
                carried: 3.0,
                expired: 0.0
            }
        );
    }

    #[test]
    fn no_carry_forward_expires_everything() {
        let p = policy(false, 0.0);
        assert_eq!(carry_over(6.0, Some(&p)).expired, 6.0);
        assert_eq!(carry_over(6.0, None).carried, 0.0);
    }

    #[test]
    fn roll_over_credits_next_year_and_expires_rest() {
        let mut closing = existing(20.0, 12.0);
        closing.year = 2024;
        let r = roll_over(&closing, None, Some(&policy(true, 5.0)));

        let credit = r.credit.unwrap();
        assert!(credit.created);
        assert_eq!(credit.allocation.year, 2025);
        assert_eq!(credit.allocation.allocated, 5.0);
        let accrual = credit.entry.unwrap();
        assert_eq!(accrual.event, LedgerEvent::Accrual);
        assert_eq!(accrual.amount, 5.0);
        assert_eq!(accrual.year, 2025);

        let expiry = r.expiry.unwrap();
        assert_eq!(expiry.event, LedgerEvent::Expiry);
        assert_eq!(expiry.amount, -3.0);
        assert_eq!(expiry.year, 2024);
    }

    #[test]
    fn roll_over_adds_to_existing_next_year() {
        let closing = existing(20.0, 18.0);
        let mut next = existing(20.0, 1.0);
        next.id = 99;
        next.year = closing.year + 1;
        let r = roll_over(&closing, Some(&next), Some(&policy(true, 5.0)));
        let credit = r.credit.unwrap();
        assert!(!credit.created);
        assert_eq!(credit.allocation.id, 99);
        assert_eq!(credit.allocation.allocated, 22.0);
        assert_eq!(credit.allocation.used, 1.0);
        assert!(r.expiry.is_none());
    }

    #[test]
    fn nothing_left_nothing_logged() {
        let closing = existing(10.0, 10.0);
        let r = roll_over(&closing, None, Some(&policy(true, 5.0)));
        assert!(r.credit.is_none());
        assert!(r.expiry.is_none());
    }
}
