//! Leave request lifecycle.
//!
//! ```text
//! PENDING ──approve──▶ APPROVED ──cancel──▶ CANCELLED
//!    │ └────reject───▶ REJECTED
//!    └──────cancel─────────────────────────▶ CANCELLED
//! ```
//!
//! REJECTED and CANCELLED are terminal. Every transition that moves days
//! in or out of an allocation comes back as a [`BalanceChange`] carrying
//! the ledger entry for it.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::leave::actor::Actor;
use crate::leave::allocation::{AllocationKey, BalanceChange};
use crate::leave::days::{DateSpan, days_taken};
use crate::leave::ledger;
use crate::model::leave_allocation::LeaveAllocation;
use crate::model::leave_request::{LeaveDuration, LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = "ANNUAL")]
    pub leave_type: LeaveType,
    #[schema(example = "2024-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub duration: LeaveDuration,
    pub reason: Option<String>,
    /// Explicit, possibly non-contiguous, days inside the range
    #[schema(value_type = Option<Vec<String>>)]
    pub day_details: Option<Vec<NaiveDate>>,
}

/// A validated request, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub duration: LeaveDuration,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_taken: f64,
    pub reason: Option<String>,
    pub day_details: Option<Vec<NaiveDate>>,
    pub status: LeaveStatus,
    pub approved_by: Option<u64>,
}

/// Allocation a new application is charged against: the year of its start date.
pub fn application_key(employee_id: u64, application: &LeaveApplication) -> AllocationKey {
    AllocationKey {
        employee_id,
        year: application.start_date.year(),
        leave_type: application.leave_type,
    }
}

pub fn allocation_key(request: &LeaveRequest) -> AllocationKey {
    AllocationKey {
        employee_id: request.employee_id,
        year: request.allocation_year(),
        leave_type: request.leave_type,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: LeaveStatus,
    pub balance: Option<BalanceChange>,
}

fn missing_allocation(key: &AllocationKey) -> AppError {
    AppError::bad_request(format!(
        "No leave allocation for {} in {}",
        key.leave_type, key.year
    ))
}

fn ensure_available(allocation: &LeaveAllocation, requested: f64) -> AppResult<()> {
    if allocation.remaining() < requested {
        return Err(AppError::bad_request(format!(
            "Insufficient leave balance. Available: {}, Requested: {}",
            allocation.remaining(),
            requested
        )));
    }
    Ok(())
}

fn ensure_no_overlap(
    span: &DateSpan,
    others: &[LeaveRequest],
    skip_id: Option<u64>,
) -> AppResult<()> {
    let clash = others.iter().filter(|r| Some(r.id) != skip_id).any(|r| {
        r.status.is_active()
            && DateSpan::new(r.start_date, r.end_date)
                .map(|existing| existing.overlaps(span))
                .unwrap_or(false)
    });
    if clash {
        return Err(AppError::bad_request(
            "You already have a leave request for this period",
        ));
    }
    Ok(())
}

/// Moves `request.days_taken` into `used`.
pub fn consume(allocation: &LeaveAllocation, request: &LeaveRequest) -> AppResult<BalanceChange> {
    ensure_available(allocation, request.days_taken)?;
    let mut updated = allocation.clone();
    updated.used += request.days_taken;
    let entry = ledger::consumption(&updated, request);
    Ok(BalanceChange {
        allocation: updated,
        created: false,
        entry: Some(entry),
    })
}

/// Gives the request's days back. `used` never drops below zero.
fn release(allocation: &LeaveAllocation, request: &LeaveRequest, why: &str) -> BalanceChange {
    let mut updated = allocation.clone();
    updated.used = (updated.used - request.days_taken).max(0.0);
    let mut entry = ledger::refund(&updated, request, why);
    entry.amount = allocation.used - updated.used;
    BalanceChange {
        allocation: updated,
        created: false,
        entry: Some(entry),
    }
}

/// Checks a fresh application against the employee's balance and their
/// other requests. `initial_status` is PENDING for self-service and may be
/// APPROVED when HR records leave directly.
pub fn validate_application(
    employee_id: u64,
    application: &LeaveApplication,
    initial_status: LeaveStatus,
    approved_by: Option<u64>,
    allocation: Option<&LeaveAllocation>,
    others: &[LeaveRequest],
) -> AppResult<NewLeaveRequest> {
    if !matches!(initial_status, LeaveStatus::Pending | LeaveStatus::Approved) {
        return Err(AppError::bad_request(
            "A new leave request can only be PENDING or APPROVED",
        ));
    }

    let span = DateSpan::new(application.start_date, application.end_date)?;
    let details = application
        .day_details
        .as_deref()
        .filter(|d| !d.is_empty());
    let days = days_taken(&span, application.duration, details)?;

    let key = application_key(employee_id, application);
    let allocation = allocation.ok_or_else(|| missing_allocation(&key))?;
    ensure_available(allocation, days)?;
    ensure_no_overlap(&span, others, None)?;

    Ok(NewLeaveRequest {
        employee_id,
        leave_type: application.leave_type,
        duration: application.duration,
        start_date: span.start(),
        end_date: span.end(),
        days_taken: days,
        reason: application.reason.clone(),
        day_details: details.map(|d| d.to_vec()),
        status: initial_status,
        approved_by: if initial_status == LeaveStatus::Approved {
            approved_by
        } else {
            None
        },
    })
}

/// Approve or reject a pending request.
pub fn decide(
    request: &LeaveRequest,
    decision: LeaveStatus,
    allocation: Option<&LeaveAllocation>,
) -> AppResult<Transition> {
    if request.status != LeaveStatus::Pending {
        return Err(AppError::bad_request(format!(
            "Leave request is already {}",
            request.status
        )));
    }

    match decision {
        LeaveStatus::Approved => {
            let key = allocation_key(request);
            let allocation = allocation.ok_or_else(|| missing_allocation(&key))?;
            Ok(Transition {
                status: LeaveStatus::Approved,
                balance: Some(consume(allocation, request)?),
            })
        }
        LeaveStatus::Rejected => Ok(Transition {
            status: LeaveStatus::Rejected,
            balance: None,
        }),
        _ => Err(AppError::bad_request("Status must be APPROVED or REJECTED")),
    }
}

/// Only the owner cancels; an approved request gets its days refunded.
pub fn cancel(
    request: &LeaveRequest,
    actor: &Actor,
    allocation: Option<&LeaveAllocation>,
) -> AppResult<Transition> {
    if actor.employee_id != Some(request.employee_id) {
        return Err(AppError::forbidden(
            "Only the requesting employee can cancel this leave",
        ));
    }

    match request.status {
        LeaveStatus::Pending => Ok(Transition {
            status: LeaveStatus::Cancelled,
            balance: None,
        }),
        LeaveStatus::Approved => {
            let key = allocation_key(request);
            let allocation = allocation.ok_or_else(|| missing_allocation(&key))?;
            Ok(Transition {
                status: LeaveStatus::Cancelled,
                balance: Some(release(allocation, request, "Leave cancelled")),
            })
        }
        LeaveStatus::Rejected | LeaveStatus::Cancelled => Err(AppError::bad_request(
            "Only pending or approved leave requests can be cancelled",
        )),
    }
}

/// Admins delete anything, owners only their pending requests. Deleting an
/// approved request refunds it the same way cancelling does.
pub fn delete(
    request: &LeaveRequest,
    actor: &Actor,
    allocation: Option<&LeaveAllocation>,
) -> AppResult<Option<BalanceChange>> {
    if actor.is_admin() {
        if request.status == LeaveStatus::Approved {
            return Ok(allocation.map(|a| release(a, request, "Approved leave deleted")));
        }
        return Ok(None);
    }

    if actor.employee_id == Some(request.employee_id) {
        if request.status == LeaveStatus::Pending {
            return Ok(None);
        }
        return Err(AppError::forbidden(
            "Only pending leave requests can be deleted",
        ));
    }

    Err(AppError::forbidden("Not allowed to delete this leave request"))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct LeaveRequestPatch {
    pub leave_type: Option<LeaveType>,
    #[schema(example = "2024-06-02", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2024-06-06", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub duration: Option<LeaveDuration>,
    pub reason: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub day_details: Option<Vec<NaiveDate>>,
}

impl LeaveRequestPatch {
    fn touches_days(&self) -> bool {
        self.leave_type.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.duration.is_some()
            || self.day_details.is_some()
    }

    /// Allocation the edited request would be charged against.
    pub fn target_key(&self, request: &LeaveRequest) -> AllocationKey {
        AllocationKey {
            employee_id: request.employee_id,
            year: self.start_date.unwrap_or(request.start_date).year(),
            leave_type: self.leave_type.unwrap_or(request.leave_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestEdit {
    pub request: LeaveRequest,
    pub balance: Option<BalanceChange>,
}

/// Applies an edit. Non-admins may only touch their own pending requests.
/// Any change to dates, type or duration of an active request goes through
/// the same overlap and balance checks as a new application; an approved
/// request is re-charged by the difference in days.
pub fn edit(
    request: &LeaveRequest,
    patch: &LeaveRequestPatch,
    actor: &Actor,
    allocation: Option<&LeaveAllocation>,
    others: &[LeaveRequest],
) -> AppResult<RequestEdit> {
    if !actor.is_admin() {
        if actor.employee_id != Some(request.employee_id) {
            return Err(AppError::forbidden("Not allowed to edit this leave request"));
        }
        if request.status != LeaveStatus::Pending {
            return Err(AppError::forbidden(
                "Only pending leave requests can be edited",
            ));
        }
    }

    let mut updated = request.clone();
    if let Some(reason) = &patch.reason {
        updated.reason = Some(reason.clone());
    }
    if !patch.touches_days() {
        return Ok(RequestEdit {
            request: updated,
            balance: None,
        });
    }

    let target = patch.target_key(request);
    if request.status == LeaveStatus::Approved && target != allocation_key(request) {
        return Err(AppError::bad_request(
            "Approved leave cannot move to another leave type or year",
        ));
    }

    updated.leave_type = target.leave_type;
    updated.start_date = patch.start_date.unwrap_or(request.start_date);
    updated.end_date = patch.end_date.unwrap_or(request.end_date);
    updated.duration = patch.duration.unwrap_or(request.duration);
    if let Some(details) = &patch.day_details {
        updated.day_details = (!details.is_empty()).then(|| details.clone());
    }

    let span = DateSpan::new(updated.start_date, updated.end_date)?;
    updated.days_taken = days_taken(&span, updated.duration, updated.day_details.as_deref())?;

    if !request.status.is_active() {
        return Ok(RequestEdit {
            request: updated,
            balance: None,
        });
    }

    ensure_no_overlap(&span, others, Some(request.id))?;
    let allocation = allocation.ok_or_else(|| missing_allocation(&target))?;

    let balance = match request.status {
        LeaveStatus::Pending => {
            ensure_available(allocation, updated.days_taken)?;
            None
        }
        _ => {
            let extra = updated.days_taken - request.days_taken;
            if extra == 0.0 {
                None
            } else {
                if extra > 0.0 {
                    ensure_available(allocation, extra)?;
                }
                let mut charged = allocation.clone();
                charged.used = (charged.used + extra).max(0.0);
                let mut entry = ledger::recharge(&charged, request.id, extra);
                entry.amount = allocation.used - charged.used;
                Some(BalanceChange {
                    allocation: charged,
                    created: false,
                    entry: Some(entry),
                })
            }
        }
    };

    Ok(RequestEdit {
        request: updated,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leave::actor::actor;
    use crate::model::leave_ledger::LedgerEvent;
    use crate::model::role::Role;
    use chrono::Utc;

    const EMP: u64 = 10;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn annual(allocated: f64, used: f64) -> LeaveAllocation {
        LeaveAllocation {
            id: 1,
            employee_id: EMP,
            year: 2024,
            leave_type: LeaveType::Annual,
            allocated,
            used,
        }
    }

    fn application(start: NaiveDate, end: NaiveDate) -> LeaveApplication {
        LeaveApplication {
            leave_type: LeaveType::Annual,
            start_date: start,
            end_date: end,
            duration: LeaveDuration::Full,
            reason: Some("Family trip".to_string()),
            day_details: None,
        }
    }

    fn stored(id: u64, new: NewLeaveRequest) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: new.employee_id,
            leave_type: new.leave_type,
            duration: new.duration,
            start_date: new.start_date,
            end_date: new.end_date,
            days_taken: new.days_taken,
            reason: new.reason,
            day_details: new.day_details,
            status: new.status,
            approved_by: new.approved_by,
            remarks: None,
            created_at: Utc::now(),
        }
    }

    fn request(id: u64, start: NaiveDate, end: NaiveDate, status: LeaveStatus) -> LeaveRequest {
        let new = validate_application(
            EMP,
            &application(start, end),
            LeaveStatus::Pending,
            None,
            Some(&annual(365.0, 0.0)),
            &[],
        )
        .unwrap();
        let mut r = stored(id, new);
        r.status = status;
        r
    }

    fn owner() -> Actor {
        actor(Role::Employee, Some(EMP))
    }

    #[test]
    fn application_computes_inclusive_days() {
        let new = validate_application(
            EMP,
            &application(d(2024, 6, 1), d(2024, 6, 5)),
            LeaveStatus::Pending,
            None,
            Some(&annual(20.0, 5.0)),
            &[],
        )
        .unwrap();
        assert_eq!(new.days_taken, 5.0);
        assert_eq!(new.status, LeaveStatus::Pending);
        assert_eq!(new.start_date.year(), 2024);
    }

    #[test]
    fn application_over_balance_rejected() {
        let err = validate_application(
            EMP,
            &application(d(2024, 6, 1), d(2024, 6, 5)),
            LeaveStatus::Pending,
            None,
            Some(&annual(10.0, 6.0)),
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Insufficient leave balance"));
    }

    #[test]
    fn application_without_allocation_rejected() {
        let err = validate_application(
            EMP,
            &application(d(2024, 6, 1), d(2024, 6, 1)),
            LeaveStatus::Pending,
            None,
            None,
            &[],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "No leave allocation for ANNUAL in 2024");
    }

    #[test]
    fn overlapping_pending_request_blocks() {
        let first = request(1, d(2024, 7, 1), d(2024, 7, 10), LeaveStatus::Pending);
        let err = validate_application(
            EMP,
            &application(d(2024, 7, 5), d(2024, 7, 7)),
            LeaveStatus::Pending,
            None,
            Some(&annual(30.0, 0.0)),
            &[first],
        )
        .unwrap_err();
        assert!(err.to_string().contains("already have a leave request"));
    }

    #[test]
    fn rejected_and_cancelled_requests_do_not_block() {
        let others = vec![
            request(1, d(2024, 7, 1), d(2024, 7, 10), LeaveStatus::Rejected),
            request(2, d(2024, 7, 4), d(2024, 7, 6), LeaveStatus::Cancelled),
        ];
        assert!(
            validate_application(
                EMP,
                &application(d(2024, 7, 5), d(2024, 7, 7)),
                LeaveStatus::Pending,
                None,
                Some(&annual(30.0, 0.0)),
                &others,
            )
            .is_ok()
        );
    }

    #[test]
    fn new_request_cannot_start_rejected() {
        assert!(
            validate_application(
                EMP,
                &application(d(2024, 7, 5), d(2024, 7, 7)),
                LeaveStatus::Rejected,
                None,
                Some(&annual(30.0, 0.0)),
                &[],
            )
            .is_err()
        );
    }

    #[test]
    fn approve_consumes_exactly_days_taken() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        let t = decide(&r, LeaveStatus::Approved, Some(&annual(20.0, 5.0))).unwrap();
        assert_eq!(t.status, LeaveStatus::Approved);
        let balance = t.balance.unwrap();
        assert_eq!(balance.allocation.used, 10.0);
        assert_eq!(balance.allocation.remaining(), 10.0);
        let entry = balance.entry.unwrap();
        assert_eq!(entry.event, LedgerEvent::Consumption);
        assert_eq!(entry.amount, -5.0);
        assert_eq!(entry.leave_request_id, Some(1));
    }

    #[test]
    fn reject_leaves_balance_alone() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        let t = decide(&r, LeaveStatus::Rejected, Some(&annual(20.0, 5.0))).unwrap();
        assert_eq!(t.status, LeaveStatus::Rejected);
        assert!(t.balance.is_none());
    }

    #[test]
    fn only_pending_requests_can_be_decided() {
        for status in [
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Cancelled,
        ] {
            let r = request(1, d(2024, 6, 1), d(2024, 6, 5), status);
            assert!(decide(&r, LeaveStatus::Approved, Some(&annual(20.0, 0.0))).is_err());
        }
    }

    #[test]
    fn decision_must_be_approve_or_reject() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        assert!(decide(&r, LeaveStatus::Cancelled, Some(&annual(20.0, 0.0))).is_err());
    }

    #[test]
    fn approval_rechecks_balance() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        assert!(decide(&r, LeaveStatus::Approved, Some(&annual(20.0, 18.0))).is_err());
    }

    #[test]
    fn approve_then_cancel_restores_balance() {
        let allocation = annual(20.0, 5.0);
        let pending = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        assert_eq!(pending.days_taken, 5.0);

        let approved_t = decide(&pending, LeaveStatus::Approved, Some(&allocation)).unwrap();
        let after_approval = approved_t.balance.unwrap().allocation;
        assert_eq!(after_approval.used, 10.0);
        assert_eq!(after_approval.remaining(), 10.0);

        let mut approved = pending.clone();
        approved.status = approved_t.status;
        let cancel_t = cancel(&approved, &owner(), Some(&after_approval)).unwrap();
        assert_eq!(cancel_t.status, LeaveStatus::Cancelled);
        let balance = cancel_t.balance.unwrap();
        assert_eq!(balance.allocation.used, 5.0);
        assert_eq!(balance.allocation.remaining(), 15.0);
        let entry = balance.entry.unwrap();
        assert_eq!(entry.event, LedgerEvent::Adjustment);
        assert_eq!(entry.amount, 5.0);
    }

    #[test]
    fn cancelling_pending_touches_no_allocation() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        let t = cancel(&r, &owner(), Some(&annual(20.0, 5.0))).unwrap();
        assert_eq!(t.status, LeaveStatus::Cancelled);
        assert!(t.balance.is_none());
    }

    #[test]
    fn only_owner_cancels() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        let hr = actor(Role::HrAdmin, Some(99));
        let err = cancel(&r, &hr, None).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn terminal_requests_cannot_be_cancelled() {
        for status in [LeaveStatus::Rejected, LeaveStatus::Cancelled] {
            let r = request(1, d(2024, 6, 1), d(2024, 6, 5), status);
            assert!(cancel(&r, &owner(), None).is_err());
        }
    }

    #[test]
    fn refund_never_drives_used_negative() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Approved);
        let t = cancel(&r, &owner(), Some(&annual(20.0, 2.0))).unwrap();
        let balance = t.balance.unwrap();
        assert_eq!(balance.allocation.used, 0.0);
        assert_eq!(balance.entry.unwrap().amount, 2.0);
    }

    #[test]
    fn delete_rules_by_role() {
        let pending = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        let approved = request(2, d(2024, 8, 1), d(2024, 8, 2), LeaveStatus::Approved);

        assert!(delete(&pending, &owner(), None).unwrap().is_none());
        assert!(matches!(
            delete(&approved, &owner(), None).unwrap_err(),
            AppError::Forbidden(_)
        ));

        let stranger = actor(Role::Employee, Some(11));
        assert!(delete(&pending, &stranger, None).is_err());

        let manager = actor(Role::Manager, Some(12));
        assert!(delete(&pending, &manager, None).is_err());
    }

    #[test]
    fn admin_delete_of_approved_request_refunds() {
        let approved = request(2, d(2024, 8, 1), d(2024, 8, 2), LeaveStatus::Approved);
        let admin = actor(Role::OrgAdmin, None);
        let refund = delete(&approved, &admin, Some(&annual(20.0, 7.0)))
            .unwrap()
            .unwrap();
        assert_eq!(refund.allocation.used, 5.0);
        assert_eq!(refund.entry.unwrap().amount, 2.0);
    }

    #[test]
    fn owner_edits_only_pending() {
        let approved = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Approved);
        let patch = LeaveRequestPatch {
            reason: Some("changed".to_string()),
            ..Default::default()
        };
        assert!(edit(&approved, &patch, &owner(), None, &[]).is_err());
    }

    #[test]
    fn editing_dates_recounts_and_revalidates() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        let other = request(2, d(2024, 6, 10), d(2024, 6, 12), LeaveStatus::Approved);
        let allocation = annual(20.0, 3.0);

        let patch = LeaveRequestPatch {
            end_date: Some(d(2024, 6, 8)),
            ..Default::default()
        };
        let e = edit(&r, &patch, &owner(), Some(&allocation), &[r.clone(), other.clone()])
            .unwrap();
        assert_eq!(e.request.days_taken, 8.0);
        assert!(e.balance.is_none());

        let clash = LeaveRequestPatch {
            end_date: Some(d(2024, 6, 10)),
            ..Default::default()
        };
        assert!(edit(&r, &clash, &owner(), Some(&allocation), &[other]).is_err());

        let too_long = LeaveRequestPatch {
            end_date: Some(d(2024, 6, 30)),
            ..Default::default()
        };
        assert!(edit(&r, &too_long, &owner(), Some(&allocation), &[]).is_err());
    }

    #[test]
    fn admin_edit_of_approved_request_recharges_difference() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Approved);
        let admin = actor(Role::HrAdmin, None);
        let allocation = annual(20.0, 5.0);

        let shorter = LeaveRequestPatch {
            end_date: Some(d(2024, 6, 3)),
            ..Default::default()
        };
        let e = edit(&r, &shorter, &admin, Some(&allocation), &[]).unwrap();
        let balance = e.balance.unwrap();
        assert_eq!(balance.allocation.used, 3.0);
        assert_eq!(balance.entry.unwrap().amount, 2.0);

        let other_type = LeaveRequestPatch {
            leave_type: Some(LeaveType::Sick),
            ..Default::default()
        };
        assert!(edit(&r, &other_type, &admin, Some(&allocation), &[]).is_err());
    }

    #[test]
    fn shortening_approved_leave_logs_only_what_was_released() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Approved);
        let admin = actor(Role::HrAdmin, None);
        let allocation = annual(20.0, 1.0);

        let one_day = LeaveRequestPatch {
            end_date: Some(d(2024, 6, 1)),
            ..Default::default()
        };
        let e = edit(&r, &one_day, &admin, Some(&allocation), &[]).unwrap();
        let balance = e.balance.unwrap();
        assert_eq!(balance.allocation.used, 0.0);
        let entry = balance.entry.unwrap();
        assert_eq!(entry.amount, 1.0);
        assert_eq!(entry.amount, allocation.used - balance.allocation.used);
    }

    #[test]
    fn reason_only_edit_skips_validation() {
        let r = request(1, d(2024, 6, 1), d(2024, 6, 5), LeaveStatus::Pending);
        let patch = LeaveRequestPatch {
            reason: Some("Moved flights".to_string()),
            ..Default::default()
        };
        let e = edit(&r, &patch, &owner(), None, &[]).unwrap();
        assert_eq!(e.request.reason.as_deref(), Some("Moved flights"));
        assert_eq!(e.request.days_taken, 5.0);
    }
}
