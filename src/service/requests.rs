use serde::Deserialize;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::leave::actor::Actor;
use crate::leave::request::{self, LeaveApplication, LeaveRequestPatch};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::service::{Listing, log_committed, notifications, persist_balance};
use crate::store::filter::LeaveRequestFilter;
use crate::store::{self, employees, requests};

#[derive(Debug, Deserialize, ToSchema)]
pub struct Decision {
    /// APPROVED or REJECTED
    #[schema(example = "APPROVED")]
    pub status: LeaveStatus,
    pub remarks: Option<String>,
}

/// Request plus its owner, both locked, owner first.
async fn lock_request(
    conn: &mut MySqlConnection,
    actor: &Actor,
    id: u64,
) -> AppResult<(Employee, LeaveRequest)> {
    let found = requests::find(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))?;
    let employee = employees::lock(conn, found.employee_id).await?;
    actor.ensure_organization(employee.organization_id)?;
    let locked = requests::lock(conn, id).await?;
    Ok((employee, locked))
}

async fn reload(conn: &mut MySqlConnection, id: u64) -> AppResult<LeaveRequest> {
    requests::find(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))
}

/// Files a leave request for `employee_id`. Employees file for themselves
/// as PENDING; admins may file for anyone and may record it straight as
/// APPROVED, in which case the days are consumed right away.
#[instrument(skip(pool, actor, application), fields(user_id = actor.user_id))]
pub async fn apply(
    pool: &MySqlPool,
    actor: &Actor,
    employee_id: u64,
    application: LeaveApplication,
    initial_status: LeaveStatus,
) -> AppResult<LeaveRequest> {
    if actor.employee_id != Some(employee_id) || initial_status != LeaveStatus::Pending {
        actor.require_admin()?;
    }

    let mut tx = pool.begin().await?;
    let employee = employees::lock(&mut tx, employee_id).await?;
    actor.ensure_organization(employee.organization_id)?;

    let key = request::application_key(employee_id, &application);
    let allocation = store::allocations::lock_by_key(&mut tx, &key).await?;
    let others = requests::active_for_employee(&mut tx, employee_id).await?;

    let new = request::validate_application(
        employee_id,
        &application,
        initial_status,
        Some(actor.user_id),
        allocation.as_ref(),
        &others,
    )?;
    let created = requests::insert(&mut tx, &new).await?;

    let mut entry = None;
    if created.status == LeaveStatus::Approved {
        if let Some(allocation) = &allocation {
            let change = request::consume(allocation, &created)?;
            entry = persist_balance(&mut tx, change).await?.1;
        }
    }
    tx.commit().await?;

    log_committed(entry.as_ref());
    info!(
        request_id = created.id,
        employee_id,
        leave_type = %created.leave_type,
        days = created.days_taken,
        status = %created.status,
        "Leave request created"
    );
    notifications::dispatch_requested(pool.clone(), employee, created.clone());
    Ok(created)
}

#[instrument(skip(pool, actor, decision), fields(user_id = actor.user_id))]
pub async fn decide(
    pool: &MySqlPool,
    actor: &Actor,
    id: u64,
    decision: Decision,
) -> AppResult<LeaveRequest> {
    let mut tx = pool.begin().await?;
    let (employee, current) = lock_request(&mut tx, actor, id).await?;
    actor.ensure_can_decide(&employee)?;

    let key = request::allocation_key(&current);
    let allocation = store::allocations::lock_by_key(&mut tx, &key).await?;
    let transition = request::decide(&current, decision.status, allocation.as_ref())?;

    requests::set_status(
        &mut tx,
        id,
        transition.status,
        Some(actor.user_id),
        decision.remarks.as_deref(),
    )
    .await?;
    let mut entry = None;
    if let Some(change) = transition.balance {
        entry = persist_balance(&mut tx, change).await?.1;
    }
    let updated = reload(&mut tx, id).await?;
    tx.commit().await?;

    log_committed(entry.as_ref());
    info!(request_id = id, status = %updated.status, "Leave request decided");
    notifications::dispatch_status(pool.clone(), employee, updated.clone());
    Ok(updated)
}

#[instrument(skip(pool, actor), fields(user_id = actor.user_id))]
pub async fn cancel(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<LeaveRequest> {
    let mut tx = pool.begin().await?;
    let (employee, current) = lock_request(&mut tx, actor, id).await?;

    let key = request::allocation_key(&current);
    let allocation = store::allocations::lock_by_key(&mut tx, &key).await?;
    let transition = request::cancel(&current, actor, allocation.as_ref())?;

    requests::set_status(&mut tx, id, transition.status, None, None).await?;
    let mut entry = None;
    if let Some(change) = transition.balance {
        entry = persist_balance(&mut tx, change).await?.1;
    }
    let updated = reload(&mut tx, id).await?;
    tx.commit().await?;

    log_committed(entry.as_ref());
    info!(request_id = id, "Leave request cancelled");
    notifications::dispatch_status(pool.clone(), employee, updated.clone());
    Ok(updated)
}

#[instrument(skip(pool, actor), fields(user_id = actor.user_id))]
pub async fn delete(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    let (_, current) = lock_request(&mut tx, actor, id).await?;

    let key = request::allocation_key(&current);
    let allocation = store::allocations::lock_by_key(&mut tx, &key).await?;
    let refund = request::delete(&current, actor, allocation.as_ref())?;

    let mut entry = None;
    if let Some(change) = refund {
        entry = persist_balance(&mut tx, change).await?.1;
    }
    requests::delete(&mut tx, id).await?;
    tx.commit().await?;

    log_committed(entry.as_ref());
    info!(request_id = id, status = %current.status, "Leave request deleted");
    Ok(())
}

#[instrument(skip(pool, actor, patch), fields(user_id = actor.user_id))]
pub async fn update(
    pool: &MySqlPool,
    actor: &Actor,
    id: u64,
    patch: LeaveRequestPatch,
) -> AppResult<LeaveRequest> {
    let mut tx = pool.begin().await?;
    let (_, current) = lock_request(&mut tx, actor, id).await?;

    let target = patch.target_key(&current);
    let allocation = store::allocations::lock_by_key(&mut tx, &target).await?;
    let others = requests::active_for_employee(&mut tx, current.employee_id).await?;
    let edit = request::edit(&current, &patch, actor, allocation.as_ref(), &others)?;

    requests::update(&mut tx, &edit.request).await?;
    let mut entry = None;
    if let Some(change) = edit.balance {
        entry = persist_balance(&mut tx, change).await?.1;
    }
    tx.commit().await?;

    log_committed(entry.as_ref());
    info!(request_id = id, days = edit.request.days_taken, "Leave request updated");
    Ok(edit.request)
}

pub async fn get(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<LeaveRequest> {
    let mut conn = pool.acquire().await?;
    let found = reload(&mut conn, id).await?;
    let employee = employees::get(&mut conn, found.employee_id).await?;
    actor.ensure_organization(employee.organization_id)?;
    actor.ensure_can_view_request(&employee)?;
    Ok(found)
}

/// Non-admins are narrowed to their own requests.
pub async fn list(
    pool: &MySqlPool,
    actor: &Actor,
    mut filter: LeaveRequestFilter,
) -> AppResult<Listing<LeaveRequest>> {
    if !actor.is_admin() {
        filter.employee_id = Some(actor.own_employee_id()?);
    }
    let mut conn = pool.acquire().await?;
    let rows = requests::list(&mut conn, actor.organization_id, &filter).await?;
    Ok(Listing::new(rows, filter.page()))
}
