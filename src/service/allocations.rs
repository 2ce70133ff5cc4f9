use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::leave::actor::Actor;
use crate::leave::allocation::{self, AllocationKey, AllocationPatch};
use crate::leave::batch::{BatchFailure, BatchResult};
use crate::model::employee::Employee;
use crate::model::leave_allocation::LeaveAllocation;
use crate::model::leave_grade::LeavePolicy;
use crate::model::leave_ledger::{LedgerEntry, NewLedgerEntry};
use crate::model::leave_type::LeaveType;
use crate::service::{Listing, log_committed, persist_balance};
use crate::store::filter::{AllocationFilter, Page};
use crate::store::{self, employees};

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewAllocation {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2024)]
    pub year: i32,
    pub leave_type: LeaveType,
    #[schema(example = 20.0)]
    pub allocated: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkAllocateInput {
    #[schema(example = 2024)]
    pub year: i32,
    pub leave_grade_id: Option<u64>,
    pub employee_ids: Option<Vec<u64>>,
}

#[derive(Debug)]
pub struct BulkAllocation {
    /// Employees that were looked at, successful or not
    pub employees: Vec<u64>,
    pub result: BatchResult<LeaveAllocation, BatchFailure>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImportRecord {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = 2024)]
    pub year: i32,
    pub leave_type: LeaveType,
    #[schema(example = 20.0)]
    pub allocated: f64,
    #[serde(default)]
    #[schema(example = 3.0)]
    pub used: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustmentInput {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2024)]
    pub year: i32,
    pub leave_type: LeaveType,
    /// Positive credits days, negative debits them
    #[schema(example = -1.5)]
    pub amount: f64,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CarryForwardInput {
    /// Closing year; balances roll into `from_year + 1`
    #[schema(example = 2024)]
    pub from_year: i32,
    pub employee_ids: Option<Vec<u64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CarriedBalance {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub carried: f64,
    pub expired: f64,
}

/// Employee row, locked, and checked against the caller's organization.
async fn lock_employee(
    conn: &mut MySqlConnection,
    actor: &Actor,
    employee_id: u64,
) -> AppResult<Employee> {
    let employee = employees::lock(conn, employee_id).await?;
    actor.ensure_organization(employee.organization_id)?;
    Ok(employee)
}

/// Loads an allocation by id and re-reads it under lock, after the owning
/// employee's row lock.
async fn lock_allocation(
    conn: &mut MySqlConnection,
    actor: &Actor,
    id: u64,
) -> AppResult<LeaveAllocation> {
    let found = store::allocations::find(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave allocation not found"))?;
    lock_employee(conn, actor, found.employee_id).await?;

    let key = AllocationKey {
        employee_id: found.employee_id,
        year: found.year,
        leave_type: found.leave_type,
    };
    store::allocations::lock_by_key(conn, &key)
        .await?
        .ok_or_else(|| AppError::not_found("Leave allocation not found"))
}

#[instrument(skip(pool, actor), fields(user_id = actor.user_id))]
pub async fn create(
    pool: &MySqlPool,
    actor: &Actor,
    input: NewAllocation,
) -> AppResult<LeaveAllocation> {
    actor.require_admin()?;
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, actor, input.employee_id).await?;

    let key = AllocationKey {
        employee_id: input.employee_id,
        year: input.year,
        leave_type: input.leave_type,
    };
    let existing = store::allocations::lock_by_key(&mut tx, &key).await?;
    let change = allocation::create(key, existing.as_ref(), input.allocated)?;
    let (saved, entry) = persist_balance(&mut tx, change).await?;
    tx.commit().await?;

    log_committed(entry.as_ref());
    Ok(saved)
}

pub async fn get(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<LeaveAllocation> {
    let mut conn = pool.acquire().await?;
    let found = store::allocations::find(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave allocation not found"))?;
    let employee = employees::get(&mut conn, found.employee_id).await?;
    actor.ensure_organization(employee.organization_id)?;
    actor.ensure_can_view_employee(employee.id)?;
    Ok(found)
}

/// Non-admins only ever see their own rows, whatever the filter says.
pub async fn list(
    pool: &MySqlPool,
    actor: &Actor,
    mut filter: AllocationFilter,
) -> AppResult<Listing<LeaveAllocation>> {
    if !actor.is_admin() {
        filter.employee_id = Some(actor.own_employee_id()?);
    }
    let mut conn = pool.acquire().await?;
    let rows = store::allocations::list(&mut conn, actor.organization_id, &filter).await?;
    Ok(Listing::new(rows, filter.page()))
}

#[instrument(skip(pool, actor, patch), fields(user_id = actor.user_id))]
pub async fn update(
    pool: &MySqlPool,
    actor: &Actor,
    id: u64,
    patch: AllocationPatch,
) -> AppResult<LeaveAllocation> {
    actor.require_admin()?;
    let mut tx = pool.begin().await?;
    let current = lock_allocation(&mut tx, actor, id).await?;
    let change = allocation::apply_patch(&current, &patch)?;
    let (saved, entry) = persist_balance(&mut tx, change).await?;
    tx.commit().await?;

    log_committed(entry.as_ref());
    Ok(saved)
}

#[instrument(skip(pool, actor), fields(user_id = actor.user_id))]
pub async fn delete(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<()> {
    actor.require_admin()?;
    let mut tx = pool.begin().await?;
    let current = lock_allocation(&mut tx, actor, id).await?;
    let entry = allocation::ensure_deletable(&current)?;
    store::allocations::delete(&mut tx, current.id).await?;
    if let Some(entry) = &entry {
        store::ledger::append(&mut tx, entry).await?;
    }
    tx.commit().await?;

    log_committed(entry.as_ref());
    Ok(())
}

async fn upsert_one(
    pool: &MySqlPool,
    actor: &Actor,
    employee_id: u64,
    year: i32,
    policy: &LeavePolicy,
) -> AppResult<LeaveAllocation> {
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, actor, employee_id).await?;
    let key = AllocationKey {
        employee_id,
        year,
        leave_type: policy.leave_type,
    };
    let existing = store::allocations::lock_by_key(&mut tx, &key).await?;
    let change = allocation::upsert_from_policy(key, existing.as_ref(), policy.total_days)?;
    let (saved, entry) = persist_balance(&mut tx, change).await?;
    tx.commit().await?;

    log_committed(entry.as_ref());
    Ok(saved)
}

/// Policies of every grade the targets belong to, read once per grade.
async fn load_policies(
    conn: &mut MySqlConnection,
    targets: &[Employee],
) -> AppResult<HashMap<u64, Vec<LeavePolicy>>> {
    let mut by_grade = HashMap::new();
    for grade_id in targets.iter().filter_map(|e| e.leave_grade_id) {
        if !by_grade.contains_key(&grade_id) {
            let policies = store::grades::policies(conn, grade_id).await?;
            by_grade.insert(grade_id, policies);
        }
    }
    Ok(by_grade)
}

/// Runs `upsert` for every (employee, policy) pair of the batch. Employees
/// without a grade are reported and skipped.
async fn allocate_each<'a, Fut>(
    targets: &'a [Employee],
    policies: &'a HashMap<u64, Vec<LeavePolicy>>,
    mut upsert: impl FnMut(&'a Employee, &'a LeavePolicy) -> Fut,
) -> BatchResult<LeaveAllocation, BatchFailure>
where
    Fut: Future<Output = AppResult<LeaveAllocation>>,
{
    let mut result = BatchResult::default();
    for employee in targets {
        let Some(grade_id) = employee.leave_grade_id else {
            warn!(employee_id = employee.id, "Skipping employee without leave grade");
            result.push_err(BatchFailure::new(employee.id, "No leave grade assigned"));
            continue;
        };
        let grade_policies = policies.get(&grade_id).map(Vec::as_slice).unwrap_or(&[]);

        result
            .run_each(
                grade_policies,
                |policy| upsert(employee, policy),
                |policy, e| {
                    error!(
                        employee_id = employee.id,
                        leave_type = %policy.leave_type,
                        error = %e,
                        "Failed to allocate leave"
                    );
                    BatchFailure::new(format!("{}:{}", employee.id, policy.leave_type), e)
                },
            )
            .await;
    }
    result
}

/// Grade-driven allocation. Each (employee, policy) pair is its own
/// transaction; a failing pair is logged and reported, never fatal.
#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id, year = input.year))]
pub async fn bulk_allocate(
    pool: &MySqlPool,
    actor: &Actor,
    input: BulkAllocateInput,
) -> AppResult<BulkAllocation> {
    actor.require_admin()?;
    let mut conn = pool.acquire().await?;
    let targets = employees::select(
        &mut conn,
        actor.organization_id,
        input.leave_grade_id,
        input.employee_ids.as_deref(),
    )
    .await?;
    if targets.is_empty() {
        return Err(AppError::bad_request("No employees found for allocation"));
    }
    let policies = load_policies(&mut conn, &targets).await?;
    drop(conn);

    let year = input.year;
    let result = allocate_each(&targets, &policies, |employee, policy| {
        upsert_one(pool, actor, employee.id, year, policy)
    })
    .await;
    let processed: Vec<u64> = targets.iter().map(|e| e.id).collect();

    info!(
        allocated = result.succeeded.len(),
        failed = result.failed.len(),
        employees = processed.len(),
        "Bulk allocation finished"
    );
    Ok(BulkAllocation {
        employees: processed,
        result,
    })
}

async fn import_one(
    pool: &MySqlPool,
    actor: &Actor,
    record: &ImportRecord,
) -> AppResult<LeaveAllocation> {
    let mut tx = pool.begin().await?;
    let employee = employees::find_by_code(&mut tx, actor.organization_id, &record.employee_code)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;
    lock_employee(&mut tx, actor, employee.id).await?;

    let key = AllocationKey {
        employee_id: employee.id,
        year: record.year,
        leave_type: record.leave_type,
    };
    let existing = store::allocations::lock_by_key(&mut tx, &key).await?;
    let change = allocation::import(key, existing.as_ref(), record.allocated, record.used)?;
    let (saved, entry) = persist_balance(&mut tx, change).await?;
    tx.commit().await?;

    log_committed(entry.as_ref());
    Ok(saved)
}

/// Runs `import` for every record. A failing record is reported under its
/// employee code and the rest still go through.
async fn import_each<'a, Fut>(
    records: &'a [ImportRecord],
    import: impl FnMut(&'a ImportRecord) -> Fut,
) -> BatchResult<LeaveAllocation, BatchFailure>
where
    Fut: Future<Output = AppResult<LeaveAllocation>>,
{
    let mut result = BatchResult::default();
    result
        .run_each(records, import, |record, e| {
            warn!(
                employee_code = %record.employee_code,
                leave_type = %record.leave_type,
                error = %e,
                "Leave import record failed"
            );
            BatchFailure::new(&record.employee_code, e)
        })
        .await;
    result
}

/// Balance import keyed by employee code. Unknown codes and invalid rows
/// are reported per record; the rest still go through.
#[instrument(skip(pool, actor, records), fields(user_id = actor.user_id, records = records.len()))]
pub async fn import_leaves(
    pool: &MySqlPool,
    actor: &Actor,
    records: Vec<ImportRecord>,
) -> AppResult<BatchResult<LeaveAllocation, BatchFailure>> {
    actor.require_admin()?;
    let result = import_each(&records, |record| import_one(pool, actor, record)).await;

    info!(
        imported = result.succeeded.len(),
        failed = result.failed.len(),
        "Leave import finished"
    );
    Ok(result)
}

#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id, employee_id = input.employee_id))]
pub async fn adjust(
    pool: &MySqlPool,
    actor: &Actor,
    input: AdjustmentInput,
) -> AppResult<LeaveAllocation> {
    actor.require_admin()?;
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, actor, input.employee_id).await?;

    let key = AllocationKey {
        employee_id: input.employee_id,
        year: input.year,
        leave_type: input.leave_type,
    };
    let existing = store::allocations::lock_by_key(&mut tx, &key).await?;
    let change = allocation::adjust(key, existing.as_ref(), input.amount, input.remarks.as_deref())?;
    let (saved, entry) = persist_balance(&mut tx, change).await?;
    tx.commit().await?;

    log_committed(entry.as_ref());
    Ok(saved)
}

async fn carry_one(
    pool: &MySqlPool,
    actor: &Actor,
    closing: &LeaveAllocation,
    policy: Option<&LeavePolicy>,
) -> AppResult<Option<CarriedBalance>> {
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, actor, closing.employee_id).await?;

    let closing_key = AllocationKey {
        employee_id: closing.employee_id,
        year: closing.year,
        leave_type: closing.leave_type,
    };
    let Some(closing) = store::allocations::lock_by_key(&mut tx, &closing_key).await? else {
        return Ok(None);
    };
    let next_key = AllocationKey {
        year: closing.year + 1,
        ..closing_key
    };
    let next = store::allocations::lock_by_key(&mut tx, &next_key).await?;
    let rollover = allocation::roll_over(&closing, next.as_ref(), policy);

    let marker: Option<&NewLedgerEntry> = rollover
        .credit
        .as_ref()
        .and_then(|c| c.entry.as_ref())
        .or(rollover.expiry.as_ref());
    let Some(marker) = marker else {
        return Ok(None);
    };
    if store::ledger::exists(&mut tx, marker).await? {
        return Err(AppError::bad_request(format!(
            "{} balance of {} already carried forward",
            closing.leave_type, closing.year
        )));
    }

    let mut committed = Vec::new();
    if let Some(credit) = rollover.credit {
        let (_, entry) = persist_balance(&mut tx, credit).await?;
        committed.extend(entry);
    }
    if let Some(expiry) = rollover.expiry {
        store::ledger::append(&mut tx, &expiry).await?;
        committed.push(expiry);
    }
    tx.commit().await?;

    for entry in &committed {
        log_committed(Some(entry));
    }
    Ok(Some(CarriedBalance {
        employee_id: closing.employee_id,
        leave_type: closing.leave_type,
        carried: rollover.outcome.carried,
        expired: rollover.outcome.expired,
    }))
}

/// Year-end rollover of every allocation of `from_year`, per the
/// employee's grade policy for that leave type.
#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id, from_year = input.from_year))]
pub async fn carry_forward(
    pool: &MySqlPool,
    actor: &Actor,
    input: CarryForwardInput,
) -> AppResult<BatchResult<CarriedBalance, BatchFailure>> {
    actor.require_admin()?;
    let mut conn = pool.acquire().await?;
    let targets = employees::select(
        &mut conn,
        actor.organization_id,
        None,
        input.employee_ids.as_deref(),
    )
    .await?;
    if targets.is_empty() {
        return Err(AppError::bad_request("No employees found for carry forward"));
    }

    let policies = load_policies(&mut conn, &targets).await?;
    let mut result: BatchResult<CarriedBalance, BatchFailure> = BatchResult::default();

    for employee in &targets {
        let grade_policies = employee
            .leave_grade_id
            .and_then(|grade_id| policies.get(&grade_id))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let closing =
            store::allocations::for_employee_year(&mut conn, employee.id, input.from_year).await?;

        result
            .run_each(
                &closing,
                |allocation| {
                    let policy = grade_policies
                        .iter()
                        .find(|p| p.leave_type == allocation.leave_type);
                    carry_one(pool, actor, allocation, policy)
                },
                |allocation, e| {
                    warn!(
                        employee_id = employee.id,
                        leave_type = %allocation.leave_type,
                        error = %e,
                        "Carry forward failed"
                    );
                    BatchFailure::new(format!("{}:{}", employee.id, allocation.leave_type), e)
                },
            )
            .await;
    }

    info!(
        carried = result.succeeded.len(),
        failed = result.failed.len(),
        "Carry forward finished"
    );
    Ok(result)
}

/// Every allocation of the employee for `year`. The year is always passed
/// in; this never reads the clock.
pub async fn balances(
    pool: &MySqlPool,
    actor: &Actor,
    employee_id: u64,
    year: i32,
) -> AppResult<Vec<LeaveAllocation>> {
    actor.ensure_can_view_employee(employee_id)?;
    let mut conn = pool.acquire().await?;
    let employee = employees::get(&mut conn, employee_id).await?;
    actor.ensure_organization(employee.organization_id)?;
    store::allocations::for_employee_year(&mut conn, employee_id, year).await
}

pub async fn ledger(
    pool: &MySqlPool,
    actor: &Actor,
    employee_id: u64,
    page: Page,
) -> AppResult<Listing<LedgerEntry>> {
    actor.ensure_can_view_employee(employee_id)?;
    let mut conn = pool.acquire().await?;
    let employee = employees::get(&mut conn, employee_id).await?;
    actor.ensure_organization(employee.organization_id)?;
    let rows = store::ledger::for_employee(&mut conn, employee_id, page).await?;
    Ok(Listing::new(rows, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn employee(id: u64, grade: Option<u64>) -> Employee {
        Employee {
            id,
            organization_id: 1,
            employee_code: format!("EMP-{:03}", id),
            first_name: "Test".to_string(),
            last_name: format!("Employee {}", id),
            status: "ACTIVE".to_string(),
            joining_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            user_id: None,
            manager_id: None,
            leave_grade_id: grade,
        }
    }

    fn policy(id: u64, leave_type: LeaveType, total_days: f64) -> LeavePolicy {
        LeavePolicy {
            id,
            leave_grade_id: 7,
            leave_type,
            total_days,
            carry_forward: false,
            max_carry_amount: 0.0,
        }
    }

    fn allocated(employee_id: u64, policy: &LeavePolicy) -> LeaveAllocation {
        LeaveAllocation {
            id: employee_id * 10 + policy.id,
            employee_id,
            year: 2025,
            leave_type: policy.leave_type,
            allocated: policy.total_days,
            used: 0.0,
        }
    }

    fn record(code: &str) -> ImportRecord {
        ImportRecord {
            employee_code: code.to_string(),
            year: 2024,
            leave_type: LeaveType::Annual,
            allocated: 20.0,
            used: 2.0,
        }
    }

    #[actix_web::test]
    async fn bulk_allocation_continues_past_failed_pairs() {
        let targets = vec![employee(1, Some(7)), employee(2, None), employee(3, Some(7))];
        let mut policies = HashMap::new();
        policies.insert(
            7,
            vec![
                policy(1, LeaveType::Annual, 20.0),
                policy(2, LeaveType::Sick, 10.0),
                policy(3, LeaveType::Casual, 5.0),
            ],
        );

        let result = allocate_each(&targets, &policies, |employee, policy| async move {
            if employee.id == 1 && policy.leave_type == LeaveType::Sick {
                Err(AppError::bad_request("Policy quota 10 is below the 12 days already used"))
            } else {
                Ok(allocated(employee.id, policy))
            }
        })
        .await;

        assert_eq!(result.succeeded.len(), 5);
        assert!(result.succeeded.iter().any(|a| a.employee_id == 3 && a.leave_type == LeaveType::Sick));
        assert_eq!(
            result.failed,
            vec![
                BatchFailure::new(
                    "1:SICK",
                    "Policy quota 10 is below the 12 days already used"
                ),
                BatchFailure::new(2, "No leave grade assigned"),
            ]
        );
    }

    #[actix_web::test]
    async fn import_reports_unknown_codes_and_keeps_going() {
        let records = vec![record("EMP-001"), record("EMP-404"), record("EMP-003")];

        let result = import_each(&records, |record| async move {
            match record.employee_code.as_str() {
                "EMP-001" => Ok(allocated(1, &policy(1, record.leave_type, record.allocated))),
                "EMP-003" => Ok(allocated(3, &policy(1, record.leave_type, record.allocated))),
                _ => Err(AppError::not_found("Employee not found")),
            }
        })
        .await;

        let imported: Vec<u64> = result.succeeded.iter().map(|a| a.employee_id).collect();
        assert_eq!(imported, vec![1, 3]);
        assert_eq!(
            result.failed,
            vec![BatchFailure::new("EMP-404", "Employee not found")]
        );
    }
}
