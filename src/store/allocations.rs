use sqlx::MySqlConnection;

use crate::error::{AppError, AppResult};
use crate::leave::allocation::AllocationKey;
use crate::model::leave_allocation::LeaveAllocation;
use crate::store::filter::AllocationFilter;
use crate::store::parse_column;

#[derive(sqlx::FromRow)]
struct AllocationRow {
    id: u64,
    employee_id: u64,
    year: i32,
    leave_type: String,
    allocated: f64,
    used: f64,
}

impl TryFrom<AllocationRow> for LeaveAllocation {
    type Error = AppError;

    fn try_from(row: AllocationRow) -> AppResult<Self> {
        Ok(LeaveAllocation {
            id: row.id,
            employee_id: row.employee_id,
            year: row.year,
            leave_type: parse_column("leave_allocations.leave_type", &row.leave_type)?,
            allocated: row.allocated,
            used: row.used,
        })
    }
}

fn convert(rows: Vec<AllocationRow>) -> AppResult<Vec<LeaveAllocation>> {
    rows.into_iter().map(LeaveAllocation::try_from).collect()
}

pub async fn find(conn: &mut MySqlConnection, id: u64) -> AppResult<Option<LeaveAllocation>> {
    sqlx::query_as::<_, AllocationRow>(
        "SELECT id, employee_id, year, leave_type, allocated, used
         FROM leave_allocations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(LeaveAllocation::try_from)
    .transpose()
}

/// Row for (employee, year, leave type), locked for the rest of the
/// transaction.
pub async fn lock_by_key(
    conn: &mut MySqlConnection,
    key: &AllocationKey,
) -> AppResult<Option<LeaveAllocation>> {
    sqlx::query_as::<_, AllocationRow>(
        "SELECT id, employee_id, year, leave_type, allocated, used
         FROM leave_allocations
         WHERE employee_id = ? AND year = ? AND leave_type = ?
         FOR UPDATE",
    )
    .bind(key.employee_id)
    .bind(key.year)
    .bind(key.leave_type.to_string())
    .fetch_optional(&mut *conn)
    .await?
    .map(LeaveAllocation::try_from)
    .transpose()
}

pub async fn for_employee_year(
    conn: &mut MySqlConnection,
    employee_id: u64,
    year: i32,
) -> AppResult<Vec<LeaveAllocation>> {
    let rows = sqlx::query_as::<_, AllocationRow>(
        "SELECT id, employee_id, year, leave_type, allocated, used
         FROM leave_allocations WHERE employee_id = ? AND year = ?
         ORDER BY leave_type",
    )
    .bind(employee_id)
    .bind(year)
    .fetch_all(&mut *conn)
    .await?;
    convert(rows)
}

pub async fn list(
    conn: &mut MySqlConnection,
    organization_id: u64,
    filter: &AllocationFilter,
) -> AppResult<(Vec<LeaveAllocation>, i64)> {
    let clause = filter.where_clause(organization_id);
    let page = filter.page();

    let count_sql = format!(
        "SELECT COUNT(*) FROM leave_allocations a JOIN employees e ON e.id = a.employee_id{}",
        clause.sql
    );
    let total = clause
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(&mut *conn)
        .await?;

    let data_sql = format!(
        "SELECT a.id, a.employee_id, a.year, a.leave_type, a.allocated, a.used
         FROM leave_allocations a JOIN employees e ON e.id = a.employee_id{}
         ORDER BY a.year DESC, a.employee_id, a.leave_type LIMIT ? OFFSET ?",
        clause.sql
    );
    let rows = clause
        .bind_as(sqlx::query_as::<_, AllocationRow>(&data_sql))
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

    Ok((convert(rows)?, total))
}

pub async fn insert(conn: &mut MySqlConnection, a: &LeaveAllocation) -> AppResult<u64> {
    let id = sqlx::query(
        "INSERT INTO leave_allocations (employee_id, year, leave_type, allocated, used)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(a.employee_id)
    .bind(a.year)
    .bind(a.leave_type.to_string())
    .bind(a.allocated)
    .bind(a.used)
    .execute(&mut *conn)
    .await?
    .last_insert_id();
    Ok(id)
}

pub async fn update(conn: &mut MySqlConnection, a: &LeaveAllocation) -> AppResult<()> {
    sqlx::query("UPDATE leave_allocations SET allocated = ?, used = ? WHERE id = ?")
        .bind(a.allocated)
        .bind(a.used)
        .bind(a.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut MySqlConnection, id: u64) -> AppResult<()> {
    sqlx::query("DELETE FROM leave_allocations WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
