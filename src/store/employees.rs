use sqlx::MySqlConnection;

use crate::error::{AppError, AppResult};
use crate::model::employee::Employee;
use crate::store::filter::placeholders;

const COLUMNS: &str = "id, organization_id, employee_code, first_name, last_name, status, \
                       joining_date, user_id, manager_id, leave_grade_id";

pub async fn find(conn: &mut MySqlConnection, id: u64) -> AppResult<Option<Employee>> {
    let sql = format!("SELECT {} FROM employees WHERE id = ?", COLUMNS);
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(employee)
}

pub async fn get(conn: &mut MySqlConnection, id: u64) -> AppResult<Employee> {
    find(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))
}

/// Takes the employee row lock. Every balance mutation for an employee
/// goes through this first, so two writers on the same employee queue up
/// instead of racing on the allocation rows.
pub async fn lock(conn: &mut MySqlConnection, id: u64) -> AppResult<Employee> {
    let sql = format!("SELECT {} FROM employees WHERE id = ? FOR UPDATE", COLUMNS);
    sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))
}

pub async fn find_by_code(
    conn: &mut MySqlConnection,
    organization_id: u64,
    employee_code: &str,
) -> AppResult<Option<Employee>> {
    let sql = format!(
        "SELECT {} FROM employees WHERE organization_id = ? AND employee_code = ?",
        COLUMNS
    );
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(organization_id)
        .bind(employee_code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(employee)
}

/// Employees of an organization, optionally narrowed to one grade and/or
/// an explicit id list.
pub async fn select(
    conn: &mut MySqlConnection,
    organization_id: u64,
    leave_grade_id: Option<u64>,
    employee_ids: Option<&[u64]>,
) -> AppResult<Vec<Employee>> {
    let mut sql = format!(
        "SELECT {} FROM employees WHERE organization_id = ?",
        COLUMNS
    );
    if leave_grade_id.is_some() {
        sql.push_str(" AND leave_grade_id = ?");
    }
    if let Some(ids) = employee_ids {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sql.push_str(&format!(" AND id IN ({})", placeholders(ids.len())));
    }
    sql.push_str(" ORDER BY id");

    let mut q = sqlx::query_as::<_, Employee>(&sql).bind(organization_id);
    if let Some(grade) = leave_grade_id {
        q = q.bind(grade);
    }
    for id in employee_ids.unwrap_or(&[]) {
        q = q.bind(*id);
    }
    Ok(q.fetch_all(&mut *conn).await?)
}

pub async fn count_by_grade(conn: &mut MySqlConnection, leave_grade_id: u64) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM employees WHERE leave_grade_id = ?",
    )
    .bind(leave_grade_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}
