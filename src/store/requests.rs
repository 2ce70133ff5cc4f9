use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlConnection;

use crate::error::{AppError, AppResult};
use crate::leave::request::NewLeaveRequest;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::store::filter::LeaveRequestFilter;
use crate::store::parse_column;

const COLUMNS: &str = "r.id, r.employee_id, r.leave_type, r.duration, r.start_date, r.end_date, \
                       r.days_taken, r.reason, r.day_details, r.status, r.approved_by, \
                       r.remarks, r.created_at";

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    duration: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days_taken: f64,
    reason: Option<String>,
    day_details: Option<String>,
    status: String,
    approved_by: Option<u64>,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for LeaveRequest {
    type Error = AppError;

    fn try_from(row: RequestRow) -> AppResult<Self> {
        let day_details = match row.day_details.as_deref() {
            None | Some("") => None,
            Some(json) => Some(serde_json::from_str::<Vec<NaiveDate>>(json).map_err(|e| {
                AppError::internal(format!("Bad day_details on leave request {}: {}", row.id, e))
            })?),
        };
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: parse_column("leave_requests.leave_type", &row.leave_type)?,
            duration: parse_column("leave_requests.duration", &row.duration)?,
            start_date: row.start_date,
            end_date: row.end_date,
            days_taken: row.days_taken,
            reason: row.reason,
            day_details,
            status: parse_column("leave_requests.status", &row.status)?,
            approved_by: row.approved_by,
            remarks: row.remarks,
            created_at: row.created_at,
        })
    }
}

fn convert(rows: Vec<RequestRow>) -> AppResult<Vec<LeaveRequest>> {
    rows.into_iter().map(LeaveRequest::try_from).collect()
}

fn details_json(details: Option<&Vec<NaiveDate>>) -> AppResult<Option<String>> {
    details
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| AppError::internal(format!("Cannot encode day_details: {}", e)))
}

pub async fn find(conn: &mut MySqlConnection, id: u64) -> AppResult<Option<LeaveRequest>> {
    let sql = format!("SELECT {} FROM leave_requests r WHERE r.id = ?", COLUMNS);
    sqlx::query_as::<_, RequestRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(LeaveRequest::try_from)
        .transpose()
}

/// Same row, locked until commit.
pub async fn lock(conn: &mut MySqlConnection, id: u64) -> AppResult<LeaveRequest> {
    let sql = format!(
        "SELECT {} FROM leave_requests r WHERE r.id = ? FOR UPDATE",
        COLUMNS
    );
    sqlx::query_as::<_, RequestRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(LeaveRequest::try_from)
        .transpose()?
        .ok_or_else(|| AppError::not_found("Leave request not found"))
}

/// PENDING and APPROVED requests of an employee, the ones that block
/// overlapping dates.
pub async fn active_for_employee(
    conn: &mut MySqlConnection,
    employee_id: u64,
) -> AppResult<Vec<LeaveRequest>> {
    let sql = format!(
        "SELECT {} FROM leave_requests r
         WHERE r.employee_id = ? AND r.status IN (?, ?)
         ORDER BY r.start_date",
        COLUMNS
    );
    let rows = sqlx::query_as::<_, RequestRow>(&sql)
        .bind(employee_id)
        .bind(LeaveStatus::Pending.to_string())
        .bind(LeaveStatus::Approved.to_string())
        .fetch_all(&mut *conn)
        .await?;
    convert(rows)
}

pub async fn list(
    conn: &mut MySqlConnection,
    organization_id: u64,
    filter: &LeaveRequestFilter,
) -> AppResult<(Vec<LeaveRequest>, i64)> {
    let clause = filter.where_clause(organization_id);
    let page = filter.page();

    let count_sql = format!(
        "SELECT COUNT(*) FROM leave_requests r JOIN employees e ON e.id = r.employee_id{}",
        clause.sql
    );
    let total = clause
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(&mut *conn)
        .await?;

    let data_sql = format!(
        "SELECT {} FROM leave_requests r JOIN employees e ON e.id = r.employee_id{}
         ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?",
        COLUMNS, clause.sql
    );
    let rows = clause
        .bind_as(sqlx::query_as::<_, RequestRow>(&data_sql))
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

    Ok((convert(rows)?, total))
}

pub async fn insert(conn: &mut MySqlConnection, new: &NewLeaveRequest) -> AppResult<LeaveRequest> {
    let id = sqlx::query(
        "INSERT INTO leave_requests
            (employee_id, leave_type, duration, start_date, end_date, days_taken,
             reason, day_details, status, approved_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new.employee_id)
    .bind(new.leave_type.to_string())
    .bind(new.duration.to_string())
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(new.days_taken)
    .bind(&new.reason)
    .bind(details_json(new.day_details.as_ref())?)
    .bind(new.status.to_string())
    .bind(new.approved_by)
    .execute(&mut *conn)
    .await?
    .last_insert_id();

    find(conn, id)
        .await?
        .ok_or_else(|| AppError::internal("Inserted leave request vanished"))
}

pub async fn set_status(
    conn: &mut MySqlConnection,
    id: u64,
    status: LeaveStatus,
    approved_by: Option<u64>,
    remarks: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE leave_requests
         SET status = ?, approved_by = COALESCE(?, approved_by), remarks = COALESCE(?, remarks)
         WHERE id = ?",
    )
    .bind(status.to_string())
    .bind(approved_by)
    .bind(remarks)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes back every editable column of an edited request.
pub async fn update(conn: &mut MySqlConnection, r: &LeaveRequest) -> AppResult<()> {
    sqlx::query(
        "UPDATE leave_requests
         SET leave_type = ?, duration = ?, start_date = ?, end_date = ?, days_taken = ?,
             reason = ?, day_details = ?
         WHERE id = ?",
    )
    .bind(r.leave_type.to_string())
    .bind(r.duration.to_string())
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(r.days_taken)
    .bind(&r.reason)
    .bind(details_json(r.day_details.as_ref())?)
    .bind(r.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut MySqlConnection, id: u64) -> AppResult<()> {
    sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
