use chrono::{DateTime, Utc};
use sqlx::MySqlConnection;

use crate::error::{AppError, AppResult};
use crate::model::leave_ledger::{LedgerEntry, NewLedgerEntry};
use crate::store::filter::Page;
use crate::store::parse_column;

#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: u64,
    employee_id: u64,
    year: i32,
    leave_type: String,
    event: String,
    amount: f64,
    remarks: Option<String>,
    leave_request_id: Option<u64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerRow) -> AppResult<Self> {
        Ok(LedgerEntry {
            id: row.id,
            employee_id: row.employee_id,
            year: row.year,
            leave_type: parse_column("leave_ledger.leave_type", &row.leave_type)?,
            event: parse_column("leave_ledger.event", &row.event)?,
            amount: row.amount,
            remarks: row.remarks,
            leave_request_id: row.leave_request_id,
            created_at: row.created_at,
        })
    }
}

/// Append only; ledger rows are never updated or deleted.
pub async fn append(conn: &mut MySqlConnection, entry: &NewLedgerEntry) -> AppResult<u64> {
    let id = sqlx::query(
        "INSERT INTO leave_ledger
            (employee_id, year, leave_type, event, amount, remarks, leave_request_id)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.employee_id)
    .bind(entry.year)
    .bind(entry.leave_type.to_string())
    .bind(entry.event.to_string())
    .bind(entry.amount)
    .bind(&entry.remarks)
    .bind(entry.leave_request_id)
    .execute(&mut *conn)
    .await?
    .last_insert_id();
    Ok(id)
}

/// Newest first.
pub async fn for_employee(
    conn: &mut MySqlConnection,
    employee_id: u64,
    page: Page,
) -> AppResult<(Vec<LedgerEntry>, i64)> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_ledger WHERE employee_id = ?",
    )
    .bind(employee_id)
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query_as::<_, LedgerRow>(
        "SELECT id, employee_id, year, leave_type, event, amount, remarks, leave_request_id, created_at
         FROM leave_ledger WHERE employee_id = ?
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(employee_id)
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(&mut *conn)
    .await?;

    let entries = rows
        .into_iter()
        .map(LedgerEntry::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    Ok((entries, total))
}

/// True when an entry with exactly these attributes was already written.
pub async fn exists(
    conn: &mut MySqlConnection,
    entry: &NewLedgerEntry,
) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_ledger
         WHERE employee_id = ? AND year = ? AND leave_type = ? AND event = ? AND remarks = ?",
    )
    .bind(entry.employee_id)
    .bind(entry.year)
    .bind(entry.leave_type.to_string())
    .bind(entry.event.to_string())
    .bind(&entry.remarks)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}
