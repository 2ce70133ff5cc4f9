use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlConnection;

use crate::error::AppResult;
use crate::model::attendance::Attendance;

pub async fn for_day(
    conn: &mut MySqlConnection,
    employee_id: u64,
    date: NaiveDate,
) -> AppResult<Option<Attendance>> {
    let row = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, work_minutes
        FROM attendance
        WHERE employee_id = ? AND date = ?
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn check_in(
    conn: &mut MySqlConnection,
    employee_id: u64,
    at: NaiveDateTime,
) -> AppResult<u64> {
    let id = sqlx::query("INSERT INTO attendance (employee_id, date, check_in) VALUES (?, ?, ?)")
        .bind(employee_id)
        .bind(at.date())
        .bind(at)
        .execute(&mut *conn)
        .await?
        .last_insert_id();
    Ok(id)
}

pub async fn check_out(
    conn: &mut MySqlConnection,
    id: u64,
    at: NaiveDateTime,
    work_minutes: i32,
) -> AppResult<()> {
    sqlx::query("UPDATE attendance SET check_out = ?, work_minutes = ? WHERE id = ?")
        .bind(at)
        .bind(work_minutes)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
