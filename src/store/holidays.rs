use chrono::NaiveDate;
use sqlx::MySqlConnection;

use crate::error::AppResult;
use crate::model::holiday::{Holiday, HolidayCalendar, HolidayInput};
use crate::store::filter::Page;

const HOLIDAY_COLUMNS: &str = "id, calendar_id, name, date, end_date, description";

#[derive(sqlx::FromRow)]
struct CalendarRow {
    id: u64,
    organization_id: u64,
    name: String,
    description: Option<String>,
    year: i32,
}

async fn with_holidays(conn: &mut MySqlConnection, row: CalendarRow) -> AppResult<HolidayCalendar> {
    let holidays = holidays_of(conn, row.id).await?;
    Ok(HolidayCalendar {
        id: row.id,
        organization_id: row.organization_id,
        name: row.name,
        description: row.description,
        year: row.year,
        holidays,
    })
}

pub async fn find_calendar(
    conn: &mut MySqlConnection,
    id: u64,
) -> AppResult<Option<HolidayCalendar>> {
    let row = sqlx::query_as::<_, CalendarRow>(
        "SELECT id, organization_id, name, description, year FROM holiday_calendars WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => Ok(Some(with_holidays(conn, row).await?)),
        None => Ok(None),
    }
}

pub async fn calendar_name_taken(
    conn: &mut MySqlConnection,
    organization_id: u64,
    name: &str,
    year: i32,
    except_id: Option<u64>,
) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM holiday_calendars
         WHERE organization_id = ? AND name = ? AND year = ? AND id <> ?",
    )
    .bind(organization_id)
    .bind(name)
    .bind(year)
    .bind(except_id.unwrap_or(0))
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

pub async fn list_calendars(
    conn: &mut MySqlConnection,
    organization_id: u64,
    page: Page,
) -> AppResult<(Vec<HolidayCalendar>, i64)> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM holiday_calendars WHERE organization_id = ?",
    )
    .bind(organization_id)
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query_as::<_, CalendarRow>(
        "SELECT id, organization_id, name, description, year FROM holiday_calendars
         WHERE organization_id = ? ORDER BY year DESC, name LIMIT ? OFFSET ?",
    )
    .bind(organization_id)
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(&mut *conn)
    .await?;

    let mut calendars = Vec::with_capacity(rows.len());
    for row in rows {
        calendars.push(with_holidays(conn, row).await?);
    }
    Ok((calendars, total))
}

pub async fn insert_calendar(
    conn: &mut MySqlConnection,
    organization_id: u64,
    name: &str,
    description: Option<&str>,
    year: i32,
) -> AppResult<u64> {
    let id = sqlx::query(
        "INSERT INTO holiday_calendars (organization_id, name, description, year) VALUES (?, ?, ?, ?)",
    )
    .bind(organization_id)
    .bind(name)
    .bind(description)
    .bind(year)
    .execute(&mut *conn)
    .await?
    .last_insert_id();
    Ok(id)
}

pub async fn update_calendar(conn: &mut MySqlConnection, calendar: &HolidayCalendar) -> AppResult<()> {
    sqlx::query("UPDATE holiday_calendars SET name = ?, description = ?, year = ? WHERE id = ?")
        .bind(&calendar.name)
        .bind(&calendar.description)
        .bind(calendar.year)
        .bind(calendar.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Holidays go with the calendar; assigned employees fall back to none.
pub async fn delete_calendar(conn: &mut MySqlConnection, id: u64) -> AppResult<()> {
    sqlx::query("UPDATE employees SET holiday_calendar_id = NULL WHERE holiday_calendar_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM holiday_calendars WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn holidays_of(conn: &mut MySqlConnection, calendar_id: u64) -> AppResult<Vec<Holiday>> {
    let sql = format!(
        "SELECT {} FROM holidays WHERE calendar_id = ? ORDER BY date",
        HOLIDAY_COLUMNS
    );
    let rows = sqlx::query_as::<_, Holiday>(&sql)
        .bind(calendar_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn find_holiday(conn: &mut MySqlConnection, id: u64) -> AppResult<Option<Holiday>> {
    let sql = format!("SELECT {} FROM holidays WHERE id = ?", HOLIDAY_COLUMNS);
    let holiday = sqlx::query_as::<_, Holiday>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(holiday)
}

pub async fn date_taken(
    conn: &mut MySqlConnection,
    calendar_id: u64,
    date: NaiveDate,
    except_id: Option<u64>,
) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM holidays WHERE calendar_id = ? AND date = ? AND id <> ?",
    )
    .bind(calendar_id)
    .bind(date)
    .bind(except_id.unwrap_or(0))
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

pub async fn insert_holiday(
    conn: &mut MySqlConnection,
    calendar_id: u64,
    input: &HolidayInput,
) -> AppResult<u64> {
    let id = sqlx::query(
        "INSERT INTO holidays (calendar_id, name, date, end_date, description) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(calendar_id)
    .bind(input.name.trim())
    .bind(input.date)
    .bind(input.end_date)
    .bind(&input.description)
    .execute(&mut *conn)
    .await?
    .last_insert_id();
    Ok(id)
}

pub async fn update_holiday(
    conn: &mut MySqlConnection,
    id: u64,
    input: &HolidayInput,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE holidays SET name = ?, date = ?, end_date = ?, description = ? WHERE id = ?",
    )
    .bind(input.name.trim())
    .bind(input.date)
    .bind(input.end_date)
    .bind(&input.description)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_holiday(conn: &mut MySqlConnection, id: u64) -> AppResult<()> {
    sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Holidays not yet over on `from`, earliest first.
pub async fn upcoming(
    conn: &mut MySqlConnection,
    calendar_id: u64,
    from: NaiveDate,
    limit: u64,
) -> AppResult<Vec<Holiday>> {
    let sql = format!(
        "SELECT {} FROM holidays
         WHERE calendar_id = ? AND COALESCE(end_date, date) >= ?
         ORDER BY date LIMIT ?",
        HOLIDAY_COLUMNS
    );
    let rows = sqlx::query_as::<_, Holiday>(&sql)
        .bind(calendar_id)
        .bind(from)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn calendar_of_employee(
    conn: &mut MySqlConnection,
    employee_id: u64,
) -> AppResult<Option<u64>> {
    let calendar = sqlx::query_scalar::<_, Option<u64>>(
        "SELECT holiday_calendar_id FROM employees WHERE id = ?",
    )
    .bind(employee_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(calendar.flatten())
}

pub async fn assign(conn: &mut MySqlConnection, employee_id: u64, calendar_id: u64) -> AppResult<()> {
    sqlx::query("UPDATE employees SET holiday_calendar_id = ? WHERE id = ?")
        .bind(calendar_id)
        .bind(employee_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
