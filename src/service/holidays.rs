use std::collections::HashSet;
use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::leave::actor::Actor;
use crate::leave::batch::{BatchFailure, BatchResult};
use crate::model::holiday::{
    Holiday, HolidayCalendar, HolidayInput, calendar_name, ensure_within_year, split_new,
    validate_year,
};
use crate::service::Listing;
use crate::store::filter::Page;
use crate::store::{employees, holidays};

pub const DEFAULT_UPCOMING: u64 = 5;
pub const MAX_UPCOMING: u64 = 50;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CalendarInput {
    #[schema(example = "Head office")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 2025)]
    pub year: i32,
}

/// Fields left out stay as they are.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CalendarUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkHolidays {
    pub created: Vec<Holiday>,
    /// Dates the calendar already had, or that repeat within the payload
    #[schema(value_type = Vec<String>)]
    pub skipped: Vec<NaiveDate>,
}

pub fn upcoming_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_UPCOMING).clamp(1, MAX_UPCOMING)
}

async fn load(conn: &mut MySqlConnection, actor: &Actor, id: u64) -> AppResult<HolidayCalendar> {
    let calendar = holidays::find_calendar(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Holiday calendar not found"))?;
    actor.ensure_organization(calendar.organization_id)?;
    Ok(calendar)
}

async fn load_holiday(
    conn: &mut MySqlConnection,
    actor: &Actor,
    id: u64,
) -> AppResult<(HolidayCalendar, Holiday)> {
    let holiday = holidays::find_holiday(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Holiday not found"))?;
    let calendar = load(conn, actor, holiday.calendar_id).await?;
    Ok((calendar, holiday))
}

async fn ensure_unique_name(
    conn: &mut MySqlConnection,
    organization_id: u64,
    name: &str,
    year: i32,
    except_id: Option<u64>,
) -> AppResult<()> {
    if holidays::calendar_name_taken(conn, organization_id, name, year, except_id).await? {
        return Err(AppError::bad_request(format!(
            "Holiday calendar '{}' already exists for {}",
            name, year
        )));
    }
    Ok(())
}

async fn ensure_free_date(
    conn: &mut MySqlConnection,
    calendar_id: u64,
    date: NaiveDate,
    except_id: Option<u64>,
) -> AppResult<()> {
    if holidays::date_taken(conn, calendar_id, date, except_id).await? {
        return Err(AppError::bad_request(format!(
            "A holiday on {} already exists in this calendar",
            date
        )));
    }
    Ok(())
}

#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id))]
pub async fn create_calendar(
    pool: &MySqlPool,
    actor: &Actor,
    input: CalendarInput,
) -> AppResult<HolidayCalendar> {
    actor.require_admin()?;
    let name = calendar_name(&input.name)?;
    validate_year(input.year)?;

    let mut tx = pool.begin().await?;
    ensure_unique_name(&mut tx, actor.organization_id, &name, input.year, None).await?;
    let id = holidays::insert_calendar(
        &mut tx,
        actor.organization_id,
        &name,
        input.description.as_deref(),
        input.year,
    )
    .await?;
    let calendar = load(&mut tx, actor, id).await?;
    tx.commit().await?;

    info!(calendar_id = id, name = %calendar.name, year = calendar.year, "Holiday calendar created");
    Ok(calendar)
}

pub async fn list_calendars(
    pool: &MySqlPool,
    actor: &Actor,
    page: Page,
) -> AppResult<Listing<HolidayCalendar>> {
    let mut conn = pool.acquire().await?;
    let rows = holidays::list_calendars(&mut conn, actor.organization_id, page).await?;
    Ok(Listing::new(rows, page))
}

pub async fn get_calendar(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<HolidayCalendar> {
    let mut conn = pool.acquire().await?;
    load(&mut conn, actor, id).await
}

#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id))]
pub async fn update_calendar(
    pool: &MySqlPool,
    actor: &Actor,
    id: u64,
    input: CalendarUpdate,
) -> AppResult<HolidayCalendar> {
    actor.require_admin()?;

    let mut tx = pool.begin().await?;
    let mut calendar = load(&mut tx, actor, id).await?;
    if let Some(raw) = &input.name {
        calendar.name = calendar_name(raw)?;
    }
    if let Some(year) = input.year {
        validate_year(year)?;
        ensure_within_year(&calendar.holidays, year)?;
        calendar.year = year;
    }
    if input.description.is_some() {
        calendar.description = input.description;
    }
    ensure_unique_name(&mut tx, calendar.organization_id, &calendar.name, calendar.year, Some(id))
        .await?;
    holidays::update_calendar(&mut tx, &calendar).await?;
    tx.commit().await?;

    info!(calendar_id = id, "Holiday calendar updated");
    Ok(calendar)
}

#[instrument(skip(pool, actor), fields(user_id = actor.user_id))]
pub async fn delete_calendar(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<()> {
    actor.require_admin()?;
    let mut tx = pool.begin().await?;
    load(&mut tx, actor, id).await?;
    holidays::delete_calendar(&mut tx, id).await?;
    tx.commit().await?;

    info!(calendar_id = id, "Holiday calendar deleted");
    Ok(())
}

#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id))]
pub async fn add_holiday(
    pool: &MySqlPool,
    actor: &Actor,
    calendar_id: u64,
    input: HolidayInput,
) -> AppResult<Holiday> {
    actor.require_admin()?;

    let mut tx = pool.begin().await?;
    let calendar = load(&mut tx, actor, calendar_id).await?;
    input.validate(calendar.year)?;
    ensure_free_date(&mut tx, calendar_id, input.date, None).await?;
    let id = holidays::insert_holiday(&mut tx, calendar_id, &input).await?;
    let holiday = holidays::find_holiday(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::internal("Inserted holiday vanished"))?;
    tx.commit().await?;

    info!(calendar_id, holiday_id = id, date = %holiday.date, "Holiday added");
    Ok(holiday)
}

/// Adds many holidays at once. Every entry is validated first and one bad
/// entry rejects the whole payload; dates already taken are skipped.
#[instrument(skip(pool, actor, inputs), fields(user_id = actor.user_id, holidays = inputs.len()))]
pub async fn bulk_create(
    pool: &MySqlPool,
    actor: &Actor,
    calendar_id: u64,
    inputs: Vec<HolidayInput>,
) -> AppResult<BulkHolidays> {
    actor.require_admin()?;

    let mut tx = pool.begin().await?;
    let calendar = load(&mut tx, actor, calendar_id).await?;
    for input in &inputs {
        input.validate(calendar.year)?;
    }
    let taken: HashSet<NaiveDate> = calendar.holidays.iter().map(|h| h.date).collect();
    let (fresh, skipped) = split_new(&inputs, &taken);

    let mut created = Vec::with_capacity(fresh.len());
    for input in fresh {
        let id = holidays::insert_holiday(&mut tx, calendar_id, input).await?;
        created.push(Holiday {
            id,
            calendar_id,
            name: input.name.trim().to_string(),
            date: input.date,
            end_date: input.end_date,
            description: input.description.clone(),
        });
    }
    tx.commit().await?;

    info!(
        calendar_id,
        created = created.len(),
        skipped = skipped.len(),
        "Holidays bulk created"
    );
    Ok(BulkHolidays { created, skipped })
}

/// Replaces every field of a holiday.
#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id))]
pub async fn update_holiday(
    pool: &MySqlPool,
    actor: &Actor,
    id: u64,
    input: HolidayInput,
) -> AppResult<Holiday> {
    actor.require_admin()?;

    let mut tx = pool.begin().await?;
    let (calendar, current) = load_holiday(&mut tx, actor, id).await?;
    input.validate(calendar.year)?;
    if input.date != current.date {
        ensure_free_date(&mut tx, calendar.id, input.date, Some(id)).await?;
    }
    holidays::update_holiday(&mut tx, id, &input).await?;
    tx.commit().await?;

    info!(holiday_id = id, date = %input.date, "Holiday updated");
    Ok(Holiday {
        id,
        calendar_id: calendar.id,
        name: input.name.trim().to_string(),
        date: input.date,
        end_date: input.end_date,
        description: input.description,
    })
}

#[instrument(skip(pool, actor), fields(user_id = actor.user_id))]
pub async fn delete_holiday(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<()> {
    actor.require_admin()?;
    let mut tx = pool.begin().await?;
    load_holiday(&mut tx, actor, id).await?;
    holidays::delete_holiday(&mut tx, id).await?;
    tx.commit().await?;

    info!(holiday_id = id, "Holiday deleted");
    Ok(())
}

/// Holidays of the caller's calendar that are not over by `today`. A
/// caller without a calendar gets an empty list.
pub async fn upcoming(
    pool: &MySqlPool,
    actor: &Actor,
    today: NaiveDate,
    limit: u64,
) -> AppResult<Vec<Holiday>> {
    let employee_id = actor.own_employee_id()?;
    let mut conn = pool.acquire().await?;
    match holidays::calendar_of_employee(&mut conn, employee_id).await? {
        Some(calendar_id) => holidays::upcoming(&mut conn, calendar_id, today, limit).await,
        None => Ok(Vec::new()),
    }
}

async fn assign_each<'a, Fut>(
    employee_ids: &'a [u64],
    assign: impl FnMut(&'a u64) -> Fut,
) -> BatchResult<u64, BatchFailure>
where
    Fut: Future<Output = AppResult<u64>>,
{
    let mut result = BatchResult::default();
    result
        .run_each(employee_ids, assign, |employee_id, e| {
            warn!(employee_id, error = %e, "Holiday calendar assignment failed");
            BatchFailure::new(employee_id, e)
        })
        .await;
    result
}

async fn assign_one(
    pool: &MySqlPool,
    organization_id: u64,
    calendar_id: u64,
    employee_id: u64,
) -> AppResult<u64> {
    let mut conn = pool.acquire().await?;
    let employee = employees::find(&mut conn, employee_id)
        .await?
        .filter(|e| e.organization_id == organization_id)
        .ok_or_else(|| AppError::not_found("Employee not found"))?;
    holidays::assign(&mut conn, employee.id, calendar_id).await?;
    Ok(employee.id)
}

/// Points each employee at the calendar. Unknown employees and employees
/// of other organizations are reported per id.
#[instrument(skip(pool, actor, employee_ids), fields(user_id = actor.user_id, employees = employee_ids.len()))]
pub async fn assign(
    pool: &MySqlPool,
    actor: &Actor,
    calendar_id: u64,
    employee_ids: Vec<u64>,
) -> AppResult<BatchResult<u64, BatchFailure>> {
    actor.require_admin()?;
    let calendar = {
        let mut conn = pool.acquire().await?;
        load(&mut conn, actor, calendar_id).await?
    };

    let result = assign_each(&employee_ids, |employee_id| {
        assign_one(pool, calendar.organization_id, calendar_id, *employee_id)
    })
    .await;

    info!(
        calendar_id,
        assigned = result.succeeded.len(),
        failed = result.failed.len(),
        "Holiday calendar assigned"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upcoming_limit_defaults_and_caps() {
        assert_eq!(upcoming_limit(None), DEFAULT_UPCOMING);
        assert_eq!(upcoming_limit(Some(0)), 1);
        assert_eq!(upcoming_limit(Some(10)), 10);
        assert_eq!(upcoming_limit(Some(u64::MAX)), MAX_UPCOMING);
    }

    #[actix_web::test]
    async fn assignment_reports_unknown_employees_and_keeps_going() {
        let ids = vec![1u64, 99, 3];
        let result = assign_each(&ids[..], |id| async move {
            if *id == 99 {
                Err(AppError::not_found("Employee not found"))
            } else {
                Ok(*id)
            }
        })
        .await;

        assert_eq!(result.succeeded, [1, 3]);
        assert_eq!(result.failed, [BatchFailure::new(99, "Employee not found")]);
    }

    #[test]
    fn partial_calendar_update_keeps_other_fields() {
        let patch: CalendarUpdate = serde_json::from_str(r#"{"name": "Branch"}"#).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Branch"));
        assert!(patch.year.is_none());
        assert!(patch.description.is_none());
    }
}
