use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::api::{CalendarListResponse, PageQuery};
use crate::auth::auth::AuthUser;
use crate::leave::batch::BatchFailure;
use crate::model::holiday::HolidayInput;
use crate::service::holidays::{self, CalendarInput, CalendarUpdate};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignCalendar {
    #[schema(example = json!([1000, 1001]))]
    pub employee_ids: Vec<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignResponse {
    /// Employees now following the calendar
    pub assigned: Vec<u64>,
    pub failed: Vec<BatchFailure>,
}

#[utoipa::path(
    post,
    path = "/api/holiday-calendars",
    request_body = CalendarInput,
    responses(
        (status = 201, description = "Holiday calendar created", body = crate::model::holiday::HolidayCalendar),
        (status = 400, description = "Duplicate name or invalid year", body = Object, example = json!({
            "message": "Holiday calendar 'Head office' already exists for 2025"
        })),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn create_calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CalendarInput>,
) -> actix_web::Result<impl Responder> {
    let calendar = holidays::create_calendar(&pool, &auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(calendar))
}

#[utoipa::path(
    get,
    path = "/api/holiday-calendars",
    params(PageQuery),
    responses(
        (status = 200, description = "Holiday calendars with their holidays, newest year first", body = CalendarListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn list_calendars(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> actix_web::Result<impl Responder> {
    let listing = holidays::list_calendars(&pool, &auth.actor(), query.page()).await?;
    Ok(HttpResponse::Ok().json(CalendarListResponse::from(listing)))
}

#[utoipa::path(
    get,
    path = "/api/holiday-calendars/{id}",
    params(("id" = u64, Path, description = "Holiday calendar id")),
    responses(
        (status = 200, description = "Holiday calendar found", body = crate::model::holiday::HolidayCalendar),
        (status = 404, description = "Holiday calendar not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn get_calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let calendar = holidays::get_calendar(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(calendar))
}

#[utoipa::path(
    put,
    path = "/api/holiday-calendars/{id}",
    params(("id" = u64, Path, description = "Holiday calendar id")),
    request_body = CalendarUpdate,
    responses(
        (status = 200, description = "Holiday calendar updated", body = crate::model::holiday::HolidayCalendar),
        (status = 400, description = "Duplicate name, or holidays outside the new year"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday calendar not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn update_calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<CalendarUpdate>,
) -> actix_web::Result<impl Responder> {
    let calendar =
        holidays::update_calendar(&pool, &auth.actor(), path.into_inner(), payload.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(calendar))
}

/// Delete a calendar, its holidays and every assignment to it
#[utoipa::path(
    delete,
    path = "/api/holiday-calendars/{id}",
    params(("id" = u64, Path, description = "Holiday calendar id")),
    responses(
        (status = 204, description = "Holiday calendar deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday calendar not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn delete_calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    holidays::delete_calendar(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/holiday-calendars/{id}/holidays",
    params(("id" = u64, Path, description = "Holiday calendar id")),
    request_body = HolidayInput,
    responses(
        (status = 201, description = "Holiday added", body = crate::model::holiday::Holiday),
        (status = 400, description = "Date taken or outside the calendar year", body = Object, example = json!({
            "message": "A holiday on 2025-01-01 already exists in this calendar"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday calendar not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn add_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<HolidayInput>,
) -> actix_web::Result<impl Responder> {
    let holiday =
        holidays::add_holiday(&pool, &auth.actor(), path.into_inner(), payload.into_inner())
            .await?;
    Ok(HttpResponse::Created().json(holiday))
}

/// Add many holidays; dates the calendar already has are skipped
#[utoipa::path(
    post,
    path = "/api/holiday-calendars/{id}/holidays/bulk",
    params(("id" = u64, Path, description = "Holiday calendar id")),
    request_body = [HolidayInput],
    responses(
        (status = 200, description = "Holidays created and dates skipped", body = crate::service::holidays::BulkHolidays),
        (status = 400, description = "An entry is invalid; nothing was written"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday calendar not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn bulk_create_holidays(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Vec<HolidayInput>>,
) -> actix_web::Result<impl Responder> {
    let bulk =
        holidays::bulk_create(&pool, &auth.actor(), path.into_inner(), payload.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(bulk))
}

#[utoipa::path(
    post,
    path = "/api/holiday-calendars/{id}/assign",
    params(("id" = u64, Path, description = "Holiday calendar id")),
    request_body = AssignCalendar,
    responses(
        (status = 200, description = "Per-employee outcome", body = AssignResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday calendar not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn assign_calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AssignCalendar>,
) -> actix_web::Result<impl Responder> {
    let result = holidays::assign(
        &pool,
        &auth.actor(),
        path.into_inner(),
        payload.into_inner().employee_ids,
    )
    .await?;
    Ok(HttpResponse::Ok().json(AssignResponse {
        assigned: result.succeeded,
        failed: result.failed,
    }))
}

/// Replace a holiday
#[utoipa::path(
    put,
    path = "/api/holidays/{id}",
    params(("id" = u64, Path, description = "Holiday id")),
    request_body = HolidayInput,
    responses(
        (status = 200, description = "Holiday updated", body = crate::model::holiday::Holiday),
        (status = 400, description = "Date taken or outside the calendar year"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn update_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<HolidayInput>,
) -> actix_web::Result<impl Responder> {
    let holiday =
        holidays::update_holiday(&pool, &auth.actor(), path.into_inner(), payload.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(holiday))
}

#[utoipa::path(
    delete,
    path = "/api/holidays/{id}",
    params(("id" = u64, Path, description = "Holiday id")),
    responses(
        (status = 204, description = "Holiday deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    holidays::delete_holiday(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_payload_accepts_optional_fields() {
        let payload: Vec<HolidayInput> = serde_json::from_str(
            r#"[
                {"name": "New Year", "date": "2025-01-01"},
                {"name": "Eid", "date": "2025-03-31", "end_date": "2025-04-02", "description": "Fitr"}
            ]"#,
        )
        .unwrap();
        assert_eq!(payload.len(), 2);
        assert!(payload[0].end_date.is_none());
        assert_eq!(payload[1].end_date.map(|d| d.to_string()).as_deref(), Some("2025-04-02"));
    }
}
