//! Self-service views of the signed-in user.

use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

use crate::api::{
    LeaveListResponse, LedgerListResponse, NotificationListResponse, PageQuery, YearQuery,
};
use crate::auth::auth::AuthUser;
use crate::model::leave_allocation::AllocationResponse;
use crate::service::{allocations, holidays, notifications, requests};
use crate::store::filter::{LeaveRequestFilter, Page};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct NotificationQuery {
    /// Only unread notifications
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UpcomingQuery {
    /// How many holidays to return, 5 by default
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/me/balances",
    params(YearQuery),
    responses(
        (status = 200, description = "Own allocations with remaining days", body = [AllocationResponse]),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<YearQuery>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.actor();
    let employee_id = actor.own_employee_id()?;
    let rows = allocations::balances(&pool, &actor, employee_id, query.year_or_current()).await?;
    let body: Vec<AllocationResponse> = rows.into_iter().map(AllocationResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/api/me/leave",
    params(PageQuery),
    responses(
        (status = 200, description = "Own leave requests", body = LeaveListResponse),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.actor();
    let filter = LeaveRequestFilter {
        employee_id: Some(actor.own_employee_id()?),
        page: query.page,
        per_page: query.per_page,
        ..Default::default()
    };
    let listing = requests::list(&pool, &actor, filter).await?;
    Ok(HttpResponse::Ok().json(LeaveListResponse::from(listing)))
}

#[utoipa::path(
    get,
    path = "/api/me/ledger",
    params(PageQuery),
    responses(
        (status = 200, description = "Own balance history, newest first", body = LedgerListResponse),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_ledger(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.actor();
    let employee_id = actor.own_employee_id()?;
    let listing = allocations::ledger(&pool, &actor, employee_id, query.page()).await?;
    Ok(HttpResponse::Ok().json(LedgerListResponse::from(listing)))
}

#[utoipa::path(
    get,
    path = "/api/me/notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Own notifications, newest first", body = NotificationListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NotificationQuery>,
) -> actix_web::Result<impl Responder> {
    let page = Page::new(query.page, query.per_page);
    let listing = notifications::list(&pool, &auth.actor(), query.unread_only, page).await?;
    Ok(HttpResponse::Ok().json(NotificationListResponse::from(listing)))
}

#[utoipa::path(
    put,
    path = "/api/me/notifications/{id}/read",
    params(("id" = u64, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn mark_notification_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    notifications::mark_read(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Upcoming holidays of the caller's calendar
#[utoipa::path(
    get,
    path = "/api/me/holidays",
    params(UpcomingQuery),
    responses(
        (status = 200, description = "Holidays not yet over, earliest first; empty without a calendar", body = [crate::model::holiday::Holiday]),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_holidays(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UpcomingQuery>,
) -> actix_web::Result<impl Responder> {
    let today = Utc::now().date_naive();
    let limit = holidays::upcoming_limit(query.limit);
    let rows = holidays::upcoming(&pool, &auth.actor(), today, limit).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_query_defaults_to_all() {
        let q: NotificationQuery = serde_json::from_str("{}").unwrap();
        assert!(!q.unread_only);
        assert_eq!(Page::new(q.page, q.per_page).per_page, 20);
    }
}
