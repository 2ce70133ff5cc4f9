use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::api::LeaveListResponse;
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::leave::request::{LeaveApplication, LeaveRequestPatch};
use crate::model::leave_request::{LeaveDuration, LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;
use crate::service::requests::{self, Decision};
use crate::store::filter::LeaveRequestFilter;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Admins only: file on behalf of this employee
    pub employee_id: Option<u64>,
    /// Admins only: APPROVED records the leave directly
    pub status: Option<LeaveStatus>,
    #[schema(example = "ANNUAL")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub duration: LeaveDuration,
    pub reason: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub day_details: Option<Vec<NaiveDate>>,
}

impl CreateLeave {
    fn split(self) -> (Option<u64>, LeaveStatus, LeaveApplication) {
        (
            self.employee_id,
            self.status.unwrap_or(LeaveStatus::Pending),
            LeaveApplication {
                leave_type: self.leave_type,
                start_date: self.start_date,
                end_date: self.end_date,
                duration: self.duration,
                reason: self.reason,
                day_details: self.day_details,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DecisionRemarks {
    #[schema(example = "Enjoy your break")]
    pub remarks: Option<String>,
}

/// Apply for leave
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid dates, insufficient balance or overlap", body = Object,
         example = json!({
            "message": "You already have a leave request for this period"
         })
        ),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.actor();
    let (employee_id, status, application) = payload.into_inner().split();
    let employee_id = match employee_id {
        Some(id) => id,
        None => actor.own_employee_id()?,
    };

    let created = requests::apply(&pool, &actor, employee_id, application, status).await?;
    Ok(HttpResponse::Created().json(created))
}

/// List leave requests
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveRequestFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveRequestFilter>,
) -> actix_web::Result<impl Responder> {
    let listing = requests::list(&pool, &auth.actor(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LeaveListResponse::from(listing)))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let found = requests::get(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// Edit a leave request. Date changes are re-validated against balance
/// and other requests.
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to edit")),
    request_body = LeaveRequestPatch,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRequest),
        (status = 400, description = "Invalid change"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<LeaveRequestPatch>,
) -> actix_web::Result<impl Responder> {
    let updated =
        requests::update(&pool, &auth.actor(), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to delete")),
    responses(
        (status = 204, description = "Leave request deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    requests::delete(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    leave_id: u64,
    status: LeaveStatus,
    body: Option<web::Json<DecisionRemarks>>,
) -> Result<LeaveRequest, AppError> {
    let remarks = body.and_then(|b| b.into_inner().remarks);
    requests::decide(&pool, &auth.actor(), leave_id, Decision { status, remarks }).await
}

/* =========================
Approve leave (HR/Admin or manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    request_body = DecisionRemarks,
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 400, description = "Already processed or insufficient balance", body = Object, example = json!({
            "message": "Leave request is already APPROVED"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<DecisionRemarks>>,
) -> actix_web::Result<impl Responder> {
    let updated = decide(auth, pool, path.into_inner(), LeaveStatus::Approved, body).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/* =========================
Reject leave (HR/Admin or manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    request_body = DecisionRemarks,
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Leave request already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<DecisionRemarks>>,
) -> actix_web::Result<impl Responder> {
    let updated = decide(auth, pool, path.into_inner(), LeaveStatus::Rejected, body).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Cancel own leave; approved leave is refunded
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(("leave_id" = u64, Path, description = "ID of the leave request to cancel")),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 400, description = "Only pending or approved leave requests can be cancelled"),
        (status = 403, description = "Only the requesting employee can cancel this leave")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let updated = requests::cancel(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_to_pending_full_day() {
        let body: CreateLeave = serde_json::from_value(serde_json::json!({
            "leave_type": "SICK",
            "start_date": "2026-03-02",
            "end_date": "2026-03-03"
        }))
        .unwrap();
        let (employee_id, status, app) = body.split();
        assert_eq!(employee_id, None);
        assert_eq!(status, LeaveStatus::Pending);
        assert_eq!(app.duration, LeaveDuration::Full);
        assert_eq!(app.leave_type, LeaveType::Sick);
    }

    #[test]
    fn lowercase_leave_type_is_rejected() {
        let parsed = serde_json::from_value::<CreateLeave>(serde_json::json!({
            "leave_type": "sick",
            "start_date": "2026-03-02",
            "end_date": "2026-03-03"
        }));
        assert!(parsed.is_err());
    }
}
