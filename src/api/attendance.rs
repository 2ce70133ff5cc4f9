use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use sqlx::MySqlPool;

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::attendance::work_minutes;
use crate::store::attendance;

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.actor().own_employee_id()?;
    let now = Utc::now().naive_utc();

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    if attendance::for_day(&mut tx, employee_id, now.date())
        .await?
        .is_some()
    {
        return Err(AppError::bad_request("Already checked in today").into());
    }
    attendance::check_in(&mut tx, employee_id, now).await?;
    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(employee_id, "Checked in");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked in successfully"
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully", body = crate::model::attendance::Attendance),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.actor().own_employee_id()?;
    let now = Utc::now().naive_utc();

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let open = attendance::for_day(&mut tx, employee_id, now.date())
        .await?
        .filter(|day| day.check_out.is_none());
    let (mut day, checked_in) = match open {
        Some(day) => match day.check_in {
            Some(at) => (day, at),
            None => return Err(AppError::bad_request("No active check-in found for today").into()),
        },
        None => return Err(AppError::bad_request("No active check-in found for today").into()),
    };

    day.work_minutes = work_minutes(checked_in, now);
    day.check_out = Some(now);
    attendance::check_out(&mut tx, day.id, now, day.work_minutes).await?;
    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(employee_id, work_minutes = day.work_minutes, "Checked out");
    Ok(HttpResponse::Ok().json(day))
}
