use actix_web::{HttpResponse, Responder, web};
use sqlx::MySqlPool;

use crate::api::{GradeListResponse, PageQuery};
use crate::auth::auth::AuthUser;
use crate::service::grades::{self, GradeInput, GradeUpdate};

#[utoipa::path(
    post,
    path = "/api/leave-grades",
    request_body = GradeInput,
    responses(
        (status = 201, description = "Leave grade created", body = crate::model::leave_grade::LeaveGrade),
        (status = 400, description = "Duplicate name or invalid policy", body = Object, example = json!({
            "message": "Leave grade 'Staff' already exists"
        })),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Grade"
)]
pub async fn create_grade(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<GradeInput>,
) -> actix_web::Result<impl Responder> {
    let grade = grades::create(&pool, &auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(grade))
}

#[utoipa::path(
    get,
    path = "/api/leave-grades",
    params(PageQuery),
    responses(
        (status = 200, description = "Leave grades with their policies", body = GradeListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Grade"
)]
pub async fn list_grades(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> actix_web::Result<impl Responder> {
    let listing = grades::list(&pool, &auth.actor(), query.page()).await?;
    Ok(HttpResponse::Ok().json(GradeListResponse::from(listing)))
}

#[utoipa::path(
    get,
    path = "/api/leave-grades/{id}",
    params(("id" = u64, Path, description = "Leave grade id")),
    responses(
        (status = 200, description = "Leave grade found", body = crate::model::leave_grade::LeaveGrade),
        (status = 404, description = "Leave grade not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Grade"
)]
pub async fn get_grade(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let grade = grades::get(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(grade))
}

/// Rename a grade and/or replace its policies
#[utoipa::path(
    put,
    path = "/api/leave-grades/{id}",
    params(("id" = u64, Path, description = "Leave grade id")),
    request_body = GradeUpdate,
    responses(
        (status = 200, description = "Leave grade updated", body = crate::model::leave_grade::LeaveGrade),
        (status = 400, description = "Duplicate name or invalid policy"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave grade not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Grade"
)]
pub async fn update_grade(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<GradeUpdate>,
) -> actix_web::Result<impl Responder> {
    let grade =
        grades::update(&pool, &auth.actor(), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(grade))
}

#[utoipa::path(
    delete,
    path = "/api/leave-grades/{id}",
    params(("id" = u64, Path, description = "Leave grade id")),
    responses(
        (status = 204, description = "Leave grade deleted"),
        (status = 400, description = "Grade still assigned to employees"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave grade not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Grade"
)]
pub async fn delete_grade(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    grades::delete(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
