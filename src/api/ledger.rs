use actix_web::{HttpResponse, Responder, web};
use sqlx::MySqlPool;

use crate::api::{LedgerListResponse, PageQuery};
use crate::auth::auth::AuthUser;
use crate::service::allocations;

/// Audit trail of one employee's balance, newest first
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/ledger",
    params(
        ("employee_id" = u64, Path, description = "Employee id"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Ledger entries", body = LedgerListResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Ledger"
)]
pub async fn employee_ledger(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<PageQuery>,
) -> actix_web::Result<impl Responder> {
    let listing =
        allocations::ledger(&pool, &auth.actor(), path.into_inner(), query.page()).await?;
    Ok(HttpResponse::Ok().json(LedgerListResponse::from(listing)))
}
