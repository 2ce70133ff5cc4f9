use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::api::{AllocationListResponse, YearQuery};
use crate::auth::auth::AuthUser;
use crate::leave::allocation::AllocationPatch;
use crate::leave::batch::BatchFailure;
use crate::model::leave_allocation::AllocationResponse;
use crate::service::allocations::{
    self, AdjustmentInput, BulkAllocateInput, CarriedBalance, CarryForwardInput, ImportRecord,
    NewAllocation,
};
use crate::store::filter::AllocationFilter;

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkAllocationResponse {
    /// Number of allocations written
    #[schema(example = 12)]
    pub allocated: usize,
    /// Employees processed
    pub employees: Vec<u64>,
    pub succeeded: Vec<AllocationResponse>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResponse {
    pub succeeded: Vec<AllocationResponse>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CarryForwardResponse {
    pub succeeded: Vec<CarriedBalance>,
    pub failed: Vec<BatchFailure>,
}

/// Create an allocation
#[utoipa::path(
    post,
    path = "/api/allocations",
    request_body = NewAllocation,
    responses(
        (status = 201, description = "Allocation created", body = AllocationResponse),
        (status = 400, description = "Duplicate allocation or invalid days", body = Object, example = json!({
            "message": "Allocation already exists for this employee, year, and leave type"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn create_allocation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<NewAllocation>,
) -> actix_web::Result<impl Responder> {
    let saved = allocations::create(&pool, &auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(AllocationResponse::from(saved)))
}

/// List allocations
#[utoipa::path(
    get,
    path = "/api/allocations",
    params(AllocationFilter),
    responses(
        (status = 200, description = "Paginated allocations", body = AllocationListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn list_allocations(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AllocationFilter>,
) -> actix_web::Result<impl Responder> {
    let listing = allocations::list(&pool, &auth.actor(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(AllocationListResponse::from(
        listing.map(AllocationResponse::from),
    )))
}

#[utoipa::path(
    get,
    path = "/api/allocations/{id}",
    params(("id" = u64, Path, description = "Allocation id")),
    responses(
        (status = 200, description = "Allocation found", body = AllocationResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn get_allocation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let found = allocations::get(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(AllocationResponse::from(found)))
}

/// Edit allocated/used days. Used may never exceed allocated.
#[utoipa::path(
    put,
    path = "/api/allocations/{id}",
    params(("id" = u64, Path, description = "Allocation id")),
    request_body = AllocationPatch,
    responses(
        (status = 200, description = "Allocation updated", body = AllocationResponse),
        (status = 400, description = "Used leave cannot exceed allocated leave"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn update_allocation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AllocationPatch>,
) -> actix_web::Result<impl Responder> {
    let saved =
        allocations::update(&pool, &auth.actor(), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(AllocationResponse::from(saved)))
}

#[utoipa::path(
    delete,
    path = "/api/allocations/{id}",
    params(("id" = u64, Path, description = "Allocation id")),
    responses(
        (status = 204, description = "Allocation deleted"),
        (status = 400, description = "Cannot delete allocation that has been used"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn delete_allocation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    allocations::delete(&pool, &auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Allocate from leave grades
#[utoipa::path(
    post,
    path = "/api/allocations/bulk",
    request_body = BulkAllocateInput,
    responses(
        (status = 200, description = "Per-employee outcome", body = BulkAllocationResponse),
        (status = 400, description = "No employees found for allocation"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn bulk_allocate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BulkAllocateInput>,
) -> actix_web::Result<impl Responder> {
    let bulk = allocations::bulk_allocate(&pool, &auth.actor(), payload.into_inner()).await?;
    let succeeded: Vec<AllocationResponse> = bulk
        .result
        .succeeded
        .into_iter()
        .map(AllocationResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(BulkAllocationResponse {
        allocated: succeeded.len(),
        employees: bulk.employees,
        succeeded,
        failed: bulk.result.failed,
    }))
}

/// Import balances by employee code
#[utoipa::path(
    post,
    path = "/api/allocations/import",
    request_body = [ImportRecord],
    responses(
        (status = 200, description = "Per-record outcome", body = ImportResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn import_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<Vec<ImportRecord>>,
) -> actix_web::Result<impl Responder> {
    let result = allocations::import_leaves(&pool, &auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ImportResponse {
        succeeded: result
            .succeeded
            .into_iter()
            .map(AllocationResponse::from)
            .collect(),
        failed: result.failed,
    }))
}

/// Credit or debit days by hand
#[utoipa::path(
    post,
    path = "/api/allocations/adjust",
    request_body = AdjustmentInput,
    responses(
        (status = 200, description = "Allocation after adjustment", body = AllocationResponse),
        (status = 400, description = "Zero amount or insufficient balance"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn adjust_allocation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<AdjustmentInput>,
) -> actix_web::Result<impl Responder> {
    let saved = allocations::adjust(&pool, &auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(AllocationResponse::from(saved)))
}

/// Year-end carry forward
#[utoipa::path(
    post,
    path = "/api/allocations/carry-forward",
    request_body = CarryForwardInput,
    responses(
        (status = 200, description = "Per-allocation outcome", body = CarryForwardResponse),
        (status = 400, description = "No employees found for carry forward"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn carry_forward(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CarryForwardInput>,
) -> actix_web::Result<impl Responder> {
    let result = allocations::carry_forward(&pool, &auth.actor(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(CarryForwardResponse {
        succeeded: result.succeeded,
        failed: result.failed,
    }))
}

/// Balances of one employee for a year
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/balances",
    params(
        ("employee_id" = u64, Path, description = "Employee id"),
        YearQuery
    ),
    responses(
        (status = 200, description = "Allocations with remaining days", body = [AllocationResponse]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Allocation"
)]
pub async fn employee_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<YearQuery>,
) -> actix_web::Result<impl Responder> {
    let rows = allocations::balances(
        &pool,
        &auth.actor(),
        path.into_inner(),
        query.year_or_current(),
    )
    .await?;
    let body: Vec<AllocationResponse> = rows.into_iter().map(AllocationResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}
