use serde::Deserialize;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::leave::actor::Actor;
use crate::model::leave_grade::{LeaveGrade, PolicyInput, grade_name, validate_policies};
use crate::service::Listing;
use crate::store::filter::Page;
use crate::store::{employees, grades};

#[derive(Debug, Deserialize, ToSchema)]
pub struct GradeInput {
    #[schema(example = "Staff")]
    pub name: String,
    #[serde(default)]
    pub policies: Vec<PolicyInput>,
}

/// Fields left out stay as they are. `policies`, when given, replaces the
/// whole set.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GradeUpdate {
    pub name: Option<String>,
    pub policies: Option<Vec<PolicyInput>>,
}

async fn load(conn: &mut MySqlConnection, actor: &Actor, id: u64) -> AppResult<LeaveGrade> {
    let grade = grades::find(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave grade not found"))?;
    actor.ensure_organization(grade.organization_id)?;
    Ok(grade)
}

async fn ensure_unique_name(
    conn: &mut MySqlConnection,
    organization_id: u64,
    name: &str,
    except_id: Option<u64>,
) -> AppResult<()> {
    if grades::name_taken(conn, organization_id, name, except_id).await? {
        return Err(AppError::bad_request(format!(
            "Leave grade '{}' already exists",
            name
        )));
    }
    Ok(())
}

#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id))]
pub async fn create(pool: &MySqlPool, actor: &Actor, input: GradeInput) -> AppResult<LeaveGrade> {
    actor.require_admin()?;
    let name = grade_name(&input.name)?;
    validate_policies(&input.policies)?;

    let mut tx = pool.begin().await?;
    ensure_unique_name(&mut tx, actor.organization_id, &name, None).await?;
    let id = grades::insert(&mut tx, actor.organization_id, &name).await?;
    grades::replace_policies(&mut tx, id, &input.policies).await?;
    let grade = load(&mut tx, actor, id).await?;
    tx.commit().await?;

    info!(grade_id = id, name = %grade.name, policies = grade.policies.len(), "Leave grade created");
    Ok(grade)
}

pub async fn list(pool: &MySqlPool, actor: &Actor, page: Page) -> AppResult<Listing<LeaveGrade>> {
    let mut conn = pool.acquire().await?;
    let rows = grades::list(&mut conn, actor.organization_id, page).await?;
    Ok(Listing::new(rows, page))
}

pub async fn get(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<LeaveGrade> {
    let mut conn = pool.acquire().await?;
    load(&mut conn, actor, id).await
}

#[instrument(skip(pool, actor, input), fields(user_id = actor.user_id))]
pub async fn update(
    pool: &MySqlPool,
    actor: &Actor,
    id: u64,
    input: GradeUpdate,
) -> AppResult<LeaveGrade> {
    actor.require_admin()?;
    if let Some(policies) = &input.policies {
        validate_policies(policies)?;
    }

    let mut tx = pool.begin().await?;
    let current = load(&mut tx, actor, id).await?;
    if let Some(raw) = &input.name {
        let name = grade_name(raw)?;
        if name != current.name {
            ensure_unique_name(&mut tx, current.organization_id, &name, Some(id)).await?;
            grades::rename(&mut tx, id, &name).await?;
        }
    }
    if let Some(policies) = &input.policies {
        grades::replace_policies(&mut tx, id, policies).await?;
    }
    let grade = load(&mut tx, actor, id).await?;
    tx.commit().await?;

    info!(grade_id = id, "Leave grade updated");
    Ok(grade)
}

#[instrument(skip(pool, actor), fields(user_id = actor.user_id))]
pub async fn delete(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<()> {
    actor.require_admin()?;
    let mut tx = pool.begin().await?;
    load(&mut tx, actor, id).await?;

    let assigned = employees::count_by_grade(&mut tx, id).await?;
    if assigned > 0 {
        return Err(AppError::bad_request(format!(
            "Cannot delete leave grade assigned to {} employee(s)",
            assigned
        )));
    }
    grades::delete(&mut tx, id).await?;
    tx.commit().await?;

    info!(grade_id = id, "Leave grade deleted");
    Ok(())
}
