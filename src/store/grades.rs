use sqlx::MySqlConnection;

use crate::error::{AppError, AppResult};
use crate::model::leave_grade::{LeaveGrade, LeavePolicy, PolicyInput};
use crate::store::filter::Page;
use crate::store::parse_column;

#[derive(sqlx::FromRow)]
struct GradeRow {
    id: u64,
    organization_id: u64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct PolicyRow {
    id: u64,
    leave_grade_id: u64,
    leave_type: String,
    total_days: f64,
    carry_forward: bool,
    max_carry_amount: f64,
}

impl TryFrom<PolicyRow> for LeavePolicy {
    type Error = AppError;

    fn try_from(row: PolicyRow) -> AppResult<Self> {
        Ok(LeavePolicy {
            id: row.id,
            leave_grade_id: row.leave_grade_id,
            leave_type: parse_column("leave_policies.leave_type", &row.leave_type)?,
            total_days: row.total_days,
            carry_forward: row.carry_forward,
            max_carry_amount: row.max_carry_amount,
        })
    }
}

pub async fn policies(conn: &mut MySqlConnection, leave_grade_id: u64) -> AppResult<Vec<LeavePolicy>> {
    let rows = sqlx::query_as::<_, PolicyRow>(
        "SELECT id, leave_grade_id, leave_type, total_days, carry_forward, max_carry_amount
         FROM leave_policies WHERE leave_grade_id = ? ORDER BY id",
    )
    .bind(leave_grade_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(LeavePolicy::try_from).collect()
}

async fn with_policies(conn: &mut MySqlConnection, row: GradeRow) -> AppResult<LeaveGrade> {
    let policies = policies(conn, row.id).await?;
    Ok(LeaveGrade {
        id: row.id,
        organization_id: row.organization_id,
        name: row.name,
        policies,
    })
}

pub async fn find(conn: &mut MySqlConnection, id: u64) -> AppResult<Option<LeaveGrade>> {
    let row = sqlx::query_as::<_, GradeRow>(
        "SELECT id, organization_id, name FROM leave_grades WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => Ok(Some(with_policies(conn, row).await?)),
        None => Ok(None),
    }
}

pub async fn name_taken(
    conn: &mut MySqlConnection,
    organization_id: u64,
    name: &str,
    except_id: Option<u64>,
) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_grades WHERE organization_id = ? AND name = ? AND id <> ?",
    )
    .bind(organization_id)
    .bind(name)
    .bind(except_id.unwrap_or(0))
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

pub async fn list(
    conn: &mut MySqlConnection,
    organization_id: u64,
    page: Page,
) -> AppResult<(Vec<LeaveGrade>, i64)> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_grades WHERE organization_id = ?",
    )
    .bind(organization_id)
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query_as::<_, GradeRow>(
        "SELECT id, organization_id, name FROM leave_grades
         WHERE organization_id = ? ORDER BY name LIMIT ? OFFSET ?",
    )
    .bind(organization_id)
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(&mut *conn)
    .await?;

    let mut grades = Vec::with_capacity(rows.len());
    for row in rows {
        grades.push(with_policies(conn, row).await?);
    }
    Ok((grades, total))
}

pub async fn insert(
    conn: &mut MySqlConnection,
    organization_id: u64,
    name: &str,
) -> AppResult<u64> {
    let id = sqlx::query("INSERT INTO leave_grades (organization_id, name) VALUES (?, ?)")
        .bind(organization_id)
        .bind(name)
        .execute(&mut *conn)
        .await?
        .last_insert_id();
    Ok(id)
}

pub async fn rename(conn: &mut MySqlConnection, id: u64, name: &str) -> AppResult<()> {
    sqlx::query("UPDATE leave_grades SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Swaps the whole policy set of a grade.
pub async fn replace_policies(
    conn: &mut MySqlConnection,
    leave_grade_id: u64,
    policies: &[PolicyInput],
) -> AppResult<()> {
    sqlx::query("DELETE FROM leave_policies WHERE leave_grade_id = ?")
        .bind(leave_grade_id)
        .execute(&mut *conn)
        .await?;
    for p in policies {
        sqlx::query(
            "INSERT INTO leave_policies
                (leave_grade_id, leave_type, total_days, carry_forward, max_carry_amount)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(leave_grade_id)
        .bind(p.leave_type.to_string())
        .bind(p.total_days)
        .bind(p.carry_forward)
        .bind(p.max_carry_amount)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn delete(conn: &mut MySqlConnection, id: u64) -> AppResult<()> {
    sqlx::query("DELETE FROM leave_grades WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
