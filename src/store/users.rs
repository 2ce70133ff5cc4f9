use sqlx::MySqlConnection;

use crate::error::AppResult;
use crate::model::role::Role;
use crate::model::user::{Recipient, User};

pub async fn find_by_username(conn: &mut MySqlConnection, username: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, organization_id, username, email, password, role_id, employee_id, is_active
         FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn find(conn: &mut MySqlConnection, id: u64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, organization_id, username, email, password, role_id, employee_id, is_active
         FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn touch_last_login(conn: &mut MySqlConnection, id: u64) -> AppResult<()> {
    sqlx::query("UPDATE users SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Active ORG_ADMIN and HR_ADMIN users of an organization.
pub async fn leave_approvers(
    conn: &mut MySqlConnection,
    organization_id: u64,
) -> AppResult<Vec<Recipient>> {
    let rows = sqlx::query_as::<_, Recipient>(
        "SELECT id AS user_id, email FROM users
         WHERE organization_id = ? AND is_active = TRUE AND role_id IN (?, ?)
         ORDER BY id",
    )
    .bind(organization_id)
    .bind(Role::OrgAdmin.id())
    .bind(Role::HrAdmin.id())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn recipient(conn: &mut MySqlConnection, user_id: u64) -> AppResult<Option<Recipient>> {
    let row = sqlx::query_as::<_, Recipient>(
        "SELECT id AS user_id, email FROM users WHERE id = ? AND is_active = TRUE",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}
