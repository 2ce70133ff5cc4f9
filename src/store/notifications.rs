use serde_json::Value;
use sqlx::MySqlConnection;

use crate::error::AppResult;
use crate::model::notification::Notification;
use crate::store::filter::Page;

pub async fn insert(
    conn: &mut MySqlConnection,
    user_id: u64,
    title: &str,
    message: &str,
) -> AppResult<u64> {
    let id = sqlx::query("INSERT INTO notifications (user_id, title, message) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(title)
        .bind(message)
        .execute(&mut *conn)
        .await?
        .last_insert_id();
    Ok(id)
}

/// Queues an email for the external sender.
pub async fn enqueue_email(
    conn: &mut MySqlConnection,
    recipient: &str,
    template: &str,
    payload: &Value,
) -> AppResult<u64> {
    let id = sqlx::query("INSERT INTO email_outbox (recipient, template, payload) VALUES (?, ?, ?)")
        .bind(recipient)
        .bind(template)
        .bind(payload.to_string())
        .execute(&mut *conn)
        .await?
        .last_insert_id();
    Ok(id)
}

pub async fn for_user(
    conn: &mut MySqlConnection,
    user_id: u64,
    unread_only: bool,
    page: Page,
) -> AppResult<(Vec<Notification>, i64)> {
    let filter = if unread_only { " AND is_read = FALSE" } else { "" };

    let count_sql = format!("SELECT COUNT(*) FROM notifications WHERE user_id = ?{}", filter);
    let total = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    let data_sql = format!(
        "SELECT id, user_id, title, message, is_read, created_at
         FROM notifications WHERE user_id = ?{}
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        filter
    );
    let rows = sqlx::query_as::<_, Notification>(&data_sql)
        .bind(user_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;
    Ok((rows, total))
}

/// Returns false when the notification does not belong to the user.
pub async fn mark_read(conn: &mut MySqlConnection, id: u64, user_id: u64) -> AppResult<bool> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
