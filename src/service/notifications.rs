//! In-app notifications and the email outbox. Leave events are dispatched
//! on a spawned task after the originating transaction has committed; a
//! failure there is logged and goes no further.

use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::leave::actor::Actor;
use crate::leave::notify::{self, Notice};
use crate::model::employee::Employee;
use crate::model::leave_request::LeaveRequest;
use crate::model::notification::Notification;
use crate::model::user::Recipient;
use crate::service::Listing;
use crate::store::filter::Page;
use crate::store::{self, employees, users};

async fn deliver(conn: &mut MySqlConnection, notices: Vec<Notice>) -> AppResult<usize> {
    let count = notices.len();
    for notice in notices {
        store::notifications::insert(
            conn,
            notice.recipient.user_id,
            &notice.title,
            &notice.message,
        )
        .await?;
        store::notifications::enqueue_email(
            conn,
            &notice.recipient.email,
            notice.template,
            &notice.payload,
        )
        .await?;
    }
    Ok(count)
}

async fn linked_user(
    conn: &mut MySqlConnection,
    user_id: Option<u64>,
) -> AppResult<Option<Recipient>> {
    match user_id {
        Some(id) => users::recipient(conn, id).await,
        None => Ok(None),
    }
}

async fn leave_requested(
    pool: &MySqlPool,
    employee: &Employee,
    request: &LeaveRequest,
) -> AppResult<usize> {
    let mut conn = pool.acquire().await?;
    let admins = users::leave_approvers(&mut conn, employee.organization_id).await?;
    let manager = match employee.manager_id {
        Some(manager_id) => {
            let manager_user = employees::find(&mut conn, manager_id)
                .await?
                .and_then(|m| m.user_id);
            linked_user(&mut conn, manager_user).await?
        }
        None => None,
    };
    let requester = linked_user(&mut conn, employee.user_id).await?;

    let approvers = notify::approvers(admins, manager, employee.user_id);
    let notices = notify::leave_requested(employee, request, approvers, requester);
    deliver(&mut conn, notices).await
}

async fn status_changed(
    pool: &MySqlPool,
    employee: &Employee,
    request: &LeaveRequest,
) -> AppResult<usize> {
    let mut conn = pool.acquire().await?;
    let owner = linked_user(&mut conn, employee.user_id).await?;
    let notices = notify::status_changed(employee, request, owner);
    deliver(&mut conn, notices).await
}

/// Tells approvers about a new request and confirms it to the requester.
pub fn dispatch_requested(pool: MySqlPool, employee: Employee, request: LeaveRequest) {
    actix_web::rt::spawn(async move {
        match leave_requested(&pool, &employee, &request).await {
            Ok(sent) => debug!(request_id = request.id, sent, "Leave request notifications queued"),
            Err(e) => error!(request_id = request.id, error = %e, "Failed to notify leave request"),
        }
    });
}

/// Tells the owner their request was approved, rejected or cancelled.
pub fn dispatch_status(pool: MySqlPool, employee: Employee, request: LeaveRequest) {
    actix_web::rt::spawn(async move {
        match status_changed(&pool, &employee, &request).await {
            Ok(sent) => debug!(request_id = request.id, sent, "Leave status notifications queued"),
            Err(e) => error!(request_id = request.id, error = %e, "Failed to notify leave status"),
        }
    });
}

pub async fn list(
    pool: &MySqlPool,
    actor: &Actor,
    unread_only: bool,
    page: Page,
) -> AppResult<Listing<Notification>> {
    let mut conn = pool.acquire().await?;
    let rows = store::notifications::for_user(&mut conn, actor.user_id, unread_only, page).await?;
    Ok(Listing::new(rows, page))
}

pub async fn mark_read(pool: &MySqlPool, actor: &Actor, id: u64) -> AppResult<()> {
    let mut conn = pool.acquire().await?;
    if store::notifications::mark_read(&mut conn, id, actor.user_id).await? {
        Ok(())
    } else {
        Err(AppError::not_found("Notification not found"))
    }
}
