//! Transactional operations. Each mutation opens one MySQL transaction,
//! locks the employee row first and the allocation row second, runs the
//! pure rules from `crate::leave`, writes the result plus its ledger entry,
//! and commits. Reads use a pooled connection.

use sqlx::MySqlConnection;
use tracing::info;

use crate::error::AppResult;
use crate::leave::allocation::BalanceChange;
use crate::model::leave_allocation::LeaveAllocation;
use crate::model::leave_ledger::NewLedgerEntry;
use crate::store::filter::Page;
use crate::store;

pub mod allocations;
pub mod grades;
pub mod holidays;
pub mod notifications;
pub mod requests;

/// One page of rows plus the total row count.
#[derive(Debug)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub page: Page,
    pub total: i64,
}

impl<T> Listing<T> {
    pub fn new((items, total): (Vec<T>, i64), page: Page) -> Self {
        Listing { items, page, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            total: self.total,
        }
    }
}

/// Writes an allocation row and its ledger entry. Returns the stored row
/// and the entry so the caller can log it once the transaction commits.
pub(crate) async fn persist_balance(
    conn: &mut MySqlConnection,
    change: BalanceChange,
) -> AppResult<(LeaveAllocation, Option<NewLedgerEntry>)> {
    let BalanceChange {
        mut allocation,
        created,
        entry,
    } = change;

    if created {
        allocation.id = store::allocations::insert(conn, &allocation).await?;
    } else {
        store::allocations::update(conn, &allocation).await?;
    }
    if let Some(entry) = &entry {
        store::ledger::append(conn, entry).await?;
    }
    Ok((allocation, entry))
}

pub(crate) fn log_committed(entry: Option<&NewLedgerEntry>) {
    if let Some(e) = entry {
        info!(
            employee_id = e.employee_id,
            year = e.year,
            leave_type = %e.leave_type,
            event = %e.event,
            amount = e.amount,
            "Leave balance changed"
        );
    }
}
