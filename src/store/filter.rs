//! Closed, typed filters for list queries, compiled into a WHERE clause
//! plus the values to bind in order.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::{QueryAs, QueryScalar};
use utoipa::IntoParams;

use crate::model::leave_request::LeaveStatus;
use crate::model::leave_type::LeaveType;

// Helper enum for typed SQLx binding
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    U64(u64),
    I32(i32),
    Str(String),
    Date(NaiveDate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub args: Vec<FilterValue>,
}

impl WhereClause {
    fn new() -> Self {
        WhereClause {
            sql: String::from(" WHERE 1=1"),
            args: Vec::new(),
        }
    }

    fn and(&mut self, condition: &str, value: FilterValue) {
        self.sql.push_str(" AND ");
        self.sql.push_str(condition);
        self.args.push(value);
    }

    pub fn bind_as<'q, O>(
        &self,
        mut q: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        for arg in &self.args {
            q = match arg.clone() {
                FilterValue::U64(v) => q.bind(v),
                FilterValue::I32(v) => q.bind(v),
                FilterValue::Str(v) => q.bind(v),
                FilterValue::Date(v) => q.bind(v),
            };
        }
        q
    }

    pub fn bind_scalar<'q, O>(
        &self,
        mut q: QueryScalar<'q, MySql, O, MySqlArguments>,
    ) -> QueryScalar<'q, MySql, O, MySqlArguments> {
        for arg in &self.args {
            q = match arg.clone() {
                FilterValue::U64(v) => q.bind(v),
                FilterValue::I32(v) => q.bind(v),
                FilterValue::Str(v) => q.bind(v),
                FilterValue::Date(v) => q.bind(v),
            };
        }
        q
    }
}

/// Highest page number honored; larger requests get this page.
pub const MAX_PAGE: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Page {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Page {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(20).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct LeaveRequestFilter {
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    /// Filter by leave type
    pub leave_type: Option<LeaveType>,
    /// Requests starting on or after this date
    #[param(value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Requests ending on or before this date
    #[param(value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

impl LeaveRequestFilter {
    /// Conditions over `leave_requests r JOIN employees e`.
    pub fn where_clause(&self, organization_id: u64) -> WhereClause {
        let mut w = WhereClause::new();
        w.and("e.organization_id = ?", FilterValue::U64(organization_id));
        if let Some(employee_id) = self.employee_id {
            w.and("r.employee_id = ?", FilterValue::U64(employee_id));
        }
        if let Some(status) = self.status {
            w.and("r.status = ?", FilterValue::Str(status.to_string()));
        }
        if let Some(leave_type) = self.leave_type {
            w.and("r.leave_type = ?", FilterValue::Str(leave_type.to_string()));
        }
        if let Some(from) = self.from {
            w.and("r.start_date >= ?", FilterValue::Date(from));
        }
        if let Some(to) = self.to {
            w.and("r.end_date <= ?", FilterValue::Date(to));
        }
        w
    }

    pub fn page(&self) -> Page {
        Page::new(self.page, self.per_page)
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct AllocationFilter {
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    /// Filter by calendar year
    pub year: Option<i32>,
    /// Filter by leave type
    pub leave_type: Option<LeaveType>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl AllocationFilter {
    /// Conditions over `leave_allocations a JOIN employees e`.
    pub fn where_clause(&self, organization_id: u64) -> WhereClause {
        let mut w = WhereClause::new();
        w.and("e.organization_id = ?", FilterValue::U64(organization_id));
        if let Some(employee_id) = self.employee_id {
            w.and("a.employee_id = ?", FilterValue::U64(employee_id));
        }
        if let Some(year) = self.year {
            w.and("a.year = ?", FilterValue::I32(year));
        }
        if let Some(leave_type) = self.leave_type {
            w.and("a.leave_type = ?", FilterValue::Str(leave_type.to_string()));
        }
        w
    }

    pub fn page(&self) -> Page {
        Page::new(self.page, self.per_page)
    }
}

/// `?, ?, ?` for an IN list of `n` values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_only_scopes_tenant() {
        let w = LeaveRequestFilter::default().where_clause(7);
        assert_eq!(w.sql, " WHERE 1=1 AND e.organization_id = ?");
        assert_eq!(w.args, vec![FilterValue::U64(7)]);
    }

    #[test]
    fn every_request_filter_binds_in_order() {
        let filter = LeaveRequestFilter {
            employee_id: Some(3),
            status: Some(LeaveStatus::Pending),
            leave_type: Some(LeaveType::Sick),
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: NaiveDate::from_ymd_opt(2024, 12, 31),
            page: None,
            per_page: None,
        };
        let w = filter.where_clause(1);
        assert_eq!(
            w.sql,
            " WHERE 1=1 AND e.organization_id = ? AND r.employee_id = ? AND r.status = ? \
             AND r.leave_type = ? AND r.start_date >= ? AND r.end_date <= ?"
        );
        assert_eq!(w.args[2], FilterValue::Str("PENDING".to_string()));
        assert_eq!(w.args[3], FilterValue::Str("SICK".to_string()));
        assert_eq!(w.args.len(), 6);
    }

    #[test]
    fn allocation_filter_by_year() {
        let filter = AllocationFilter {
            year: Some(2025),
            ..Default::default()
        };
        let w = filter.where_clause(1);
        assert!(w.sql.ends_with("AND a.year = ?"));
        assert_eq!(w.args[1], FilterValue::I32(2025));
    }

    #[test]
    fn page_is_clamped() {
        let p = Page::new(Some(0), Some(1000));
        assert_eq!(p, Page { page: 1, per_page: 100 });
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let p = Page::new(Some(u64::MAX), Some(100));
        assert_eq!(p.page, MAX_PAGE);
        assert_eq!(p.offset(), (MAX_PAGE - 1) * 100);

        let raw = Page { page: u64::MAX, per_page: 100 };
        assert_eq!(raw.offset(), u64::MAX);
    }

    #[test]
    fn placeholder_list() {
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
