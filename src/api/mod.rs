//! HTTP handlers. Each handler turns the authenticated caller into an
//! `Actor`, calls one service operation and serializes the result.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::model::holiday::HolidayCalendar;
use crate::model::leave_allocation::AllocationResponse;
use crate::model::leave_grade::LeaveGrade;
use crate::model::leave_ledger::LedgerEntry;
use crate::model::leave_request::LeaveRequest;
use crate::model::notification::Notification;
use crate::service::Listing;
use crate::store::filter::Page;

pub mod allocation;
pub mod attendance;
pub mod holiday;
pub mod leave_grade;
pub mod leave_request;
pub mod ledger;
pub mod me;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.per_page)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct YearQuery {
    /// Calendar year, defaults to the current one
    pub year: Option<i32>,
}

impl YearQuery {
    /// The only place the wall clock decides a leave year.
    pub fn year_or_current(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }
}

macro_rules! list_response {
    ($name:ident, $item:ty) => {
        #[derive(Debug, Serialize, ToSchema)]
        pub struct $name {
            pub data: Vec<$item>,
            #[schema(example = 1)]
            pub page: u64,
            #[schema(example = 20)]
            pub per_page: u64,
            #[schema(example = 1)]
            pub total: i64,
        }

        impl From<Listing<$item>> for $name {
            fn from(l: Listing<$item>) -> Self {
                $name {
                    data: l.items,
                    page: l.page.page,
                    per_page: l.page.per_page,
                    total: l.total,
                }
            }
        }
    };
}

list_response!(AllocationListResponse, AllocationResponse);
list_response!(LeaveListResponse, LeaveRequest);
list_response!(LedgerListResponse, LedgerEntry);
list_response!(GradeListResponse, LeaveGrade);
list_response!(CalendarListResponse, HolidayCalendar);
list_response!(NotificationListResponse, Notification);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_year_wins() {
        let q = YearQuery { year: Some(2023) };
        assert_eq!(q.year_or_current(), 2023);
    }

    #[test]
    fn listing_becomes_envelope() {
        let listing = Listing::new((vec![], 42), Page::new(Some(3), Some(10)));
        let body: LeaveListResponse = listing.into();
        assert_eq!((body.page, body.per_page, body.total), (3, 10, 42));
    }
}
