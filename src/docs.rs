use crate::api::allocation::{BulkAllocationResponse, CarryForwardResponse, ImportResponse};
use crate::api::holiday::{AssignCalendar, AssignResponse};
use crate::api::leave_request::{CreateLeave, DecisionRemarks};
use crate::api::{
    AllocationListResponse, CalendarListResponse, GradeListResponse, LeaveListResponse,
    LedgerListResponse, NotificationListResponse,
};
use crate::leave::allocation::AllocationPatch;
use crate::leave::batch::BatchFailure;
use crate::leave::request::LeaveRequestPatch;
use crate::model::attendance::Attendance;
use crate::model::holiday::{Holiday, HolidayCalendar, HolidayInput};
use crate::model::leave_allocation::AllocationResponse;
use crate::model::leave_grade::{LeaveGrade, LeavePolicy, PolicyInput};
use crate::model::leave_ledger::{LedgerEntry, LedgerEvent};
use crate::model::leave_request::{LeaveDuration, LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;
use crate::model::notification::Notification;
use crate::service::allocations::{
    AdjustmentInput, BulkAllocateInput, CarriedBalance, CarryForwardInput, ImportRecord,
    NewAllocation,
};
use crate::service::grades::{GradeInput, GradeUpdate};
use crate::service::holidays::{BulkHolidays, CalendarInput, CalendarUpdate};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave management

Leave requests, approvals, per-year allocations and the balance ledger of a
multi-tenant HR system.

### Key features
- **Leave requests**: apply, edit, approve/reject, cancel and delete
- **Allocations**: per employee, year and leave type, with bulk allocation
  from leave grades, import, manual adjustment and year-end carry forward
- **Ledger**: every balance change is recorded and can be listed per employee
- **Leave grades**: named policy sets assigned to employees
- **Holiday calendars**: yearly holiday sets assigned to employees
- **Attendance**: daily check-in and check-out
- **Notifications**: in-app notifications for leave events

### Security
All `/api` endpoints require a **JWT Bearer** access token obtained from
`/auth/login`. Administrative operations require an admin role.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,

        crate::api::allocation::create_allocation,
        crate::api::allocation::list_allocations,
        crate::api::allocation::get_allocation,
        crate::api::allocation::update_allocation,
        crate::api::allocation::delete_allocation,
        crate::api::allocation::bulk_allocate,
        crate::api::allocation::import_leaves,
        crate::api::allocation::adjust_allocation,
        crate::api::allocation::carry_forward,
        crate::api::allocation::employee_balances,

        crate::api::ledger::employee_ledger,

        crate::api::leave_grade::create_grade,
        crate::api::leave_grade::list_grades,
        crate::api::leave_grade::get_grade,
        crate::api::leave_grade::update_grade,
        crate::api::leave_grade::delete_grade,

        crate::api::holiday::create_calendar,
        crate::api::holiday::list_calendars,
        crate::api::holiday::get_calendar,
        crate::api::holiday::update_calendar,
        crate::api::holiday::delete_calendar,
        crate::api::holiday::add_holiday,
        crate::api::holiday::bulk_create_holidays,
        crate::api::holiday::assign_calendar,
        crate::api::holiday::update_holiday,
        crate::api::holiday::delete_holiday,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,

        crate::api::me::my_balances,
        crate::api::me::my_leave,
        crate::api::me::my_ledger,
        crate::api::me::my_holidays,
        crate::api::me::my_notifications,
        crate::api::me::mark_notification_read
    ),
    components(
        schemas(
            LeaveType,
            LeaveStatus,
            LeaveDuration,
            LeaveRequest,
            CreateLeave,
            LeaveRequestPatch,
            DecisionRemarks,
            LeaveListResponse,
            AllocationResponse,
            AllocationPatch,
            AllocationListResponse,
            NewAllocation,
            BulkAllocateInput,
            BulkAllocationResponse,
            ImportRecord,
            ImportResponse,
            AdjustmentInput,
            CarryForwardInput,
            CarriedBalance,
            CarryForwardResponse,
            BatchFailure,
            LedgerEvent,
            LedgerEntry,
            LedgerListResponse,
            LeaveGrade,
            LeavePolicy,
            PolicyInput,
            GradeInput,
            GradeUpdate,
            GradeListResponse,
            HolidayCalendar,
            Holiday,
            HolidayInput,
            CalendarInput,
            CalendarUpdate,
            CalendarListResponse,
            BulkHolidays,
            AssignCalendar,
            AssignResponse,
            Attendance,
            Notification,
            NotificationListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request APIs"),
        (name = "Allocation", description = "Leave allocation and balance APIs"),
        (name = "Ledger", description = "Balance history APIs"),
        (name = "Leave Grade", description = "Leave grade and policy APIs"),
        (name = "Holiday", description = "Holiday calendar APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Me", description = "Self-service APIs for the signed-in user"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_auth() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/leave/{leave_id}/approve"));
        assert!(doc.paths.paths.contains_key("/api/holiday-calendars/{id}/holidays/bulk"));
    }
}
