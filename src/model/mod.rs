pub mod attendance;
pub mod employee;
pub mod holiday;
pub mod leave_allocation;
pub mod leave_grade;
pub mod leave_ledger;
pub mod leave_request;
pub mod leave_type;
pub mod notification;
pub mod role;
pub mod user;
