use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::leave_type::LeaveType;

/// One employee's quota of one leave type for one calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveAllocation {
    pub id: u64,
    pub employee_id: u64,
    pub year: i32,
    pub leave_type: LeaveType,
    pub allocated: f64,
    pub used: f64,
}

impl LeaveAllocation {
    pub fn remaining(&self) -> f64 {
        self.allocated - self.used
    }
}

/// Allocation as returned to clients, `remaining` derived on read.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "year": 2024,
    "leave_type": "ANNUAL",
    "allocated": 20.0,
    "used": 5.0,
    "remaining": 15.0
}))]
pub struct AllocationResponse {
    pub id: u64,
    pub employee_id: u64,
    pub year: i32,
    pub leave_type: LeaveType,
    pub allocated: f64,
    pub used: f64,
    pub remaining: f64,
}

impl From<&LeaveAllocation> for AllocationResponse {
    fn from(a: &LeaveAllocation) -> Self {
        AllocationResponse {
            id: a.id,
            employee_id: a.employee_id,
            year: a.year,
            leave_type: a.leave_type,
            allocated: a.allocated,
            used: a.used,
            remaining: a.remaining(),
        }
    }
}

impl From<LeaveAllocation> for AllocationResponse {
    fn from(a: LeaveAllocation) -> Self {
        AllocationResponse::from(&a)
    }
}
