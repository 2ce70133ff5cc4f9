use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "organization_id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "status": "ACTIVE",
        "joining_date": "2024-01-01",
        "user_id": 7,
        "manager_id": null,
        "leave_grade_id": 2
    })
)]
pub struct Employee {
    pub id: u64,
    pub organization_id: u64,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub status: String,
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub joining_date: NaiveDate,
    /// Linked login, if the employee has one
    pub user_id: Option<u64>,
    pub manager_id: Option<u64>,
    pub leave_grade_id: Option<u64>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
