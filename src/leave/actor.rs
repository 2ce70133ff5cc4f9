use crate::error::{AppError, AppResult};
use crate::model::employee::Employee;
use crate::model::role::Role;

/// Who is performing an operation, already authenticated.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
    pub organization_id: u64,
    pub employee_id: Option<u64>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin access required"))
        }
    }

    /// Records of another organization are only visible to SUPER_ADMIN.
    pub fn ensure_organization(&self, organization_id: u64) -> AppResult<()> {
        if self.role == Role::SuperAdmin || self.organization_id == organization_id {
            Ok(())
        } else {
            Err(AppError::forbidden("Access denied"))
        }
    }

    pub fn own_employee_id(&self) -> AppResult<u64> {
        self.employee_id
            .ok_or_else(|| AppError::forbidden("No employee profile"))
    }

    /// Admins see everyone in their organization, others only themselves.
    pub fn ensure_can_view_employee(&self, employee_id: u64) -> AppResult<()> {
        if self.is_admin() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "Employees can only view their own leave data",
            ))
        }
    }

    fn manages(&self, employee: &Employee) -> bool {
        self.employee_id.is_some() && employee.manager_id == self.employee_id
    }

    /// Approving and rejecting is for admins and the direct manager.
    pub fn ensure_can_decide(&self, employee: &Employee) -> AppResult<()> {
        if self.is_admin() || self.manages(employee) {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "Not allowed to approve or reject this leave request",
            ))
        }
    }

    pub fn ensure_can_view_request(&self, employee: &Employee) -> AppResult<()> {
        if self.is_admin() || self.employee_id == Some(employee.id) || self.manages(employee) {
            Ok(())
        } else {
            Err(AppError::forbidden("Not allowed to view this leave request"))
        }
    }
}

#[cfg(test)]
pub(crate) fn actor(role: Role, employee_id: Option<u64>) -> Actor {
    Actor {
        user_id: 900 + employee_id.unwrap_or(0),
        role,
        organization_id: 1,
        employee_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_crosses_organizations() {
        let a = actor(Role::SuperAdmin, None);
        assert!(a.ensure_organization(42).is_ok());
    }

    #[test]
    fn org_admin_stays_in_organization() {
        let a = actor(Role::OrgAdmin, None);
        assert!(a.ensure_organization(1).is_ok());
        assert!(a.ensure_organization(2).is_err());
    }

    #[test]
    fn employee_views_only_self() {
        let a = actor(Role::Employee, Some(10));
        assert!(a.ensure_can_view_employee(10).is_ok());
        assert!(a.ensure_can_view_employee(11).is_err());
    }

    fn reportee(manager_id: Option<u64>) -> Employee {
        Employee {
            id: 10,
            organization_id: 1,
            employee_code: "EMP-010".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            status: "ACTIVE".to_string(),
            joining_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            user_id: Some(100),
            manager_id,
            leave_grade_id: None,
        }
    }

    #[test]
    fn direct_manager_decides() {
        let manager = actor(Role::Manager, Some(5));
        assert!(manager.ensure_can_decide(&reportee(Some(5))).is_ok());
        assert!(manager.ensure_can_decide(&reportee(Some(6))).is_err());
        assert!(manager.ensure_can_view_request(&reportee(Some(5))).is_ok());
    }

    #[test]
    fn employee_cannot_decide_own_leave() {
        let me = actor(Role::Employee, Some(10));
        assert!(me.ensure_can_decide(&reportee(None)).is_err());
        assert!(me.ensure_can_view_request(&reportee(None)).is_ok());
    }

    #[test]
    fn missing_profile_never_matches_missing_manager() {
        let nobody = actor(Role::Manager, None);
        assert!(nobody.ensure_can_decide(&reportee(None)).is_err());
    }
}
