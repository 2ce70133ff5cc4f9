use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::leave_type::LeaveType;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveGrade {
    pub id: u64,
    pub organization_id: u64,
    #[schema(example = "Staff")]
    pub name: String,
    pub policies: Vec<LeavePolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeavePolicy {
    pub id: u64,
    pub leave_grade_id: u64,
    pub leave_type: LeaveType,
    /// Annual quota in days
    #[schema(example = 20.0)]
    pub total_days: f64,
    pub carry_forward: bool,
    #[schema(example = 5.0)]
    pub max_carry_amount: f64,
}

/// Policy as submitted by an admin, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PolicyInput {
    pub leave_type: LeaveType,
    #[schema(example = 20.0)]
    pub total_days: f64,
    #[serde(default)]
    pub carry_forward: bool,
    #[serde(default)]
    #[schema(example = 5.0)]
    pub max_carry_amount: f64,
}

impl PolicyInput {
    pub fn validate(&self) -> AppResult<()> {
        if !self.total_days.is_finite() || self.total_days < 0.0 {
            return Err(AppError::bad_request(format!(
                "Total days for {} must be a non-negative number",
                self.leave_type
            )));
        }
        if self.max_carry_amount < 0.0 {
            return Err(AppError::bad_request(format!(
                "Max carry amount for {} must be non-negative",
                self.leave_type
            )));
        }
        if !self.carry_forward && self.max_carry_amount > 0.0 {
            return Err(AppError::bad_request(format!(
                "Max carry amount for {} must be 0 when carry forward is disabled",
                self.leave_type
            )));
        }
        if self.carry_forward && self.max_carry_amount > self.total_days {
            return Err(AppError::bad_request(format!(
                "Max carry amount for {} cannot exceed total days",
                self.leave_type
            )));
        }
        Ok(())
    }
}

/// Trimmed, non-empty grade name.
pub fn grade_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Leave grade name is required"));
    }
    if name.chars().count() > 191 {
        return Err(AppError::bad_request("Leave grade name is too long"));
    }
    Ok(name.to_string())
}

/// Checks every policy and rejects a leave type that appears twice.
pub fn validate_policies(policies: &[PolicyInput]) -> AppResult<()> {
    let mut seen = std::collections::HashSet::new();
    for policy in policies {
        policy.validate()?;
        if !seen.insert(policy.leave_type) {
            return Err(AppError::bad_request(format!(
                "Duplicate leave type {} in policies",
                policy.leave_type
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(leave_type: LeaveType, total: f64, carry: bool, max: f64) -> PolicyInput {
        PolicyInput {
            leave_type,
            total_days: total,
            carry_forward: carry,
            max_carry_amount: max,
        }
    }

    #[test]
    fn carry_amount_must_be_zero_without_carry_forward() {
        assert!(policy(LeaveType::Annual, 20.0, false, 0.0).validate().is_ok());
        assert!(policy(LeaveType::Annual, 20.0, false, 3.0).validate().is_err());
    }

    #[test]
    fn carry_amount_cannot_exceed_quota() {
        assert!(policy(LeaveType::Annual, 20.0, true, 20.0).validate().is_ok());
        assert!(policy(LeaveType::Annual, 20.0, true, 21.0).validate().is_err());
    }

    #[test]
    fn negative_quota_rejected() {
        assert!(policy(LeaveType::Sick, -1.0, false, 0.0).validate().is_err());
    }

    #[test]
    fn duplicate_leave_types_rejected() {
        let policies = vec![
            policy(LeaveType::Annual, 20.0, true, 5.0),
            policy(LeaveType::Sick, 10.0, false, 0.0),
            policy(LeaveType::Annual, 15.0, false, 0.0),
        ];
        let err = validate_policies(&policies).unwrap_err();
        assert!(err.to_string().contains("Duplicate leave type ANNUAL"));
    }

    #[test]
    fn grade_name_is_trimmed() {
        assert_eq!(grade_name("  Staff ").unwrap(), "Staff");
        assert!(grade_name("   ").is_err());
    }
}
