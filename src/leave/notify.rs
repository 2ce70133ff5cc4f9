//! Who hears about a leave event, and what they are told. Delivery itself
//! belongs to the notification outbox.

use serde_json::{Value, json};

use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::user::Recipient;

pub const TEMPLATE_LEAVE_REQUEST: &str = "leave-request";
pub const TEMPLATE_LEAVE_STATUS: &str = "leave-status";

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub recipient: Recipient,
    pub title: String,
    pub message: String,
    pub template: &'static str,
    pub payload: Value,
}

/// Admins, HR and the manager, each once, never the requester.
pub fn approvers(
    admins: Vec<Recipient>,
    manager: Option<Recipient>,
    requester_user_id: Option<u64>,
) -> Vec<Recipient> {
    let mut out: Vec<Recipient> = Vec::with_capacity(admins.len() + 1);
    for r in admins.into_iter().chain(manager) {
        if Some(r.user_id) == requester_user_id {
            continue;
        }
        if out.iter().all(|seen| seen.user_id != r.user_id) {
            out.push(r);
        }
    }
    out
}

fn payload(employee: &Employee, request: &LeaveRequest) -> Value {
    json!({
        "employeeName": employee.full_name(),
        "leaveType": request.leave_type.to_string(),
        "startDate": request.start_date.to_string(),
        "endDate": request.end_date.to_string(),
        "daysTaken": request.days_taken,
        "status": request.status.to_string(),
        "reason": request.reason,
    })
}

pub fn leave_requested(
    employee: &Employee,
    request: &LeaveRequest,
    approvers: Vec<Recipient>,
    requester: Option<Recipient>,
) -> Vec<Notice> {
    let data = payload(employee, request);
    let mut notices: Vec<Notice> = approvers
        .into_iter()
        .map(|recipient| Notice {
            recipient,
            title: "New Leave Request".to_string(),
            message: format!(
                "{} has applied for {} leave from {} to {}",
                employee.full_name(),
                request.leave_type,
                request.start_date,
                request.end_date
            ),
            template: TEMPLATE_LEAVE_REQUEST,
            payload: data.clone(),
        })
        .collect();

    if let Some(recipient) = requester {
        notices.push(Notice {
            recipient,
            title: "Leave Request Submitted".to_string(),
            message: format!(
                "Your {} leave request for {} to {} is {}",
                request.leave_type,
                request.start_date,
                request.end_date,
                request.status.to_string().to_lowercase()
            ),
            template: TEMPLATE_LEAVE_STATUS,
            payload: data,
        });
    }
    notices
}

pub fn status_changed(
    employee: &Employee,
    request: &LeaveRequest,
    owner: Option<Recipient>,
) -> Vec<Notice> {
    let Some(recipient) = owner else {
        return Vec::new();
    };
    let title = match request.status {
        LeaveStatus::Approved => "Leave Approved",
        LeaveStatus::Rejected => "Leave Rejected",
        LeaveStatus::Cancelled => "Leave Cancelled",
        LeaveStatus::Pending => "Leave Updated",
    };
    vec![Notice {
        recipient,
        title: title.to_string(),
        message: format!(
            "Your leave request for {} has been {}.",
            request.start_date,
            request.status.to_string().to_lowercase()
        ),
        template: TEMPLATE_LEAVE_STATUS,
        payload: payload(employee, request),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::LeaveDuration;
    use crate::model::leave_type::LeaveType;
    use chrono::{NaiveDate, Utc};

    fn r(user_id: u64) -> Recipient {
        Recipient {
            user_id,
            email: format!("user{}@example.com", user_id),
        }
    }

    fn employee() -> Employee {
        Employee {
            id: 10,
            organization_id: 1,
            employee_code: "EMP-010".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            status: "ACTIVE".to_string(),
            joining_date: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
            user_id: Some(5),
            manager_id: Some(2),
            leave_grade_id: Some(1),
        }
    }

    fn request(status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id: 10,
            leave_type: LeaveType::Annual,
            duration: LeaveDuration::Full,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(),
            days_taken: 5.0,
            reason: None,
            day_details: None,
            status,
            approved_by: None,
            remarks: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn approvers_deduplicated_by_user() {
        let out = approvers(vec![r(1), r(2), r(1)], Some(r(2)), Some(5));
        let ids: Vec<u64> = out.iter().map(|x| x.user_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn requester_is_not_an_approver() {
        // an HR admin applying for their own leave
        let out = approvers(vec![r(5), r(6)], None, Some(5));
        assert_eq!(out, vec![r(6)]);
    }

    #[test]
    fn requester_gets_confirmation() {
        let notices = leave_requested(
            &employee(),
            &request(LeaveStatus::Pending),
            vec![r(1)],
            Some(r(5)),
        );
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].title, "New Leave Request");
        assert!(notices[0].message.starts_with("Ada Byron has applied"));
        assert_eq!(notices[1].recipient.user_id, 5);
        assert_eq!(notices[1].payload["daysTaken"], 5.0);
    }

    #[test]
    fn status_change_without_linked_user_is_silent() {
        assert!(status_changed(&employee(), &request(LeaveStatus::Approved), None).is_empty());
        let n = status_changed(&employee(), &request(LeaveStatus::Rejected), Some(r(5)));
        assert_eq!(n[0].title, "Leave Rejected");
        assert!(n[0].message.ends_with("has been rejected."));
    }
}
