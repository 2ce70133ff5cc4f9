use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin = 1,
    OrgAdmin = 2,
    HrAdmin = 3,
    Manager = 4,
    Employee = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::SuperAdmin),
            2 => Some(Role::OrgAdmin),
            3 => Some(Role::HrAdmin),
            4 => Some(Role::Manager),
            5 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// SUPER_ADMIN, ORG_ADMIN and HR_ADMIN manage leave for the whole organization.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::OrgAdmin | Role::HrAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for role in [
            Role::SuperAdmin,
            Role::OrgAdmin,
            Role::HrAdmin,
            Role::Manager,
            Role::Employee,
        ] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
    }

    #[test]
    fn managers_are_not_admins() {
        assert!(Role::HrAdmin.is_admin());
        assert!(!Role::Manager.is_admin());
        assert!(!Role::Employee.is_admin());
    }

    #[test]
    fn names_are_upper_snake() {
        assert_eq!(Role::HrAdmin.to_string(), "HR_ADMIN");
        assert_eq!("ORG_ADMIN".parse::<Role>().unwrap(), Role::OrgAdmin);
    }
}
