use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<NaiveDateTime>,
    pub work_minutes: i32,
}

/// Whole minutes between check-in and check-out, never negative.
pub fn work_minutes(check_in: NaiveDateTime, check_out: NaiveDateTime) -> i32 {
    let minutes = (check_out - check_in).num_minutes();
    minutes.clamp(0, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn counts_whole_minutes() {
        assert_eq!(work_minutes(at(9, 0), at(17, 30)), 510);
    }

    #[test]
    fn clock_skew_does_not_go_negative() {
        assert_eq!(work_minutes(at(17, 0), at(9, 0)), 0);
    }
}
