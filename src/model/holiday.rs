use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Named set of public holidays for one year. Employees follow at most one
/// calendar.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HolidayCalendar {
    pub id: u64,
    pub organization_id: u64,
    #[schema(example = "Head office")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 2025)]
    pub year: i32,
    /// Ordered by date
    pub holidays: Vec<Holiday>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    pub id: u64,
    pub calendar_id: u64,
    #[schema(example = "New Year")]
    pub name: String,
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Last day of a multi-day holiday
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HolidayInput {
    #[schema(example = "New Year")]
    pub name: String,
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl HolidayInput {
    /// Checks the entry against the year of the calendar it goes into.
    pub fn validate(&self, year: i32) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::bad_request("Holiday name is required"));
        }
        if self.date.year() != year {
            return Err(AppError::bad_request(format!(
                "Holiday on {} is outside calendar year {}",
                self.date, year
            )));
        }
        if let Some(end) = self.end_date {
            if end < self.date {
                return Err(AppError::bad_request(format!(
                    "Holiday '{}' ends before it starts",
                    self.name.trim()
                )));
            }
        }
        Ok(())
    }
}

/// Trimmed, non-empty calendar name.
pub fn calendar_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Calendar name is required"));
    }
    if name.chars().count() > 191 {
        return Err(AppError::bad_request("Calendar name is too long"));
    }
    Ok(name.to_string())
}

pub fn validate_year(year: i32) -> AppResult<()> {
    if !(1970..=9999).contains(&year) {
        return Err(AppError::bad_request(format!("Invalid calendar year {}", year)));
    }
    Ok(())
}

/// A calendar's year can only move if none of its holidays would fall
/// outside it.
pub fn ensure_within_year(holidays: &[Holiday], year: i32) -> AppResult<()> {
    match holidays.iter().find(|h| h.date.year() != year) {
        Some(h) => Err(AppError::bad_request(format!(
            "Calendar has a holiday on {} outside year {}",
            h.date, year
        ))),
        None => Ok(()),
    }
}

/// Splits a bulk payload into entries to insert and dates to skip. A date
/// is skipped when the calendar already has it or an earlier entry in the
/// same payload claimed it.
pub fn split_new<'a>(
    inputs: &'a [HolidayInput],
    taken: &HashSet<NaiveDate>,
) -> (Vec<&'a HolidayInput>, Vec<NaiveDate>) {
    let mut seen = taken.clone();
    let mut fresh = Vec::new();
    let mut skipped = Vec::new();
    for input in inputs {
        if seen.insert(input.date) {
            fresh.push(input);
        } else {
            skipped.push(input.date);
        }
    }
    (fresh, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn input(name: &str, on: NaiveDate) -> HolidayInput {
        HolidayInput {
            name: name.to_string(),
            date: on,
            end_date: None,
            description: None,
        }
    }

    #[test]
    fn holiday_must_fall_in_calendar_year() {
        assert!(input("New Year", date(1, 1)).validate(2025).is_ok());
        let err = input("New Year", date(1, 1)).validate(2026).unwrap_err();
        assert_eq!(err.to_string(), "Holiday on 2025-01-01 is outside calendar year 2026");
    }

    #[test]
    fn holiday_cannot_end_before_it_starts() {
        let mut h = input("Eid", date(4, 1));
        h.end_date = Some(date(3, 31));
        assert!(h.validate(2025).is_err());

        h.end_date = Some(date(4, 3));
        assert!(h.validate(2025).is_ok());
    }

    #[test]
    fn blank_names_rejected() {
        assert!(input("  ", date(5, 1)).validate(2025).is_err());
        assert!(calendar_name("   ").is_err());
        assert_eq!(calendar_name(" Head office ").unwrap(), "Head office");
    }

    #[test]
    fn bulk_skips_taken_and_repeated_dates() {
        let inputs = vec![
            input("New Year", date(1, 1)),
            input("Labour Day", date(5, 1)),
            input("Labour Day (again)", date(5, 1)),
            input("Christmas", date(12, 25)),
        ];
        let taken: HashSet<_> = [date(12, 25)].into_iter().collect();

        let (fresh, skipped) = split_new(&inputs, &taken);
        let names: Vec<_> = fresh.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["New Year", "Labour Day"]);
        assert_eq!(skipped, [date(5, 1), date(12, 25)]);
    }

    #[test]
    fn year_change_blocked_by_existing_holidays() {
        let holidays = vec![Holiday {
            id: 1,
            calendar_id: 1,
            name: "New Year".to_string(),
            date: date(1, 1),
            end_date: None,
            description: None,
        }];
        assert!(ensure_within_year(&holidays, 2025).is_ok());
        assert!(ensure_within_year(&holidays, 2026).is_err());
        assert!(ensure_within_year(&[], 2026).is_ok());
        assert!(validate_year(1800).is_err());
    }
}
