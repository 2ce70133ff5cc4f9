//! Calendar arithmetic for leave requests.
//!
//! Dates are whole calendar days: a span covers `start` 00:00:00 through
//! `end` 23:59:59, so comparing `NaiveDate`s inclusively is enough for the
//! overlap test and no time-of-day stretching is needed for day counts.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::model::leave_request::LeaveDuration;

pub const HALF_DAY: f64 = 0.5;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DateSpan {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::bad_request("Start date cannot be after end date"));
        }
        Ok(DateSpan { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive-bounds interval intersection.
    pub fn overlaps(&self, other: &DateSpan) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn inclusive_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Days charged for a request.
///
/// An explicit `day_details` list wins over the range and counts each
/// distinct date once; a half-day request is a flat 0.5 and must be a
/// single date.
pub fn days_taken(
    span: &DateSpan,
    duration: LeaveDuration,
    day_details: Option<&[NaiveDate]>,
) -> AppResult<f64> {
    if let Some(details) = day_details.filter(|d| !d.is_empty()) {
        if duration == LeaveDuration::Half {
            return Err(AppError::bad_request(
                "Half-day requests cannot list individual days",
            ));
        }
        if let Some(outside) = details.iter().find(|d| !span.contains(**d)) {
            return Err(AppError::bad_request(format!(
                "Day {} is outside the requested range",
                outside
            )));
        }
        let distinct: BTreeSet<&NaiveDate> = details.iter().collect();
        return Ok(distinct.len() as f64);
    }

    match duration {
        LeaveDuration::Full => Ok(span.inclusive_days() as f64),
        LeaveDuration::Half => {
            if span.start() != span.end() {
                return Err(AppError::bad_request(
                    "Half-day leave must start and end on the same date",
                ));
            }
            Ok(HALF_DAY)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn span(a: NaiveDate, b: NaiveDate) -> DateSpan {
        DateSpan::new(a, b).unwrap()
    }

    #[test]
    fn reversed_range_rejected() {
        assert!(DateSpan::new(d(2024, 6, 5), d(2024, 6, 1)).is_err());
    }

    #[test]
    fn single_day_counts_as_one() {
        let s = span(d(2024, 6, 1), d(2024, 6, 1));
        assert_eq!(days_taken(&s, LeaveDuration::Full, None).unwrap(), 1.0);
    }

    #[test]
    fn range_is_inclusive() {
        let s = span(d(2024, 6, 1), d(2024, 6, 5));
        assert_eq!(days_taken(&s, LeaveDuration::Full, None).unwrap(), 5.0);
    }

    #[test]
    fn range_across_month_and_leap_day() {
        let s = span(d(2024, 2, 27), d(2024, 3, 2));
        assert_eq!(s.inclusive_days(), 5);
    }

    #[test]
    fn half_day_is_fixed() {
        let s = span(d(2024, 6, 3), d(2024, 6, 3));
        assert_eq!(days_taken(&s, LeaveDuration::Half, None).unwrap(), 0.5);
    }

    #[test]
    fn half_day_over_several_days_rejected() {
        let s = span(d(2024, 6, 3), d(2024, 6, 4));
        assert!(days_taken(&s, LeaveDuration::Half, None).is_err());
    }

    #[test]
    fn day_details_count_distinct_dates() {
        let s = span(d(2024, 6, 1), d(2024, 6, 10));
        let details = [d(2024, 6, 2), d(2024, 6, 4), d(2024, 6, 4), d(2024, 6, 9)];
        assert_eq!(
            days_taken(&s, LeaveDuration::Full, Some(&details)).unwrap(),
            3.0
        );
    }

    #[test]
    fn empty_day_details_fall_back_to_range() {
        let s = span(d(2024, 6, 1), d(2024, 6, 3));
        assert_eq!(days_taken(&s, LeaveDuration::Full, Some(&[])).unwrap(), 3.0);
    }

    #[test]
    fn day_details_outside_range_rejected() {
        let s = span(d(2024, 6, 1), d(2024, 6, 3));
        let details = [d(2024, 6, 2), d(2024, 6, 7)];
        let err = days_taken(&s, LeaveDuration::Full, Some(&details)).unwrap_err();
        assert!(err.to_string().contains("2024-06-07"));
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let july = span(d(2024, 7, 1), d(2024, 7, 10));
        assert!(july.overlaps(&span(d(2024, 7, 5), d(2024, 7, 7))));
        assert!(july.overlaps(&span(d(2024, 7, 10), d(2024, 7, 12))));
        assert!(july.overlaps(&span(d(2024, 6, 20), d(2024, 7, 1))));
        assert!(!july.overlaps(&span(d(2024, 7, 11), d(2024, 7, 12))));
        assert!(!july.overlaps(&span(d(2024, 6, 1), d(2024, 6, 30))));
    }
}
