//! Row-level access to MySQL. Every function takes a plain connection so
//! the same call works inside a transaction (`&mut tx`) or on a pooled
//! connection.

use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub mod allocations;
pub mod attendance;
pub mod employees;
pub mod filter;
pub mod grades;
pub mod holidays;
pub mod ledger;
pub mod notifications;
pub mod requests;
pub mod users;

/// Parses an enum column stored as its upper-snake name.
pub(crate) fn parse_column<T: FromStr>(column: &str, value: &str) -> AppResult<T> {
    value.parse().map_err(|_| {
        AppError::internal(format!(
            "Unexpected value '{}' in column {}",
            value, column
        ))
    })
}
