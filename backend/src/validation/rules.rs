//! Common validation rules shared across request payloads.

use chrono::{NaiveDate, Utc};
use validator::ValidationError;

/// Wire format for calendar dates in request bodies.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Validates a date of birth.
///
/// Requirements:
/// - `YYYY-MM-DD`
/// - not later than today (UTC)
pub fn validate_date_of_birth(value: &str) -> Result<(), ValidationError> {
    let Some(date) = parse_date(value) else {
        return Err(ValidationError::new("date_format"));
    };
    if date > Utc::now().date_naive() {
        return Err(ValidationError::new("date_in_future"));
    }
    Ok(())
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
