// Input checks that run before anything touches the disk
use crate::{Error, Result};
use chrono::NaiveDate;

/// Canonical on-disk date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shortest acceptable (trimmed) subscription name
pub const MIN_NAME_LEN: usize = 2;

/// Stateless date checks. These never fail, they just say yes or no.
pub struct DateValidator;

impl DateValidator {
    /// True iff `input` parses completely under `format` (chrono syntax)
    pub fn is_valid(input: &str, format: &str) -> bool {
        if input.is_empty() {
            return false;
        }
        NaiveDate::parse_from_str(input, format).is_ok()
    }

    /// Shorthand for the canonical `YYYY-MM-DD` format
    pub fn is_valid_iso(input: &str) -> bool {
        Self::is_valid(input, DATE_FORMAT)
    }

    /// True iff the date is today or later. Unparseable input is simply false.
    pub fn is_future_or_today(input: &str, today: NaiveDate) -> bool {
        parse_date(input).map(|d| d >= today).unwrap_or(false)
    }
}

/// Parse a canonical date, turning failure into a validation error
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    if input.is_empty() {
        return Err(Error::ValidationError("Renewal date is required".to_string()));
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| {
        Error::ValidationError(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD",
            input
        ))
    })
}

/// Names need at least two visible characters
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(Error::ValidationError(format!(
            "Subscription name must have at least {} characters",
            MIN_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::ValidationError(format!(
            "Price must be a non-negative amount, got {}",
            price
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_dates() {
        assert!(DateValidator::is_valid_iso("2024-02-29"));
        assert!(DateValidator::is_valid("29/02/2024", "%d/%m/%Y"));
    }

    #[test]
    fn test_invalid_dates() {
        assert!(!DateValidator::is_valid_iso(""));
        assert!(!DateValidator::is_valid_iso("2023-02-29"));
        assert!(!DateValidator::is_valid_iso("2024-13-01"));
        assert!(!DateValidator::is_valid_iso("2024-01-01 extra"));
        assert!(!DateValidator::is_valid_iso("tomorrow"));
    }

    #[test]
    fn test_future_or_today() {
        let today = date(2024, 6, 15);
        assert!(DateValidator::is_future_or_today("2024-06-15", today));
        assert!(DateValidator::is_future_or_today("2024-06-16", today));
        assert!(!DateValidator::is_future_or_today("2024-06-14", today));
        assert!(!DateValidator::is_future_or_today("garbage", today));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("Netflix").is_ok());
        assert!(validate_name("TV").is_ok());
        assert!(validate_name(" X ").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_price_validation() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(9.99).is_ok());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
    }

    #[test]
    fn test_parse_date_error_is_validation() {
        assert!(matches!(parse_date("2024/01/01"), Err(Error::ValidationError(_))));
        assert_eq!(parse_date("2024-01-01").unwrap(), date(2024, 1, 1));
    }
}
