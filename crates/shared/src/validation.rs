//! Field validators shared by request DTOs and services.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    // Telegram usernames: 5-32 chars of letters, digits and underscores.
    static ref TELEGRAM_HANDLE: Regex = Regex::new(r"^[A-Za-z0-9_]{5,32}$").expect("static regex");
}

/// Date format accepted for bill due dates and deadlines.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Strips surrounding whitespace and one leading `@` from a Telegram handle.
pub fn normalize_handle(handle: &str) -> &str {
    let trimmed = handle.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

/// Validates a Telegram handle, with or without the leading `@`.
pub fn validate_telegram_handle(handle: &str) -> Result<(), ValidationError> {
    if TELEGRAM_HANDLE.is_match(normalize_handle(handle)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("telegram_handle");
        err.message = Some("Telegram username must be 5-32 letters, digits or underscores".into());
        Err(err)
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Validates a `YYYY-MM-DD` date string.
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => {
            let mut err = ValidationError::new("date_format");
            err.message = Some("Date must use the YYYY-MM-DD format".into());
            Err(err)
        }
    }
}

/// Validates that a decimal amount is finite and strictly positive.
pub fn validate_positive_amount(amount: f64) -> Result<(), ValidationError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount_range");
        err.message = Some("Amount must be greater than zero".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("@alice_01"), "alice_01");
        assert_eq!(normalize_handle("  bob_resident "), "bob_resident");
        assert_eq!(normalize_handle("@@double"), "@double");
    }

    #[test]
    fn test_telegram_handle() {
        assert!(validate_telegram_handle("@alice_01").is_ok());
        assert!(validate_telegram_handle("manager_bob").is_ok());
        assert!(validate_telegram_handle("abc").is_err());
        assert!(validate_telegram_handle("has space").is_err());
        assert!(validate_telegram_handle("dash-name").is_err());
        assert!(validate_telegram_handle(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_dates() {
        assert!(validate_date("2024-03-31").is_ok());
        assert!(validate_date("2024-02-30").is_err());
        assert!(validate_date("31/03/2024").is_err());
        assert_eq!(
            parse_date("2024-03-31"),
            NaiveDate::from_ymd_opt(2024, 3, 31)
        );
    }

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(0.01).is_ok());
        assert!(validate_positive_amount(0.0).is_err());
        assert!(validate_positive_amount(-5.0).is_err());
        assert!(validate_positive_amount(f64::NAN).is_err());
        assert!(validate_positive_amount(f64::INFINITY).is_err());
    }
}
