//! Integer-cent money helpers.
//!
//! Amounts are stored and divided as `i64` cents. The HTTP layer accepts and
//! renders decimals with two fractional digits.

/// Splits `total_cents` into `parts` shares that sum exactly to the total.
///
/// Leftover cents go one each to the leading shares, so callers that order
/// recipients by id get a deterministic assignment.
pub fn split_cents(total_cents: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }

    let count = parts as i64;
    let base = total_cents.div_euclid(count);
    let remainder = total_cents.rem_euclid(count);

    (0..count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Converts a decimal amount to cents, rounding half away from zero.
///
/// Returns `None` for non-finite values or values outside the `i64` range.
pub fn decimal_to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }
    let cents = (amount * 100.0).round();
    if cents.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

/// Converts cents to a decimal amount for JSON bodies.
pub fn cents_to_decimal(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Formats cents as `units.cc`, e.g. `5000` becomes `50.00`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
