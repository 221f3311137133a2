use std::fmt;

/// Money is held as integer cents so balances add up exactly.
/// 1 unit = 100 cents, so 2500.50 = 250050 cents.
pub type Cents = i64;

/// Sums over many balances, wide enough that adding any number of `Cents` can't overflow.
pub type TotalCents = i128;

/// Format cents as a plain decimal string.
/// Example: 250050 -> "2500.50", -1234 -> "-12.34"
pub fn format_cents(cents: impl Into<TotalCents>) -> String {
    let cents = cents.into();
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string typed by a user into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, MoneyError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (digits, ""),
    };
    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(MoneyError::InvalidFormat);
    }
    // A leading '-' is the only sign accepted
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(units_str) || !all_digits(decimal_str) {
        return Err(MoneyError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| MoneyError::InvalidFormat)?
    };

    // More than two decimal places are truncated
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => decimal_str.parse::<i64>().map_err(|_| MoneyError::InvalidFormat)? * 10,
        _ => decimal_str[..2].parse().map_err(|_| MoneyError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(MoneyError::OutOfRange)?;
    Ok(if negative { -cents } else { cents })
}

/// Convert a decimal amount in currency units (as carried by JSON) to cents,
/// rounding to the nearest cent.
pub fn cents_from_units(units: f64) -> Result<Cents, MoneyError> {
    if !units.is_finite() {
        return Err(MoneyError::InvalidFormat);
    }
    let cents = (units * 100.0).round();
    if cents.abs() >= i64::MAX as f64 {
        return Err(MoneyError::OutOfRange);
    }
    Ok(cents as Cents)
}

/// Convert cents back to currency units for JSON output.
pub fn cents_to_units(cents: impl Into<TotalCents>) -> f64 {
    cents.into() as f64 / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::InvalidFormat => write!(f, "invalid money format"),
            MoneyError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for MoneyError {}
