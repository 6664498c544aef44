//! Monetary amounts as integer minor units.
//!
//! Expense amounts are stored and summed as whole cents (`i64`) so that
//! totals are exact no matter how many small amounts are added together.
//! Clients submit decimal strings such as "12.50" which are parsed here at
//! the API boundary.

use crate::Error;

/// A monetary amount in whole cents.
pub type Cents = i64;

/// Parse a non-negative decimal amount string, e.g. "12.50", into cents.
///
/// Accepts up to two fractional digits. A missing fractional part is
/// treated as ".00" and a single fractional digit as tenths, so "7" and
/// "7.5" parse to 700 and 750 cents respectively.
///
/// # Errors
/// Returns [Error::InvalidAmount] if the string is empty, negative, has
/// more than two fractional digits or contains anything other than ASCII
/// digits and a single decimal point.
pub fn parse_amount(text: &str) -> Result<Cents, Error> {
    let text = text.trim();
    let invalid = || Error::InvalidAmount(text.to_owned());

    let (whole_text, fraction_text) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };

    if whole_text.is_empty() || fraction_text.len() > 2 {
        return Err(invalid());
    }

    if !whole_text.bytes().all(|byte| byte.is_ascii_digit())
        || !fraction_text.bytes().all(|byte| byte.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: i64 = whole_text.parse().map_err(|_| invalid())?;

    let fraction = match fraction_text.len() {
        0 => 0,
        length => {
            let digits: i64 = fraction_text.parse().map_err(|_| invalid())?;
            if length == 1 { digits * 10 } else { digits }
        }
    };

    whole
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(fraction))
        .ok_or_else(invalid)
}

/// Format an amount in cents as a decimal string with two fractional
/// digits, e.g. 1250 becomes "12.50".
pub fn format_cents(cents: Cents) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}
