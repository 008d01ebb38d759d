//! Two-decimal money arithmetic.
//!
//! Every monetary figure the crate exposes is rounded to two decimal
//! places with commercial rounding (half away from zero) at the point
//! where it is computed. Intermediate products are never carried
//! unrounded into the next named figure, because the protection code and
//! the signed document embed these exact values.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::error::FiscalError;

/// Round to two decimal places, half away from zero.
///
/// Negative values round symmetrically (`-1.125` → `-1.13`) and a
/// negative zero result is normalised to zero.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

/// Largest magnitude accepted for a quantity, price or amount.
///
/// Two bounded factors multiply to at most 10^24, and [`MAX_LINES`] such
/// products still sum inside the 96-bit mantissa of [`Decimal`].
///
/// [`MAX_LINES`]: super::builder::MAX_LINES
pub const MAX_MAGNITUDE: Decimal = dec!(1000000000000);

/// Reject values whose magnitude exceeds [`MAX_MAGNITUDE`].
pub fn check_magnitude(field: &str, value: Decimal) -> Result<Decimal, FiscalError> {
    if value.abs() > MAX_MAGNITUDE {
        return Err(FiscalError::invalid(
            field,
            format!("{value} exceeds the largest accepted magnitude {MAX_MAGNITUDE}"),
        ));
    }
    Ok(value)
}

/// Multiply and round the product to two decimal places.
///
/// Callers keep both factors within [`MAX_MAGNITUDE`].
pub fn mul2(a: Decimal, b: Decimal) -> Decimal {
    round2(a * b)
}

/// Sum an iterator of amounts and round the result to two decimal places.
/// An empty iterator yields `0.00`.
pub fn sum2<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round2(values.into_iter().sum())
}

/// Format with exactly two decimals and a `.` separator.
pub fn format2(value: Decimal) -> String {
    let mut rounded = round2(value);
    rounded.rescale(2);
    rounded.to_string()
}

/// Parse a textual number, rejecting anything that is not a decimal literal.
pub fn parse_decimal(field: &str, text: &str) -> Result<Decimal, FiscalError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FiscalError::invalid(field, "value must not be empty"));
    }
    Decimal::from_str(trimmed)
        .map_err(|e| FiscalError::invalid(field, format!("'{trimmed}' is not a number: {e}")))
}
