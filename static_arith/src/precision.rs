// static_arith/src/precision.rs

//! Significant-digit precision and the per-session coder configuration.

use std::fmt;
use std::num::NonZeroU32;

use contracts::debug_requires;

use crate::arithmetic_coding::{arithmetic_decode, arithmetic_encode};
use crate::decimal::Decimal;
use crate::error::{PrecisionError, Result};
use crate::probability::{Model, Symbol};

/// Extra digits added on top of the width of the final coding interval.
pub const GUARD_DIGITS: u32 = 4;

/// Number of significant decimal digits kept by every interval operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Precision(NonZeroU32);

impl Precision {
    /// Creates a precision of `digits` significant digits.
    ///
    /// # Errors
    ///
    /// Returns `PrecisionError::ZeroDigits` if `digits` is zero.
    pub fn new(digits: u32) -> std::result::Result<Self, PrecisionError> {
        NonZeroU32::new(digits)
            .map(Precision)
            .ok_or(PrecisionError::ZeroDigits)
    }

    pub const fn from_nonzero(digits: NonZeroU32) -> Self {
        Precision(digits)
    }

    pub const fn digits(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} digits", self.0)
    }
}

/// Smallest precision that keeps a message of `message_length` symbols decodable when no
/// symbol is less likely than `min_probability`.
///
/// The final interval is at least `min_probability^n` wide, so its bounds need
/// `n * -log10(min_probability)` digits. Rounding adds up to one unit in the last place
/// per step, which costs another `log10(2 * (n + 1))` digits, and `GUARD_DIGITS` keeps the
/// codeword clear of the interval edges.
#[debug_requires(min_probability > 0.0 && min_probability <= 1.0, "probability out of (0, 1]")]
pub fn required_precision(message_length: usize, min_probability: f64) -> Precision {
    let min_probability = if min_probability > 0.0 {
        min_probability.min(1.0)
    } else {
        f64::MIN_POSITIVE
    };
    let n = message_length as f64;
    let interval_digits = (n * -min_probability.log10()).ceil().max(0.0);
    let rounding_digits = (2.0 * (n + 1.0)).log10().ceil();
    let digits = interval_digits + rounding_digits + f64::from(GUARD_DIGITS);

    // Saturating float-to-int cast; the result is at least GUARD_DIGITS.
    let digits = (digits as u32).max(GUARD_DIGITS);
    Precision::new(digits).unwrap_or(Precision::from_nonzero(NonZeroU32::MIN))
}

/// Session configuration shared by one encode and its matching decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoderConfig {
    pub precision: Precision,
}

impl CoderConfig {
    pub fn new(precision: Precision) -> Self {
        CoderConfig { precision }
    }

    /// Sizes the precision for `message_length` symbols coded with `model`.
    pub fn for_message(model: &Model, message_length: usize) -> Self {
        CoderConfig::new(model.required_precision(message_length))
    }

    pub fn encode(&self, message: &[Symbol], model: &Model) -> Result<Decimal> {
        arithmetic_encode(message, model, self.precision)
    }

    pub fn decode(&self, value: &Decimal, length: usize, model: &Model) -> Result<Vec<Symbol>> {
        arithmetic_decode(value, length, model, self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_digits_rejected() {
        assert_eq!(Precision::new(0), Err(PrecisionError::ZeroDigits));
        assert_eq!(Precision::new(7).unwrap().digits(), 7);
    }

    #[test]
    fn test_required_precision_known_values() {
        // 3 * 0.699 -> 3, log10(8) -> 1, plus guard digits.
        assert_eq!(required_precision(3, 0.2).digits(), 8);
        // A certain symbol costs nothing but rounding and guard digits.
        assert_eq!(required_precision(4, 1.0).digits(), 5);
        assert_eq!(required_precision(0, 0.5).digits(), 5);
    }

    #[test]
    fn test_required_precision_grows_with_length() {
        let mut previous = required_precision(1, 0.01);
        for length in [10, 100, 1000, 10_000] {
            let next = required_precision(length, 0.01);
            assert!(next > previous);
            previous = next;
        }
        assert!(required_precision(1000, 0.01).digits() >= 2000);
    }

    #[test]
    fn test_required_precision_grows_as_probability_shrinks() {
        assert!(required_precision(50, 0.001) > required_precision(50, 0.1));
    }
}
