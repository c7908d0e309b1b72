// static_arith/src/decimal.rs

//! Arbitrary-precision decimal numbers with significant-digit rounding.
//!
//! A [`Decimal`] is `mantissa * 10^exponent` with an unbounded integer mantissa. The
//! `add`, `sub`, `mul` and `checked_div` operations round their result to a
//! [`Precision`] worth of significant digits, rounding half away from zero. The
//! `_exact` variants never round and are used where the result must be bit-identical on
//! both sides of a coding session, e.g. cumulative probabilities.

use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use contracts::debug_ensures;
use num::bigint::Sign;
use num::{BigInt, BigUint, Integer, One, Signed, Zero};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::precision::Precision;

/// Error returned when parsing a [`Decimal`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal: {0:?}")]
pub struct ParseDecimalError(String);

/// A decimal number kept in normalized form: the mantissa carries no trailing zero
/// digits, and zero is stored with exponent zero. Structural equality is therefore
/// numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: BigInt,
    exponent: i64,
}

fn pow10(power: u64) -> BigUint {
    num::pow(BigUint::from(10u32), power as usize)
}

fn scale(mantissa: &BigInt, power: u64) -> BigInt {
    if power == 0 {
        mantissa.clone()
    } else {
        mantissa * BigInt::from(pow10(power))
    }
}

/// Number of decimal digits of `magnitude` (one for zero).
fn digit_count(magnitude: &BigUint) -> u64 {
    if magnitude.is_zero() {
        return 1;
    }
    // floor((bits - 1) * log10(2)) + 1 is the digit count of 2^(bits-1); the true count
    // is at most one more. The float product may be off by one near integers.
    let mut digits = ((magnitude.bits() - 1) as f64 * std::f64::consts::LOG10_2) as u64 + 1;
    if digits > 1 && *magnitude < pow10(digits - 1) {
        digits -= 1;
    }
    while *magnitude >= pow10(digits) {
        digits += 1;
    }
    digits
}

impl Decimal {
    fn normalized(mut mantissa: BigInt, mut exponent: i64) -> Self {
        if mantissa.is_zero() {
            return Decimal::zero();
        }
        let ten = BigInt::from(10);
        loop {
            let (quotient, remainder) = mantissa.div_rem(&ten);
            if !remainder.is_zero() {
                break;
            }
            mantissa = quotient;
            exponent += 1;
        }
        Decimal { mantissa, exponent }
    }

    /// `mantissa * 10^exponent`.
    pub fn from_parts(mantissa: BigInt, exponent: i64) -> Self {
        Decimal::normalized(mantissa, exponent)
    }

    /// The normalized mantissa and exponent.
    pub fn parts(&self) -> (&BigInt, i64) {
        (&self.mantissa, self.exponent)
    }

    pub fn zero() -> Self {
        Decimal {
            mantissa: BigInt::zero(),
            exponent: 0,
        }
    }

    pub fn one() -> Self {
        Decimal {
            mantissa: BigInt::one(),
            exponent: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    /// Number of significant digits held by this value.
    pub fn significant_digits(&self) -> u64 {
        digit_count(self.mantissa.magnitude())
    }

    /// Exponent of the leading digit, so that `10^adjusted <= |self| < 10^(adjusted+1)`.
    pub fn adjusted_exponent(&self) -> i64 {
        self.exponent + self.significant_digits() as i64 - 1
    }

    /// One unit in the last place of `self` when written with `precision` digits.
    pub fn ulp(&self, precision: Precision) -> Decimal {
        Decimal {
            mantissa: BigInt::one(),
            exponent: self.adjusted_exponent() - i64::from(precision.digits()) + 1,
        }
    }

    /// Rounds to `precision` significant digits, half away from zero.
    #[debug_ensures(ret.significant_digits() <= u64::from(precision.digits()))]
    pub fn rounded(self, precision: Precision) -> Decimal {
        let digits = self.significant_digits();
        let keep = u64::from(precision.digits());
        if digits <= keep {
            return self;
        }
        self.drop_digits(digits - keep)
    }

    /// Rounds to a multiple of `10^exponent`, half away from zero.
    pub fn rounded_at(self, exponent: i64) -> Decimal {
        if self.exponent >= exponent {
            return self;
        }
        let dropped = (exponent - self.exponent) as u64;
        self.drop_digits(dropped)
    }

    fn drop_digits(self, dropped: u64) -> Decimal {
        let divisor = pow10(dropped);
        let (mut quotient, remainder) = self.mantissa.magnitude().div_rem(&divisor);
        if remainder * 2u32 >= divisor {
            quotient += 1u32;
        }
        let sign = self.mantissa.sign();
        Decimal::normalized(
            BigInt::from_biguint(sign, quotient),
            self.exponent + dropped as i64,
        )
    }

    /// Brings both mantissas to the smaller of the two exponents.
    fn aligned(&self, other: &Decimal) -> (BigInt, BigInt, i64) {
        let exponent = self.exponent.min(other.exponent);
        (
            scale(&self.mantissa, (self.exponent - exponent) as u64),
            scale(&other.mantissa, (other.exponent - exponent) as u64),
            exponent,
        )
    }

    pub fn add_exact(&self, other: &Decimal) -> Decimal {
        let (lhs, rhs, exponent) = self.aligned(other);
        Decimal::normalized(lhs + rhs, exponent)
    }

    pub fn sub_exact(&self, other: &Decimal) -> Decimal {
        let (lhs, rhs, exponent) = self.aligned(other);
        Decimal::normalized(lhs - rhs, exponent)
    }

    pub fn mul_exact(&self, other: &Decimal) -> Decimal {
        Decimal::normalized(&self.mantissa * &other.mantissa, self.exponent + other.exponent)
    }

    pub fn add(&self, other: &Decimal, precision: Precision) -> Decimal {
        self.add_exact(other).rounded(precision)
    }

    pub fn sub(&self, other: &Decimal, precision: Precision) -> Decimal {
        self.sub_exact(other).rounded(precision)
    }

    pub fn mul(&self, other: &Decimal, precision: Precision) -> Decimal {
        self.mul_exact(other).rounded(precision)
    }

    /// Divides at `precision` significant digits; `None` when `divisor` is zero.
    pub fn checked_div(&self, divisor: &Decimal, precision: Precision) -> Option<Decimal> {
        if divisor.is_zero() {
            return None;
        }
        Some(self.quotient(divisor, precision))
    }

    /// `self / divisor` for a non-zero `divisor`.
    fn quotient(&self, divisor: &Decimal, precision: Precision) -> Decimal {
        if self.is_zero() {
            return Decimal::zero();
        }
        let keep = u64::from(precision.digits());
        let numerator_digits = self.significant_digits();
        let divisor_digits = divisor.significant_digits();

        // Shift the numerator so the truncated quotient has at least keep + 1 digits.
        // Rounding that truncated quotient half-up matches rounding the exact one.
        let shift = (keep + 1 + divisor_digits).saturating_sub(numerator_digits);
        let numerator = self.mantissa.magnitude() * pow10(shift);
        let quotient = numerator / divisor.mantissa.magnitude();

        let sign = if self.is_negative() == divisor.is_negative() {
            Sign::Plus
        } else {
            Sign::Minus
        };
        let exponent = self.exponent - divisor.exponent - shift as i64;
        Decimal::normalized(BigInt::from_biguint(sign, quotient), exponent).rounded(precision)
    }

    /// Exactly half of `self`.
    pub fn half_exact(&self) -> Decimal {
        let one_half = Decimal {
            mantissa: BigInt::from(5),
            exponent: -1,
        };
        self.mul_exact(&one_half)
    }

    /// Half of `self`, rounded to `precision`.
    pub fn half(&self, precision: Precision) -> Decimal {
        self.half_exact().rounded(precision)
    }

    /// `numerator / denominator` at `precision`.
    pub fn from_ratio(numerator: u64, denominator: NonZeroU64, precision: Precision) -> Decimal {
        Decimal::from(numerator).quotient(&Decimal::from(denominator.get()), precision)
    }

    /// Nearest `f64`, for sizing estimates only.
    pub fn to_f64(&self) -> f64 {
        format!("{}e{}", self.mantissa, self.exponent)
            .parse()
            .unwrap_or(f64::NAN)
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal::normalized(BigInt::from(value), 0)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::normalized(BigInt::from(value), 0)
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.exponent == other.exponent {
            return self.mantissa.cmp(&other.mantissa);
        }
        let (lhs, rhs, _) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Plain positional notation, never scientific, so that the text is exact.
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            f.write_str("-")?;
        }
        let digits = self.mantissa.magnitude().to_str_radix(10);
        if self.exponent >= 0 {
            f.write_str(&digits)?;
            for _ in 0..self.exponent {
                f.write_str("0")?;
            }
            return Ok(());
        }
        let fraction_len = self.exponent.unsigned_abs() as usize;
        if digits.len() > fraction_len {
            let (whole, fraction) = digits.split_at(digits.len() - fraction_len);
            write!(f, "{}.{}", whole, fraction)
        } else {
            write!(f, "0.{}{}", "0".repeat(fraction_len - digits.len()), digits)
        }
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDecimalError(text.to_owned());
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(invalid());
        }

        let joined = format!("{}{}", whole, fraction);
        let magnitude = BigUint::parse_bytes(joined.as_bytes(), 10).ok_or_else(invalid)?;
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        let exponent = -i64::try_from(fraction.len()).map_err(|_| invalid())?;
        Ok(Decimal::normalized(
            BigInt::from_biguint(sign, magnitude),
            exponent,
        ))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
