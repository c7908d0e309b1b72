// static_arith/src/arithmetic_coding.rs

use contracts::{debug_ensures, debug_requires};
use tracing::{debug, trace, warn};

use crate::decimal::Decimal;
use crate::error::{DecodeError, PrecisionError, Result};
use crate::precision::Precision;
use crate::probability::{Model, Symbol, SymbolRange};

/// Upper bound on the capacity reserved up front for decoded output.
const INITIAL_OUTPUT_CAPACITY: usize = 1024;

/// The shrinking `[low, high)` interval of final values consistent with the symbols
/// coded so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingInterval {
    low: Decimal,
    high: Decimal,
}

impl CodingInterval {
    /// The whole unit interval `[0, 1)`.
    pub fn unit() -> Self {
        CodingInterval {
            low: Decimal::zero(),
            high: Decimal::one(),
        }
    }

    pub fn low(&self) -> &Decimal {
        &self.low
    }

    pub fn high(&self) -> &Decimal {
        &self.high
    }

    pub fn contains(&self, value: &Decimal) -> bool {
        self.low <= *value && *value < self.high
    }

    /// Midpoint of the interval at `precision`.
    pub fn midpoint(&self, precision: Precision) -> Decimal {
        self.low.add(&self.high, precision).half(precision)
    }

    /// The midpoint cut down to the fewest digits that keep it within a quarter of the
    /// width of the midpoint.
    ///
    /// Rounding at the leading digit of half the width moves the midpoint by at most a
    /// quarter of the width.
    pub fn shortest_inner(&self, precision: Precision) -> Decimal {
        let half_width = self.high.sub_exact(&self.low).half_exact();
        self.midpoint(precision).rounded_at(half_width.adjusted_exponent())
    }

    /// Narrows the interval to the part proportional to `range`.
    ///
    /// Returns `false`, leaving the interval untouched, when `precision` can no longer
    /// tell the narrowed bounds apart: the bounds meet, the width the symbol should get
    /// is below one unit in the last place of the new upper bound, or rounding left the
    /// interval unchanged for a symbol less likely than one. New bounds are clamped into
    /// the current ones so rounding never widens the interval.
    #[debug_ensures(self.low < self.high)]
    fn narrow(&mut self, range: &SymbolRange, precision: Precision) -> bool {
        let width = self.high.sub(&self.low, precision);
        let symbol_width = width.mul(range.probability(), precision);

        // High first: both bounds are derived from the pre-update low and width.
        let high = self
            .low
            .add(&width.mul(range.upper(), precision), precision)
            .min(self.high.clone());
        let low = self
            .low
            .add(&width.mul(range.cumulative(), precision), precision)
            .max(self.low.clone());

        let stalled =
            low == self.low && high == self.high && *range.probability() < Decimal::one();
        if low >= high || symbol_width < high.ulp(precision) || stalled {
            return false;
        }
        self.high = high;
        self.low = low;
        true
    }
}

/// Represents the state of the Arithmetic Coder.
///
/// Symbols are pushed one at a time; after every push the coding interval satisfies
/// `0 <= low < high <= 1` and lies inside the interval before the push.
#[derive(Debug, Clone)]
pub struct ArithmeticCoder<'m> {
    model: &'m Model,
    precision: Precision,
    interval: CodingInterval,
    position: usize,
}

impl<'m> ArithmeticCoder<'m> {
    pub fn new(model: &'m Model, precision: Precision) -> Self {
        ArithmeticCoder {
            model,
            precision,
            interval: CodingInterval::unit(),
            position: 0,
        }
    }

    /// Narrows the coding interval by one symbol.
    ///
    /// # Errors
    ///
    /// * `ModelError::UnknownSymbol` if `symbol` is not in the model.
    /// * `PrecisionError::IntervalCollapsed` if the interval can no longer be narrowed
    ///   at this precision. The coder is left at the last good state.
    pub fn push(&mut self, symbol: Symbol) -> Result<()> {
        let range = self.model.range(symbol)?;
        if !self.interval.narrow(range, self.precision) {
            warn!(
                position = self.position,
                precision = self.precision.digits(),
                "coding interval collapsed"
            );
            return Err(PrecisionError::IntervalCollapsed {
                position: self.position,
                precision: self.precision.digits(),
            }
            .into());
        }
        trace!(position = self.position, symbol, "narrowed coding interval");
        self.position += 1;
        Ok(())
    }

    pub fn interval(&self) -> &CodingInterval {
        &self.interval
    }

    /// Number of symbols pushed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the codeword: the midpoint of the final interval.
    pub fn finish(self) -> Decimal {
        self.interval.midpoint(self.precision)
    }

    /// Returns a codeword with as few digits as the final interval allows, see
    /// [`CodingInterval::shortest_inner`]. Decodes like the one from [`finish`](Self::finish).
    pub fn finish_short(self) -> Decimal {
        self.interval.shortest_inner(self.precision)
    }
}

/// Encodes a message into a single value in `[0, 1)`.
///
/// # Arguments
///
/// * `message` - Symbols to encode.
/// * `model` - Probability model; every symbol of `message` must be part of it.
/// * `precision` - Significant digits of every interval operation.
///
/// # Returns
///
/// * `Result<Decimal>` - The codeword, or an error.
///
/// # Examples
///
/// ```
/// use static_arith::{arithmetic_encode, Decimal, Model, Precision};
///
/// let model = Model::from_probabilities([
///     (b'a', "0.5".parse::<Decimal>().unwrap()),
///     (b'b', "0.3".parse().unwrap()),
///     (b'c', "0.2".parse().unwrap()),
/// ])
/// .unwrap();
/// let value = arithmetic_encode(b"aab", &model, Precision::new(8).unwrap()).unwrap();
/// assert_eq!(value.to_string(), "0.1625");
/// ```
pub fn arithmetic_encode(
    message: &[Symbol],
    model: &Model,
    precision: Precision,
) -> Result<Decimal> {
    debug!(
        length = message.len(),
        alphabet = model.len(),
        precision = precision.digits(),
        "encoding message"
    );
    let mut coder = ArithmeticCoder::new(model, precision);
    for &symbol in message {
        coder.push(symbol)?;
    }
    let value = coder.finish();
    debug!(digits = value.significant_digits(), "encoded message");
    Ok(value)
}

/// Recovers symbols from a codeword by repeatedly locating and rescaling the working
/// value.
///
/// Next to the working value the decoder keeps the product of the probabilities decoded
/// so far, which is the width the encoder's interval had at the same point. Once that
/// width drops below one unit in the last place of the codeword, the precision cannot
/// have carried any more symbols.
#[derive(Debug, Clone)]
pub struct ArithmeticDecoder<'m> {
    model: &'m Model,
    precision: Precision,
    value: Decimal,
    width: Decimal,
    resolution: Decimal,
    position: usize,
}

impl<'m> ArithmeticDecoder<'m> {
    pub fn new(model: &'m Model, value: Decimal, precision: Precision) -> Self {
        ArithmeticDecoder {
            model,
            precision,
            resolution: value.ulp(precision),
            value,
            width: Decimal::one(),
            position: 0,
        }
    }

    /// Decodes the next symbol of a message declared to be `declared` symbols long.
    ///
    /// # Errors
    ///
    /// * `DecodeError::NoMatchingSymbol` if no range contains the working value.
    /// * `DecodeError::LengthMismatch` if the precision is exhausted.
    #[debug_requires(self.position < declared)]
    pub fn next_symbol(&mut self, declared: usize) -> Result<Symbol> {
        let position = self.position;
        let no_match = |value: &Decimal| DecodeError::NoMatchingSymbol {
            position,
            value: format!("{:e}", value.to_f64()),
        };

        let model = self.model;
        let range = model.find(&self.value).ok_or_else(|| {
            warn!(position, "working value outside of every symbol range");
            no_match(&self.value)
        })?;

        let width = self.width.mul(range.probability(), self.precision);
        if width < self.resolution {
            warn!(
                position,
                declared,
                precision = self.precision.digits(),
                "precision exhausted before the declared length"
            );
            return Err(DecodeError::LengthMismatch {
                declared,
                decoded: position,
            }
            .into());
        }

        let offset = self.value.sub(range.cumulative(), self.precision);
        self.value = offset
            .checked_div(range.probability(), self.precision)
            .ok_or_else(|| no_match(&self.value))?;
        self.width = width;
        self.position += 1;
        trace!(position, symbol = range.symbol(), "decoded symbol");
        Ok(range.symbol())
    }

    /// The current working value.
    pub fn value(&self) -> &Decimal {
        &self.value
    }

    /// Number of symbols decoded so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Decodes a value produced by [`arithmetic_encode`].
///
/// # Arguments
///
/// * `value` - The codeword.
/// * `length` - Number of symbols to decode.
/// * `model` - The model the value was encoded with.
/// * `precision` - The precision the value was encoded with.
///
/// # Returns
///
/// * `Result<Vec<Symbol>>` - The decoded message, or an error.
///
/// The original message is recovered when `precision` is at least
/// [`Model::required_precision`] for `length`.
///
/// # Examples
///
/// ```
/// use static_arith::{arithmetic_decode, Decimal, Model, Precision};
///
/// let model = Model::from_probabilities([(b'a', Decimal::one())]).unwrap();
/// let value: Decimal = "0.5".parse().unwrap();
/// let decoded = arithmetic_decode(&value, 4, &model, Precision::new(5).unwrap()).unwrap();
/// assert_eq!(decoded, b"aaaa");
/// ```
pub fn arithmetic_decode(
    value: &Decimal,
    length: usize,
    model: &Model,
    precision: Precision,
) -> Result<Vec<Symbol>> {
    debug!(
        length,
        alphabet = model.len(),
        precision = precision.digits(),
        "decoding message"
    );
    let mut decoder = ArithmeticDecoder::new(model, value.clone(), precision);
    let mut decoded = Vec::with_capacity(length.min(INITIAL_OUTPUT_CAPACITY));
    for _ in 0..length {
        decoded.push(decoder.next_symbol(length)?);
    }
    debug!(length = decoded.len(), "decoded message");
    Ok(decoded)
}
