// static_arith/src/probability.rs

//! Static probability model and the cumulative ranges derived from it.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::num::{NonZeroU32, NonZeroU64};

use contracts::debug_ensures;

use crate::decimal::Decimal;
use crate::error::ModelError;
use crate::estimator::frequencies;
use crate::precision::{required_precision, Precision};

/// One byte of the message alphabet.
pub type Symbol = u8;

/// Significant digits of each probability computed from frequency counts.
/// Must be identical for every model that is meant to be shared.
pub const PROBABILITY_DIGITS: u32 = 30;

pub(crate) const PROBABILITY_PRECISION: Precision = match NonZeroU32::new(PROBABILITY_DIGITS) {
    Some(digits) => Precision::from_nonzero(digits),
    None => panic!("PROBABILITY_DIGITS must be non-zero"),
};

/// The half-open range `[cumulative, cumulative + probability)` owned by one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRange {
    symbol: Symbol,
    probability: Decimal,
    cumulative: Decimal,
    upper: Decimal,
}

impl SymbolRange {
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn probability(&self) -> &Decimal {
        &self.probability
    }

    /// Sum of the probabilities of all symbols ordered before this one.
    pub fn cumulative(&self) -> &Decimal {
        &self.cumulative
    }

    /// Exclusive upper end, `cumulative + probability`.
    pub fn upper(&self) -> &Decimal {
        &self.upper
    }

    pub fn contains(&self, value: &Decimal) -> bool {
        self.cumulative <= *value && *value < self.upper
    }
}

/// Immutable mapping from symbol to probability, iterated in ascending symbol order.
///
/// Cumulative values are summed without rounding, so two models built from the same
/// `(symbol, probability)` pairs have bit-identical ranges. Encoder and decoder must
/// be handed the same model (or one rebuilt from its persisted pairs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    ranges: Vec<SymbolRange>,
    min_probability: Decimal,
}

impl Model {
    /// Builds a model from symbol counts over a text of `total` symbols.
    ///
    /// Symbols with a zero count are left out. Each probability is `count / total`
    /// rounded to [`PROBABILITY_DIGITS`]. When the counts add up to `total`, the last
    /// symbol takes whatever mass is left so that the ranges cover `[0, 1)` exactly.
    ///
    /// # Errors
    ///
    /// * `ModelError::EmptyAlphabet` - no symbol has a non-zero count.
    /// * `ModelError::InvalidTotal` - `total` is smaller than the sum of the counts. A sum
    ///   that overflows `u64` is reported as `u64::MAX`.
    #[debug_ensures(ret.as_ref().map_or(true, |model| model.total_mass() <= Decimal::one()))]
    pub fn from_frequencies(
        frequencies: &BTreeMap<Symbol, u64>,
        total: u64,
    ) -> Result<Self, ModelError> {
        let observed: Vec<(Symbol, u64)> = frequencies
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&symbol, &count)| (symbol, count))
            .collect();
        if observed.is_empty() {
            return Err(ModelError::EmptyAlphabet);
        }

        let counted = observed
            .iter()
            .try_fold(0u64, |sum, &(_, count)| sum.checked_add(count));
        let (counted, denominator) = match (counted, NonZeroU64::new(total)) {
            (Some(counted), Some(denominator)) if counted <= total => (counted, denominator),
            (counted, _) => {
                return Err(ModelError::InvalidTotal {
                    total,
                    counted: counted.unwrap_or(u64::MAX),
                })
            }
        };

        let mut pairs = Vec::with_capacity(observed.len());
        let mut mass = Decimal::zero();
        for (index, &(symbol, count)) in observed.iter().enumerate() {
            let closes_unit = index + 1 == observed.len() && counted == total;
            let probability = if closes_unit {
                Decimal::one().sub_exact(&mass)
            } else {
                Decimal::from_ratio(count, denominator, PROBABILITY_PRECISION)
            };
            mass = mass.add_exact(&probability);
            pairs.push((symbol, probability));
        }
        Ok(Model::assemble(pairs))
    }

    /// Rebuilds a model from explicit probabilities without altering any of them.
    ///
    /// Zero probabilities are left out.
    ///
    /// # Errors
    ///
    /// * `ModelError::EmptyAlphabet` - no symbol has a non-zero probability.
    /// * `ModelError::InvalidProbability` - a probability is negative or above one.
    /// * `ModelError::DuplicateSymbol` - a symbol is listed twice.
    /// * `ModelError::MassExceedsOne` - the probabilities add up to more than one.
    pub fn from_probabilities<I>(probabilities: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (Symbol, Decimal)>,
    {
        let mut ordered = BTreeMap::new();
        for (symbol, probability) in probabilities {
            if probability.is_negative() || probability > Decimal::one() {
                return Err(ModelError::InvalidProbability {
                    symbol,
                    probability: probability.to_string(),
                });
            }
            match ordered.entry(symbol) {
                Entry::Occupied(_) => return Err(ModelError::DuplicateSymbol(symbol)),
                Entry::Vacant(slot) => {
                    slot.insert(probability);
                }
            }
        }

        let pairs: Vec<(Symbol, Decimal)> = ordered
            .into_iter()
            .filter(|(_, probability)| !probability.is_zero())
            .collect();
        if pairs.is_empty() {
            return Err(ModelError::EmptyAlphabet);
        }

        let model = Model::assemble(pairs);
        let mass = model.total_mass();
        if mass > Decimal::one() {
            return Err(ModelError::MassExceedsOne(mass.to_string()));
        }
        Ok(model)
    }

    /// Counts the bytes of `text` and builds the model from those counts.
    pub fn from_text(text: &[u8]) -> Result<Self, ModelError> {
        let (counts, total) = frequencies(text);
        Model::from_frequencies(&counts, total)
    }

    /// Lays out the ranges of non-empty, symbol-ordered pairs.
    fn assemble(pairs: Vec<(Symbol, Decimal)>) -> Self {
        let mut ranges = Vec::with_capacity(pairs.len());
        let mut cumulative = Decimal::zero();
        for (symbol, probability) in pairs {
            let upper = cumulative.add_exact(&probability);
            ranges.push(SymbolRange {
                symbol,
                probability,
                cumulative,
                upper: upper.clone(),
            });
            cumulative = upper;
        }
        let min_probability = ranges
            .iter()
            .map(|range| &range.probability)
            .min()
            .cloned()
            .unwrap_or_else(Decimal::one);
        Model {
            ranges,
            min_probability,
        }
    }

    /// Looks up the range of `symbol`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::UnknownSymbol` if `symbol` is not in the model.
    pub fn range(&self, symbol: Symbol) -> Result<&SymbolRange, ModelError> {
        self.ranges
            .binary_search_by_key(&symbol, |range| range.symbol)
            .map(|index| &self.ranges[index])
            .map_err(|_| ModelError::UnknownSymbol(symbol))
    }

    pub fn probability(&self, symbol: Symbol) -> Result<&Decimal, ModelError> {
        self.range(symbol).map(SymbolRange::probability)
    }

    pub fn cumulative(&self, symbol: Symbol) -> Result<&Decimal, ModelError> {
        self.range(symbol).map(SymbolRange::cumulative)
    }

    /// Symbols in the fixed order used to lay out the cumulative ranges.
    pub fn ordered_symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.ranges.iter().map(|range| range.symbol)
    }

    pub fn ranges(&self) -> &[SymbolRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Always `false`: construction rejects empty alphabets.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn min_probability(&self) -> &Decimal {
        &self.min_probability
    }

    /// Sum of all probabilities, computed exactly.
    pub fn total_mass(&self) -> Decimal {
        self.ranges
            .last()
            .map_or_else(Decimal::zero, |range| range.upper.clone())
    }

    /// First range, in symbol order, that contains `value`.
    ///
    /// The scan visits each symbol at most once.
    pub fn find(&self, value: &Decimal) -> Option<&SymbolRange> {
        self.ranges.iter().find(|range| range.contains(value))
    }

    /// Precision needed to code `message_length` symbols with this model.
    pub fn required_precision(&self, message_length: usize) -> Precision {
        let min_probability = self.min_probability.to_f64().clamp(f64::MIN_POSITIVE, 1.0);
        required_precision(message_length, min_probability)
    }
}
