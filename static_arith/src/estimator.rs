// static_arith/src/estimator.rs

//! Symbol frequency estimation over a source text.

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use ndarray::Array1;

use crate::decimal::Decimal;
use crate::probability::{Symbol, PROBABILITY_PRECISION};

const ALPHABET_SIZE: usize = 256;

/// Byte histogram of `text`, indexed by byte value.
pub fn histogram(text: &[u8]) -> Array1<u64> {
    let mut counts = Array1::<u64>::zeros(ALPHABET_SIZE);
    for &byte in text {
        counts[byte as usize] += 1;
    }
    counts
}

/// Non-zero symbol counts of `text` together with its length.
pub fn frequencies(text: &[u8]) -> (BTreeMap<Symbol, u64>, u64) {
    let counts = histogram(text)
        .indexed_iter()
        .filter(|(_, &count)| count > 0)
        .map(|(byte, &count)| (byte as Symbol, count))
        .collect();
    (counts, text.len() as u64)
}

/// Observed probability of every symbol of `text`: count / length, rounded to
/// [`PROBABILITY_DIGITS`](crate::PROBABILITY_DIGITS) significant digits. Empty text gives
/// an empty mapping.
///
/// The probabilities are not adjusted to add up to exactly one;
/// [`Model::from_frequencies`](crate::Model::from_frequencies) does that.
pub fn estimate(text: &[u8]) -> BTreeMap<Symbol, Decimal> {
    let (counts, total) = frequencies(text);
    let total = match NonZeroU64::new(total) {
        Some(total) => total,
        None => return BTreeMap::new(),
    };
    counts
        .into_iter()
        .map(|(symbol, count)| (symbol, Decimal::from_ratio(count, total, PROBABILITY_PRECISION)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probability::Model;

    #[test]
    fn test_histogram_counts_bytes() {
        let counts = histogram(b"abracadabra");
        assert_eq!(counts.len(), ALPHABET_SIZE);
        assert_eq!(counts[b'a' as usize], 5);
        assert_eq!(counts[b'b' as usize], 2);
        assert_eq!(counts[b'z' as usize], 0);
        assert_eq!(counts.sum(), 11);
    }

    #[test]
    fn test_frequencies_skip_unseen_bytes() {
        let (counts, total) = frequencies(b"abracadabra");
        assert_eq!(total, 11);
        let expected: BTreeMap<Symbol, u64> =
            [(b'a', 5), (b'b', 2), (b'c', 1), (b'd', 1), (b'r', 2)]
                .into_iter()
                .collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn test_estimate_is_count_over_length() {
        let probabilities = estimate(b"aabc");
        assert_eq!(probabilities.len(), 3);
        assert_eq!(probabilities[&b'a'].to_string(), "0.5");
        assert_eq!(probabilities[&b'b'].to_string(), "0.25");
        assert_eq!(probabilities[&b'c'].to_string(), "0.25");
        assert!(estimate(b"").is_empty());
    }

    #[test]
    fn test_estimate_rounds_to_probability_digits() {
        let probabilities = estimate(b"abc");
        assert_eq!(
            probabilities[&b'a'].to_string(),
            "0.333333333333333333333333333333"
        );
        assert!(probabilities
            .values()
            .all(|p| p.significant_digits() == u64::from(crate::PROBABILITY_DIGITS)));
    }

    #[test]
    fn test_estimate_feeds_model() {
        let model = Model::from_probabilities(estimate(b"hello world")).unwrap();
        assert_eq!(model.len(), 8);
        assert!(model.total_mass() <= Decimal::one());
        assert_eq!(
            model.probability(b'l').unwrap(),
            Model::from_text(b"hello world").unwrap().probability(b'l').unwrap()
        );
    }

    #[test]
    fn test_binary_input() {
        let text: Vec<u8> = (0..=255u8).chain(0..=255u8).collect();
        let (counts, total) = frequencies(&text);
        assert_eq!(total, 512);
        assert_eq!(counts.len(), 256);
        assert!(counts.values().all(|&count| count == 2));
    }
}
