// static_arith/src/error.rs

//! Error types for model construction, interval arithmetic and coding.

use thiserror::Error;

use crate::probability::Symbol;

/// Failures while building or querying a probability model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// No symbol has a non-zero frequency or probability.
    #[error("model has an empty alphabet")]
    EmptyAlphabet,

    /// The symbol is not part of the model.
    #[error("symbol 0x{0:02x} is not in the model")]
    UnknownSymbol(Symbol),

    /// A probability lies outside of (0, 1].
    #[error("probability {probability} of symbol 0x{symbol:02x} is outside of (0, 1]")]
    InvalidProbability { symbol: Symbol, probability: String },

    /// The same symbol was listed twice.
    #[error("symbol 0x{0:02x} appears more than once")]
    DuplicateSymbol(Symbol),

    /// The probabilities add up to more than one.
    #[error("total probability mass {0} exceeds one")]
    MassExceedsOne(String),

    /// The declared total is smaller than the sum of the counts.
    #[error("declared total {total} is smaller than the counted {counted} symbols")]
    InvalidTotal { total: u64, counted: u64 },
}

/// Failures caused by the chosen significant-digit precision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrecisionError {
    /// The coding interval can no longer be narrowed at this precision.
    #[error("coding interval collapsed at symbol {position} with {precision} significant digits")]
    IntervalCollapsed { position: usize, precision: u32 },

    /// A precision of zero significant digits was requested.
    #[error("precision must be at least one significant digit")]
    ZeroDigits,
}

/// Failures while recovering symbols from a codeword.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The working value lies outside of every cumulative range.
    #[error("no symbol range contains the working value {value} at position {position}")]
    NoMatchingSymbol { position: usize, value: String },

    /// Precision ran out before the declared number of symbols was produced.
    #[error("cannot decode {declared} symbols, precision exhausted after {decoded}")]
    LengthMismatch { declared: usize, decoded: usize },
}

/// Error type for encoding and decoding operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticCodingError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Precision(#[from] PrecisionError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Failures while persisting or restoring a codeword artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("artifact holds an invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("invalid artifact precision: {0}")]
    Precision(#[from] PrecisionError),

    #[error("artifact length {0} does not fit in memory on this platform")]
    Length(u64),

    #[error("{length} symbols need {required} significant digits, the artifact has {precision}")]
    LengthExceedsPrecision {
        length: u64,
        precision: u32,
        required: u32,
    },

    #[error("malformed binary artifact: {0}")]
    Format(&'static str),

    #[error(transparent)]
    Coding(#[from] ArithmeticCodingError),
}

/// A specialized Result type for coding operations.
pub type Result<T> = std::result::Result<T, ArithmeticCodingError>;
