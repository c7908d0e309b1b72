// static_arith/src/lib.rs

//! Static Arithmetic Coding Library
//!
//! Compresses a whole message into one arbitrary-precision decimal value under a fixed
//! per-symbol probability model, and recovers the message from that value, the model
//! and the message length.
//!
//! All interval arithmetic runs at a fixed number of significant digits chosen per
//! session. The digits needed grow linearly with the message length; use
//! [`required_precision`] or [`Model::required_precision`] to size them. Undersized
//! precision is reported as [`PrecisionError::IntervalCollapsed`] while encoding or as a
//! [`DecodeError`] while decoding.
//!
//! ```
//! use static_arith::{arithmetic_decode, arithmetic_encode, Model};
//!
//! let message = b"mississippi";
//! let model = Model::from_text(message).unwrap();
//! let precision = model.required_precision(message.len());
//!
//! let value = arithmetic_encode(message, &model, precision).unwrap();
//! let decoded = arithmetic_decode(&value, message.len(), &model, precision).unwrap();
//! assert_eq!(decoded, message);
//! ```

pub mod arithmetic_coding;
pub mod artifact;
pub mod decimal;
pub mod error;
pub mod estimator;
pub mod precision;
pub mod probability;

pub use arithmetic_coding::{
    arithmetic_decode, arithmetic_encode, ArithmeticCoder, ArithmeticDecoder, CodingInterval,
};
pub use artifact::{Artifact, ModelEntry};
pub use decimal::{Decimal, ParseDecimalError};
pub use error::{ArithmeticCodingError, ArtifactError, DecodeError, ModelError, PrecisionError};
pub use estimator::{estimate, frequencies, histogram};
pub use precision::{required_precision, CoderConfig, Precision, GUARD_DIGITS};
pub use probability::{Model, Symbol, SymbolRange, PROBABILITY_DIGITS};
