// static_arith/src/artifact.rs

//! Persisted form of a coded message: codeword, length, precision and model.
//!
//! Two encodings are provided. Both keep the model as its `(symbol, probability)` pairs
//! in symbol order, so that the decoding side rebuilds bit-identical cumulative ranges.
//!
//! The binary encoding is compact and is what the demo binary writes:
//!
//! ```text
//! artifact = MAGIC precision:uint length:uint value:decimal count:uint
//!            { symbol:u8 probability:decimal } * count
//! uint     = width:u8 big-endian[width]              width <= 8
//! decimal  = zigzag(exponent):uint header:uint magnitude:big-endian[header >> 1]
//!            sign in the low bit of header
//! ```
//!
//! The JSON encoding stores every decimal as an exact decimal string.

use std::io::{self, Read, Write};

use num::bigint::Sign;
use num::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::arithmetic_coding::{arithmetic_decode, ArithmeticCoder};
use crate::decimal::Decimal;
use crate::error::{ArtifactError, ModelError, PrecisionError};
use crate::precision::Precision;
use crate::probability::{Model, Symbol};

const MAGIC: &[u8; 4] = b"SAC1";

/// One model entry per possible byte value.
const MAX_ENTRIES: u64 = 256;

/// Largest power-of-ten exponent, in magnitude, accepted from a binary artifact.
const MAX_SCALE: u64 = 1 << 24;

fn write_uint<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    let bytes = value.to_be_bytes();
    let skip = (value.leading_zeros() / 8) as usize;
    writer.write_all(&[(bytes.len() - skip) as u8])?;
    writer.write_all(&bytes[skip..])
}

fn read_uint<R: Read>(reader: &mut R) -> Result<u64, ArtifactError> {
    let mut width = [0u8; 1];
    reader.read_exact(&mut width)?;
    let width = usize::from(width[0]);
    if width > 8 {
        return Err(ArtifactError::Format("integer wider than 64 bits"));
    }
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes[8 - width..])?;
    Ok(u64::from_be_bytes(bytes))
}

fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

fn write_decimal<W: Write>(writer: &mut W, value: &Decimal) -> io::Result<()> {
    let (mantissa, exponent) = value.parts();
    let magnitude = mantissa.magnitude().to_bytes_be();
    let negative = u64::from(mantissa.sign() == Sign::Minus);
    write_uint(writer, zigzag(exponent))?;
    write_uint(writer, (magnitude.len() as u64) << 1 | negative)?;
    writer.write_all(&magnitude)
}

fn read_decimal<R: Read>(reader: &mut R) -> Result<Decimal, ArtifactError> {
    let exponent = unzigzag(read_uint(reader)?);
    if exponent.unsigned_abs() > MAX_SCALE {
        return Err(ArtifactError::Format("decimal exponent out of range"));
    }
    let header = read_uint(reader)?;
    let expected = header >> 1;
    let mut magnitude = Vec::new();
    reader.by_ref().take(expected).read_to_end(&mut magnitude)?;
    if magnitude.len() as u64 != expected {
        return Err(ArtifactError::Format("truncated decimal"));
    }
    let sign = if header & 1 == 1 {
        Sign::Minus
    } else {
        Sign::Plus
    };
    let mantissa = BigInt::from_biguint(sign, BigUint::from_bytes_be(&magnitude));
    Ok(Decimal::from_parts(mantissa, exponent))
}

/// One persisted model entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub symbol: Symbol,
    pub probability: Decimal,
}

/// Everything needed to decode a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    value: Decimal,
    length: u64,
    precision: u32,
    model: Vec<ModelEntry>,
}

impl Artifact {
    pub fn new(value: Decimal, length: usize, precision: Precision, model: &Model) -> Self {
        Artifact {
            value,
            length: length as u64,
            precision: precision.digits(),
            model: model
                .ranges()
                .iter()
                .map(|range| ModelEntry {
                    symbol: range.symbol(),
                    probability: range.probability().clone(),
                })
                .collect(),
        }
    }

    /// Builds a model from `text`, encodes it and packs the result.
    ///
    /// Without an explicit `precision`, the precision is sized for `text`. The stored
    /// codeword is the shortest one the final interval allows.
    ///
    /// # Errors
    ///
    /// * `ArtifactError::LengthExceedsPrecision` - `precision` is below the size
    ///   [`Model::required_precision`] gives for `text`.
    pub fn compress(text: &[u8], precision: Option<Precision>) -> Result<Self, ArtifactError> {
        let model = Model::from_text(text)?;
        let required = model.required_precision(text.len());
        let precision = match precision {
            Some(precision) if precision < required => {
                return Err(ArtifactError::LengthExceedsPrecision {
                    length: text.len() as u64,
                    precision: precision.digits(),
                    required: required.digits(),
                })
            }
            Some(precision) => precision,
            None => required,
        };
        info!(
            length = text.len(),
            alphabet = model.len(),
            precision = precision.digits(),
            "compressing"
        );
        let mut coder = ArithmeticCoder::new(&model, precision);
        for &symbol in text {
            coder.push(symbol)?;
        }
        let value = coder.finish_short();
        debug!(digits = value.significant_digits(), "encoded message");
        Ok(Artifact::new(value, text.len(), precision, &model))
    }

    /// Rebuilds the model and decodes the stored value.
    ///
    /// # Errors
    ///
    /// * `ArtifactError::LengthExceedsPrecision` - the stored precision is too small for
    ///   the stored length, so no encoder could have produced this artifact.
    pub fn decompress(&self) -> Result<Vec<u8>, ArtifactError> {
        let model = self.model()?;
        let precision = self.precision()?;
        let length =
            usize::try_from(self.length).map_err(|_| ArtifactError::Length(self.length))?;
        let required = model.required_precision(length);
        if precision < required {
            return Err(ArtifactError::LengthExceedsPrecision {
                length: self.length,
                precision: precision.digits(),
                required: required.digits(),
            });
        }
        info!(length, precision = precision.digits(), "decompressing");
        Ok(arithmetic_decode(&self.value, length, &model, precision)?)
    }

    pub fn value(&self) -> &Decimal {
        &self.value
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn precision(&self) -> Result<Precision, PrecisionError> {
        Precision::new(self.precision)
    }

    /// Rebuilds the model exactly as it was persisted.
    pub fn model(&self) -> Result<Model, ModelError> {
        Model::from_probabilities(
            self.model
                .iter()
                .map(|entry| (entry.symbol, entry.probability.clone())),
        )
    }

    /// Writes the binary encoding.
    pub fn write_binary<W: Write>(&self, mut writer: W) -> Result<(), ArtifactError> {
        writer.write_all(MAGIC)?;
        write_uint(&mut writer, u64::from(self.precision))?;
        write_uint(&mut writer, self.length)?;
        write_decimal(&mut writer, &self.value)?;
        write_uint(&mut writer, self.model.len() as u64)?;
        for entry in &self.model {
            writer.write_all(&[entry.symbol])?;
            write_decimal(&mut writer, &entry.probability)?;
        }
        debug!(entries = self.model.len(), "wrote binary artifact");
        Ok(())
    }

    /// Reads the binary encoding.
    pub fn read_binary<R: Read>(mut reader: R) -> Result<Self, ArtifactError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ArtifactError::Format("bad magic"));
        }
        let precision = u32::try_from(read_uint(&mut reader)?)
            .map_err(|_| ArtifactError::Format("precision wider than 32 bits"))?;
        let length = read_uint(&mut reader)?;
        let value = read_decimal(&mut reader)?;

        let count = read_uint(&mut reader)?;
        if count > MAX_ENTRIES {
            return Err(ArtifactError::Format("more model entries than byte values"));
        }
        let mut model = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut symbol = [0u8; 1];
            reader.read_exact(&mut symbol)?;
            let probability = read_decimal(&mut reader)?;
            model.push(ModelEntry {
                symbol: symbol[0],
                probability,
            });
        }
        debug!(entries = model.len(), "read binary artifact");
        Ok(Artifact {
            value,
            length,
            precision,
            model,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        let mut bytes = Vec::new();
        self.write_binary(&mut bytes)?;
        Ok(bytes)
    }

    /// Parses the binary encoding, which must span all of `bytes`.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self, ArtifactError> {
        let artifact = Artifact::read_binary(&mut bytes)?;
        if !bytes.is_empty() {
            return Err(ArtifactError::Format("trailing bytes"));
        }
        Ok(artifact)
    }

    /// Writes the JSON encoding.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), ArtifactError> {
        serde_json::to_writer(writer, self)?;
        debug!(entries = self.model.len(), "wrote artifact");
        Ok(())
    }

    /// Reads the JSON encoding.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ArtifactError> {
        let artifact: Artifact = serde_json::from_reader(reader)?;
        debug!(entries = artifact.model.len(), "read artifact");
        Ok(artifact)
    }

    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ArtifactError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArithmeticCodingError, DecodeError};

    #[test]
    fn test_compress_decompress() {
        let text = b"hello world";
        let artifact = Artifact::compress(text, None).unwrap();
        assert_eq!(artifact.length(), 11);
        assert_eq!(artifact.precision().unwrap().digits(), 18);
        assert_eq!(artifact.value().to_string(), "0.2934822223");
        assert_eq!(artifact.decompress().unwrap(), text);
    }

    #[test]
    fn test_json_preserves_model_exactly() {
        let text = b"she sells sea shells by the sea shore";
        let artifact = Artifact::compress(text, None).unwrap();
        let json = artifact.to_json().unwrap();
        let restored = Artifact::from_json(&json).unwrap();

        assert_eq!(restored, artifact);
        assert_eq!(restored.model().unwrap(), Model::from_text(text).unwrap());
        assert_eq!(restored.decompress().unwrap(), text);
    }

    #[test]
    fn test_writer_reader() {
        let text = b"abracadabra";
        let artifact = Artifact::compress(text, None).unwrap();
        let mut buffer = Vec::new();
        artifact.to_writer(&mut buffer).unwrap();
        let restored = Artifact::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(restored.decompress().unwrap(), text);
    }

    #[test]
    fn test_json_layout() {
        let model = Model::from_probabilities([(b'a', Decimal::one())]).unwrap();
        let artifact = Artifact::new("0.5".parse().unwrap(), 4, Precision::new(5).unwrap(), &model);
        assert_eq!(
            artifact.to_json().unwrap(),
            r#"{"value":"0.5","length":4,"precision":5,"model":[{"symbol":97,"probability":"1"}]}"#
        );
    }

    #[test]
    fn test_empty_text_cannot_be_compressed() {
        assert!(matches!(
            Artifact::compress(b"", None),
            Err(ArtifactError::Model(ModelError::EmptyAlphabet))
        ));
    }

    #[test]
    fn test_explicit_precision_too_small() {
        let text = b"abracadabra".repeat(5);
        assert!(matches!(
            Artifact::compress(&text, Some(Precision::new(10).unwrap())),
            Err(ArtifactError::LengthExceedsPrecision {
                length: 55,
                precision: 10,
                required: 65
            })
        ));

        let artifact = Artifact::compress(&text, Some(Precision::new(80).unwrap())).unwrap();
        assert_eq!(artifact.precision().unwrap().digits(), 80);
        assert_eq!(artifact.decompress().unwrap(), text);
    }

    #[test]
    fn test_tampered_artifacts() {
        let zero_precision =
            r#"{"value":"0.5","length":4,"precision":0,"model":[{"symbol":97,"probability":"1"}]}"#;
        assert!(matches!(
            Artifact::from_json(zero_precision).unwrap().decompress(),
            Err(ArtifactError::Precision(PrecisionError::ZeroDigits))
        ));

        let bad_model =
            r#"{"value":"0.5","length":4,"precision":5,"model":[{"symbol":97,"probability":"2"}]}"#;
        assert!(matches!(
            Artifact::from_json(bad_model).unwrap().decompress(),
            Err(ArtifactError::Model(ModelError::InvalidProbability { .. }))
        ));

        let outside =
            r#"{"value":"0.9","length":2,"precision":8,"model":[{"symbol":97,"probability":"0.5"}]}"#;
        assert!(matches!(
            Artifact::from_json(outside).unwrap().decompress(),
            Err(ArtifactError::Coding(ArithmeticCodingError::Decode(
                DecodeError::NoMatchingSymbol { position: 0, .. }
            )))
        ));

        assert!(matches!(
            Artifact::from_json(r#"{"value":"0.5e1","length":1,"precision":5,"model":[]}"#),
            Err(ArtifactError::Json(_))
        ));
        assert!(matches!(Artifact::from_json("not json"), Err(ArtifactError::Json(_))));
    }

    #[test]
    fn test_length_beyond_stored_precision() {
        // A single-symbol model never runs out of interval, so the length is only
        // bounded by the precision it was sized with.
        let huge =
            r#"{"value":"0.5","length":1000000000000,"precision":5,"model":[{"symbol":97,"probability":"1"}]}"#;
        assert!(matches!(
            Artifact::from_json(huge).unwrap().decompress(),
            Err(ArtifactError::LengthExceedsPrecision {
                length: 1_000_000_000_000,
                precision: 5,
                required: 17
            })
        ));

        let model = Model::from_probabilities([(b'a', Decimal::one())]).unwrap();
        let value = "0.5".parse().unwrap();
        let artifact = Artifact::new(value, 99_995, Precision::new(10).unwrap(), &model);
        assert_eq!(artifact.decompress().unwrap(), vec![b'a'; 99_995]);
    }

    #[test]
    fn test_binary_round_trip() {
        let text = b"It was the best of times, it was the worst of times, \
it was the age of wisdom, it was the age of foolishness, "
            .repeat(10);
        let artifact = Artifact::compress(&text, None).unwrap();
        let bytes = artifact.to_bytes().unwrap();
        let json = artifact.to_json().unwrap();

        let restored = Artifact::from_bytes(&bytes).unwrap();
        assert_eq!(restored, artifact);
        assert_eq!(restored.to_bytes().unwrap(), bytes);
        assert_eq!(restored.decompress().unwrap(), text);

        assert!(bytes.len() < json.len());
        assert!(bytes.len() < text.len(), "{} >= {}", bytes.len(), text.len());
    }

    #[test]
    fn test_binary_layout() {
        let model = Model::from_probabilities([(b'a', Decimal::one())]).unwrap();
        let artifact = Artifact::new("0.5".parse().unwrap(), 4, Precision::new(5).unwrap(), &model);
        assert_eq!(
            artifact.to_bytes().unwrap(),
            [
                b'S', b'A', b'C', b'1', // magic
                1, 5, // precision
                1, 4, // length
                1, 1, 1, 2, 5, // 0.5: zigzag(-1), one magnitude byte, 5
                1, 1, // one entry
                b'a', 0, 1, 2, 1, // 'a' with probability 1
            ]
        );
    }

    #[test]
    fn test_malformed_binary() {
        let model = Model::from_probabilities([(b'a', Decimal::one())]).unwrap();
        let artifact = Artifact::new("0.5".parse().unwrap(), 4, Precision::new(5).unwrap(), &model);
        let bytes = artifact.to_bytes().unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            Artifact::from_bytes(&bad_magic),
            Err(ArtifactError::Format("bad magic"))
        ));

        assert!(matches!(
            Artifact::from_bytes(&bytes[..bytes.len() - 1]),
            Err(ArtifactError::Format("truncated decimal"))
        ));
        assert!(matches!(
            Artifact::from_bytes(&bytes[..6]),
            Err(ArtifactError::Io(_))
        ));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            Artifact::from_bytes(&trailing),
            Err(ArtifactError::Format("trailing bytes"))
        ));

        let mut wide = bytes[..4].to_vec();
        wide.push(9);
        assert!(matches!(
            Artifact::from_bytes(&wide),
            Err(ArtifactError::Format("integer wider than 64 bits"))
        ));

        let mut many = bytes[..13].to_vec();
        many.extend_from_slice(&[2, 1, 1]);
        assert!(matches!(
            Artifact::from_bytes(&many),
            Err(ArtifactError::Format("more model entries than byte values"))
        ));

        let mut far = bytes[..8].to_vec();
        far.extend_from_slice(&[8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(
            Artifact::from_bytes(&far),
            Err(ArtifactError::Format("decimal exponent out of range"))
        ));
    }
}
