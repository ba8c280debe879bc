/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Decoded field value model.
//!
//! This module provides:
//! - [`FieldKind`]: type tag for decoded values
//! - [`DecimalValue`]: mantissa/exponent pair representing `mantissa × 10^exponent`
//! - [`Field`]: tagged union over all decoded value kinds, each nullable
//!
//! Fields are immutable once built. A null field records its kind but no
//! payload; every typed accessor on a null field fails with
//! [`FieldError::NotPresent`] rather than returning a default value.

use crate::error::FieldError;
use crate::field_set::{FieldSet, Sequence};
use bytes::Bytes;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Type tag identifying the kind of a decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Unsigned integer.
    UInt,
    /// Signed integer.
    Int,
    /// Decimal (mantissa/exponent pair).
    Decimal,
    /// ASCII string.
    Ascii,
    /// Unicode (UTF-8) string.
    Unicode,
    /// Raw byte vector.
    ByteVector,
    /// Nested field set.
    Group,
    /// Ordered repetitions of a field set.
    Sequence,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UInt => "uint",
            Self::Int => "int",
            Self::Decimal => "decimal",
            Self::Ascii => "ascii",
            Self::Unicode => "unicode",
            Self::ByteVector => "bytevector",
            Self::Group => "group",
            Self::Sequence => "sequence",
        };
        write!(f, "{}", name)
    }
}

/// Decimal value as a mantissa/exponent pair.
///
/// Represents `mantissa × 10^exponent`. The pair is kept exact; conversion
/// to [`Decimal`] is a separate, fallible step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalValue {
    /// Signed mantissa.
    pub mantissa: i64,
    /// Power-of-ten exponent.
    pub exponent: i32,
}

impl DecimalValue {
    /// Creates a new decimal value.
    ///
    /// # Arguments
    /// * `mantissa` - The signed mantissa
    /// * `exponent` - The power-of-ten exponent
    #[inline]
    #[must_use]
    pub const fn new(mantissa: i64, exponent: i32) -> Self {
        Self { mantissa, exponent }
    }

    /// Converts the pair into a [`Decimal`].
    ///
    /// # Errors
    /// Returns `FieldError::DecimalOutOfRange` if the pair does not fit the
    /// `Decimal` value space (scale above 28 or multiplication overflow).
    pub fn to_decimal(self) -> Result<Decimal, FieldError> {
        let out_of_range = FieldError::DecimalOutOfRange {
            mantissa: self.mantissa,
            exponent: self.exponent,
        };

        if self.exponent <= 0 {
            let scale = self.exponent.unsigned_abs();
            Decimal::try_from_i128_with_scale(i128::from(self.mantissa), scale)
                .map_err(|_| out_of_range)
        } else {
            let factor = 10i128
                .checked_pow(self.exponent.unsigned_abs())
                .ok_or_else(|| out_of_range.clone())?;
            let scaled = i128::from(self.mantissa)
                .checked_mul(factor)
                .ok_or_else(|| out_of_range.clone())?;
            Decimal::try_from_i128_with_scale(scaled, 0).map_err(|_| out_of_range)
        }
    }

    /// Converts the pair into an `f64` approximation.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 * 10f64.powi(self.exponent)
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(d) => write!(f, "{}", d),
            Err(_) => write!(f, "{}e{}", self.mantissa, self.exponent),
        }
    }
}

/// A decoded field value.
///
/// One variant per field kind, plus `Null` which records absence without a
/// payload. Nested field sets are shared by reference counting; the builder
/// and the decoder dictionaries may both hold a decoded value, and the
/// longest holder determines its lifetime.
///
/// Equality is kind equality plus payload equality; group and sequence
/// fields compare their contained field sets structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Null field of the recorded kind.
    Null(FieldKind),
    /// Unsigned integer value.
    UInt(u64),
    /// Signed integer value.
    Int(i64),
    /// Decimal value.
    Decimal(DecimalValue),
    /// ASCII string value.
    Ascii(String),
    /// Unicode string value.
    Unicode(String),
    /// Raw byte vector value.
    ByteVector(Bytes),
    /// Nested field set.
    Group(Arc<FieldSet>),
    /// Ordered repetitions of a field set.
    Sequence(Sequence),
}

impl Field {
    /// Returns the kind tag of this field.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Null(kind) => *kind,
            Self::UInt(_) => FieldKind::UInt,
            Self::Int(_) => FieldKind::Int,
            Self::Decimal(_) => FieldKind::Decimal,
            Self::Ascii(_) => FieldKind::Ascii,
            Self::Unicode(_) => FieldKind::Unicode,
            Self::ByteVector(_) => FieldKind::ByteVector,
            Self::Group(_) => FieldKind::Group,
            Self::Sequence(_) => FieldKind::Sequence,
        }
    }

    /// Returns true if the field carries a value.
    #[inline]
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Null(_))
    }

    fn wrong_kind(&self, expected: FieldKind) -> FieldError {
        match self {
            Self::Null(kind) => FieldError::NotPresent { kind: *kind },
            _ => FieldError::WrongKind {
                expected,
                actual: self.kind(),
            },
        }
    }

    /// Returns the value as an unsigned integer.
    ///
    /// # Errors
    /// Returns `FieldError::NotPresent` on a null field and
    /// `FieldError::WrongKind` on a kind mismatch.
    pub fn as_u64(&self) -> Result<u64, FieldError> {
        match self {
            Self::UInt(v) => Ok(*v),
            _ => Err(self.wrong_kind(FieldKind::UInt)),
        }
    }

    /// Returns the value as a signed integer.
    ///
    /// # Errors
    /// Returns `FieldError::NotPresent` on a null field and
    /// `FieldError::WrongKind` on a kind mismatch.
    pub fn as_i64(&self) -> Result<i64, FieldError> {
        match self {
            Self::Int(v) => Ok(*v),
            _ => Err(self.wrong_kind(FieldKind::Int)),
        }
    }

    /// Returns the mantissa/exponent pair of a decimal field.
    ///
    /// # Errors
    /// Returns `FieldError::NotPresent` on a null field and
    /// `FieldError::WrongKind` on a kind mismatch. A null decimal rejects
    /// value extraction like every other null field.
    pub fn as_decimal(&self) -> Result<DecimalValue, FieldError> {
        match self {
            Self::Decimal(v) => Ok(*v),
            _ => Err(self.wrong_kind(FieldKind::Decimal)),
        }
    }

    /// Returns the value as a string slice (ASCII or Unicode).
    ///
    /// # Errors
    /// Returns `FieldError::NotPresent` on a null field and
    /// `FieldError::WrongKind` on a kind mismatch.
    pub fn as_str(&self) -> Result<&str, FieldError> {
        match self {
            Self::Ascii(s) | Self::Unicode(s) => Ok(s),
            _ => Err(self.wrong_kind(FieldKind::Ascii)),
        }
    }

    /// Returns the value as raw bytes.
    ///
    /// # Errors
    /// Returns `FieldError::NotPresent` on a null field and
    /// `FieldError::WrongKind` on a kind mismatch.
    pub fn as_bytes(&self) -> Result<&[u8], FieldError> {
        match self {
            Self::ByteVector(b) => Ok(b),
            _ => Err(self.wrong_kind(FieldKind::ByteVector)),
        }
    }

    /// Returns the nested field set of a group field.
    ///
    /// # Errors
    /// Returns `FieldError::NotPresent` on a null field and
    /// `FieldError::WrongKind` on a kind mismatch.
    pub fn as_group(&self) -> Result<&Arc<FieldSet>, FieldError> {
        match self {
            Self::Group(g) => Ok(g),
            _ => Err(self.wrong_kind(FieldKind::Group)),
        }
    }

    /// Returns the repetitions of a sequence field.
    ///
    /// # Errors
    /// Returns `FieldError::NotPresent` on a null field and
    /// `FieldError::WrongKind` on a kind mismatch.
    pub fn as_sequence(&self) -> Result<&Sequence, FieldError> {
        match self {
            Self::Sequence(s) => Ok(s),
            _ => Err(self.wrong_kind(FieldKind::Sequence)),
        }
    }
}

impl fmt::Display for Field {
    /// One canonical textual form per field kind. A group renders as a
    /// fixed literal, never its contents.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(_) => write!(f, "null"),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Ascii(s) | Self::Unicode(s) => write!(f, "{}", s),
            Self::ByteVector(b) => write!(f, "<{} bytes>", b.len()),
            Self::Group(_) => write!(f, "<group>"),
            Self::Sequence(_) => write!(f, "<sequence>"),
        }
    }
}
