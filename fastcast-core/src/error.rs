/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the fastcast FAST decoder.
//!
//! This module provides the error hierarchy shared across all fastcast
//! crates, using `thiserror` for typed, domain-specific errors:
//! - [`FieldError`]: value-access misuse on decoded fields
//! - [`SourceError`]: transport failures reported by a byte source
//! - [`BuildError`]: aborts raised by a message builder
//! - [`WireError`]: top-level composition of the above

use crate::value::FieldKind;
use thiserror::Error;

/// Result type alias using [`WireError`] as the error type.
pub type Result<T> = std::result::Result<T, WireError>;

/// Top-level error type composing the core error classes.
#[derive(Debug, Error)]
pub enum WireError {
    /// Value-access misuse on a decoded field.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// Transport failure from a byte source.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Message builder aborted.
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// I/O error from an underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised when accessing the typed value of a decoded field.
///
/// These are always signaled; a null field never yields a silently
/// default-constructed value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The field is null; it carries no value of any kind.
    #[error("field not present: {kind} field is null")]
    NotPresent {
        /// The kind recorded for the null field.
        kind: FieldKind,
    },

    /// The field holds a value of a different kind than requested.
    #[error("wrong field kind: expected {expected}, actual {actual}")]
    WrongKind {
        /// The kind the accessor expected.
        expected: FieldKind,
        /// The kind the field actually holds.
        actual: FieldKind,
    },

    /// The mantissa/exponent pair does not fit the decimal value type.
    #[error("decimal out of range: mantissa={mantissa}, exponent={exponent}")]
    DecimalOutOfRange {
        /// Decimal mantissa.
        mantissa: i64,
        /// Decimal exponent.
        exponent: i32,
    },
}

/// Transport failure reported by a byte source.
///
/// End-of-data and "no data yet" are not errors; they are reported through
/// [`Fetch`](crate::source::Fetch).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The underlying transport failed to deliver.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Abort raised by a [`MessageBuilder`](crate::builder::MessageBuilder).
///
/// A builder abort is fatal to the message being decoded; the decoder
/// propagates it without corrupting its dictionary state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("builder aborted: {reason}")]
pub struct BuildError {
    /// Description of why the builder aborted.
    pub reason: String,
}

impl BuildError {
    /// Creates a new build error.
    ///
    /// # Arguments
    /// * `reason` - Description of why the builder aborted
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_display() {
        let err = FieldError::NotPresent {
            kind: FieldKind::Decimal,
        };
        assert_eq!(err.to_string(), "field not present: decimal field is null");
    }

    #[test]
    fn test_wrong_kind_display() {
        let err = FieldError::WrongKind {
            expected: FieldKind::UInt,
            actual: FieldKind::Ascii,
        };
        assert_eq!(err.to_string(), "wrong field kind: expected uint, actual ascii");
    }

    #[test]
    fn test_wire_error_from_field() {
        let err: WireError = FieldError::NotPresent {
            kind: FieldKind::UInt,
        }
        .into();
        assert!(matches!(err, WireError::Field(_)));
    }

    #[test]
    fn test_source_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = SourceError::from(io);
        assert!(matches!(err, SourceError::Transport(_)));
    }
}
