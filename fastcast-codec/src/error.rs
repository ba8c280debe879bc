/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST protocol error types.
//!
//! Protocol violations are fatal to the current message only; the stream
//! may continue with the next message once framing independently recovers
//! a boundary. Each variant carries enough context (template id, field
//! name, byte offset) to diagnose the failure.

use fastcast_core::{BuildError, FieldError, SourceError};
use thiserror::Error;

/// Errors that can occur during FAST decoding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FastError {
    /// The block ended in the middle of an encoded entity.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof {
        /// Byte offset where input ran out.
        offset: usize,
    },

    /// A stop-bit integer exceeded its value range.
    #[error("integer overflow at offset {offset}")]
    IntegerOverflow {
        /// Byte offset of the offending entity.
        offset: usize,
    },

    /// A string field held invalid UTF-8.
    #[error("invalid string encoding at offset {offset}")]
    InvalidString {
        /// Byte offset of the offending entity.
        offset: usize,
    },

    /// An entity used more bytes than its value requires (strict mode).
    #[error("overlong encoding at offset {offset}")]
    OverlongEncoding {
        /// Byte offset of the offending entity.
        offset: usize,
    },

    /// A decimal exponent fell outside the valid range (strict mode).
    #[error("exponent out of range for field '{field}': {exponent}")]
    ExponentOutOfRange {
        /// Field name.
        field: String,
        /// The decoded exponent.
        exponent: i64,
    },

    /// A decoded value does not fit the field's declared type.
    #[error("value out of range for field '{field}': {reason}")]
    ValueOutOfRange {
        /// Field name.
        field: String,
        /// Description of the range violation.
        reason: String,
    },

    /// The message selected a template id absent from the registry.
    #[error("unknown template id: {id}")]
    UnknownTemplate {
        /// The unknown template id.
        id: u32,
    },

    /// The message carried no template id and none was previously selected.
    #[error("no template id on the wire and no previous template")]
    NoTemplateId,

    /// A mandatory field decoded as null.
    #[error("null value for mandatory field '{field}' in template {template_id}")]
    NullMandatory {
        /// Owning template id.
        template_id: u32,
        /// Field name.
        field: String,
    },

    /// A dictionary-dependent operator found no prior value and no initial
    /// value to fall back on.
    #[error("undefined prior value for mandatory field '{field}' in template {template_id}")]
    UndefinedPriorValue {
        /// Owning template id.
        template_id: u32,
        /// Field name.
        field: String,
    },

    /// A template declared an operator the field type cannot carry.
    #[error("invalid operator for field '{field}': {reason}")]
    InvalidOperator {
        /// Field name.
        field: String,
        /// Why the operator is invalid here.
        reason: String,
    },

    /// Value-access misuse on a decoded field.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// The message builder aborted.
    #[error("{0}")]
    Build(#[from] BuildError),

    /// The byte source failed.
    #[error("{0}")]
    Source(#[from] SourceError),
}
