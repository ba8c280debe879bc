/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Operator dictionaries.
//!
//! The copy/increment/delta/tail operators need the last-seen value per
//! field, keyed by field identity and scoped either globally or per
//! template. Writes made while decoding one message are staged in a pending
//! overlay and committed only when the message completes; a decode or
//! builder failure discards the overlay, so operator state always reflects
//! the last successfully decoded message.

use bytes::Bytes;
use std::collections::HashMap;

/// State of one dictionary entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DictionaryValue {
    /// No value has been assigned yet.
    #[default]
    Undefined,
    /// The previous value was explicitly null.
    Empty,
    /// Unsigned integer value.
    UInt(u64),
    /// Signed integer value.
    Int(i64),
    /// Decimal value.
    Decimal {
        /// Decimal mantissa.
        mantissa: i64,
        /// Decimal exponent.
        exponent: i32,
    },
    /// Text value.
    Text(String),
    /// Byte sequence value.
    Bytes(Bytes),
}

impl DictionaryValue {
    /// Returns true if no value has been assigned.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns true if the previous value was explicitly null.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the value as a u64, if applicable.
    #[must_use]
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an i64, if applicable.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as text, if applicable.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as bytes, if applicable.
    #[must_use]
    pub fn as_raw(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

type Key = (Option<u32>, String);

/// Scoped "previous value" store with transactional message semantics.
///
/// The scope component of a key is `None` for the global dictionary and
/// `Some(template_id)` for a template-private dictionary.
#[derive(Debug, Default)]
pub struct Dictionary {
    committed: HashMap<Key, DictionaryValue>,
    pending: HashMap<Key, DictionaryValue>,
}

impl Dictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an entry, preferring writes staged by the message in
    /// flight. `None` means the entry was never assigned.
    #[must_use]
    pub fn get(&self, scope: Option<u32>, key: &str) -> Option<&DictionaryValue> {
        let key: Key = (scope, key.to_string());
        self.pending.get(&key).or_else(|| self.committed.get(&key))
    }

    /// Stages a write for the message in flight.
    pub fn stage(&mut self, scope: Option<u32>, key: impl Into<String>, value: DictionaryValue) {
        self.pending.insert((scope, key.into()), value);
    }

    /// Commits staged writes; called when a message decodes successfully.
    pub fn commit(&mut self) {
        self.committed.extend(self.pending.drain());
    }

    /// Discards staged writes; called when a message fails mid-decode.
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Clears all state, committed and pending.
    pub fn reset(&mut self) {
        self.committed.clear();
        self.pending.clear();
    }

    /// Returns the number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Returns true if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}
