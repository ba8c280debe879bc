/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Ordered collections of decoded fields.
//!
//! This module provides:
//! - [`FieldSet`]: ordered, named fields produced by decoding one template
//!   scope (a message body, a group, or one sequence entry)
//! - [`Sequence`]: ordered repetitions of a field set
//! - [`Message`]: a top-level field set tagged with its template id
//!
//! Field sets are built during decode and immutable thereafter; nested
//! scopes are shared by reference counting.

use crate::value::Field;
use smallvec::SmallVec;
use std::sync::Arc;

/// Ordered collection of named fields.
///
/// Preserves template field order. Lookup by name is linear; field sets in
/// market-data templates are small and iteration order matters more than
/// lookup speed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    /// Id of the template that produced this set, if it was a message root.
    template_id: Option<u32>,
    /// The fields, in template order.
    fields: SmallVec<[(String, Field); 8]>,
}

/// A decoded message: a field set carrying its template id.
pub type Message = FieldSet;

impl FieldSet {
    /// Creates an empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty field set tagged with the template that produced it.
    ///
    /// # Arguments
    /// * `template_id` - The producing template id
    #[must_use]
    pub fn with_template_id(template_id: u32) -> Self {
        Self {
            template_id: Some(template_id),
            fields: SmallVec::new(),
        }
    }

    /// Returns the producing template id, if recorded.
    #[inline]
    #[must_use]
    pub const fn template_id(&self) -> Option<u32> {
        self.template_id
    }

    /// Appends a field, preserving insertion order.
    ///
    /// # Arguments
    /// * `name` - The field name
    /// * `field` - The decoded field
    pub fn push(&mut self, name: impl Into<String>, field: Field) {
        self.fields.push((name.into(), field));
    }

    /// Returns the first field with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }

    /// Returns the field at the given position.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<(&str, &Field)> {
        self.fields.get(index).map(|(n, f)| (n.as_str(), f))
    }

    /// Returns the number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the set holds no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates the fields in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }
}

/// Ordered repetitions of a field set, produced by a sequence field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    entries: Vec<Arc<FieldSet>>,
}

impl Sequence {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty sequence with capacity for the decoded length.
    #[must_use]
    pub fn with_capacity(length: usize) -> Self {
        Self {
            entries: Vec::with_capacity(length),
        }
    }

    /// Appends one entry.
    pub fn push(&mut self, entry: Arc<FieldSet>) {
        self.entries.push(entry);
    }

    /// Returns the entry at the given position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<FieldSet>> {
        self.entries.get(index)
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the sequence holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the entries in decode order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FieldSet>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set_order_and_lookup() {
        let mut set = FieldSet::with_template_id(30);
        set.push("symbol", Field::Ascii("EURUSD".to_string()));
        set.push("price", Field::UInt(101250));

        assert_eq!(set.template_id(), Some(30));
        assert_eq!(set.len(), 2);
        assert_eq!(set.at(0).unwrap().0, "symbol");
        assert_eq!(set.get("price").unwrap().as_u64().unwrap(), 101250);
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn test_field_set_duplicate_names_keep_first() {
        let mut set = FieldSet::new();
        set.push("px", Field::UInt(1));
        set.push("px", Field::UInt(2));

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("px").unwrap().as_u64().unwrap(), 1);
    }

    #[test]
    fn test_sequence_entries_in_order() {
        let mut seq = Sequence::with_capacity(2);
        let mut first = FieldSet::new();
        first.push("qty", Field::UInt(10));
        let mut second = FieldSet::new();
        second.push("qty", Field::UInt(20));
        seq.push(Arc::new(first));
        seq.push(Arc::new(second));

        assert_eq!(seq.len(), 2);
        assert_eq!(
            seq.get(0).unwrap().get("qty").unwrap().as_u64().unwrap(),
            10
        );
        assert_eq!(
            seq.get(1).unwrap().get("qty").unwrap().as_u64().unwrap(),
            20
        );
    }
}
