/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Schema definitions for FAST templates.
//!
//! This module defines the structures that represent decoding instructions:
//! - [`PrimitiveType`]: wire type of a primitive field
//! - [`Presence`]: mandatory vs. optional fields
//! - [`Operator`] / [`OperatorSpec`]: per-field encoding strategy
//! - [`Instruction`]: one step of a template, possibly nested
//! - [`Template`]: an ordered list of instructions identified by id
//!
//! Templates are immutable once registered and referenced, never copied, by
//! every decode context.

use serde::{Deserialize, Serialize};

/// Wire type of a primitive field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Decimal (exponent/mantissa pair).
    Decimal,
    /// ASCII string.
    Ascii,
    /// Unicode (UTF-8) string.
    Unicode,
    /// Raw byte vector.
    ByteVector,
}

impl PrimitiveType {
    /// Returns true for the integer types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::UInt32 | Self::UInt64 | Self::Int32 | Self::Int64
        )
    }

    /// Returns true for the unsigned integer types.
    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt32 | Self::UInt64)
    }
}

/// Whether a field must carry a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Presence {
    /// The field always carries a value.
    #[default]
    Mandatory,
    /// The field may be null.
    Optional,
}

impl Presence {
    /// Returns true if the field may be null.
    #[inline]
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        matches!(self, Self::Optional)
    }
}

/// FAST field operator.
///
/// Determines how wire bytes (or their absence) combine with the per-field
/// dictionary entry and presence-map bit to produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Operator {
    /// No operator - value is always encoded on the wire.
    #[default]
    None,
    /// Constant - value is never on the wire, always the declared constant.
    Constant,
    /// Default - presence bit selects wire value vs. declared default.
    Default,
    /// Copy - if absent, reuse the previous value from the dictionary.
    Copy,
    /// Increment - if absent, previous value plus one.
    Increment,
    /// Delta - wire carries a delta against the previous value.
    Delta,
    /// Tail - wire carries a replacement for the tail of the previous value.
    Tail,
}

impl Operator {
    /// Returns true if this operator reads or writes the dictionary.
    #[must_use]
    pub const fn uses_dictionary(&self) -> bool {
        matches!(self, Self::Copy | Self::Increment | Self::Delta | Self::Tail)
    }

    /// Returns true if a field with this operator and presence consumes a
    /// presence-map bit.
    #[must_use]
    pub const fn uses_presence_bit(&self, presence: Presence) -> bool {
        match self {
            Self::None | Self::Delta => false,
            Self::Constant => presence.is_optional(),
            Self::Default | Self::Copy | Self::Increment | Self::Tail => true,
        }
    }
}

/// Initial or constant value declared by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InitialValue {
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
    /// Text value (ASCII or Unicode).
    Text(String),
    /// Raw bytes value.
    Bytes(Vec<u8>),
}

/// An operator with its declared initial value, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OperatorSpec {
    /// The operator.
    pub op: Operator,
    /// Declared initial/default/constant value.
    pub initial: Option<InitialValue>,
}

impl OperatorSpec {
    /// Creates a spec for the given operator with no initial value.
    #[must_use]
    pub const fn new(op: Operator) -> Self {
        Self { op, initial: None }
    }

    /// Adds an initial value.
    #[must_use]
    pub fn with_initial(mut self, initial: InitialValue) -> Self {
        self.initial = Some(initial);
        self
    }
}

/// Dictionary scope for operator state produced under a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DictionaryScope {
    /// One dictionary shared across all templates.
    #[default]
    Global,
    /// A dictionary private to the template.
    Template,
}

/// Instruction for one primitive field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInstruction {
    /// Field name.
    pub name: String,
    /// Auxiliary field id (FIX tag or feed-specific id).
    pub id: Option<u32>,
    /// Wire type.
    pub kind: PrimitiveType,
    /// Mandatory or optional.
    pub presence: Presence,
    /// Operator for the field (or the combined decimal entity).
    pub operator: OperatorSpec,
    /// Exponent operator for decimals decoded as two sub-values.
    pub exponent: Option<OperatorSpec>,
    /// Mantissa operator for decimals decoded as two sub-values.
    pub mantissa: Option<OperatorSpec>,
}

impl FieldInstruction {
    /// Creates a mandatory field with no operator.
    ///
    /// # Arguments
    /// * `name` - The field name
    /// * `kind` - The wire type
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            id: None,
            kind,
            presence: Presence::Mandatory,
            operator: OperatorSpec::default(),
            exponent: None,
            mantissa: None,
        }
    }

    /// Sets the auxiliary field id.
    #[must_use]
    pub const fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Marks the field optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Sets the field operator.
    #[must_use]
    pub fn with_operator(mut self, operator: OperatorSpec) -> Self {
        self.operator = operator;
        self
    }

    /// Splits a decimal into exponent/mantissa sub-operators.
    ///
    /// # Arguments
    /// * `exponent` - Operator for the exponent sub-value
    /// * `mantissa` - Operator for the mantissa sub-value
    #[must_use]
    pub fn with_decimal_operators(mut self, exponent: OperatorSpec, mantissa: OperatorSpec) -> Self {
        self.exponent = Some(exponent);
        self.mantissa = Some(mantissa);
        self
    }

    /// Returns the dictionary key for this field.
    ///
    /// Sub-values extend the key so exponent and mantissa state never
    /// collide.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.name
    }
}

/// Instruction for a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInstruction {
    /// Group name.
    pub name: String,
    /// Mandatory or optional; optional groups are gated by a presence bit.
    pub presence: Presence,
    /// Instructions of the nested field set.
    pub instructions: Vec<Instruction>,
}

impl GroupInstruction {
    /// Creates a mandatory group.
    #[must_use]
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            presence: Presence::Mandatory,
            instructions,
        }
    }

    /// Marks the group optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }
}

/// Instruction for a sequence of repeated field sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceInstruction {
    /// Sequence name.
    pub name: String,
    /// Mandatory or optional; optionality lives on the length field.
    pub presence: Presence,
    /// The length field, an integer instruction with its own operator.
    pub length: FieldInstruction,
    /// Instructions of the repeated field set.
    pub instructions: Vec<Instruction>,
}

impl SequenceInstruction {
    /// Creates a mandatory sequence with a plain uint32 length field.
    #[must_use]
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        let name = name.into();
        let length = FieldInstruction::new(format!("{}Length", name), PrimitiveType::UInt32);
        Self {
            name,
            presence: Presence::Mandatory,
            length,
            instructions,
        }
    }

    /// Replaces the length field instruction.
    #[must_use]
    pub fn with_length(mut self, length: FieldInstruction) -> Self {
        self.length = length;
        self
    }

    /// Marks the sequence optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self.length.presence = Presence::Optional;
        self
    }
}

/// One step of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Decode a primitive field.
    Field(FieldInstruction),
    /// Decode a nested group under a fresh presence map.
    Group(GroupInstruction),
    /// Decode a length field, then that many field-set repetitions.
    Sequence(SequenceInstruction),
    /// Decode another template's instructions inline (static reference).
    TemplateRef {
        /// Id of the referenced template.
        id: u32,
    },
}

/// An ordered list of field instructions identified by a template id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Numeric template id used for dynamic selection on the wire.
    pub id: u32,
    /// Template name.
    pub name: String,
    /// Dictionary scope for operator state under this template.
    pub scope: DictionaryScope,
    /// The instructions, in decode order.
    pub instructions: Vec<Instruction>,
}

impl Template {
    /// Creates a template with global dictionary scope.
    ///
    /// # Arguments
    /// * `id` - The template id
    /// * `name` - The template name
    /// * `instructions` - The instructions in decode order
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            id,
            name: name.into(),
            scope: DictionaryScope::Global,
            instructions,
        }
    }

    /// Sets the dictionary scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: DictionaryScope) -> Self {
        self.scope = scope;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_uses_dictionary() {
        assert!(!Operator::None.uses_dictionary());
        assert!(!Operator::Constant.uses_dictionary());
        assert!(!Operator::Default.uses_dictionary());
        assert!(Operator::Copy.uses_dictionary());
        assert!(Operator::Increment.uses_dictionary());
        assert!(Operator::Delta.uses_dictionary());
        assert!(Operator::Tail.uses_dictionary());
    }

    #[test]
    fn test_operator_presence_bit_rules() {
        assert!(!Operator::None.uses_presence_bit(Presence::Mandatory));
        assert!(!Operator::None.uses_presence_bit(Presence::Optional));
        assert!(!Operator::Delta.uses_presence_bit(Presence::Optional));
        assert!(!Operator::Constant.uses_presence_bit(Presence::Mandatory));
        assert!(Operator::Constant.uses_presence_bit(Presence::Optional));
        assert!(Operator::Copy.uses_presence_bit(Presence::Mandatory));
        assert!(Operator::Default.uses_presence_bit(Presence::Optional));
        assert!(Operator::Increment.uses_presence_bit(Presence::Mandatory));
    }

    #[test]
    fn test_field_instruction_builder() {
        let field = FieldInstruction::new("price", PrimitiveType::Decimal)
            .with_id(270)
            .optional()
            .with_operator(OperatorSpec::new(Operator::Copy));

        assert_eq!(field.name, "price");
        assert_eq!(field.id, Some(270));
        assert!(field.presence.is_optional());
        assert_eq!(field.operator.op, Operator::Copy);
    }

    #[test]
    fn test_sequence_default_length_field() {
        let seq = SequenceInstruction::new("entries", Vec::new());
        assert_eq!(seq.length.name, "entriesLength");
        assert_eq!(seq.length.kind, PrimitiveType::UInt32);

        let optional = SequenceInstruction::new("entries", Vec::new()).optional();
        assert!(optional.length.presence.is_optional());
    }
}
