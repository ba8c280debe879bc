/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Field decode algorithms.
//!
//! One algorithm per FAST operator (none, constant, default, copy,
//! increment, delta, tail) crossed with each primitive type. Every
//! algorithm combines up to three inputs into a value: the wire bytes (or
//! their absence), the per-field dictionary entry, and the presence-map
//! bit. Dictionary writes are staged through [`Dictionary::stage`] and
//! committed by the decoder once the whole message succeeds.

use crate::dictionary::{Dictionary, DictionaryValue};
use crate::error::FastError;
use crate::pmap::PresenceMap;
use crate::stopbit;
use bytes::Bytes;
use fastcast_core::{DecimalValue, Field, FieldKind};
use fastcast_templates::{FieldInstruction, InitialValue, Operator, OperatorSpec, PrimitiveType};
use tracing::warn;

/// Decode-time context shared by every field of one template scope.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope {
    /// Template owning the field, for error context.
    pub template_id: u32,
    /// Dictionary scope key (`None` = global).
    pub dict_scope: Option<u32>,
    /// Reject conformance violations instead of tolerating them.
    pub strict: bool,
}

impl Scope {
    fn null_mandatory(&self, field: &str) -> FastError {
        FastError::NullMandatory {
            template_id: self.template_id,
            field: field.to_string(),
        }
    }

    fn undefined_prior(&self, field: &str) -> FastError {
        FastError::UndefinedPriorValue {
            template_id: self.template_id,
            field: field.to_string(),
        }
    }
}

fn invalid_operator(field: &str, reason: &str) -> FastError {
    FastError::InvalidOperator {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn initial_u64(spec: &OperatorSpec) -> Option<u64> {
    match spec.initial.as_ref()? {
        InitialValue::UInt(v) => Some(*v),
        InitialValue::Int(v) if *v >= 0 => Some(*v as u64),
        _ => None,
    }
}

fn initial_i64(spec: &OperatorSpec) -> Option<i64> {
    match spec.initial.as_ref()? {
        InitialValue::Int(v) => Some(*v),
        InitialValue::UInt(v) => i64::try_from(*v).ok(),
        _ => None,
    }
}

fn initial_text(spec: &OperatorSpec) -> Option<&str> {
    match spec.initial.as_ref()? {
        InitialValue::Text(s) => Some(s),
        _ => None,
    }
}

fn initial_bytes(spec: &OperatorSpec) -> Option<&[u8]> {
    match spec.initial.as_ref()? {
        InitialValue::Bytes(b) => Some(b),
        _ => None,
    }
}

fn initial_decimal(spec: &OperatorSpec) -> Option<(i64, i32)> {
    match spec.initial.as_ref()? {
        InitialValue::Decimal { mantissa, exponent } => Some((*mantissa, *exponent)),
        _ => None,
    }
}

/// Decodes one primitive field according to its instruction.
///
/// Returns `Field::Null(kind)` for decoded nulls; protocol violations
/// surface as errors fatal to the current message.
pub(crate) fn decode_field(
    scope: &Scope,
    instr: &FieldInstruction,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    dict: &mut Dictionary,
) -> Result<Field, FastError> {
    let optional = instr.presence.is_optional();

    match instr.kind {
        PrimitiveType::UInt32 | PrimitiveType::UInt64 => {
            let value = uint_entity(
                scope,
                instr.key(),
                &instr.operator,
                optional,
                data,
                offset,
                pmap,
                dict,
            )?;
            if instr.kind == PrimitiveType::UInt32 {
                if let Some(v) = value {
                    check_range(scope, instr.key(), v <= u64::from(u32::MAX), "uint32")?;
                }
            }
            Ok(value.map_or(Field::Null(FieldKind::UInt), Field::UInt))
        }
        PrimitiveType::Int32 | PrimitiveType::Int64 => {
            let value = int_entity(
                scope,
                instr.key(),
                &instr.operator,
                optional,
                data,
                offset,
                pmap,
                dict,
            )?;
            if instr.kind == PrimitiveType::Int32 {
                if let Some(v) = value {
                    check_range(
                        scope,
                        instr.key(),
                        (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&v),
                        "int32",
                    )?;
                }
            }
            Ok(value.map_or(Field::Null(FieldKind::Int), Field::Int))
        }
        PrimitiveType::Decimal => decode_decimal(scope, instr, optional, data, offset, pmap, dict),
        PrimitiveType::Ascii => {
            let value = text_entity(
                scope,
                instr.key(),
                &instr.operator,
                optional,
                TextKind::Ascii,
                data,
                offset,
                pmap,
                dict,
            )?;
            Ok(value.map_or(Field::Null(FieldKind::Ascii), Field::Ascii))
        }
        PrimitiveType::Unicode => {
            let value = text_entity(
                scope,
                instr.key(),
                &instr.operator,
                optional,
                TextKind::Utf8,
                data,
                offset,
                pmap,
                dict,
            )?;
            Ok(value.map_or(Field::Null(FieldKind::Unicode), Field::Unicode))
        }
        PrimitiveType::ByteVector => {
            let value = bytes_entity(
                scope,
                instr.key(),
                &instr.operator,
                optional,
                data,
                offset,
                pmap,
                dict,
            )?;
            Ok(value.map_or(Field::Null(FieldKind::ByteVector), Field::ByteVector))
        }
    }
}

/// Decodes a sequence length field, returning `None` for a null length.
pub(crate) fn decode_length(
    scope: &Scope,
    instr: &FieldInstruction,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    dict: &mut Dictionary,
) -> Result<Option<u64>, FastError> {
    uint_entity(
        scope,
        instr.key(),
        &instr.operator,
        instr.presence.is_optional(),
        data,
        offset,
        pmap,
        dict,
    )
}

fn check_range(scope: &Scope, field: &str, ok: bool, ty: &str) -> Result<(), FastError> {
    if ok {
        return Ok(());
    }
    if scope.strict {
        return Err(FastError::ValueOutOfRange {
            field: field.to_string(),
            reason: format!("value does not fit {}", ty),
        });
    }
    warn!(field, ty, "tolerating out-of-range value");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn uint_entity(
    scope: &Scope,
    key: &str,
    spec: &OperatorSpec,
    optional: bool,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    dict: &mut Dictionary,
) -> Result<Option<u64>, FastError> {
    let read_wire = |offset: &mut usize| -> Result<Option<u64>, FastError> {
        if optional {
            stopbit::decode_nullable_uint(data, offset, scope.strict)
        } else {
            stopbit::decode_uint(data, offset, scope.strict).map(Some)
        }
    };

    match spec.op {
        Operator::None => read_wire(offset),
        Operator::Constant => {
            let value = initial_u64(spec)
                .ok_or_else(|| invalid_operator(key, "constant operator requires an initial value"))?;
            if optional && !pmap.next_bit() {
                Ok(None)
            } else {
                Ok(Some(value))
            }
        }
        Operator::Default => {
            if pmap.next_bit() {
                read_wire(offset)
            } else {
                match initial_u64(spec) {
                    Some(v) => Ok(Some(v)),
                    None if optional => Ok(None),
                    None => Err(scope.null_mandatory(key)),
                }
            }
        }
        Operator::Copy => {
            if pmap.next_bit() {
                let value = read_wire(offset)?;
                dict.stage(
                    scope.dict_scope,
                    key,
                    value.map_or(DictionaryValue::Empty, DictionaryValue::UInt),
                );
                Ok(value)
            } else {
                reuse_uint(scope, key, spec, optional, dict, false, offset)
            }
        }
        Operator::Increment => {
            if pmap.next_bit() {
                let value = read_wire(offset)?;
                dict.stage(
                    scope.dict_scope,
                    key,
                    value.map_or(DictionaryValue::Empty, DictionaryValue::UInt),
                );
                Ok(value)
            } else {
                reuse_uint(scope, key, spec, optional, dict, true, offset)
            }
        }
        Operator::Delta => {
            let delta = if optional {
                stopbit::decode_nullable_int(data, offset, scope.strict)?
            } else {
                Some(stopbit::decode_int(data, offset, scope.strict)?)
            };
            match delta {
                None => Ok(None),
                Some(d) => {
                    let base = match dict.get(scope.dict_scope, key) {
                        Some(DictionaryValue::UInt(v)) => *v,
                        _ => initial_u64(spec).unwrap_or(0),
                    };
                    let value = i128::from(base) + i128::from(d);
                    let value = u64::try_from(value)
                        .map_err(|_| FastError::IntegerOverflow { offset: *offset })?;
                    dict.stage(scope.dict_scope, key, DictionaryValue::UInt(value));
                    Ok(Some(value))
                }
            }
        }
        Operator::Tail => Err(invalid_operator(key, "tail operator on an integer field")),
    }
}

fn reuse_uint(
    scope: &Scope,
    key: &str,
    spec: &OperatorSpec,
    optional: bool,
    dict: &mut Dictionary,
    increment: bool,
    offset: &usize,
) -> Result<Option<u64>, FastError> {
    match dict.get(scope.dict_scope, key) {
        Some(DictionaryValue::UInt(v)) => {
            if increment {
                let next = v
                    .checked_add(1)
                    .ok_or(FastError::IntegerOverflow { offset: *offset })?;
                dict.stage(scope.dict_scope, key, DictionaryValue::UInt(next));
                Ok(Some(next))
            } else {
                Ok(Some(*v))
            }
        }
        Some(DictionaryValue::Empty) => {
            if optional {
                Ok(None)
            } else {
                Err(scope.null_mandatory(key))
            }
        }
        Some(DictionaryValue::Undefined) | None => match initial_u64(spec) {
            Some(v) => {
                dict.stage(scope.dict_scope, key, DictionaryValue::UInt(v));
                Ok(Some(v))
            }
            None if optional => Ok(None),
            None => Err(scope.undefined_prior(key)),
        },
        Some(_) => Err(invalid_operator(key, "dictionary entry type mismatch")),
    }
}

#[allow(clippy::too_many_arguments)]
fn int_entity(
    scope: &Scope,
    key: &str,
    spec: &OperatorSpec,
    optional: bool,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    dict: &mut Dictionary,
) -> Result<Option<i64>, FastError> {
    let read_wire = |offset: &mut usize| -> Result<Option<i64>, FastError> {
        if optional {
            stopbit::decode_nullable_int(data, offset, scope.strict)
        } else {
            stopbit::decode_int(data, offset, scope.strict).map(Some)
        }
    };

    match spec.op {
        Operator::None => read_wire(offset),
        Operator::Constant => {
            let value = initial_i64(spec)
                .ok_or_else(|| invalid_operator(key, "constant operator requires an initial value"))?;
            if optional && !pmap.next_bit() {
                Ok(None)
            } else {
                Ok(Some(value))
            }
        }
        Operator::Default => {
            if pmap.next_bit() {
                read_wire(offset)
            } else {
                match initial_i64(spec) {
                    Some(v) => Ok(Some(v)),
                    None if optional => Ok(None),
                    None => Err(scope.null_mandatory(key)),
                }
            }
        }
        Operator::Copy | Operator::Increment => {
            let increment = spec.op == Operator::Increment;
            if pmap.next_bit() {
                let value = read_wire(offset)?;
                dict.stage(
                    scope.dict_scope,
                    key,
                    value.map_or(DictionaryValue::Empty, DictionaryValue::Int),
                );
                Ok(value)
            } else {
                match dict.get(scope.dict_scope, key) {
                    Some(DictionaryValue::Int(v)) => {
                        if increment {
                            let next = v
                                .checked_add(1)
                                .ok_or(FastError::IntegerOverflow { offset: *offset })?;
                            dict.stage(scope.dict_scope, key, DictionaryValue::Int(next));
                            Ok(Some(next))
                        } else {
                            Ok(Some(*v))
                        }
                    }
                    Some(DictionaryValue::Empty) => {
                        if optional {
                            Ok(None)
                        } else {
                            Err(scope.null_mandatory(key))
                        }
                    }
                    Some(DictionaryValue::Undefined) | None => match initial_i64(spec) {
                        Some(v) => {
                            dict.stage(scope.dict_scope, key, DictionaryValue::Int(v));
                            Ok(Some(v))
                        }
                        None if optional => Ok(None),
                        None => Err(scope.undefined_prior(key)),
                    },
                    Some(_) => Err(invalid_operator(key, "dictionary entry type mismatch")),
                }
            }
        }
        Operator::Delta => {
            let delta = if optional {
                stopbit::decode_nullable_int(data, offset, scope.strict)?
            } else {
                Some(stopbit::decode_int(data, offset, scope.strict)?)
            };
            match delta {
                None => Ok(None),
                Some(d) => {
                    let base = match dict.get(scope.dict_scope, key) {
                        Some(DictionaryValue::Int(v)) => *v,
                        _ => initial_i64(spec).unwrap_or(0),
                    };
                    let value = i128::from(base) + i128::from(d);
                    let value = i64::try_from(value)
                        .map_err(|_| FastError::IntegerOverflow { offset: *offset })?;
                    dict.stage(scope.dict_scope, key, DictionaryValue::Int(value));
                    Ok(Some(value))
                }
            }
        }
        Operator::Tail => Err(invalid_operator(key, "tail operator on an integer field")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextKind {
    Ascii,
    Utf8,
}

impl TextKind {
    fn read(
        self,
        optional: bool,
        data: &[u8],
        offset: &mut usize,
        strict: bool,
    ) -> Result<Option<String>, FastError> {
        match (self, optional) {
            (Self::Ascii, false) => stopbit::decode_ascii(data, offset, strict).map(Some),
            (Self::Ascii, true) => stopbit::decode_nullable_ascii(data, offset, strict),
            (Self::Utf8, false) => stopbit::decode_utf8(data, offset, strict).map(Some),
            (Self::Utf8, true) => stopbit::decode_nullable_utf8(data, offset, strict),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn text_entity(
    scope: &Scope,
    key: &str,
    spec: &OperatorSpec,
    optional: bool,
    kind: TextKind,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    dict: &mut Dictionary,
) -> Result<Option<String>, FastError> {
    match spec.op {
        Operator::None => kind.read(optional, data, offset, scope.strict),
        Operator::Constant => {
            let value = initial_text(spec)
                .ok_or_else(|| invalid_operator(key, "constant operator requires an initial value"))?
                .to_string();
            if optional && !pmap.next_bit() {
                Ok(None)
            } else {
                Ok(Some(value))
            }
        }
        Operator::Default => {
            if pmap.next_bit() {
                kind.read(optional, data, offset, scope.strict)
            } else {
                match initial_text(spec) {
                    Some(v) => Ok(Some(v.to_string())),
                    None if optional => Ok(None),
                    None => Err(scope.null_mandatory(key)),
                }
            }
        }
        Operator::Copy => {
            if pmap.next_bit() {
                let value = kind.read(optional, data, offset, scope.strict)?;
                dict.stage(
                    scope.dict_scope,
                    key,
                    value
                        .clone()
                        .map_or(DictionaryValue::Empty, DictionaryValue::Text),
                );
                Ok(value)
            } else {
                match dict.get(scope.dict_scope, key) {
                    Some(DictionaryValue::Text(v)) => Ok(Some(v.clone())),
                    Some(DictionaryValue::Empty) => {
                        if optional {
                            Ok(None)
                        } else {
                            Err(scope.null_mandatory(key))
                        }
                    }
                    Some(DictionaryValue::Undefined) | None => match initial_text(spec) {
                        Some(v) => {
                            let v = v.to_string();
                            dict.stage(scope.dict_scope, key, DictionaryValue::Text(v.clone()));
                            Ok(Some(v))
                        }
                        None if optional => Ok(None),
                        None => Err(scope.undefined_prior(key)),
                    },
                    Some(_) => Err(invalid_operator(key, "dictionary entry type mismatch")),
                }
            }
        }
        Operator::Increment => Err(invalid_operator(key, "increment operator on a string field")),
        Operator::Delta => {
            let subtraction = if optional {
                stopbit::decode_nullable_int(data, offset, scope.strict)?
            } else {
                Some(stopbit::decode_int(data, offset, scope.strict)?)
            };
            match subtraction {
                None => Ok(None),
                Some(sub) => {
                    let content = match kind {
                        TextKind::Ascii => stopbit::decode_ascii(data, offset, scope.strict)?,
                        TextKind::Utf8 => stopbit::decode_utf8(data, offset, scope.strict)?,
                    };
                    let base = match dict.get(scope.dict_scope, key) {
                        Some(DictionaryValue::Text(v)) => v.clone(),
                        _ => initial_text(spec).unwrap_or_default().to_string(),
                    };
                    let merged = apply_delta(key, base.as_bytes(), sub, content.as_bytes())?;
                    let value = String::from_utf8(merged)
                        .map_err(|_| FastError::InvalidString { offset: *offset })?;
                    dict.stage(scope.dict_scope, key, DictionaryValue::Text(value.clone()));
                    Ok(Some(value))
                }
            }
        }
        Operator::Tail => {
            if pmap.next_bit() {
                let tail = kind.read(optional, data, offset, scope.strict)?;
                match tail {
                    None => {
                        dict.stage(scope.dict_scope, key, DictionaryValue::Empty);
                        Ok(None)
                    }
                    Some(tail) => {
                        let base = match dict.get(scope.dict_scope, key) {
                            Some(DictionaryValue::Text(v)) => v.clone(),
                            _ => initial_text(spec).unwrap_or_default().to_string(),
                        };
                        let merged = apply_tail(base.as_bytes(), tail.as_bytes());
                        let value = String::from_utf8(merged)
                            .map_err(|_| FastError::InvalidString { offset: *offset })?;
                        dict.stage(scope.dict_scope, key, DictionaryValue::Text(value.clone()));
                        Ok(Some(value))
                    }
                }
            } else {
                match dict.get(scope.dict_scope, key) {
                    Some(DictionaryValue::Text(v)) => Ok(Some(v.clone())),
                    Some(DictionaryValue::Empty) => {
                        if optional {
                            Ok(None)
                        } else {
                            Err(scope.null_mandatory(key))
                        }
                    }
                    Some(DictionaryValue::Undefined) | None => match initial_text(spec) {
                        Some(v) => Ok(Some(v.to_string())),
                        None if optional => Ok(None),
                        None => Err(scope.undefined_prior(key)),
                    },
                    Some(_) => Err(invalid_operator(key, "dictionary entry type mismatch")),
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn bytes_entity(
    scope: &Scope,
    key: &str,
    spec: &OperatorSpec,
    optional: bool,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    dict: &mut Dictionary,
) -> Result<Option<Bytes>, FastError> {
    let read_wire = |offset: &mut usize| -> Result<Option<Bytes>, FastError> {
        if optional {
            stopbit::decode_nullable_byte_vector(data, offset, scope.strict)
        } else {
            stopbit::decode_byte_vector(data, offset, scope.strict).map(Some)
        }
    };

    match spec.op {
        Operator::None => read_wire(offset),
        Operator::Constant => {
            let value = initial_bytes(spec)
                .ok_or_else(|| invalid_operator(key, "constant operator requires an initial value"))?;
            let value = Bytes::copy_from_slice(value);
            if optional && !pmap.next_bit() {
                Ok(None)
            } else {
                Ok(Some(value))
            }
        }
        Operator::Default => {
            if pmap.next_bit() {
                read_wire(offset)
            } else {
                match initial_bytes(spec) {
                    Some(v) => Ok(Some(Bytes::copy_from_slice(v))),
                    None if optional => Ok(None),
                    None => Err(scope.null_mandatory(key)),
                }
            }
        }
        Operator::Copy => {
            if pmap.next_bit() {
                let value = read_wire(offset)?;
                dict.stage(
                    scope.dict_scope,
                    key,
                    value
                        .clone()
                        .map_or(DictionaryValue::Empty, DictionaryValue::Bytes),
                );
                Ok(value)
            } else {
                match dict.get(scope.dict_scope, key) {
                    Some(DictionaryValue::Bytes(v)) => Ok(Some(v.clone())),
                    Some(DictionaryValue::Empty) => {
                        if optional {
                            Ok(None)
                        } else {
                            Err(scope.null_mandatory(key))
                        }
                    }
                    Some(DictionaryValue::Undefined) | None => match initial_bytes(spec) {
                        Some(v) => {
                            let v = Bytes::copy_from_slice(v);
                            dict.stage(scope.dict_scope, key, DictionaryValue::Bytes(v.clone()));
                            Ok(Some(v))
                        }
                        None if optional => Ok(None),
                        None => Err(scope.undefined_prior(key)),
                    },
                    Some(_) => Err(invalid_operator(key, "dictionary entry type mismatch")),
                }
            }
        }
        Operator::Increment => Err(invalid_operator(
            key,
            "increment operator on a byte vector field",
        )),
        Operator::Delta => {
            let subtraction = if optional {
                stopbit::decode_nullable_int(data, offset, scope.strict)?
            } else {
                Some(stopbit::decode_int(data, offset, scope.strict)?)
            };
            match subtraction {
                None => Ok(None),
                Some(sub) => {
                    let content = stopbit::decode_byte_vector(data, offset, scope.strict)?;
                    let base = match dict.get(scope.dict_scope, key) {
                        Some(DictionaryValue::Bytes(v)) => v.clone(),
                        _ => Bytes::copy_from_slice(initial_bytes(spec).unwrap_or_default()),
                    };
                    let merged = apply_delta(key, &base, sub, &content)?;
                    let value = Bytes::from(merged);
                    dict.stage(scope.dict_scope, key, DictionaryValue::Bytes(value.clone()));
                    Ok(Some(value))
                }
            }
        }
        Operator::Tail => {
            if pmap.next_bit() {
                let tail = read_wire(offset)?;
                match tail {
                    None => {
                        dict.stage(scope.dict_scope, key, DictionaryValue::Empty);
                        Ok(None)
                    }
                    Some(tail) => {
                        let base = match dict.get(scope.dict_scope, key) {
                            Some(DictionaryValue::Bytes(v)) => v.clone(),
                            _ => Bytes::copy_from_slice(initial_bytes(spec).unwrap_or_default()),
                        };
                        let value = Bytes::from(apply_tail(&base, &tail));
                        dict.stage(scope.dict_scope, key, DictionaryValue::Bytes(value.clone()));
                        Ok(Some(value))
                    }
                }
            } else {
                match dict.get(scope.dict_scope, key) {
                    Some(DictionaryValue::Bytes(v)) => Ok(Some(v.clone())),
                    Some(DictionaryValue::Empty) => {
                        if optional {
                            Ok(None)
                        } else {
                            Err(scope.null_mandatory(key))
                        }
                    }
                    Some(DictionaryValue::Undefined) | None => match initial_bytes(spec) {
                        Some(v) => Ok(Some(Bytes::copy_from_slice(v))),
                        None if optional => Ok(None),
                        None => Err(scope.undefined_prior(key)),
                    },
                    Some(_) => Err(invalid_operator(key, "dictionary entry type mismatch")),
                }
            }
        }
    }
}

/// Applies a FAST delta: a non-negative subtraction removes that many bytes
/// from the tail of the base and appends; a negative subtraction removes
/// `|n| - 1` bytes from the head and prepends.
fn apply_delta(
    key: &str,
    base: &[u8],
    subtraction: i64,
    content: &[u8],
) -> Result<Vec<u8>, FastError> {
    if subtraction >= 0 {
        let strip = subtraction as usize;
        if strip > base.len() {
            return Err(FastError::ValueOutOfRange {
                field: key.to_string(),
                reason: format!(
                    "delta subtraction {} exceeds previous length {}",
                    strip,
                    base.len()
                ),
            });
        }
        let mut merged = base[..base.len() - strip].to_vec();
        merged.extend_from_slice(content);
        Ok(merged)
    } else {
        let strip = subtraction.unsigned_abs() as usize - 1;
        if strip > base.len() {
            return Err(FastError::ValueOutOfRange {
                field: key.to_string(),
                reason: format!(
                    "delta subtraction {} exceeds previous length {}",
                    strip,
                    base.len()
                ),
            });
        }
        let mut merged = content.to_vec();
        merged.extend_from_slice(&base[strip..]);
        Ok(merged)
    }
}

/// Applies a tail replacement: the wire value replaces the end of the base;
/// a wire value at least as long as the base replaces it entirely.
fn apply_tail(base: &[u8], tail: &[u8]) -> Vec<u8> {
    if tail.len() >= base.len() {
        return tail.to_vec();
    }
    let mut merged = base[..base.len() - tail.len()].to_vec();
    merged.extend_from_slice(tail);
    merged
}

fn check_exponent(scope: &Scope, key: &str, exponent: i64) -> Result<i32, FastError> {
    if (-63..=63).contains(&exponent) {
        return Ok(exponent as i32);
    }
    if scope.strict {
        return Err(FastError::ExponentOutOfRange {
            field: key.to_string(),
            exponent,
        });
    }
    warn!(field = key, exponent, "tolerating out-of-range exponent");
    Ok(exponent.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

fn decode_decimal(
    scope: &Scope,
    instr: &FieldInstruction,
    optional: bool,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    dict: &mut Dictionary,
) -> Result<Field, FastError> {
    // Split form: exponent and mantissa each under their own operator. The
    // exponent inherits the field's presence; a null exponent nullifies the
    // whole decimal and the mantissa is not consumed.
    if let (Some(exp_spec), Some(man_spec)) = (&instr.exponent, &instr.mantissa) {
        let exp_key = format!("{}.exponent", instr.key());
        let man_key = format!("{}.mantissa", instr.key());

        let exponent = int_entity(
            scope, &exp_key, exp_spec, optional, data, offset, pmap, dict,
        )?;
        return match exponent {
            None => Ok(Field::Null(FieldKind::Decimal)),
            Some(e) => {
                let e = check_exponent(scope, &exp_key, e)?;
                let mantissa = int_entity(
                    scope, &man_key, man_spec, false, data, offset, pmap, dict,
                )?
                .ok_or_else(|| scope.null_mandatory(&man_key))?;
                Ok(Field::Decimal(DecimalValue::new(mantissa, e)))
            }
        };
    }

    // Combined form: one operator covers the exponent/mantissa pair.
    let key = instr.key();
    let spec = &instr.operator;

    let read_wire =
        |offset: &mut usize| -> Result<Option<(i64, i64)>, FastError> {
            let exponent = if optional {
                stopbit::decode_nullable_int(data, offset, scope.strict)?
            } else {
                Some(stopbit::decode_int(data, offset, scope.strict)?)
            };
            match exponent {
                None => Ok(None),
                Some(e) => {
                    let mantissa = stopbit::decode_int(data, offset, scope.strict)?;
                    Ok(Some((mantissa, e)))
                }
            }
        };

    let to_field = |scope: &Scope, pair: Option<(i64, i64)>| -> Result<Field, FastError> {
        match pair {
            None => Ok(Field::Null(FieldKind::Decimal)),
            Some((mantissa, exponent)) => {
                let exponent = check_exponent(scope, key, exponent)?;
                Ok(Field::Decimal(DecimalValue::new(mantissa, exponent)))
            }
        }
    };

    match spec.op {
        Operator::None => {
            let pair = read_wire(offset)?;
            to_field(scope, pair)
        }
        Operator::Constant => {
            let (mantissa, exponent) = initial_decimal(spec)
                .ok_or_else(|| invalid_operator(key, "constant operator requires an initial value"))?;
            if optional && !pmap.next_bit() {
                Ok(Field::Null(FieldKind::Decimal))
            } else {
                Ok(Field::Decimal(DecimalValue::new(mantissa, exponent)))
            }
        }
        Operator::Default => {
            if pmap.next_bit() {
                let pair = read_wire(offset)?;
                to_field(scope, pair)
            } else {
                match initial_decimal(spec) {
                    Some((m, e)) => Ok(Field::Decimal(DecimalValue::new(m, e))),
                    None if optional => Ok(Field::Null(FieldKind::Decimal)),
                    None => Err(scope.null_mandatory(key)),
                }
            }
        }
        Operator::Copy => {
            if pmap.next_bit() {
                let pair = read_wire(offset)?;
                dict.stage(
                    scope.dict_scope,
                    key,
                    pair.map_or(DictionaryValue::Empty, |(m, e)| DictionaryValue::Decimal {
                        mantissa: m,
                        exponent: e as i32,
                    }),
                );
                to_field(scope, pair)
            } else {
                match dict.get(scope.dict_scope, key) {
                    Some(DictionaryValue::Decimal { mantissa, exponent }) => {
                        Ok(Field::Decimal(DecimalValue::new(*mantissa, *exponent)))
                    }
                    Some(DictionaryValue::Empty) => {
                        if optional {
                            Ok(Field::Null(FieldKind::Decimal))
                        } else {
                            Err(scope.null_mandatory(key))
                        }
                    }
                    Some(DictionaryValue::Undefined) | None => match initial_decimal(spec) {
                        Some((m, e)) => {
                            dict.stage(
                                scope.dict_scope,
                                key,
                                DictionaryValue::Decimal {
                                    mantissa: m,
                                    exponent: e,
                                },
                            );
                            Ok(Field::Decimal(DecimalValue::new(m, e)))
                        }
                        None if optional => Ok(Field::Null(FieldKind::Decimal)),
                        None => Err(scope.undefined_prior(key)),
                    },
                    Some(_) => Err(invalid_operator(key, "dictionary entry type mismatch")),
                }
            }
        }
        Operator::Increment => Err(invalid_operator(key, "increment operator on a decimal field")),
        Operator::Delta => {
            let exponent_delta = if optional {
                stopbit::decode_nullable_int(data, offset, scope.strict)?
            } else {
                Some(stopbit::decode_int(data, offset, scope.strict)?)
            };
            match exponent_delta {
                None => Ok(Field::Null(FieldKind::Decimal)),
                Some(de) => {
                    let dm = stopbit::decode_int(data, offset, scope.strict)?;
                    let (base_m, base_e) = match dict.get(scope.dict_scope, key) {
                        Some(DictionaryValue::Decimal { mantissa, exponent }) => {
                            (*mantissa, *exponent)
                        }
                        _ => initial_decimal(spec).unwrap_or((0, 0)),
                    };
                    let exponent =
                        check_exponent(scope, key, i64::from(base_e).wrapping_add(de))?;
                    let mantissa = i64::try_from(i128::from(base_m) + i128::from(dm))
                        .map_err(|_| FastError::IntegerOverflow { offset: *offset })?;
                    dict.stage(
                        scope.dict_scope,
                        key,
                        DictionaryValue::Decimal { mantissa, exponent },
                    );
                    Ok(Field::Decimal(DecimalValue::new(mantissa, exponent)))
                }
            }
        }
        Operator::Tail => Err(invalid_operator(key, "tail operator on a decimal field")),
    }
}
