/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Template-driven message decoder.
//!
//! Decodes one message at a time from a framed block: read the presence
//! map, select the template (dynamically via presence-map bit 0, or the
//! previous template id), then walk the template's instructions in order,
//! invoking the field codec per primitive and recursing into groups and
//! sequences. Every decoded field is pushed to the [`MessageBuilder`]
//! synchronously and in template order.
//!
//! Dictionary writes are staged per message and committed only on success;
//! a protocol violation or builder abort discards them, so a failed message
//! never corrupts operator state for subsequent messages.

use crate::dictionary::Dictionary;
use crate::error::FastError;
use crate::operators::{self, Scope};
use crate::pmap::PresenceMap;
use crate::stopbit;
use fastcast_core::MessageBuilder;
use fastcast_templates::{DictionaryScope, Instruction, Template, TemplateRegistry};
use std::sync::Arc;
use tracing::debug;

/// Default ceiling on decoded sequence lengths, a guard against corrupt
/// length fields committing the decoder to absurd repetition counts.
const DEFAULT_SEQUENCE_LIMIT: u64 = 1 << 20;

/// Template-driven FAST decoder.
///
/// Owns one decode context: the operator dictionaries and the current
/// template register. The registry is shared, read-only configuration; one
/// decoder supports one decode in flight at a time.
#[derive(Debug)]
pub struct Decoder {
    registry: Arc<TemplateRegistry>,
    dictionary: Dictionary,
    strict: bool,
    reset_on_each_message: bool,
    sequence_limit: u64,
    template_id: Option<u32>,
}

impl Decoder {
    /// Creates a decoder over a shared template registry.
    ///
    /// Strict conformance checking is enabled by default.
    #[must_use]
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self {
            registry,
            dictionary: Dictionary::new(),
            strict: true,
            reset_on_each_message: false,
            sequence_limit: DEFAULT_SEQUENCE_LIMIT,
            template_id: None,
        }
    }

    /// Enables or disables strict conformance checking.
    ///
    /// Tolerant mode accepts overlong encodings and out-of-range values
    /// with best-effort interpretation.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Clears the dictionaries before every message when enabled.
    #[must_use]
    pub const fn with_reset_on_each_message(mut self, reset: bool) -> Self {
        self.reset_on_each_message = reset;
        self
    }

    /// Overrides the decoded sequence length ceiling.
    #[must_use]
    pub const fn with_sequence_limit(mut self, limit: u64) -> Self {
        self.sequence_limit = limit;
        self
    }

    /// Returns true if strict checking is enabled.
    #[must_use]
    pub const fn strict(&self) -> bool {
        self.strict
    }

    /// Returns the id of the template driving the decoding.
    #[must_use]
    pub const fn template_id(&self) -> Option<u32> {
        self.template_id
    }

    /// Clears dictionaries and the current-template register.
    pub fn reset(&mut self) {
        self.dictionary.reset();
        self.template_id = None;
    }

    /// Decodes one message from the block, reporting to the builder.
    ///
    /// # Arguments
    /// * `data` - The framed block
    /// * `offset` - Current position, advanced past the message
    /// * `builder` - Receives the decoded values
    ///
    /// # Errors
    /// Protocol violations and builder aborts are fatal to this message
    /// only; the dictionaries stay consistent for the next message.
    pub fn decode_message(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        builder: &mut dyn MessageBuilder,
    ) -> Result<(), FastError> {
        if self.reset_on_each_message {
            self.dictionary.reset();
            self.template_id = None;
        }

        let result = self.decode_message_inner(data, offset, builder);
        match &result {
            Ok(()) => self.dictionary.commit(),
            Err(error) => {
                debug!(%error, offset = *offset, "message decode failed");
                self.dictionary.discard();
            }
        }
        result
    }

    /// Decodes messages until the block is exhausted.
    ///
    /// # Arguments
    /// * `data` - The framed block
    /// * `builder` - Receives the decoded values
    /// * `limit` - Maximum number of messages; 0 means unlimited
    ///
    /// # Returns
    /// The number of messages decoded.
    ///
    /// # Errors
    /// Stops at the first failing message.
    pub fn decode_each(
        &mut self,
        data: &[u8],
        builder: &mut dyn MessageBuilder,
        limit: usize,
    ) -> Result<usize, FastError> {
        let mut offset = 0;
        let mut count = 0;
        while offset < data.len() && (limit == 0 || count < limit) {
            self.decode_message(data, &mut offset, builder)?;
            count += 1;
        }
        Ok(count)
    }

    fn decode_message_inner(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        builder: &mut dyn MessageBuilder,
    ) -> Result<(), FastError> {
        let mut pmap = PresenceMap::decode(data, offset)?;

        // Presence-map bit 0 gates a template id on the wire.
        let template_id = if pmap.next_bit() {
            let raw = stopbit::decode_uint(data, offset, self.strict)?;
            u32::try_from(raw).map_err(|_| FastError::ValueOutOfRange {
                field: "templateId".to_string(),
                reason: format!("template id {} does not fit u32", raw),
            })?
        } else {
            self.template_id.ok_or(FastError::NoTemplateId)?
        };

        let template = self
            .registry
            .template(template_id)
            .ok_or(FastError::UnknownTemplate { id: template_id })?;
        self.template_id = Some(template_id);

        builder.start_message(template_id, &template.name);
        self.decode_instructions(
            &template,
            &template.instructions,
            data,
            offset,
            &mut pmap,
            builder,
        )?;
        builder.end_message();
        Ok(())
    }

    fn scope_for(&self, template: &Template) -> Scope {
        Scope {
            template_id: template.id,
            dict_scope: match template.scope {
                DictionaryScope::Global => None,
                DictionaryScope::Template => Some(template.id),
            },
            strict: self.strict,
        }
    }

    fn decode_instructions(
        &mut self,
        template: &Template,
        instructions: &[Instruction],
        data: &[u8],
        offset: &mut usize,
        pmap: &mut PresenceMap,
        builder: &mut dyn MessageBuilder,
    ) -> Result<(), FastError> {
        let scope = self.scope_for(template);

        for instruction in instructions {
            match instruction {
                Instruction::Field(instr) => {
                    let field = operators::decode_field(
                        &scope,
                        instr,
                        data,
                        offset,
                        pmap,
                        &mut self.dictionary,
                    )?;
                    builder.field(&instr.name, field)?;
                }
                Instruction::Group(group) => {
                    let present = !group.presence.is_optional() || pmap.next_bit();
                    if present {
                        let mut sub_pmap = PresenceMap::decode(data, offset)?;
                        builder.start_group(&group.name);
                        self.decode_instructions(
                            template,
                            &group.instructions,
                            data,
                            offset,
                            &mut sub_pmap,
                            builder,
                        )?;
                        builder.end_group();
                    }
                }
                Instruction::Sequence(sequence) => {
                    let length = operators::decode_length(
                        &scope,
                        &sequence.length,
                        data,
                        offset,
                        pmap,
                        &mut self.dictionary,
                    )?;
                    let Some(length) = length else {
                        continue;
                    };
                    if length > self.sequence_limit {
                        return Err(FastError::ValueOutOfRange {
                            field: sequence.length.name.clone(),
                            reason: format!(
                                "sequence length {} exceeds limit {}",
                                length, self.sequence_limit
                            ),
                        });
                    }

                    builder.start_sequence(&sequence.name, length as usize);
                    for _ in 0..length {
                        let mut entry_pmap = PresenceMap::decode(data, offset)?;
                        builder.start_sequence_entry();
                        self.decode_instructions(
                            template,
                            &sequence.instructions,
                            data,
                            offset,
                            &mut entry_pmap,
                            builder,
                        )?;
                        builder.end_sequence_entry();
                    }
                    builder.end_sequence();
                }
                Instruction::TemplateRef { id } => {
                    let referenced = self
                        .registry
                        .template(*id)
                        .ok_or(FastError::UnknownTemplate { id: *id })?;
                    // Static reference: the referenced instructions decode
                    // inline, sharing the enclosing presence map.
                    self.decode_instructions(
                        &referenced,
                        &referenced.instructions,
                        data,
                        offset,
                        pmap,
                        builder,
                    )?;
                }
            }
        }
        Ok(())
    }
}
