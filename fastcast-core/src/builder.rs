/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message builder interface.
//!
//! The decoder's sole output channel. Every decoded field is reported
//! synchronously and in template order between a start/end message bracket;
//! groups and sequences are reported as nested brackets. The builder owns
//! assembly of whatever representation it wants; [`MessageCollector`] is the
//! generic implementation that assembles [`Message`] values.

use crate::error::BuildError;
use crate::field_set::{FieldSet, Message, Sequence};
use crate::value::Field;
use std::sync::Arc;

/// Receives decoded values from the template-driven decoder.
///
/// Calls arrive in strict template order. `field` may abort the decode of
/// the current message by returning an error; the decoder propagates the
/// abort without corrupting operator state for subsequent messages.
pub trait MessageBuilder {
    /// Opens a message decoded with the given template.
    fn start_message(&mut self, template_id: u32, name: &str);

    /// Reports one decoded field.
    ///
    /// # Errors
    /// Returns `BuildError` to abort decoding of the current message.
    fn field(&mut self, name: &str, field: Field) -> Result<(), BuildError>;

    /// Opens a nested group scope.
    fn start_group(&mut self, name: &str);

    /// Closes the innermost group scope.
    fn end_group(&mut self);

    /// Opens a sequence scope with the decoded repetition count.
    fn start_sequence(&mut self, name: &str, length: usize);

    /// Opens one sequence entry.
    fn start_sequence_entry(&mut self);

    /// Closes the current sequence entry.
    fn end_sequence_entry(&mut self);

    /// Closes the innermost sequence scope.
    fn end_sequence(&mut self);

    /// Closes the current message.
    fn end_message(&mut self);

    /// Notifies the builder that the stream has halted.
    ///
    /// Messages already decoded when a stop was requested may still have
    /// arrived before this call.
    fn decoding_stopped(&mut self);
}

enum Frame {
    Message(FieldSet),
    Group { name: String, set: FieldSet },
    Sequence { name: String, seq: Sequence },
    Entry(FieldSet),
}

/// Generic builder assembling decoded messages into [`Message`] values.
///
/// Groups and sequence entries are wrapped into [`Field::Group`] and
/// [`Field::Sequence`] values on their closing bracket, so the finished
/// message mirrors the template's nesting.
#[derive(Default)]
pub struct MessageCollector {
    messages: Vec<Message>,
    stack: Vec<Frame>,
    stopped: bool,
}

impl MessageCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages collected so far.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consumes the collector, returning the collected messages.
    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Returns true if `decoding_stopped` has been received.
    #[must_use]
    pub const fn stopped(&self) -> bool {
        self.stopped
    }

    fn top_set(&mut self) -> Option<&mut FieldSet> {
        match self.stack.last_mut() {
            Some(Frame::Message(set) | Frame::Group { set, .. } | Frame::Entry(set)) => Some(set),
            _ => None,
        }
    }
}

impl MessageBuilder for MessageCollector {
    fn start_message(&mut self, template_id: u32, _name: &str) {
        self.stack.clear();
        self.stack
            .push(Frame::Message(FieldSet::with_template_id(template_id)));
    }

    fn field(&mut self, name: &str, field: Field) -> Result<(), BuildError> {
        match self.top_set() {
            Some(set) => {
                set.push(name, field);
                Ok(())
            }
            None => Err(BuildError::new("field reported outside a message")),
        }
    }

    fn start_group(&mut self, name: &str) {
        self.stack.push(Frame::Group {
            name: name.to_string(),
            set: FieldSet::new(),
        });
    }

    fn end_group(&mut self) {
        if let Some(Frame::Group { name, set }) = self.stack.pop() {
            if let Some(parent) = self.top_set() {
                parent.push(name, Field::Group(Arc::new(set)));
            }
        }
    }

    fn start_sequence(&mut self, name: &str, length: usize) {
        self.stack.push(Frame::Sequence {
            name: name.to_string(),
            seq: Sequence::with_capacity(length),
        });
    }

    fn start_sequence_entry(&mut self) {
        self.stack.push(Frame::Entry(FieldSet::new()));
    }

    fn end_sequence_entry(&mut self) {
        if let Some(Frame::Entry(set)) = self.stack.pop() {
            if let Some(Frame::Sequence { seq, .. }) = self.stack.last_mut() {
                seq.push(Arc::new(set));
            }
        }
    }

    fn end_sequence(&mut self) {
        if let Some(Frame::Sequence { name, seq }) = self.stack.pop() {
            if let Some(parent) = self.top_set() {
                parent.push(name, Field::Sequence(seq));
            }
        }
    }

    fn end_message(&mut self) {
        if let Some(Frame::Message(set)) = self.stack.pop() {
            self.messages.push(set);
        }
    }

    fn decoding_stopped(&mut self) {
        self.stopped = true;
    }
}
