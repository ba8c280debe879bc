/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fastcast Templates
//!
//! Template schema and registry for the fastcast FAST decoder.
//!
//! A template is an ordered list of field instructions (type, operator,
//! optional initial value, presence) identified by a template id. Templates
//! may nest groups and sequences and may reference other templates,
//! including recursively. XML template-file parsing lives outside this
//! workspace; this crate consumes already-resolved definitions.

pub mod registry;
pub mod schema;

pub use registry::{RegistryError, TemplateRegistry};
pub use schema::{
    DictionaryScope, FieldInstruction, GroupInstruction, InitialValue, Instruction, Operator,
    OperatorSpec, Presence, PrimitiveType, SequenceInstruction, Template,
};
