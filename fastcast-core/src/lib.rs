/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fastcast Core
//!
//! Core types, traits, and error definitions for the fastcast FAST decoder.
//!
//! This crate provides the building blocks used across all fastcast crates:
//! - **Error types**: layered error handling with `thiserror`
//! - **Value model**: the tagged [`Field`] union, [`DecimalValue`], and
//!   nullable access contracts
//! - **Field sets**: ordered [`FieldSet`], [`Sequence`], and [`Message`]
//! - **Builder**: the [`MessageBuilder`] output channel and the generic
//!   [`MessageCollector`]
//! - **Byte source**: the [`ByteSource`] transport abstraction with
//!   suspension-aware [`Fetch`] results
//!
//! ## Ownership
//!
//! Decoded values are immutable once built and shared by reference counting;
//! group and sequence fields recursively own child field sets whose lifetime
//! is determined by the longest holder (builder or decoder dictionary).

pub mod builder;
pub mod error;
pub mod field_set;
pub mod source;
pub mod value;

pub use builder::{MessageBuilder, MessageCollector};
pub use error::{BuildError, FieldError, Result, SourceError, WireError};
pub use field_set::{FieldSet, Message, Sequence};
pub use source::{BufferSource, ByteSource, ChunkedSource, Fetch};
pub use value::{DecimalValue, Field, FieldKind};
