/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fastcast
//!
//! A FAST (FIX Adapted for STreaming) market-data decoder for Rust.
//!
//! fastcast turns a raw byte stream — from TCP, multicast, or file — into
//! typed, template-described messages. Framing recovers block boundaries
//! through configurable (possibly absent) header schemes; field-level
//! decoding interprets FAST's presence-map-driven, stop-bit-terminated
//! encoding of integers, decimals, strings, and nested groups, driven by
//! an externally supplied template registry.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fastcast::prelude::*;
//!
//! let mut registry = TemplateRegistry::new();
//! registry.register(my_template)?;
//!
//! let mut decoder = Decoder::new(registry.into_shared());
//! let mut collector = MessageCollector::new();
//! decoder.decode_each(&block, &mut collector, 0)?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: value model, field sets, builder trait, byte sources, errors
//! - [`templates`]: template schema and the shared registry
//! - [`codec`]: stop-bit primitives, presence maps, operators, header
//!   analyzers, and the template-driven decoder
//! - [`transport`]: queue services and the Tokio block-framing codec

pub mod core {
    //! Value model, field sets, builder trait, byte sources, errors.
    pub use fastcast_core::*;
}

pub mod templates {
    //! Template schema and the shared registry.
    pub use fastcast_templates::*;
}

pub mod codec {
    //! Wire-format decoding: primitives, operators, framing, decoder.
    pub use fastcast_codec::*;
}

pub mod transport {
    //! Queue services and the Tokio block-framing codec.
    pub use fastcast_transport::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use fastcast_core::{
        BufferSource, BuildError, ByteSource, ChunkedSource, DecimalValue, Fetch, Field,
        FieldError, FieldKind, FieldSet, Message, MessageBuilder, MessageCollector, Result,
        Sequence, SourceError, WireError,
    };

    // Templates
    pub use fastcast_templates::{
        DictionaryScope, FieldInstruction, GroupInstruction, InitialValue, Instruction, Operator,
        OperatorSpec, Presence, PrimitiveType, SequenceInstruction, Template, TemplateRegistry,
    };

    // Codec
    pub use fastcast_codec::{
        Analysis, Decoder, Encoder, FastError, FastHeader, FixedSizeHeader, HeaderAnalyzer,
        HeaderConfig, NoHeader, PresenceMap,
    };

    // Transport
    pub use fastcast_transport::{
        BlockCodec, ControlHandle, PacketDecodeService, ServiceOutcome, StreamDecodeService,
        WaitPolicy, buffer_queue,
    };
}
