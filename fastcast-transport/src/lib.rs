/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fastcast Transport
//!
//! Framing services for the fastcast FAST decoder.
//!
//! The decoder core consumes framed blocks; this crate bridges raw buffer
//! delivery into decode passes. It provides the packet-aligned and
//! streaming queue services (with blocking and non-blocking wait policies)
//! and a Tokio codec for length-framed async streams.

pub mod codec;
pub mod queue;

pub use codec::{BlockCodec, CodecError};
pub use queue::{
    ControlHandle, PacketDecodeService, ServiceOutcome, StreamDecodeService, WaitPolicy,
    buffer_queue,
};
