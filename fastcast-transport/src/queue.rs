/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Queue services bridging buffer delivery into decode passes.
//!
//! Receivers deliver raw buffers from I/O threads; a queue service drains
//! them on the decode thread, applies the configured header analyzers, and
//! drives the template decoder. Two framing disciplines are supported:
//!
//! - [`PacketDecodeService`]: packet-aligned — every delivered buffer holds
//!   one or more whole messages (datagram transports). At most one decode
//!   pass runs per buffer.
//! - [`StreamDecodeService`]: streaming — messages may span buffer
//!   boundaries; the message header analyzer suspends and resumes across
//!   deliveries.
//!
//! The channel hand-off is the only synchronization boundary: ownership of
//! a delivered buffer passes to the decode path for the duration of one
//! decode pass. A stop request is advisory; an in-flight pass completes and
//! the builder then receives `decoding_stopped`.

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use fastcast_codec::header::{Analysis, HeaderAnalyzer};
use fastcast_codec::{Decoder, FastError};
use fastcast_core::{BufferSource, ChunkedSource, MessageBuilder};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a service behaves when the queue runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Wait on the channel until a buffer arrives (or the sender drops).
    Block,
    /// Return control to the caller immediately.
    NonBlock,
}

/// Outcome of one service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    /// A buffer (packet mode) or block (stream mode) was decoded.
    Processed,
    /// Nothing to do yet; call again after the next delivery.
    NoData,
    /// A stop request was honored; the builder has been notified.
    Stopped,
    /// Every sender dropped and all delivered data is consumed; the
    /// builder has been notified.
    Finished,
}

#[derive(Debug, Default)]
struct ControlState {
    stop_requested: bool,
    paused: bool,
}

/// Shared control handle for a queue service.
///
/// Stop is advisory and asynchronous: the decode pass already running
/// completes, and completed messages may still reach the builder after the
/// request. Pause only affects future buffer consumption, never in-flight
/// decode state.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    state: Arc<Mutex<ControlState>>,
}

impl ControlHandle {
    /// Creates a new control handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an asynchronous stop.
    pub fn request_stop(&self) {
        self.state.lock().stop_requested = true;
    }

    /// Returns true once a stop has been requested.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.state.lock().stop_requested
    }

    /// Suspends consumption of future deliveries.
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    /// Resumes consumption.
    pub fn resume(&self) {
        self.state.lock().paused = false;
    }

    /// Returns true while paused.
    #[must_use]
    pub fn paused(&self) -> bool {
        self.state.lock().paused
    }
}

/// Creates an unbounded buffer queue for receiver-to-decoder hand-off.
#[must_use]
pub fn buffer_queue() -> (Sender<Bytes>, Receiver<Bytes>) {
    unbounded()
}

/// Packet-aligned decode service.
///
/// Every delivered buffer carries whole messages: an optional packet
/// header first, then per message an optional message header and the FAST
/// payload. Truncated framing inside a buffer drops the remainder of that
/// buffer (with a warning) rather than suspending; packet transports do
/// not split messages.
pub struct PacketDecodeService {
    decoder: Decoder,
    packet_header: Box<dyn HeaderAnalyzer + Send>,
    message_header: Box<dyn HeaderAnalyzer + Send>,
    queue: Receiver<Bytes>,
    control: ControlHandle,
    message_limit: usize,
    message_count: usize,
    byte_count: usize,
}

impl PacketDecodeService {
    /// Creates a packet-aligned service.
    ///
    /// # Arguments
    /// * `decoder` - The template-driven decoder
    /// * `packet_header` - Analyzer for the per-packet header
    /// * `message_header` - Analyzer for the per-message header
    /// * `queue` - Buffer delivery channel
    #[must_use]
    pub fn new(
        decoder: Decoder,
        packet_header: Box<dyn HeaderAnalyzer + Send>,
        message_header: Box<dyn HeaderAnalyzer + Send>,
        queue: Receiver<Bytes>,
    ) -> Self {
        Self {
            decoder,
            packet_header,
            message_header,
            queue,
            control: ControlHandle::new(),
            message_limit: 0,
            message_count: 0,
            byte_count: 0,
        }
    }

    /// Sets the maximum number of messages to decode (0 means unlimited).
    #[must_use]
    pub const fn with_message_limit(mut self, limit: usize) -> Self {
        self.message_limit = limit;
        self
    }

    /// Returns the control handle for stop/pause requests.
    #[must_use]
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Returns how many messages have been decoded.
    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.message_count
    }

    /// Returns how many bytes have been delivered.
    #[must_use]
    pub const fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Access the internal decoder.
    #[must_use]
    pub const fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    fn limit_reached(&self) -> bool {
        self.message_limit != 0 && self.message_count >= self.message_limit
    }

    /// Services at most one queued buffer.
    ///
    /// # Errors
    /// Protocol violations inside a message propagate; the rest of that
    /// buffer is abandoned but the service remains usable.
    pub fn service_queue(
        &mut self,
        builder: &mut dyn MessageBuilder,
        policy: WaitPolicy,
    ) -> Result<ServiceOutcome, FastError> {
        if self.control.stop_requested() || self.limit_reached() {
            builder.decoding_stopped();
            return Ok(ServiceOutcome::Stopped);
        }
        if self.control.paused() {
            return Ok(ServiceOutcome::NoData);
        }

        let buffer = match policy {
            WaitPolicy::Block => match self.queue.recv() {
                Ok(buffer) => buffer,
                Err(_) => {
                    builder.decoding_stopped();
                    return Ok(ServiceOutcome::Finished);
                }
            },
            WaitPolicy::NonBlock => match self.queue.try_recv() {
                Ok(buffer) => buffer,
                Err(TryRecvError::Empty) => return Ok(ServiceOutcome::NoData),
                Err(TryRecvError::Disconnected) => {
                    builder.decoding_stopped();
                    return Ok(ServiceOutcome::Finished);
                }
            },
        };

        self.consume_buffer(buffer, builder)?;
        Ok(ServiceOutcome::Processed)
    }

    /// Runs until the senders drop, a stop is requested, or the message
    /// limit is reached.
    ///
    /// # Errors
    /// Stops at the first protocol violation.
    pub fn run(&mut self, builder: &mut dyn MessageBuilder) -> Result<(), FastError> {
        loop {
            match self.service_queue(builder, WaitPolicy::Block)? {
                ServiceOutcome::Processed | ServiceOutcome::NoData => {}
                ServiceOutcome::Stopped | ServiceOutcome::Finished => return Ok(()),
            }
        }
    }

    fn consume_buffer(
        &mut self,
        buffer: Bytes,
        builder: &mut dyn MessageBuilder,
    ) -> Result<(), FastError> {
        self.byte_count += buffer.len();
        let mut source = BufferSource::new(buffer);

        match self.packet_header.analyze(&mut source)? {
            Analysis::NeedData => {
                warn!("truncated packet header; dropping buffer");
                return Ok(());
            }
            Analysis::Header { skip: true, .. } => {
                debug!("skipping packet payload");
                return Ok(());
            }
            Analysis::Header { skip: false, .. } => {}
        }

        while source.remaining() > 0 && !self.limit_reached() {
            let (block_size, skip) = match self.message_header.analyze(&mut source)? {
                Analysis::NeedData => {
                    warn!("truncated message header; dropping rest of buffer");
                    return Ok(());
                }
                Analysis::Header { block_size, skip } => (block_size, skip),
            };

            let take = if block_size == 0 {
                source.remaining()
            } else {
                block_size
            };
            let Some(block) = source.take(take) else {
                warn!(
                    declared = block_size,
                    available = source.remaining(),
                    "message block overruns packet; dropping rest of buffer"
                );
                return Ok(());
            };
            if skip {
                continue;
            }

            let allowed = if self.message_limit == 0 {
                0
            } else {
                self.message_limit - self.message_count
            };
            self.message_count += self.decoder.decode_each(&block, builder, allowed)?;
        }
        Ok(())
    }
}

/// Streaming decode service.
///
/// Messages may span buffer boundaries. The message header analyzer runs
/// incrementally over accumulated deliveries, suspending on exhaustion and
/// resuming after the next delivery; a recognized block is decoded once its
/// payload has fully arrived. Requires a header scheme that declares block
/// sizes.
pub struct StreamDecodeService {
    decoder: Decoder,
    message_header: Box<dyn HeaderAnalyzer + Send>,
    queue: Receiver<Bytes>,
    control: ControlHandle,
    source: ChunkedSource,
    pending_block: Option<(usize, bool)>,
    disconnected: bool,
    message_limit: usize,
    message_count: usize,
    byte_count: usize,
}

impl StreamDecodeService {
    /// Creates a streaming service.
    ///
    /// # Arguments
    /// * `decoder` - The template-driven decoder
    /// * `message_header` - Analyzer for the per-message header; must
    ///   declare block sizes
    /// * `queue` - Buffer delivery channel
    #[must_use]
    pub fn new(
        decoder: Decoder,
        message_header: Box<dyn HeaderAnalyzer + Send>,
        queue: Receiver<Bytes>,
    ) -> Self {
        Self {
            decoder,
            message_header,
            queue,
            control: ControlHandle::new(),
            source: ChunkedSource::new(),
            pending_block: None,
            disconnected: false,
            message_limit: 0,
            message_count: 0,
            byte_count: 0,
        }
    }

    /// Sets the maximum number of messages to decode (0 means unlimited).
    #[must_use]
    pub const fn with_message_limit(mut self, limit: usize) -> Self {
        self.message_limit = limit;
        self
    }

    /// Returns the control handle for stop/pause requests.
    #[must_use]
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Returns how many messages have been decoded.
    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.message_count
    }

    /// Returns how many bytes have been delivered.
    #[must_use]
    pub const fn byte_count(&self) -> usize {
        self.byte_count
    }

    fn limit_reached(&self) -> bool {
        self.message_limit != 0 && self.message_count >= self.message_limit
    }

    /// Pulls one delivery into the accumulation; returns false when none
    /// is available under the given policy.
    fn fill(&mut self, policy: WaitPolicy) -> bool {
        match policy {
            WaitPolicy::Block => match self.queue.recv() {
                Ok(buffer) => {
                    self.byte_count += buffer.len();
                    self.source.push(buffer);
                    true
                }
                Err(_) => {
                    self.disconnected = true;
                    self.source.finish();
                    false
                }
            },
            WaitPolicy::NonBlock => match self.queue.try_recv() {
                Ok(buffer) => {
                    self.byte_count += buffer.len();
                    self.source.push(buffer);
                    true
                }
                Err(TryRecvError::Empty) => false,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    self.source.finish();
                    false
                }
            },
        }
    }

    fn starved(&mut self, builder: &mut dyn MessageBuilder) -> ServiceOutcome {
        if self.disconnected && self.source.remaining() == 0 && self.pending_block.is_none() {
            builder.decoding_stopped();
            ServiceOutcome::Finished
        } else if self.disconnected {
            // Data left but not enough to finish a block: the stream was
            // cut mid-message.
            warn!(
                remaining = self.source.remaining(),
                "stream ended mid-block; dropping tail"
            );
            builder.decoding_stopped();
            ServiceOutcome::Finished
        } else {
            ServiceOutcome::NoData
        }
    }

    /// Advances the stream by at most one decoded block.
    ///
    /// Under [`WaitPolicy::Block`] the call waits on the channel for
    /// missing data; under [`WaitPolicy::NonBlock`] it suspends and
    /// returns [`ServiceOutcome::NoData`] instead.
    ///
    /// # Errors
    /// Protocol violations inside a block propagate; framing state remains
    /// consistent so the next block can still be decoded.
    pub fn poll(
        &mut self,
        builder: &mut dyn MessageBuilder,
        policy: WaitPolicy,
    ) -> Result<ServiceOutcome, FastError> {
        if self.control.stop_requested() || self.limit_reached() {
            builder.decoding_stopped();
            return Ok(ServiceOutcome::Stopped);
        }
        if self.control.paused() {
            return Ok(ServiceOutcome::NoData);
        }

        loop {
            if self.pending_block.is_none() {
                match self.message_header.analyze(&mut self.source)? {
                    Analysis::NeedData => {
                        if self.fill(policy) {
                            continue;
                        }
                        return Ok(self.starved(builder));
                    }
                    Analysis::Header { block_size, skip } => {
                        self.pending_block = Some((block_size, skip));
                    }
                }
            }

            let (block_size, skip) = self.pending_block.unwrap_or_default();
            if block_size == 0 {
                // Without a declared size there is no way to know where a
                // spanning message ends.
                return Err(FastError::ValueOutOfRange {
                    field: "blockSize".to_string(),
                    reason: "streaming framing requires a header that declares block sizes"
                        .to_string(),
                });
            }
            while self.source.remaining() < block_size {
                if !self.fill(policy) {
                    return Ok(self.starved(builder));
                }
            }

            let Some(block) = self.source.take(block_size) else {
                return Ok(self.starved(builder));
            };
            self.pending_block = None;

            if skip {
                debug!(block_size, "skipping block payload");
                continue;
            }

            let allowed = if self.message_limit == 0 {
                0
            } else {
                self.message_limit - self.message_count
            };
            self.message_count += self.decoder.decode_each(&block, builder, allowed)?;
            return Ok(ServiceOutcome::Processed);
        }
    }

    /// Runs until the senders drop, a stop is requested, or the message
    /// limit is reached.
    ///
    /// # Errors
    /// Stops at the first protocol violation.
    pub fn run(&mut self, builder: &mut dyn MessageBuilder) -> Result<(), FastError> {
        loop {
            match self.poll(builder, WaitPolicy::Block)? {
                ServiceOutcome::Processed | ServiceOutcome::NoData => {}
                ServiceOutcome::Stopped | ServiceOutcome::Finished => return Ok(()),
            }
        }
    }
}
