/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Block header analyzers.
//!
//! A header analyzer recovers block boundaries from an undifferentiated
//! byte stream. It is constructed once per stream, reused across every
//! framed block, and driven by exactly one thread at a time. Running out of
//! bytes is never an error: the analyzer suspends, preserving its state at
//! byte granularity, and resumes when the caller re-invokes it with more
//! data available. Partial multi-byte fields resume mid-field.
//!
//! Three schemes are provided:
//! - [`NoHeader`]: no framing; the block runs to the end of the buffer
//! - [`FixedSizeHeader`]: fixed prefix / size-field / suffix byte counts
//! - [`FastHeader`]: header fields are FAST stop-bit entities

use fastcast_core::{ByteSource, Fetch, SourceError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of one analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    /// A complete header was recognized.
    Header {
        /// Payload size declared by the header; 0 means "no explicit
        /// framing; decode to the end of the buffer".
        block_size: usize,
        /// Discard this block's payload without decoding it.
        skip: bool,
    },
    /// The source ran out mid-header; call again once more data arrives.
    NeedData,
}

/// Recognizes an optional header framing a block.
pub trait HeaderAnalyzer {
    /// Consumes header bytes from the source.
    ///
    /// # Errors
    /// Returns `SourceError` only for transport failures; exhaustion is
    /// reported as [`Analysis::NeedData`].
    fn analyze(&mut self, source: &mut dyn ByteSource) -> Result<Analysis, SourceError>;
}

/// Configuration for a fixed-size block header.
///
/// The same shape serves packet-level and message-level headers, applied
/// independently by the framing services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Opaque bytes before the size field.
    pub prefix_bytes: usize,
    /// Bytes of the unsigned block-size field; 0 is legal and yields
    /// block size 0.
    pub size_bytes: usize,
    /// Opaque bytes after the size field.
    pub suffix_bytes: usize,
    /// Interpret the size field as big-endian.
    pub big_endian: bool,
    /// Report `skip = true` on every Nth header; 0 disables skipping.
    pub skip_cadence: u64,
}

impl HeaderConfig {
    /// Creates a header configuration with the given size field.
    ///
    /// # Arguments
    /// * `size_bytes` - Bytes of the block-size field
    /// * `big_endian` - Interpret the size field as big-endian
    #[must_use]
    pub const fn new(size_bytes: usize, big_endian: bool) -> Self {
        Self {
            prefix_bytes: 0,
            size_bytes,
            suffix_bytes: 0,
            big_endian,
            skip_cadence: 0,
        }
    }

    /// Sets the prefix byte count.
    #[must_use]
    pub const fn with_prefix(mut self, prefix_bytes: usize) -> Self {
        self.prefix_bytes = prefix_bytes;
        self
    }

    /// Sets the suffix byte count.
    #[must_use]
    pub const fn with_suffix(mut self, suffix_bytes: usize) -> Self {
        self.suffix_bytes = suffix_bytes;
        self
    }

    /// Sets the test-skip cadence (a diagnostic hook, not a protocol
    /// feature).
    #[must_use]
    pub const fn with_skip_cadence(mut self, cadence: u64) -> Self {
        self.skip_cadence = cadence;
        self
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self::new(0, true)
    }
}

/// Analyzer for streams without block headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHeader;

impl HeaderAnalyzer for NoHeader {
    fn analyze(&mut self, _source: &mut dyn ByteSource) -> Result<Analysis, SourceError> {
        Ok(Analysis::Header {
            block_size: 0,
            skip: false,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Prefix,
    BlockSize,
    Suffix,
    Complete,
}

/// Analyzer for fixed-size block headers.
///
/// An explicit finite-state machine over
/// `Idle -> Prefix -> BlockSize -> Suffix -> Complete -> Idle`. One call
/// processes as far as the available data allows, then suspends; no byte
/// already consumed is ever re-read.
#[derive(Debug)]
pub struct FixedSizeHeader {
    config: HeaderConfig,
    /// Whether accumulation order differs from the wire order. The swap
    /// decision is relative to the native platform order, so the same code
    /// is portable.
    swap_needed: bool,
    state: State,
    byte_count: usize,
    block_size: usize,
    headers_parsed: u64,
}

impl FixedSizeHeader {
    /// Creates an analyzer for the given header configuration.
    #[must_use]
    pub fn new(config: HeaderConfig) -> Self {
        let swap_needed = if cfg!(target_endian = "big") {
            !config.big_endian
        } else {
            config.big_endian
        };
        Self {
            config,
            swap_needed,
            state: State::Idle,
            byte_count: 0,
            block_size: 0,
            headers_parsed: 0,
        }
    }

    /// Returns the number of headers completed so far.
    #[must_use]
    pub const fn headers_parsed(&self) -> u64 {
        self.headers_parsed
    }
}

impl HeaderAnalyzer for FixedSizeHeader {
    fn analyze(&mut self, source: &mut dyn ByteSource) -> Result<Analysis, SourceError> {
        loop {
            match self.state {
                State::Idle => {
                    self.state = State::Prefix;
                    self.byte_count = 0;
                }
                State::Prefix => {
                    while self.byte_count < self.config.prefix_bytes {
                        match source.next_byte()? {
                            Fetch::Ready(_) => self.byte_count += 1,
                            Fetch::Pending | Fetch::End => return Ok(Analysis::NeedData),
                        }
                    }
                    self.state = State::BlockSize;
                    self.byte_count = 0;
                    self.block_size = 0;
                }
                State::BlockSize => {
                    while self.byte_count < self.config.size_bytes {
                        match source.next_byte()? {
                            Fetch::Ready(byte) => {
                                if self.swap_needed {
                                    self.block_size |= usize::from(byte) << (self.byte_count * 8);
                                } else {
                                    self.block_size = (self.block_size << 8) | usize::from(byte);
                                }
                                self.byte_count += 1;
                            }
                            Fetch::Pending | Fetch::End => return Ok(Analysis::NeedData),
                        }
                    }
                    self.state = State::Suffix;
                    self.byte_count = 0;
                }
                State::Suffix => {
                    while self.byte_count < self.config.suffix_bytes {
                        match source.next_byte()? {
                            Fetch::Ready(_) => self.byte_count += 1,
                            Fetch::Pending | Fetch::End => return Ok(Analysis::NeedData),
                        }
                    }
                    self.state = State::Complete;
                }
                State::Complete => {
                    let block_size = self.block_size;
                    self.state = State::Idle;
                    self.headers_parsed += 1;

                    let skip = self.config.skip_cadence != 0
                        && self.headers_parsed % self.config.skip_cadence == 0;
                    if skip {
                        debug!(header = self.headers_parsed, "skipping block header");
                    }
                    return Ok(Analysis::Header { block_size, skip });
                }
            }
        }
    }
}

/// Analyzer for FAST-encoded block headers.
///
/// Header fields are stop-bit entities rather than fixed byte counts:
/// `prefix_fields` entities are discarded, an optional stop-bit unsigned
/// block size follows, then `suffix_fields` discarded entities. Suspension
/// resumes mid-entity with the partial accumulation preserved.
#[derive(Debug)]
pub struct FastHeader {
    prefix_fields: usize,
    has_block_size: bool,
    suffix_fields: usize,
    skip_cadence: u64,
    state: State,
    fields_done: usize,
    accumulator: u64,
    block_size: usize,
    headers_parsed: u64,
}

impl FastHeader {
    /// Creates an analyzer for a FAST-encoded header layout.
    ///
    /// # Arguments
    /// * `prefix_fields` - Stop-bit entities before the size field
    /// * `has_block_size` - Whether a stop-bit block size is present
    /// * `suffix_fields` - Stop-bit entities after the size field
    #[must_use]
    pub const fn new(prefix_fields: usize, has_block_size: bool, suffix_fields: usize) -> Self {
        Self {
            prefix_fields,
            has_block_size,
            suffix_fields,
            skip_cadence: 0,
            state: State::Idle,
            fields_done: 0,
            accumulator: 0,
            block_size: 0,
            headers_parsed: 0,
        }
    }

    /// Sets the test-skip cadence.
    #[must_use]
    pub const fn with_skip_cadence(mut self, cadence: u64) -> Self {
        self.skip_cadence = cadence;
        self
    }

    /// Discards whole stop-bit entities, counting completions in
    /// `fields_done`.
    fn skip_entities(
        &mut self,
        source: &mut dyn ByteSource,
        target: usize,
    ) -> Result<bool, SourceError> {
        while self.fields_done < target {
            match source.next_byte()? {
                Fetch::Ready(byte) => {
                    if byte & 0x80 != 0 {
                        self.fields_done += 1;
                    }
                }
                Fetch::Pending | Fetch::End => return Ok(false),
            }
        }
        Ok(true)
    }
}

impl HeaderAnalyzer for FastHeader {
    fn analyze(&mut self, source: &mut dyn ByteSource) -> Result<Analysis, SourceError> {
        loop {
            match self.state {
                State::Idle => {
                    self.state = State::Prefix;
                    self.fields_done = 0;
                }
                State::Prefix => {
                    if !self.skip_entities(source, self.prefix_fields)? {
                        return Ok(Analysis::NeedData);
                    }
                    self.state = State::BlockSize;
                    self.accumulator = 0;
                }
                State::BlockSize => {
                    if self.has_block_size {
                        loop {
                            match source.next_byte()? {
                                Fetch::Ready(byte) => {
                                    self.accumulator =
                                        (self.accumulator << 7) | u64::from(byte & 0x7F);
                                    if byte & 0x80 != 0 {
                                        break;
                                    }
                                }
                                Fetch::Pending | Fetch::End => return Ok(Analysis::NeedData),
                            }
                        }
                        self.block_size = self.accumulator as usize;
                    } else {
                        self.block_size = 0;
                    }
                    self.state = State::Suffix;
                    self.fields_done = 0;
                }
                State::Suffix => {
                    if !self.skip_entities(source, self.suffix_fields)? {
                        return Ok(Analysis::NeedData);
                    }
                    self.state = State::Complete;
                }
                State::Complete => {
                    let block_size = self.block_size;
                    self.state = State::Idle;
                    self.headers_parsed += 1;

                    let skip =
                        self.skip_cadence != 0 && self.headers_parsed % self.skip_cadence == 0;
                    if skip {
                        debug!(header = self.headers_parsed, "skipping block header");
                    }
                    return Ok(Analysis::Header { block_size, skip });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastcast_core::{BufferSource, ChunkedSource};

    fn header_bytes(config: &HeaderConfig, block_size: usize) -> Vec<u8> {
        let mut bytes = vec![0xAA; config.prefix_bytes];
        for index in 0..config.size_bytes {
            let shift = if config.big_endian {
                (config.size_bytes - 1 - index) * 8
            } else {
                index * 8
            };
            bytes.push(((block_size >> shift) & 0xFF) as u8);
        }
        bytes.extend(std::iter::repeat_n(0xBB, config.suffix_bytes));
        bytes
    }

    #[test]
    fn test_no_header() {
        let mut analyzer = NoHeader;
        let mut source = BufferSource::new(vec![1u8, 2, 3]);
        assert_eq!(
            analyzer.analyze(&mut source).unwrap(),
            Analysis::Header {
                block_size: 0,
                skip: false
            }
        );
        // No bytes consumed.
        assert_eq!(source.offset(), 0);
    }

    #[test]
    fn test_fixed_size_all_layouts() {
        for prefix in [0usize, 1, 3] {
            for size in [0usize, 1, 2, 4] {
                for suffix in [0usize, 2] {
                    for big_endian in [false, true] {
                        let config = HeaderConfig::new(size, big_endian)
                            .with_prefix(prefix)
                            .with_suffix(suffix);
                        let block_size = if size == 0 { 0 } else { 0x01_02 % (1 << (8 * size)) };
                        let bytes = header_bytes(&config, block_size);

                        let mut analyzer = FixedSizeHeader::new(config);
                        let mut source = BufferSource::new(bytes);
                        assert_eq!(
                            analyzer.analyze(&mut source).unwrap(),
                            Analysis::Header {
                                block_size,
                                skip: false
                            },
                            "prefix={} size={} suffix={} be={}",
                            prefix,
                            size,
                            suffix,
                            big_endian
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_fixed_size_resets_between_blocks() {
        let config = HeaderConfig::new(2, true).with_prefix(1).with_suffix(1);
        let mut bytes = header_bytes(&config, 300);
        bytes.extend(header_bytes(&config, 77));

        let mut analyzer = FixedSizeHeader::new(config);
        let mut source = BufferSource::new(bytes);
        assert_eq!(
            analyzer.analyze(&mut source).unwrap(),
            Analysis::Header {
                block_size: 300,
                skip: false
            }
        );
        assert_eq!(
            analyzer.analyze(&mut source).unwrap(),
            Analysis::Header {
                block_size: 77,
                skip: false
            }
        );
    }

    #[test]
    fn test_byte_by_byte_matches_contiguous() {
        let config = HeaderConfig::new(4, true).with_prefix(2).with_suffix(1);
        let bytes = header_bytes(&config, 0x0102_0304);

        // Contiguous.
        let mut analyzer = FixedSizeHeader::new(config);
        let mut source = BufferSource::new(bytes.clone());
        let contiguous = analyzer.analyze(&mut source).unwrap();

        // One byte per delivery; every other call suspends.
        let mut analyzer = FixedSizeHeader::new(config);
        let mut source = ChunkedSource::new();
        let mut result = analyzer.analyze(&mut source).unwrap();
        for byte in &bytes {
            assert_eq!(result, Analysis::NeedData);
            source.push(vec![*byte]);
            result = analyzer.analyze(&mut source).unwrap();
        }
        assert_eq!(result, contiguous);
        assert_eq!(
            contiguous,
            Analysis::Header {
                block_size: 0x0102_0304,
                skip: false
            }
        );
    }

    #[test]
    fn test_little_endian_accumulation() {
        let config = HeaderConfig::new(2, false);
        let mut analyzer = FixedSizeHeader::new(config);
        // 0x2C 0x01 little-endian = 300.
        let mut source = BufferSource::new(vec![0x2C, 0x01]);
        assert_eq!(
            analyzer.analyze(&mut source).unwrap(),
            Analysis::Header {
                block_size: 300,
                skip: false
            }
        );
    }

    #[test]
    fn test_skip_cadence() {
        // N = 1: every header skips.
        let config = HeaderConfig::new(1, true).with_skip_cadence(1);
        let mut analyzer = FixedSizeHeader::new(config);
        let mut source = BufferSource::new(vec![5u8, 5, 5]);
        for _ in 0..3 {
            let Analysis::Header { skip, .. } = analyzer.analyze(&mut source).unwrap() else {
                panic!("expected a complete header");
            };
            assert!(skip);
        }

        // N = 3: third header skips.
        let config = HeaderConfig::new(1, true).with_skip_cadence(3);
        let mut analyzer = FixedSizeHeader::new(config);
        let mut source = BufferSource::new(vec![5u8; 6]);
        let mut skips = Vec::new();
        for _ in 0..6 {
            let Analysis::Header { skip, .. } = analyzer.analyze(&mut source).unwrap() else {
                panic!("expected a complete header");
            };
            skips.push(skip);
        }
        assert_eq!(skips, vec![false, false, true, false, false, true]);

        // N = 0: never skips.
        let config = HeaderConfig::new(1, true);
        let mut analyzer = FixedSizeHeader::new(config);
        let mut source = BufferSource::new(vec![5u8; 4]);
        for _ in 0..4 {
            let Analysis::Header { skip, .. } = analyzer.analyze(&mut source).unwrap() else {
                panic!("expected a complete header");
            };
            assert!(!skip);
        }
    }

    #[test]
    fn test_zero_size_bytes_yields_zero_block() {
        let config = HeaderConfig::new(0, true).with_prefix(2);
        let mut analyzer = FixedSizeHeader::new(config);
        let mut source = BufferSource::new(vec![9u8, 9]);
        assert_eq!(
            analyzer.analyze(&mut source).unwrap(),
            Analysis::Header {
                block_size: 0,
                skip: false
            }
        );
    }

    #[test]
    fn test_fast_header_stop_bit_entities() {
        // One prefix entity (two bytes), block size 300, one suffix entity.
        let bytes = vec![0x01, 0x82, 0x02, 0x2C | 0x80, 0x99 | 0x80];
        let mut analyzer = FastHeader::new(1, true, 1);
        let mut source = BufferSource::new(bytes);
        assert_eq!(
            analyzer.analyze(&mut source).unwrap(),
            Analysis::Header {
                block_size: 300,
                skip: false
            }
        );
    }

    #[test]
    fn test_fast_header_suspends_mid_entity() {
        let bytes = vec![0x02, 0x2C | 0x80];
        let mut analyzer = FastHeader::new(0, true, 0);
        let mut source = ChunkedSource::new();

        source.push(vec![bytes[0]]);
        assert_eq!(analyzer.analyze(&mut source).unwrap(), Analysis::NeedData);

        source.push(vec![bytes[1]]);
        assert_eq!(
            analyzer.analyze(&mut source).unwrap(),
            Analysis::Header {
                block_size: 300,
                skip: false
            }
        );
    }
}
