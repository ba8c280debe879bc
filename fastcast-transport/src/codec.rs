/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec for block framing.
//!
//! Applies a fixed-size [`HeaderConfig`] to an async byte stream and yields
//! whole block payloads, so async consumers can frame before handing blocks
//! to a decoder. Skip-flagged blocks are discarded here, matching the
//! header analyzer's test-skip contract.

use bytes::{BufMut, BytesMut};
use fastcast_codec::header::HeaderConfig;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

/// Errors that can occur during block codec operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A header declared a block larger than the configured maximum.
    #[error("block too large: {size} bytes exceeds maximum {max_size}")]
    BlockTooLarge {
        /// Declared block size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// The codec configuration cannot frame a stream.
    #[error("invalid framing configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Tokio codec yielding header-framed block payloads.
#[derive(Debug, Clone)]
pub struct BlockCodec {
    config: HeaderConfig,
    max_block_size: usize,
    headers_parsed: u64,
}

impl BlockCodec {
    /// Creates a codec for the given header configuration.
    #[must_use]
    pub fn new(config: HeaderConfig) -> Self {
        Self {
            config,
            max_block_size: 1024 * 1024,
            headers_parsed: 0,
        }
    }

    /// Sets the maximum accepted block size.
    #[must_use]
    pub const fn with_max_block_size(mut self, size: usize) -> Self {
        self.max_block_size = size;
        self
    }

    fn header_len(&self) -> usize {
        self.config.prefix_bytes + self.config.size_bytes + self.config.suffix_bytes
    }

    fn read_block_size(&self, header: &[u8]) -> usize {
        let size_field = &header[self.config.prefix_bytes..][..self.config.size_bytes];
        let mut block_size = 0usize;
        for (index, &byte) in size_field.iter().enumerate() {
            if self.config.big_endian {
                block_size = (block_size << 8) | usize::from(byte);
            } else {
                block_size |= usize::from(byte) << (index * 8);
            }
        }
        block_size
    }
}

impl Decoder for BlockCodec {
    type Item = BytesMut;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.config.size_bytes == 0 {
            return Err(CodecError::InvalidConfig(
                "streaming framing requires a size field".to_string(),
            ));
        }

        loop {
            let header_len = self.header_len();
            if src.len() < header_len {
                return Ok(None);
            }

            let block_size = self.read_block_size(&src[..header_len]);
            if block_size > self.max_block_size {
                return Err(CodecError::BlockTooLarge {
                    size: block_size,
                    max_size: self.max_block_size,
                });
            }

            let total = header_len + block_size;
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            let mut frame = src.split_to(total);
            let payload = frame.split_off(header_len);
            self.headers_parsed += 1;

            if self.config.skip_cadence != 0
                && self.headers_parsed % self.config.skip_cadence == 0
            {
                debug!(header = self.headers_parsed, "skipping framed block");
                continue;
            }
            return Ok(Some(payload));
        }
    }
}

impl Encoder<&[u8]> for BlockCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.config.size_bytes > 0 {
            let max = if self.config.size_bytes * 8 >= usize::BITS as usize {
                usize::MAX
            } else {
                (1 << (self.config.size_bytes * 8)) - 1
            };
            if item.len() > max {
                return Err(CodecError::BlockTooLarge {
                    size: item.len(),
                    max_size: max,
                });
            }
        }

        dst.reserve(self.header_len() + item.len());
        dst.put_bytes(0, self.config.prefix_bytes);
        for index in 0..self.config.size_bytes {
            let shift = if self.config.big_endian {
                (self.config.size_bytes - 1 - index) * 8
            } else {
                index * 8
            };
            dst.put_u8(((item.len() >> shift) & 0xFF) as u8);
        }
        dst.put_bytes(0, self.config.suffix_bytes);
        dst.put_slice(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> BlockCodec {
        BlockCodec::new(HeaderConfig::new(2, true).with_prefix(1).with_suffix(1))
    }

    #[test]
    fn test_codec_round_trip() {
        let mut codec = codec();
        let mut buf = BytesMut::new();
        codec.encode(&b"payload"[..], &mut buf).unwrap();

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"payload");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_incomplete_returns_none() {
        let mut codec = codec();
        let mut full = BytesMut::new();
        codec.encode(&b"payload"[..], &mut full).unwrap();

        let mut partial = full.split_to(full.len() - 3);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.unsplit(full);
        let frame = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(&frame[..], b"payload");
    }

    #[test]
    fn test_codec_multiple_frames() {
        let mut codec = codec();
        let mut buf = BytesMut::new();
        codec.encode(&b"one"[..], &mut buf).unwrap();
        codec.encode(&b"two"[..], &mut buf).unwrap();

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"one");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"two");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_little_endian_size() {
        let mut codec = BlockCodec::new(HeaderConfig::new(2, false));
        let mut buf = BytesMut::new();
        codec.encode(&[0xAB; 300][..], &mut buf).unwrap();
        assert_eq!(&buf[..2], &[0x2C, 0x01]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.len(), 300);
    }

    #[test]
    fn test_codec_skip_cadence_discards_blocks() {
        let config = HeaderConfig::new(2, true).with_skip_cadence(2);
        let mut codec = BlockCodec::new(config);
        let mut buf = BytesMut::new();
        for payload in [&b"a"[..], b"b", b"c", b"d"] {
            codec.encode(payload, &mut buf).unwrap();
        }

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"a");
        // "b" is the 2nd header: skipped, so "c" comes next.
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"c");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_block_too_large() {
        let mut codec = codec().with_max_block_size(4);
        let mut buf = BytesMut::new();
        BlockCodec::new(HeaderConfig::new(2, true).with_prefix(1).with_suffix(1))
            .encode(&[0u8; 16][..], &mut buf)
            .unwrap();

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::BlockTooLarge { .. })
        ));
    }
}
