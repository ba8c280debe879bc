/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Stop-bit entity encoding.
//!
//! The encode direction of the wire format: stop-bit integers, strings,
//! byte vectors, presence maps, and decimal pairs, accumulated into an
//! internal buffer. Used by feed simulators and by tests that need exact
//! wire images; the decoder core itself never encodes.

use crate::pmap::PresenceMap;

/// Accumulating FAST entity encoder.
#[derive(Debug, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {
    /// Creates a new encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encodes an unsigned integer.
    pub fn encode_uint(&mut self, value: u64) {
        if value == 0 {
            self.buffer.push(0x80);
            return;
        }

        let mut groups = [0u8; 10];
        let mut count = 0;
        let mut v = value;
        while v > 0 {
            groups[count] = (v & 0x7F) as u8;
            count += 1;
            v >>= 7;
        }

        for index in (0..count).rev() {
            let mut byte = groups[index];
            if index == 0 {
                byte |= 0x80;
            }
            self.buffer.push(byte);
        }
    }

    /// Encodes a signed integer in its minimal stop-bit form.
    pub fn encode_int(&mut self, value: i64) {
        let mut groups = [0u8; 10];
        let mut count = 0;
        let mut v = value;

        loop {
            groups[count] = (v & 0x7F) as u8;
            count += 1;
            v >>= 7;

            let sign_bit = groups[count - 1] & 0x40 != 0;
            let done = if value < 0 {
                v == -1 && sign_bit
            } else {
                v == 0 && !sign_bit
            };
            if done || count == 10 {
                break;
            }
        }

        for index in (0..count).rev() {
            let mut byte = groups[index];
            if index == 0 {
                byte |= 0x80;
            }
            self.buffer.push(byte);
        }
    }

    /// Encodes a nullable unsigned integer (the value domain shifts up by
    /// one; null is `0x80`).
    pub fn encode_nullable_uint(&mut self, value: Option<u64>) {
        match value {
            Some(v) => self.encode_uint(v + 1),
            None => self.buffer.push(0x80),
        }
    }

    /// Encodes a nullable signed integer (non-negative values shift up by
    /// one; null is `0x80`).
    pub fn encode_nullable_int(&mut self, value: Option<i64>) {
        match value {
            Some(v) if v >= 0 => self.encode_int(v + 1),
            Some(v) => self.encode_int(v),
            None => self.buffer.push(0x80),
        }
    }

    /// Encodes a mandatory ASCII string; empty is the single byte `0x80`.
    pub fn encode_ascii(&mut self, value: &str) {
        let bytes = value.as_bytes();
        if bytes.is_empty() {
            self.buffer.push(0x80);
            return;
        }
        // A leading NUL needs a pad byte so it survives the empty-string
        // encoding.
        if bytes[0] == 0x00 {
            self.buffer.push(0x00);
        }
        self.encode_ascii_content(value);
    }

    /// Encodes a nullable ASCII string; null is `0x80`, empty is
    /// `0x00 0x80`. Content starting with NUL takes one extra pad byte on
    /// top of the mandatory form.
    pub fn encode_nullable_ascii(&mut self, value: Option<&str>) {
        match value {
            None => self.buffer.push(0x80),
            Some("") => self.buffer.extend_from_slice(&[0x00, 0x80]),
            Some(s) => {
                if s.as_bytes()[0] == 0x00 {
                    self.buffer.push(0x00);
                }
                self.encode_ascii(s);
            }
        }
    }

    fn encode_ascii_content(&mut self, value: &str) {
        let bytes = value.as_bytes();
        for (index, &byte) in bytes.iter().enumerate() {
            if index == bytes.len() - 1 {
                self.buffer.push(byte | 0x80);
            } else {
                self.buffer.push(byte & 0x7F);
            }
        }
    }

    /// Encodes a mandatory byte vector (stop-bit length, then raw bytes).
    pub fn encode_byte_vector(&mut self, value: &[u8]) {
        self.encode_uint(value.len() as u64);
        self.buffer.extend_from_slice(value);
    }

    /// Encodes a nullable byte vector (nullable length prefix).
    pub fn encode_nullable_byte_vector(&mut self, value: Option<&[u8]>) {
        match value {
            None => self.buffer.push(0x80),
            Some(v) => {
                self.encode_nullable_uint(Some(v.len() as u64));
                self.buffer.extend_from_slice(v);
            }
        }
    }

    /// Encodes a mandatory UTF-8 string as a byte vector.
    pub fn encode_utf8(&mut self, value: &str) {
        self.encode_byte_vector(value.as_bytes());
    }

    /// Encodes a mandatory decimal: exponent first, then mantissa.
    pub fn encode_decimal(&mut self, mantissa: i64, exponent: i32) {
        self.encode_int(i64::from(exponent));
        self.encode_int(mantissa);
    }

    /// Encodes a nullable decimal (nullable exponent gates the pair).
    pub fn encode_nullable_decimal(&mut self, value: Option<(i64, i32)>) {
        match value {
            None => self.buffer.push(0x80),
            Some((mantissa, exponent)) => {
                self.encode_nullable_int(Some(i64::from(exponent)));
                self.encode_int(mantissa);
            }
        }
    }

    /// Encodes a presence map from individual bits.
    pub fn encode_pmap(&mut self, bits: &[bool]) {
        self.buffer
            .extend_from_slice(&PresenceMap::from_bits(bits).encode());
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }

    /// Returns a view of the current buffer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns the current buffer length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clears the buffer for reuse.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
