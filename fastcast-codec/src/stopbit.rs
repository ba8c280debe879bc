/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Stop-bit entity decoding.
//!
//! FAST packs every primitive into stop-bit entities: 7 value bits per byte,
//! high bit set on the final byte. Signed integers take their sign from bit
//! 6 of the first byte. Nullable encodings shift the non-negative value
//! domain up by one so the single byte `0x80` can act as the null sentinel.
//!
//! All functions advance `offset` past the consumed entity. In strict mode
//! overlong encodings (entities using more bytes than the value requires)
//! are rejected; tolerant mode accepts them.

use crate::error::FastError;
use bytes::Bytes;

/// Decodes an unsigned stop-bit integer.
///
/// # Arguments
/// * `data` - The input block
/// * `offset` - Current position, advanced past the entity
/// * `strict` - Reject overlong encodings
///
/// # Errors
/// Returns `FastError::UnexpectedEof` if the block ends mid-entity and
/// `FastError::IntegerOverflow` if the value exceeds 64 bits.
pub fn decode_uint(data: &[u8], offset: &mut usize, strict: bool) -> Result<u64, FastError> {
    let start = *offset;
    let mut result: u64 = 0;

    loop {
        if *offset >= data.len() {
            return Err(FastError::UnexpectedEof { offset: *offset });
        }

        let byte = data[*offset];
        *offset += 1;

        if result > (u64::MAX >> 7) {
            return Err(FastError::IntegerOverflow { offset: start });
        }

        result = (result << 7) | u64::from(byte & 0x7F);

        if byte & 0x80 != 0 {
            break;
        }
    }

    // A leading zero byte on a multi-byte entity adds no value bits.
    if strict && *offset - start > 1 && data[start] == 0x00 {
        return Err(FastError::OverlongEncoding { offset: start });
    }

    Ok(result)
}

/// Decodes a signed stop-bit integer.
///
/// # Arguments
/// * `data` - The input block
/// * `offset` - Current position, advanced past the entity
/// * `strict` - Reject overlong encodings
///
/// # Errors
/// Returns `FastError::UnexpectedEof` if the block ends mid-entity and
/// `FastError::IntegerOverflow` if the value exceeds 64 bits.
pub fn decode_int(data: &[u8], offset: &mut usize, strict: bool) -> Result<i64, FastError> {
    let start = *offset;
    if start >= data.len() {
        return Err(FastError::UnexpectedEof { offset: start });
    }

    let negative = (data[start] & 0x40) != 0;
    let mut result: i64 = if negative { -1 } else { 0 };

    loop {
        if *offset >= data.len() {
            return Err(FastError::UnexpectedEof { offset: *offset });
        }

        let byte = data[*offset];
        *offset += 1;

        if result > (i64::MAX >> 7) || result < (i64::MIN >> 7) {
            return Err(FastError::IntegerOverflow { offset: start });
        }

        result = (result << 7) | i64::from(byte & 0x7F);

        if byte & 0x80 != 0 {
            break;
        }
    }

    // Redundant sign bytes: a leading 0x00 whose successor carries a clear
    // sign bit, or a leading 0x7F whose successor carries a set sign bit.
    if strict && *offset - start > 1 {
        let first = data[start] & 0x7F;
        let second_sign = data[start + 1] & 0x40 != 0;
        if (first == 0x00 && !second_sign) || (first == 0x7F && second_sign) {
            return Err(FastError::OverlongEncoding { offset: start });
        }
    }

    Ok(result)
}

/// Decodes a nullable unsigned integer; `0x80` alone is null, every
/// non-null value is shifted down by one.
///
/// # Errors
/// Same conditions as [`decode_uint`].
pub fn decode_nullable_uint(
    data: &[u8],
    offset: &mut usize,
    strict: bool,
) -> Result<Option<u64>, FastError> {
    let raw = decode_uint(data, offset, strict)?;
    Ok(raw.checked_sub(1))
}

/// Decodes a nullable signed integer; `0x80` alone is null, positive
/// values are shifted down by one.
///
/// # Errors
/// Same conditions as [`decode_int`].
pub fn decode_nullable_int(
    data: &[u8],
    offset: &mut usize,
    strict: bool,
) -> Result<Option<i64>, FastError> {
    let raw = decode_int(data, offset, strict)?;
    Ok(match raw {
        0 => None,
        v if v > 0 => Some(v - 1),
        v => Some(v),
    })
}

fn decode_ascii_raw(data: &[u8], offset: &mut usize) -> Result<Vec<u8>, FastError> {
    let mut raw = Vec::new();

    loop {
        if *offset >= data.len() {
            return Err(FastError::UnexpectedEof { offset: *offset });
        }

        let byte = data[*offset];
        *offset += 1;
        raw.push(byte & 0x7F);

        if byte & 0x80 != 0 {
            break;
        }
    }

    Ok(raw)
}

/// Interprets the raw 7-bit groups of a mandatory string entity: a lone
/// zero byte is the empty string, and a `0x00` pad is only legal in front
/// of a NUL character.
fn strip_pad(mut raw: Vec<u8>, start: usize, strict: bool) -> Result<Vec<u8>, FastError> {
    if raw.len() == 1 && raw[0] == 0x00 {
        raw.clear();
        return Ok(raw);
    }
    if raw.first() == Some(&0x00) {
        if strict && raw.get(1) != Some(&0x00) {
            return Err(FastError::OverlongEncoding { offset: start });
        }
        raw.remove(0);
    }
    Ok(raw)
}

/// Decodes a mandatory ASCII string.
///
/// The single byte `0x80` is the empty string.
///
/// # Errors
/// Returns `FastError::UnexpectedEof` on truncation,
/// `FastError::OverlongEncoding` for an illegal pad byte in strict mode.
pub fn decode_ascii(data: &[u8], offset: &mut usize, strict: bool) -> Result<String, FastError> {
    let start = *offset;
    let raw = decode_ascii_raw(data, offset)?;
    let content = strip_pad(raw, start, strict)?;
    String::from_utf8(content).map_err(|_| FastError::InvalidString { offset: start })
}

/// Decodes a nullable ASCII string.
///
/// The single byte `0x80` is null; `0x00 0x80` is the empty string. A
/// nullable value that is empty or starts with NUL carries one extra pad
/// byte on top of the mandatory form.
///
/// # Errors
/// Same conditions as [`decode_ascii`].
pub fn decode_nullable_ascii(
    data: &[u8],
    offset: &mut usize,
    strict: bool,
) -> Result<Option<String>, FastError> {
    let start = *offset;
    let mut raw = decode_ascii_raw(data, offset)?;

    if raw.len() == 1 && raw[0] == 0x00 {
        return Ok(None);
    }
    if raw.first() == Some(&0x00) {
        if strict && raw.get(1) != Some(&0x00) {
            return Err(FastError::OverlongEncoding { offset: start });
        }
        raw.remove(0);
        raw = strip_pad(raw, start, strict)?;
    }

    String::from_utf8(raw)
        .map(Some)
        .map_err(|_| FastError::InvalidString { offset: start })
}

/// Decodes a mandatory byte vector (stop-bit length prefix, then raw bytes).
///
/// # Errors
/// Returns `FastError::UnexpectedEof` if the declared length overruns the
/// block.
pub fn decode_byte_vector(
    data: &[u8],
    offset: &mut usize,
    strict: bool,
) -> Result<Bytes, FastError> {
    let length = decode_uint(data, offset, strict)? as usize;
    take_raw(data, offset, length)
}

/// Decodes a nullable byte vector (nullable length prefix).
///
/// # Errors
/// Same conditions as [`decode_byte_vector`].
pub fn decode_nullable_byte_vector(
    data: &[u8],
    offset: &mut usize,
    strict: bool,
) -> Result<Option<Bytes>, FastError> {
    match decode_nullable_uint(data, offset, strict)? {
        None => Ok(None),
        Some(length) => take_raw(data, offset, length as usize).map(Some),
    }
}

/// Decodes a mandatory UTF-8 string (byte vector validated as UTF-8).
///
/// # Errors
/// Returns `FastError::InvalidString` on invalid UTF-8, plus the
/// [`decode_byte_vector`] conditions.
pub fn decode_utf8(data: &[u8], offset: &mut usize, strict: bool) -> Result<String, FastError> {
    let start = *offset;
    let raw = decode_byte_vector(data, offset, strict)?;
    String::from_utf8(raw.to_vec()).map_err(|_| FastError::InvalidString { offset: start })
}

/// Decodes a nullable UTF-8 string.
///
/// # Errors
/// Same conditions as [`decode_utf8`].
pub fn decode_nullable_utf8(
    data: &[u8],
    offset: &mut usize,
    strict: bool,
) -> Result<Option<String>, FastError> {
    let start = *offset;
    match decode_nullable_byte_vector(data, offset, strict)? {
        None => Ok(None),
        Some(raw) => String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|_| FastError::InvalidString { offset: start }),
    }
}

fn take_raw(data: &[u8], offset: &mut usize, length: usize) -> Result<Bytes, FastError> {
    if *offset + length > data.len() {
        return Err(FastError::UnexpectedEof { offset: data.len() });
    }
    let raw = Bytes::copy_from_slice(&data[*offset..*offset + length]);
    *offset += length;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_uint_single_byte() {
        let data = [0x81];
        let mut offset = 0;
        assert_eq!(decode_uint(&data, &mut offset, true).unwrap(), 1);
        assert_eq!(offset, 1);
    }

    #[test]
    fn test_decode_uint_multi_byte() {
        // 942 = 7 * 128 + 46
        let data = [0x07, 0xAE];
        let mut offset = 0;
        assert_eq!(decode_uint(&data, &mut offset, true).unwrap(), 942);
        assert_eq!(offset, 2);
    }

    #[test]
    fn test_decode_uint_truncated() {
        let data = [0x07];
        let mut offset = 0;
        assert!(matches!(
            decode_uint(&data, &mut offset, false),
            Err(FastError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_decode_uint_overlong_strict_only() {
        let data = [0x00, 0x81];
        let mut offset = 0;
        assert!(matches!(
            decode_uint(&data, &mut offset, true),
            Err(FastError::OverlongEncoding { offset: 0 })
        ));

        let mut offset = 0;
        assert_eq!(decode_uint(&data, &mut offset, false).unwrap(), 1);
    }

    #[test]
    fn test_decode_int_signs() {
        let mut offset = 0;
        assert_eq!(decode_int(&[0x81], &mut offset, true).unwrap(), 1);

        let mut offset = 0;
        assert_eq!(decode_int(&[0xFF], &mut offset, true).unwrap(), -1);

        // 64 needs a second byte because bit 6 of 0x40 reads as a sign.
        let mut offset = 0;
        assert_eq!(decode_int(&[0x00, 0xC0], &mut offset, true).unwrap(), 64);

        let mut offset = 0;
        assert_eq!(decode_int(&[0x7F, 0xBF], &mut offset, true).unwrap(), -65);
    }

    #[test]
    fn test_decode_int_overlong_strict() {
        // 0x00 followed by a clear sign bit adds nothing.
        let mut offset = 0;
        assert!(matches!(
            decode_int(&[0x00, 0x81], &mut offset, true),
            Err(FastError::OverlongEncoding { .. })
        ));

        // 0x7F followed by a set sign bit adds nothing.
        let mut offset = 0;
        assert!(matches!(
            decode_int(&[0x7F, 0xFF], &mut offset, true),
            Err(FastError::OverlongEncoding { .. })
        ));

        let mut offset = 0;
        assert_eq!(decode_int(&[0x00, 0x81], &mut offset, false).unwrap(), 1);
    }

    #[test]
    fn test_decode_nullable_uint() {
        let mut offset = 0;
        assert_eq!(decode_nullable_uint(&[0x80], &mut offset, true).unwrap(), None);

        let mut offset = 0;
        assert_eq!(
            decode_nullable_uint(&[0x81], &mut offset, true).unwrap(),
            Some(0)
        );

        let mut offset = 0;
        assert_eq!(
            decode_nullable_uint(&[0x83], &mut offset, true).unwrap(),
            Some(2)
        );
    }

    #[test]
    fn test_decode_nullable_int() {
        let mut offset = 0;
        assert_eq!(decode_nullable_int(&[0x80], &mut offset, true).unwrap(), None);

        let mut offset = 0;
        assert_eq!(
            decode_nullable_int(&[0x82], &mut offset, true).unwrap(),
            Some(1)
        );

        let mut offset = 0;
        assert_eq!(
            decode_nullable_int(&[0xFF], &mut offset, true).unwrap(),
            Some(-1)
        );
    }

    #[test]
    fn test_decode_ascii() {
        let data = [b'H', b'i', b'!' | 0x80];
        let mut offset = 0;
        assert_eq!(decode_ascii(&data, &mut offset, true).unwrap(), "Hi!");
        assert_eq!(offset, 3);
    }

    #[test]
    fn test_decode_ascii_empty() {
        let mut offset = 0;
        assert_eq!(decode_ascii(&[0x80], &mut offset, true).unwrap(), "");
    }

    #[test]
    fn test_decode_nullable_ascii_forms() {
        let mut offset = 0;
        assert_eq!(
            decode_nullable_ascii(&[0x80], &mut offset, true).unwrap(),
            None
        );

        let mut offset = 0;
        assert_eq!(
            decode_nullable_ascii(&[0x00, 0x80], &mut offset, true).unwrap(),
            Some(String::new())
        );

        let data = [b'A', b'B' | 0x80];
        let mut offset = 0;
        assert_eq!(
            decode_nullable_ascii(&data, &mut offset, true).unwrap(),
            Some("AB".to_string())
        );
    }

    #[test]
    fn test_nul_string_forms() {
        // Mandatory "\0" carries one pad byte.
        let mut offset = 0;
        assert_eq!(decode_ascii(&[0x00, 0x80], &mut offset, true).unwrap(), "\0");

        // Nullable "\0" carries one extra pad on top of the mandatory form.
        let mut offset = 0;
        assert_eq!(
            decode_nullable_ascii(&[0x00, 0x00, 0x80], &mut offset, true).unwrap(),
            Some("\0".to_string())
        );

        // An unnecessary pad is rejected in strict mode only.
        let mut offset = 0;
        assert!(matches!(
            decode_ascii(&[0x00, b'A' | 0x80], &mut offset, true),
            Err(FastError::OverlongEncoding { .. })
        ));
        let mut offset = 0;
        assert_eq!(
            decode_ascii(&[0x00, b'A' | 0x80], &mut offset, false).unwrap(),
            "A"
        );
    }

    #[test]
    fn test_decode_byte_vector() {
        let data = [0x83, 1, 2, 3];
        let mut offset = 0;
        let raw = decode_byte_vector(&data, &mut offset, true).unwrap();
        assert_eq!(&raw[..], &[1, 2, 3]);
        assert_eq!(offset, 4);
    }

    #[test]
    fn test_decode_byte_vector_overrun() {
        let data = [0x85, 1, 2];
        let mut offset = 0;
        assert!(matches!(
            decode_byte_vector(&data, &mut offset, true),
            Err(FastError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_decode_nullable_byte_vector() {
        let mut offset = 0;
        assert_eq!(
            decode_nullable_byte_vector(&[0x80], &mut offset, true).unwrap(),
            None
        );

        let data = [0x82, 9, 8];
        let mut offset = 0;
        let raw = decode_nullable_byte_vector(&data, &mut offset, true)
            .unwrap()
            .unwrap();
        assert_eq!(&raw[..], &[9, 8]);
    }

    #[test]
    fn test_decode_utf8() {
        let data = [0x82, 0xC3, 0xA9]; // "é"
        let mut offset = 0;
        assert_eq!(decode_utf8(&data, &mut offset, true).unwrap(), "é");

        let bad = [0x81, 0xFF];
        let mut offset = 0;
        assert!(matches!(
            decode_utf8(&bad, &mut offset, true),
            Err(FastError::InvalidString { .. })
        ));
    }
}
