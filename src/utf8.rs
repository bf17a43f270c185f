// ABOUTME: UTF-8 string validation with an all-ASCII fast path and NUL rejection.
// ABOUTME: Rejects overlong encodings, surrogates, and codepoints above U+10FFFF.

use crate::error::{Error, Result};

/// Check whether every byte is ASCII (< 0x80), eight bytes at a time.
#[inline]
#[must_use]
pub fn is_ascii(bytes: &[u8]) -> bool {
    const HIGH_BITS: u64 = 0x8080_8080_8080_8080;
    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        if u64::from_le_bytes(buf) & HIGH_BITS != 0 {
            return false;
        }
    }
    chunks.remainder().iter().all(|&b| b < 0x80)
}

/// Check whether the slice contains a NUL (0x00) byte.
#[inline]
#[must_use]
pub fn contains_nul(bytes: &[u8]) -> bool {
    memchr::memchr(0, bytes).is_some()
}

/// Validate a byte sequence as well-formed UTF-8.
///
/// Accepts 1- to 4-byte sequences. The second byte's range depends on the
/// lead byte, which is where overlong encodings (0xE0/0xF0), surrogates
/// (0xED) and codepoints above U+10FFFF (0xF4) are caught. Truncated
/// sequences are invalid.
#[allow(dead_code)] // sole caller is behind cfg(not(feature = "simd-utf8"))
fn validate(bytes: &[u8]) -> Result<()> {
    let len = bytes.len();
    let mut i = 0;
    while i < len {
        let first = bytes[i];
        if first < 0x80 {
            i += 1;
            continue;
        }
        let width = match first {
            0xc2..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf4 => 4,
            // 0x80-0xbf: continuation without leader; 0xc0/0xc1: overlong
            // ASCII; 0xf5-0xff: invalid lead
            _ => return Err(Error::InvalidUtf8),
        };
        if i + width > len {
            return Err(Error::InvalidUtf8);
        }
        let second = bytes[i + 1];
        let second_ok = match first {
            0xe0 => (0xa0..=0xbf).contains(&second),
            0xed => (0x80..=0x9f).contains(&second),
            0xf0 => (0x90..=0xbf).contains(&second),
            0xf4 => (0x80..=0x8f).contains(&second),
            _ => (0x80..=0xbf).contains(&second),
        };
        if !second_ok {
            return Err(Error::InvalidUtf8);
        }
        for j in 2..width {
            if !(0x80..=0xbf).contains(&bytes[i + j]) {
                return Err(Error::InvalidUtf8);
            }
        }
        i += width;
    }
    Ok(())
}

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
pub fn to_str(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
pub fn to_str(bytes: &[u8]) -> Result<&str> {
    if !is_ascii(bytes) {
        validate(bytes)?;
    }
    // SAFETY: the bytes were just validated as well-formed UTF-8.
    Ok(unsafe { std::str::from_utf8_unchecked(bytes) })
}

/// Validate string content per decoder/encoder flags: well-formed UTF-8,
/// optionally NUL-free. Returns the borrowed string.
#[inline]
pub fn to_str_checked(bytes: &[u8], reject_nul: bool) -> Result<&str> {
    let s = to_str(bytes)?;
    if reject_nul && contains_nul(bytes) {
        return Err(Error::NulCharacter);
    }
    Ok(s)
}
