// ABOUTME: High-performance BONJSON binary encoder.
// ABOUTME: Encodes values using delimiter-terminated containers and FF-terminated long strings.

use crate::error::{Error, Result};
use crate::types::{type_code, zigzag_encode, leb128_encode, BigNumber, NATIVE_SIZE_INDEX};
use crate::utf8;
use std::io::Write;

/// Configuration options for the encoder.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Reject NaN and Infinity float values (default: true)
    pub reject_nan_infinity: bool,
    /// Reject NUL characters in strings (default: true)
    pub reject_nul: bool,
    /// Maximum container nesting depth
    pub max_depth: usize,
    /// Maximum string length in bytes
    pub max_string_length: usize,
    /// Maximum elements in a container
    pub max_container_size: usize,
    /// Maximum document size in bytes
    pub max_document_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        use crate::types::limits;
        Self {
            reject_nan_infinity: true,
            reject_nul: true,
            max_depth: limits::MAX_DEPTH,
            max_string_length: limits::MAX_STRING_LENGTH,
            max_container_size: limits::MAX_CONTAINER_SIZE,
            max_document_size: limits::MAX_DOCUMENT_SIZE,
        }
    }
}

/// A BONJSON encoder that writes to a byte buffer.
///
/// The encoder tracks container state to ensure well-formed output and
/// enforces the configured resource limits at write time. After the root
/// value completes, further writes fail.
///
/// # Performance Note
///
/// The encoder writes small chunks (often single bytes) directly to the writer.
/// For file or network I/O, wrap your writer in [`std::io::BufWriter`] to avoid
/// excessive syscall overhead. For in-memory writers like `Vec<u8>`, no buffering
/// is needed.
pub struct Encoder<W: Write> {
    writer: W,
    config: EncoderConfig,
    /// Stack of container states
    containers: Vec<ContainerState>,
    /// Total bytes written so far (document size limit)
    written: usize,
    /// Set once a complete value has been written at the root
    root_done: bool,
    /// Set after the first error; all further operations fail
    poisoned: bool,
}

#[derive(Clone, Copy)]
struct ContainerState {
    is_object: bool,
    expecting_key: bool,
    /// Direct children written so far (keys and values each count)
    element_count: usize,
}

impl<W: Write> Encoder<W> {
    /// Create a new encoder that writes to the given writer.
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, EncoderConfig::default())
    }

    /// Create a new encoder with custom configuration.
    pub fn with_config(writer: W, config: EncoderConfig) -> Self {
        Self {
            writer,
            config,
            containers: Vec::new(),
            written: 0,
            root_done: false,
            poisoned: false,
        }
    }

    /// Consume the encoder and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Total bytes written so far.
    #[must_use]
    pub fn bytes_written(&self) -> usize {
        self.written
    }

    /// Run a state-checked operation, poisoning the encoder on failure.
    #[inline]
    fn checked<F: FnOnce(&mut Self) -> Result<()>>(&mut self, f: F) -> Result<()> {
        if self.poisoned {
            return Err(Error::invalid_data("encoder already failed"));
        }
        let result = f(self);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    /// Check that a non-string value may be written here.
    #[inline]
    fn check_value_allowed(&self) -> Result<()> {
        match self.containers.last() {
            Some(c) if c.is_object && c.expecting_key => Err(Error::ExpectedObjectKey),
            Some(_) => Ok(()),
            None if self.root_done => Err(Error::TrailingBytes),
            None => Ok(()),
        }
    }

    /// Check that a string (value or key) may be written here.
    #[inline]
    fn check_string_allowed(&self) -> Result<()> {
        if self.containers.is_empty() && self.root_done {
            return Err(Error::TrailingBytes);
        }
        Ok(())
    }

    /// Account for one completed value or key in the current container, and
    /// toggle the key/value expectation in objects.
    #[inline]
    fn element_written(&mut self) -> Result<()> {
        match self.containers.last_mut() {
            Some(container) => {
                container.element_count += 1;
                if container.element_count > self.config.max_container_size {
                    return Err(Error::MaxContainerSizeExceeded);
                }
                if container.is_object {
                    container.expecting_key = !container.expecting_key;
                }
                Ok(())
            }
            None => {
                self.root_done = true;
                Ok(())
            }
        }
    }

    // =========================================================================
    // Unchecked methods for serde serializer
    //
    // These methods skip container state tracking for better performance.
    // Designed for the serde serialization path, where Rust's type system
    // guarantees correct structure.
    //
    // These methods still perform:
    // - NaN/Infinity rejection for floats
    // - NUL, string length, and document size limit checks
    // - Optimal encoding selection (small ints, float32, etc.)
    // =========================================================================

    /// Encode a null value without container state checks.
    #[inline]
    pub(crate) fn write_null_unchecked(&mut self) -> Result<()> {
        self.write_byte(type_code::NULL)
    }

    /// Encode a boolean value without state checks.
    #[inline]
    pub(crate) fn write_bool_unchecked(&mut self, value: bool) -> Result<()> {
        self.write_byte(if value { type_code::TRUE } else { type_code::FALSE })
    }

    /// Encode an unsigned integer without state checks.
    #[inline]
    pub(crate) fn write_u64_unchecked(&mut self, value: u64) -> Result<()> {
        self.emit_unsigned_int(value)
    }

    /// Encode a signed integer without state checks.
    #[inline]
    pub(crate) fn write_i64_unchecked(&mut self, value: i64) -> Result<()> {
        self.emit_signed_int(value)
    }

    /// Encode a 32-bit float without state checks.
    #[inline]
    pub(crate) fn write_f32_unchecked(&mut self, value: f32) -> Result<()> {
        self.write_f64_unchecked(f64::from(value))
    }

    /// Encode a 64-bit float without state checks.
    #[inline]
    pub(crate) fn write_f64_unchecked(&mut self, value: f64) -> Result<()> {
        self.emit_f64(value)
    }

    /// Encode a string without state checks.
    #[inline]
    pub(crate) fn write_str_unchecked(&mut self, value: &str) -> Result<()> {
        self.emit_str(value)
    }

    /// Begin an array without state checks.
    #[inline]
    pub(crate) fn begin_array_unchecked(&mut self) -> Result<()> {
        if self.containers.len() >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        self.containers.push(ContainerState {
            is_object: false,
            expecting_key: false,
            element_count: 0,
        });
        self.write_byte(type_code::ARRAY)
    }

    /// Begin an object without state checks.
    #[inline]
    pub(crate) fn begin_object_unchecked(&mut self) -> Result<()> {
        if self.containers.len() >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        self.containers.push(ContainerState {
            is_object: true,
            expecting_key: true,
            element_count: 0,
        });
        self.write_byte(type_code::OBJECT)
    }

    /// Write a container end marker without state checks.
    #[inline]
    pub(crate) fn end_container_unchecked(&mut self) -> Result<()> {
        self.containers.pop();
        self.write_byte(type_code::CONTAINER_END)
    }

    /// Write a single byte.
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.written >= self.config.max_document_size {
            return Err(Error::MaxDocumentSizeExceeded);
        }
        self.writer.write_all(&[byte])?;
        self.written += 1;
        Ok(())
    }

    /// Write multiple bytes.
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.written + bytes.len() > self.config.max_document_size {
            return Err(Error::MaxDocumentSizeExceeded);
        }
        self.writer.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    /// Encode a null value.
    pub fn write_null(&mut self) -> Result<()> {
        self.checked(|enc| {
            enc.check_value_allowed()?;
            enc.write_byte(type_code::NULL)?;
            enc.element_written()
        })
    }

    /// Encode a boolean value.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.checked(|enc| {
            enc.check_value_allowed()?;
            enc.write_byte(if value {
                type_code::TRUE
            } else {
                type_code::FALSE
            })?;
            enc.element_written()
        })
    }

    /// Encode an unsigned integer.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.checked(|enc| {
            enc.check_value_allowed()?;
            enc.emit_unsigned_int(value)?;
            enc.element_written()
        })
    }

    /// Encode a signed integer.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.checked(|enc| {
            enc.check_value_allowed()?;
            enc.emit_signed_int(value)?;
            enc.element_written()
        })
    }

    /// Encode a 64-bit float.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.checked(|enc| {
            enc.check_value_allowed()?;
            enc.emit_f64(value)?;
            enc.element_written()
        })
    }

    /// Encode a 32-bit float.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_f64(f64::from(value))
    }

    /// Encode a `BigNumber` using zigzag LEB128 metadata and LE magnitude bytes.
    pub fn write_big_number(&mut self, value: BigNumber) -> Result<()> {
        self.checked(|enc| {
            enc.check_value_allowed()?;
            enc.emit_big_number(value)?;
            enc.element_written()
        })
    }

    /// Encode a string (value, or key when inside an object).
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.checked(|enc| {
            enc.check_string_allowed()?;
            enc.emit_str(value)?;
            enc.element_written()
        })
    }

    /// Begin encoding an array (delimiter-terminated).
    pub fn begin_array(&mut self) -> Result<()> {
        self.checked(|enc| {
            enc.check_value_allowed()?;
            enc.begin_array_unchecked()
        })
    }

    /// Begin encoding an object (delimiter-terminated).
    pub fn begin_object(&mut self) -> Result<()> {
        self.checked(|enc| {
            enc.check_value_allowed()?;
            enc.begin_object_unchecked()
        })
    }

    /// End the current container by writing the end marker (0xFE).
    pub fn end_container(&mut self) -> Result<()> {
        self.checked(Self::end_container_inner)
    }

    fn end_container_inner(&mut self) -> Result<()> {
        let container = self
            .containers
            .pop()
            .ok_or(Error::UnbalancedContainers)?;

        // Can't close an object while expecting a value
        if container.is_object && !container.expecting_key {
            return Err(Error::ExpectedObjectValue);
        }

        self.write_byte(type_code::CONTAINER_END)?;
        self.element_written()
    }

    /// Close every open container.
    pub fn end_all_containers(&mut self) -> Result<()> {
        self.checked(|enc| {
            while !enc.containers.is_empty() {
                enc.end_container_inner()?;
            }
            Ok(())
        })
    }

    /// Encode a complete array of signed integers in one call.
    pub fn write_i64_array(&mut self, values: &[i64]) -> Result<()> {
        self.checked(|enc| {
            enc.begin_batch_array(values.len())?;
            for &v in values {
                enc.emit_signed_int(v)?;
            }
            enc.finish_batch_array()
        })
    }

    /// Encode a complete array of floats in one call.
    pub fn write_f64_array(&mut self, values: &[f64]) -> Result<()> {
        self.checked(|enc| {
            enc.begin_batch_array(values.len())?;
            for &v in values {
                enc.emit_f64(v)?;
            }
            enc.finish_batch_array()
        })
    }

    /// Encode a complete array of strings in one call.
    pub fn write_str_array<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        self.checked(|enc| {
            enc.begin_batch_array(values.len())?;
            for v in values {
                enc.emit_str(v.as_ref())?;
            }
            enc.finish_batch_array()
        })
    }

    fn begin_batch_array(&mut self, len: usize) -> Result<()> {
        self.check_value_allowed()?;
        if self.containers.len() >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        if len > self.config.max_container_size {
            return Err(Error::MaxContainerSizeExceeded);
        }
        self.write_byte(type_code::ARRAY)
    }

    fn finish_batch_array(&mut self) -> Result<()> {
        self.write_byte(type_code::CONTAINER_END)?;
        self.element_written()
    }

    /// Finish encoding and ensure all containers are closed.
    pub fn finish(self) -> Result<W> {
        if !self.containers.is_empty() {
            return Err(Error::UnclosedContainers);
        }
        Ok(self.writer)
    }

    // -------------------------------------------------------------------------
    // Internal encoding methods
    // -------------------------------------------------------------------------

    /// Write an unsigned integer using the optimal encoding.
    #[allow(clippy::cast_possible_truncation)]
    fn emit_unsigned_int(&mut self, value: u64) -> Result<()> {
        // Small integer range: 0-100
        if value <= 100 {
            return self.write_byte(type_code::small_int_code(value as i64));
        }

        let min_bytes = required_unsigned_bytes_min1(value);
        let native_index = NATIVE_SIZE_INDEX[min_bytes - 1];

        // If MSB is clear at the native width, prefer signed encoding
        let native_bytes = 1usize << (native_index as usize);
        let msb_set = (value >> (native_bytes * 8 - 1)) & 1 != 0;
        let code = if msb_set {
            type_code::UINT8 + native_index
        } else {
            type_code::SINT8 + native_index
        };

        self.write_byte(code)?;
        let bytes = value.to_le_bytes();
        self.write_bytes(&bytes[..native_bytes])
    }

    /// Write a signed integer using the optimal encoding.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    fn emit_signed_int(&mut self, value: i64) -> Result<()> {
        // Small integer range: -100 to 100
        if (-100..=100).contains(&value) {
            return self.write_byte(type_code::small_int_code(value));
        }

        let min_bytes = required_signed_bytes_min1(value);
        let native_index = NATIVE_SIZE_INDEX[min_bytes - 1];
        let native_bytes = 1usize << (native_index as usize);

        // For positive values, check if unsigned encoding needs fewer bytes
        if value > 0 {
            let unsigned_min = required_unsigned_bytes_min1(value as u64);
            let unsigned_native_index = NATIVE_SIZE_INDEX[unsigned_min - 1];
            let unsigned_native_bytes = 1usize << (unsigned_native_index as usize);
            if unsigned_native_bytes < native_bytes {
                self.write_byte(type_code::UINT8 + unsigned_native_index)?;
                let bytes = (value as u64).to_le_bytes();
                return self.write_bytes(&bytes[..unsigned_native_bytes]);
            }
        }

        self.write_byte(type_code::SINT8 + native_index)?;
        let bytes = value.to_le_bytes();
        self.write_bytes(&bytes[..native_bytes])
    }

    /// Write a float, downcasting to integer or f32 where lossless.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::float_cmp)]
    fn emit_f64(&mut self, value: f64) -> Result<()> {
        if self.config.reject_nan_infinity && !value.is_finite() {
            return Err(Error::invalid_data("NaN or Infinity not allowed"));
        }

        // Negative zero must be encoded as float
        if value == 0.0 && value.is_sign_negative() {
            return self.emit_float(value);
        }

        // Whole numbers in integer range collapse to integers. The bounds
        // are exact f64 values; anything at or beyond 2^64 stays a float.
        const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
        const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
        if value.fract() == 0.0 {
            if (-TWO_POW_63..TWO_POW_63).contains(&value) {
                return self.emit_signed_int(value as i64);
            }
            if (TWO_POW_63..TWO_POW_64).contains(&value) {
                return self.emit_unsigned_int(value as u64);
            }
        }

        self.emit_float(value)
    }

    /// Write a float using the optimal width (32 or 64 bit).
    #[allow(clippy::cast_possible_truncation)]
    fn emit_float(&mut self, value: f64) -> Result<()> {
        // Use f32 if the round-trip is bit-exact
        let f32_val = value as f32;
        #[allow(clippy::float_cmp)]
        if f64::from(f32_val) == value {
            let mut buf = [0u8; 5];
            buf[0] = type_code::FLOAT32;
            buf[1..5].copy_from_slice(&f32_val.to_le_bytes());
            return self.write_bytes(&buf);
        }

        let mut buf = [0u8; 9];
        buf[0] = type_code::FLOAT64;
        buf[1..9].copy_from_slice(&value.to_le_bytes());
        self.write_bytes(&buf)
    }

    /// Write the BigNumber payload (type code + exponent + signed_length + magnitude).
    #[allow(clippy::cast_possible_wrap)]
    fn emit_big_number(&mut self, value: BigNumber) -> Result<()> {
        if value.exponent.unsigned_abs() > crate::types::limits::MAX_BIGNUMBER_EXPONENT {
            return Err(Error::ValueOutOfRange);
        }

        self.write_byte(type_code::BIG_NUMBER)?;

        // Encode exponent as zigzag LEB128
        let mut buf = [0u8; 10];
        let n = leb128_encode(zigzag_encode(value.exponent), &mut buf);
        self.write_bytes(&buf[..n])?;

        if value.significand == 0 {
            // Zero significand: signed_length = 0, no magnitude bytes
            return self.write_byte(0x00);
        }

        // Convert significand to LE bytes and find normalized length
        let sig_bytes = value.significand.to_le_bytes();
        let byte_count = 8 - sig_bytes.iter().rev().take_while(|&&b| b == 0).count();

        // Encode signed_length: positive byte_count for positive, negative for negative
        let signed_length: i64 = if value.sign < 0 {
            -(byte_count as i64)
        } else {
            byte_count as i64
        };
        let n = leb128_encode(zigzag_encode(signed_length), &mut buf);
        self.write_bytes(&buf[..n])?;

        // Write raw LE magnitude bytes
        self.write_bytes(&sig_bytes[..byte_count])
    }

    /// Write a string value (short inline or FF-delimited long form).
    #[allow(clippy::cast_possible_truncation)]
    fn emit_str(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let len = bytes.len();

        if len > self.config.max_string_length {
            return Err(Error::MaxStringLengthExceeded);
        }
        if self.config.reject_nul && utf8::contains_nul(bytes) {
            return Err(Error::NulCharacter);
        }

        if len <= 15 {
            self.write_byte(type_code::STRING0 + len as u8)?;
            self.write_bytes(bytes)
        } else {
            // Long string: FF + data + FF
            self.write_byte(type_code::STRING_LONG)?;
            self.write_bytes(bytes)?;
            self.write_byte(type_code::STRING_LONG)
        }
    }
}

// =============================================================================
// Utility functions
// =============================================================================

/// Calculate the number of bytes required to store an unsigned integer (minimum 1).
#[inline]
fn required_unsigned_bytes_min1(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    (bits + 7) / 8
}

/// Calculate the number of bytes required to store a signed integer (minimum 1).
#[inline]
fn required_signed_bytes_min1(value: i64) -> usize {
    if value == 0 {
        return 1;
    }

    let redundant = if value < 0 {
        value.leading_ones() as usize
    } else {
        value.leading_zeros() as usize
    };

    // We need at least one sign bit, so subtract 1 from redundant count
    let significant_bits = 64 - redundant + 1;
    (significant_bits + 7) / 8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_i64(value: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_i64(value).unwrap();
        drop(enc);
        buf
    }

    fn encode_u64(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_u64(value).unwrap();
        drop(enc);
        buf
    }

    fn encode_f64(value: f64) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_f64(value).unwrap();
        drop(enc);
        buf
    }

    #[test]
    fn test_required_unsigned_bytes() {
        assert_eq!(required_unsigned_bytes_min1(0), 1);
        assert_eq!(required_unsigned_bytes_min1(255), 1);
        assert_eq!(required_unsigned_bytes_min1(256), 2);
        assert_eq!(required_unsigned_bytes_min1(0xffff), 2);
        assert_eq!(required_unsigned_bytes_min1(0x10000), 3);
        assert_eq!(required_unsigned_bytes_min1(u64::MAX), 8);
    }

    #[test]
    fn test_required_signed_bytes() {
        assert_eq!(required_signed_bytes_min1(0), 1);
        assert_eq!(required_signed_bytes_min1(127), 1);
        assert_eq!(required_signed_bytes_min1(128), 2);
        assert_eq!(required_signed_bytes_min1(-1), 1);
        assert_eq!(required_signed_bytes_min1(-128), 1);
        assert_eq!(required_signed_bytes_min1(-129), 2);
    }

    #[test]
    fn test_encode_small_ints() {
        assert_eq!(encode_i64(0), vec![0x64]);
        assert_eq!(encode_i64(42), vec![0x8e]);
        assert_eq!(encode_i64(100), vec![0xc8]);
        assert_eq!(encode_i64(-100), vec![0x00]);
        assert_eq!(encode_i64(-1), vec![0x63]);
    }

    #[test]
    fn test_encode_larger_ints() {
        // -101 as sint8 (0xe4): just outside the small int range
        assert_eq!(encode_i64(-101), vec![0xe4, 0x9b]);

        // 1000 as sint16 (0xe5): native size for 2 bytes
        assert_eq!(encode_i64(1000), vec![0xe5, 0xe8, 0x03]);

        // 180 as uint8 (0xe0): sign bit set at 1 byte
        assert_eq!(encode_u64(180), vec![0xe0, 0xb4]);

        // 127 would fit signed in 1 byte; sign bit clear, so sint8
        assert_eq!(encode_i64(127), vec![0xe4, 0x7f]);

        // i64::MIN as sint64
        let bytes = encode_i64(i64::MIN);
        assert_eq!(bytes[0], 0xe7);
        assert_eq!(&bytes[1..], i64::MIN.to_le_bytes());

        // u64::MAX as uint64
        let bytes = encode_u64(u64::MAX);
        assert_eq!(bytes[0], 0xe3);
        assert_eq!(&bytes[1..], u64::MAX.to_le_bytes());
    }

    #[test]
    fn test_width_minimality() {
        // Every boundary picks the smallest native width with the right signedness
        let cases: [(i64, usize); 8] = [
            (101, 2),          // sint8
            (-128, 2),         // sint8
            (-129, 3),         // sint16
            (32767, 3),        // sint16
            (32768, 3),        // uint16 (msb set at 2 bytes)
            (65536, 5),        // sint32
            (0x8000_0000, 5),  // uint32
            (0x1_0000_0000, 9) // sint64
        ];
        for (value, expected_len) in cases {
            assert_eq!(encode_i64(value).len(), expected_len, "value {value}");
        }
    }

    #[test]
    fn test_encode_null_bool() {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_null().unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xcd]);

        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_bool(true).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xcf]);

        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_bool(false).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xce]);
    }

    #[test]
    fn test_encode_floats() {
        // 1.5 fits f32 exactly
        assert_eq!(encode_f64(1.5), vec![0xcb, 0x00, 0x00, 0xc0, 0x3f]);

        // Pi needs f64
        let bytes = encode_f64(std::f64::consts::PI);
        assert_eq!(bytes[0], 0xcc);
        assert_eq!(&bytes[1..], std::f64::consts::PI.to_le_bytes());

        // Integer-valued floats collapse to integers
        assert_eq!(encode_f64(42.0), vec![0x8e]);

        // Negative zero stays f32
        assert_eq!(encode_f64(-0.0), vec![0xcb, 0x00, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn test_encode_short_string() {
        // Empty string: 0xd0
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_str("").unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xd0]);

        // "hi": 0xd2 + bytes
        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_str("hi").unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xd2, b'h', b'i']);

        // "hello world!" (12 bytes): 0xdc + bytes
        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_str("hello world!").unwrap();
        drop(enc);
        assert_eq!(buf[0], 0xdc);
        assert_eq!(&buf[1..], b"hello world!");
    }

    #[test]
    fn test_encode_long_string() {
        // 16-byte string → FF + data + FF
        let s = "abcdefghijklmnop";
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_str(s).unwrap();
        drop(enc);
        assert_eq!(buf[0], 0xff);
        assert_eq!(&buf[1..17], s.as_bytes());
        assert_eq!(buf[17], 0xff);
    }

    #[test]
    fn test_encode_empty_containers() {
        // Empty array: FC FE
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.begin_array().unwrap();
        enc.end_container().unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xfc, 0xfe]);

        // Empty object: FD FE
        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.begin_object().unwrap();
        enc.end_container().unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xfd, 0xfe]);
    }

    #[test]
    fn test_encode_array_with_values() {
        // [1, 2, 3] → FC 65 66 67 FE
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.begin_array().unwrap();
        enc.write_i64(1).unwrap();
        enc.write_i64(2).unwrap();
        enc.write_i64(3).unwrap();
        enc.end_container().unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xfc, 0x65, 0x66, 0x67, 0xfe]);
    }

    #[test]
    fn test_encode_object() {
        // {"a": true} → FD D1 61 CF FE
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.begin_object().unwrap();
        enc.write_str("a").unwrap();
        enc.write_bool(true).unwrap();
        enc.end_container().unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xfd, 0xd1, b'a', 0xcf, 0xfe]);
    }

    #[test]
    fn test_batch_arrays() {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_i64_array(&[1, 2, 3]).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xfc, 0x65, 0x66, 0x67, 0xfe]);

        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_f64_array(&[1.5]).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xfc, 0xcb, 0x00, 0x00, 0xc0, 0x3f, 0xfe]);

        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_str_array(&["a", "b"]).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xfc, 0xd1, b'a', 0xd1, b'b', 0xfe]);
    }

    #[test]
    fn test_end_all_containers() {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.begin_array().unwrap();
        enc.begin_object().unwrap();
        enc.write_str("k").unwrap();
        enc.begin_array().unwrap();
        enc.end_all_containers().unwrap();
        enc.finish().unwrap();
        assert_eq!(buf, vec![0xfc, 0xfd, 0xd1, b'k', 0xfc, 0xfe, 0xfe, 0xfe]);
    }

    #[test]
    fn test_state_machine_violations() {
        // Non-string at key position
        let mut enc = Encoder::new(Vec::new());
        enc.begin_object().unwrap();
        assert_eq!(enc.write_i64(1), Err(Error::ExpectedObjectKey));

        // Close while a value is pending
        let mut enc = Encoder::new(Vec::new());
        enc.begin_object().unwrap();
        enc.write_str("k").unwrap();
        assert_eq!(enc.end_container(), Err(Error::ExpectedObjectValue));

        // Close with nothing open
        let mut enc = Encoder::new(Vec::new());
        assert_eq!(enc.end_container(), Err(Error::UnbalancedContainers));

        // Value after the root completes
        let mut enc = Encoder::new(Vec::new());
        enc.write_null().unwrap();
        assert_eq!(enc.write_null(), Err(Error::TrailingBytes));
    }

    #[test]
    fn test_poisoned_after_error() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_object().unwrap();
        assert!(enc.write_i64(1).is_err());
        // A write that would otherwise be legal also fails now
        assert!(enc.write_str("k").is_err());
    }

    #[test]
    fn test_unclosed_container() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_array().unwrap();
        assert_eq!(enc.finish().unwrap_err(), Error::UnclosedContainers);
    }

    #[test]
    fn test_nan_infinity_rejected() {
        let mut enc = Encoder::new(Vec::new());
        assert!(enc.write_f64(f64::NAN).is_err());

        let mut enc = Encoder::new(Vec::new());
        assert!(enc.write_f64(f64::INFINITY).is_err());

        let mut enc = Encoder::new(Vec::new());
        assert!(enc.write_f64(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_nul_rejected_in_strings() {
        let mut enc = Encoder::new(Vec::new());
        assert_eq!(enc.write_str("a\0b"), Err(Error::NulCharacter));

        let config = EncoderConfig {
            reject_nul: false,
            ..EncoderConfig::default()
        };
        let mut buf = Vec::new();
        let mut enc = Encoder::with_config(&mut buf, config);
        enc.write_str("a\0b").unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xd3, b'a', 0x00, b'b']);
    }

    #[test]
    fn test_depth_limit() {
        let config = EncoderConfig {
            max_depth: 3,
            ..EncoderConfig::default()
        };
        let mut enc = Encoder::with_config(Vec::new(), config);
        enc.begin_array().unwrap();
        enc.begin_array().unwrap();
        enc.begin_array().unwrap();
        assert_eq!(enc.begin_array(), Err(Error::MaxDepthExceeded));
    }

    #[test]
    fn test_container_size_limit() {
        let config = EncoderConfig {
            max_container_size: 2,
            ..EncoderConfig::default()
        };
        let mut enc = Encoder::with_config(Vec::new(), config);
        enc.begin_array().unwrap();
        enc.write_i64(1).unwrap();
        enc.write_i64(2).unwrap();
        assert_eq!(enc.write_i64(3), Err(Error::MaxContainerSizeExceeded));
    }

    #[test]
    fn test_document_size_limit() {
        let config = EncoderConfig {
            max_document_size: 4,
            ..EncoderConfig::default()
        };
        let mut enc = Encoder::with_config(Vec::new(), config);
        assert_eq!(enc.write_str("hello"), Err(Error::MaxDocumentSizeExceeded));
    }

    #[test]
    fn test_big_number_wire() {
        // 15 × 10^5: exponent 5 → zigzag 10 (0x0a), signed_length 1 → zigzag 2 (0x02)
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_big_number(BigNumber::new(1, 15, 5)).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xca, 0x0a, 0x02, 0x0f]);

        // -15 × 10^5: signed_length -1 → zigzag 1 (0x01)
        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_big_number(BigNumber::new(-1, 15, 5)).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xca, 0x0a, 0x01, 0x0f]);

        // Zero: exponent 0, signed_length 0, no magnitude
        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_big_number(BigNumber::zero()).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xca, 0x00, 0x00]);

        // Magnitude is normalized: 0x0100 needs exactly 2 bytes
        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        enc.write_big_number(BigNumber::new(1, 0x0100, 0)).unwrap();
        drop(enc);
        assert_eq!(buf, vec![0xca, 0x00, 0x04, 0x00, 0x01]);
    }
}
