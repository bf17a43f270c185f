// ABOUTME: High-performance BONJSON binary decoder.
// ABOUTME: Single-pass pull decoder with a visitor API layered on top.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::error::{Error, Result};
use crate::types::{leb128_decode, limits, type_code, zigzag_decode, BigNumber};
use crate::utf8;

/// Configuration options for the decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Reject NUL characters in strings (default: true)
    pub reject_nul: bool,
    /// Validate string bytes as UTF-8 during scanning (default: true).
    /// The streaming decoder always validates, since it hands out `&str`.
    pub reject_invalid_utf8: bool,
    /// Reject duplicate object keys (default: true)
    pub reject_duplicate_keys: bool,
    /// Reject unconsumed bytes after the root value (default: true)
    pub reject_trailing_bytes: bool,
    /// Reject NaN and Infinity float values (default: true)
    pub reject_nan_infinity: bool,
    /// Maximum container nesting depth
    pub max_depth: usize,
    /// Maximum elements in a container
    pub max_container_size: usize,
    /// Maximum string length in bytes
    pub max_string_length: usize,
    /// Maximum document size in bytes
    pub max_document_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            reject_nul: true,
            reject_invalid_utf8: true,
            reject_duplicate_keys: true,
            reject_trailing_bytes: true,
            reject_nan_infinity: true,
            max_depth: limits::MAX_DEPTH,
            max_container_size: limits::MAX_CONTAINER_SIZE,
            max_string_length: limits::MAX_STRING_LENGTH,
            max_document_size: limits::MAX_DOCUMENT_SIZE,
        }
    }
}

/// The type of value that was decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    BigNumber(BigNumber),
    String(&'a str),
    ArrayStart,
    ObjectStart,
    ContainerEnd,
}

/// Container state for the decode stack.
enum ContainerState {
    Array {
        element_count: usize,
    },
    Object {
        expecting_key: bool,
        element_count: usize,
        /// (offset, len) of each key seen, for duplicate detection
        keys: Vec<(usize, usize)>,
    },
    /// A typed array being expanded element by element
    TypedArray {
        elem_code: u8,
        remaining: u64,
    },
    /// A record instance being expanded pair by pair
    Record {
        def_index: usize,
        next_key: usize,
        expecting_key: bool,
    },
}

/// Callbacks invoked by [`Decoder::parse`] in document order.
///
/// Each callback returns a status; any error aborts decoding and propagates
/// to the caller unchanged.
pub trait Visitor {
    fn on_null(&mut self) -> Result<()>;
    fn on_bool(&mut self, value: bool) -> Result<()>;
    fn on_signed_int(&mut self, value: i64) -> Result<()>;
    fn on_unsigned_int(&mut self, value: u64) -> Result<()>;
    fn on_float(&mut self, value: f64) -> Result<()>;
    fn on_big_number(&mut self, value: BigNumber) -> Result<()>;
    fn on_string(&mut self, value: &str) -> Result<()>;
    fn on_begin_array(&mut self) -> Result<()>;
    fn on_begin_object(&mut self) -> Result<()>;
    fn on_end_container(&mut self) -> Result<()>;

    /// Called once after the root value and all trailing checks complete.
    fn on_end_data(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A BONJSON decoder that reads from a byte slice.
///
/// Strings are borrowed slices of the input buffer, which must outlive the
/// decoder.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    config: DecoderConfig,
    containers: Vec<ContainerState>,
    /// Key slices of each record definition seen so far
    record_defs: Vec<Vec<(usize, usize)>>,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder for the given data.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, DecoderConfig::default())
    }

    /// Create a new decoder with custom configuration.
    #[must_use]
    pub fn with_config(data: &'a [u8], config: DecoderConfig) -> Self {
        Self {
            data,
            pos: 0,
            config,
            containers: Vec::new(),
            record_defs: Vec::new(),
        }
    }

    /// Check document size limit (called once at start of decoding).
    #[inline]
    pub fn check_document_size(&self) -> Result<()> {
        if self.data.len() > self.config.max_document_size {
            return Err(Error::MaxDocumentSizeExceeded);
        }
        Ok(())
    }

    /// Get the current position in the input.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current container nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    /// Check if we've reached the end of input.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get the decoder configuration.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Read a single byte, advancing position.
    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        if self.pos >= self.data.len() {
            return Err(Error::incomplete());
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read exactly n bytes.
    #[inline]
    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(Error::incomplete());
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read an unsigned LEB128 value.
    fn read_uleb128(&mut self) -> Result<u64> {
        let remaining = &self.data[self.pos..];
        match leb128_decode(remaining) {
            Some((value, consumed)) => {
                self.pos += consumed;
                Ok(value)
            }
            // With 10+ bytes available the only failure is overflow
            None if remaining.len() >= 10 => Err(Error::ValueOutOfRange),
            None => Err(Error::incomplete()),
        }
    }

    /// Read a zigzag LEB128 value.
    #[inline]
    fn read_zigzag(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.read_uleb128()?))
    }

    /// Whether the next value from the input must be an object key.
    #[inline]
    fn at_key_position(&self) -> bool {
        matches!(
            self.containers.last(),
            Some(ContainerState::Object { expecting_key: true, .. })
        )
    }

    /// Account for one completed value or key in the current container.
    fn value_completed(&mut self) -> Result<()> {
        match self.containers.last_mut() {
            Some(ContainerState::Array { element_count }) => {
                *element_count += 1;
                if *element_count > self.config.max_container_size {
                    return Err(Error::MaxContainerSizeExceeded);
                }
            }
            Some(ContainerState::Object {
                expecting_key,
                element_count,
                ..
            }) => {
                *expecting_key = !*expecting_key;
                *element_count += 1;
                if *element_count > self.config.max_container_size {
                    return Err(Error::MaxContainerSizeExceeded);
                }
            }
            Some(ContainerState::Record { expecting_key, .. }) => {
                *expecting_key = !*expecting_key;
            }
            _ => {}
        }
        Ok(())
    }

    /// Decode the next value from the input.
    ///
    /// Containers produce `ArrayStart`/`ObjectStart`, then their children in
    /// order, then `ContainerEnd`. Typed arrays and record instances are
    /// expanded into the same event stream.
    pub fn decode_value(&mut self) -> Result<DecodedValue<'a>> {
        // Events synthesized from container state rather than a type code
        match self.containers.last() {
            Some(ContainerState::TypedArray { .. }) => {
                return self.next_typed_array_event();
            }
            Some(ContainerState::Record { expecting_key, .. }) => {
                if *expecting_key {
                    return self.next_record_key_event();
                }
                if self.peek_byte()? == type_code::CONTAINER_END {
                    // Values ran out before the keys did: fill with null.
                    // The end marker stays put until every key is emitted.
                    self.value_completed()?;
                    return Ok(DecodedValue::Null);
                }
            }
            _ => {}
        }

        let mut tc = self.read_type_code()?;

        // Record definitions are transparent: register and move on
        while tc == type_code::RECORD_DEF {
            if self.at_key_position() {
                return Err(Error::ExpectedObjectKey);
            }
            self.read_record_def()?;
            tc = self.read_type_code()?;
        }

        if self.at_key_position()
            && !type_code::is_any_string(tc)
            && tc != type_code::CONTAINER_END
        {
            return Err(Error::ExpectedObjectKey);
        }

        self.decode_value_with_type_code(tc)
    }

    /// Read the next type code, distinguishing exhausted input at container
    /// level (unclosed) from a truncated document.
    #[inline]
    fn read_type_code(&mut self) -> Result<u8> {
        if self.pos >= self.data.len() {
            return Err(if self.containers.is_empty() {
                Error::incomplete()
            } else {
                Error::UnclosedContainers
            });
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn peek_byte(&self) -> Result<u8> {
        if self.pos >= self.data.len() {
            return Err(if self.containers.is_empty() {
                Error::incomplete()
            } else {
                Error::UnclosedContainers
            });
        }
        Ok(self.data[self.pos])
    }

    /// Decode a value given its type code.
    #[allow(clippy::cast_possible_wrap)]
    fn decode_value_with_type_code(&mut self, tc: u8) -> Result<DecodedValue<'a>> {
        // Small integers: 0x00-0xc8 (value = tc - 100)
        if type_code::is_small_int(tc) {
            self.value_completed()?;
            return Ok(DecodedValue::Int(type_code::small_int_value(tc)));
        }

        // All integers (signed and unsigned): 0xe0-0xe7
        // Combined check is more efficient than separate unsigned/signed checks
        if type_code::is_any_int(tc) {
            let size = type_code::int_size(tc);
            return if type_code::int_is_signed(tc) {
                let val = self.read_signed_int_sized(size)?;
                self.value_completed()?;
                Ok(DecodedValue::Int(val))
            } else {
                let val = self.read_unsigned_int_sized(size)?;
                self.value_completed()?;
                Ok(DecodedValue::UInt(val))
            };
        }

        // Strings: 0xd0-0xdf short, 0xff long
        if type_code::is_any_string(tc) {
            let is_key = self.at_key_position();
            let (s, offset) = self.read_string(tc)?;
            if is_key {
                self.track_object_key(offset, s.len())?;
            }
            self.value_completed()?;
            return Ok(DecodedValue::String(s));
        }

        if type_code::is_typed_array(tc) {
            return self.begin_typed_array(tc);
        }

        match tc {
            type_code::BIG_NUMBER => {
                let bn = self.decode_big_number()?;
                self.value_completed()?;
                Ok(DecodedValue::BigNumber(bn))
            }
            type_code::FLOAT32 => {
                let f = self.read_float32()?;
                self.value_completed()?;
                Ok(DecodedValue::Float(f))
            }
            type_code::FLOAT64 => {
                let f = self.read_float64()?;
                self.value_completed()?;
                Ok(DecodedValue::Float(f))
            }
            type_code::NULL => {
                self.value_completed()?;
                Ok(DecodedValue::Null)
            }
            type_code::FALSE => {
                self.value_completed()?;
                Ok(DecodedValue::Bool(false))
            }
            type_code::TRUE => {
                self.value_completed()?;
                Ok(DecodedValue::Bool(true))
            }
            type_code::ARRAY => {
                self.push_container(ContainerState::Array { element_count: 0 })?;
                Ok(DecodedValue::ArrayStart)
            }
            type_code::OBJECT => {
                self.push_container(ContainerState::Object {
                    expecting_key: true,
                    element_count: 0,
                    keys: Vec::new(),
                })?;
                Ok(DecodedValue::ObjectStart)
            }
            type_code::CONTAINER_END => self.end_container_event(),
            type_code::RECORD_INSTANCE => self.begin_record_instance(),
            _ => Err(Error::invalid_type_code(tc)),
        }
    }

    fn push_container(&mut self, state: ContainerState) -> Result<()> {
        if self.containers.len() >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        self.containers.push(state);
        Ok(())
    }

    /// Handle a 0xFE marker: pop the container and emit the end event.
    fn end_container_event(&mut self) -> Result<DecodedValue<'a>> {
        match self.containers.pop() {
            None => Err(Error::UnbalancedContainers),
            Some(ContainerState::Object {
                expecting_key: false,
                ..
            }) => Err(Error::ExpectedObjectValue),
            Some(_) => {
                self.value_completed()?;
                Ok(DecodedValue::ContainerEnd)
            }
        }
    }

    /// Record an object key and check it against the keys seen so far.
    fn track_object_key(&mut self, offset: usize, len: usize) -> Result<()> {
        if !self.config.reject_duplicate_keys {
            return Ok(());
        }
        let data = self.data;
        let Some(ContainerState::Object { keys, .. }) = self.containers.last_mut() else {
            return Ok(());
        };
        if keys.len() >= limits::MAX_TRACKED_KEYS {
            return Err(Error::TooManyKeys);
        }
        let key = &data[offset..offset + len];
        for &(o, l) in keys.iter() {
            if &data[o..o + l] == key {
                return Err(Error::DuplicateKey);
            }
        }
        keys.push((offset, len));
        Ok(())
    }

    /// Read an unsigned integer of given byte size.
    #[inline]
    fn read_unsigned_int_sized(&mut self, size: usize) -> Result<u64> {
        let bytes = self.read_bytes(size)?;
        let mut buf = [0u8; 8];
        buf[..size].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a signed integer of given byte size, sign-extending.
    #[inline]
    fn read_signed_int_sized(&mut self, size: usize) -> Result<i64> {
        let bytes = self.read_bytes(size)?;
        let sign_bit = (bytes[size - 1] >> 7) & 1;
        let fill: u8 = if sign_bit == 1 { 0xff } else { 0x00 };
        let mut buf = [fill; 8];
        buf[..size].copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    /// Read a float32 value.
    #[inline]
    fn read_float32(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(4)?;
        let value = f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        self.check_float(value)?;
        Ok(value)
    }

    /// Read a float64 value.
    #[inline]
    fn read_float64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        let value = f64::from_le_bytes(buf);
        self.check_float(value)?;
        Ok(value)
    }

    /// Check if a float value is allowed.
    #[inline]
    fn check_float(&self, value: f64) -> Result<()> {
        if self.config.reject_nan_infinity && !value.is_finite() {
            return Err(Error::invalid_data("NaN or Infinity not allowed"));
        }
        Ok(())
    }

    /// Read a string given its type code. Returns the string and its byte
    /// offset in the input.
    fn read_string(&mut self, tc: u8) -> Result<(&'a str, usize)> {
        let (offset, len) = self.read_string_slice(tc)?;
        let bytes = &self.data[offset..offset + len];
        let s = utf8::to_str_checked(bytes, self.config.reject_nul)?;
        Ok((s, offset))
    }

    /// Locate string content for a string type code without validating it.
    /// Short strings carry their length in the code; long strings run to the
    /// next 0xFF (which cannot occur inside well-formed UTF-8).
    fn read_string_slice(&mut self, tc: u8) -> Result<(usize, usize)> {
        if type_code::is_short_string(tc) {
            let len = type_code::short_string_len(tc);
            if len > self.config.max_string_length {
                return Err(Error::MaxStringLengthExceeded);
            }
            let offset = self.pos;
            if offset + len > self.data.len() {
                return Err(Error::incomplete());
            }
            self.pos += len;
            return Ok((offset, len));
        }

        // Long string: scan for the terminator, but no further than the
        // length limit allows
        let start = self.pos;
        let window_end = self
            .data
            .len()
            .min(start.saturating_add(self.config.max_string_length).saturating_add(1));
        match memchr::memchr(type_code::STRING_LONG, &self.data[start..window_end]) {
            Some(rel) => {
                if rel > self.config.max_string_length {
                    return Err(Error::MaxStringLengthExceeded);
                }
                self.pos = start + rel + 1;
                Ok((start, rel))
            }
            None if window_end < self.data.len() => Err(Error::MaxStringLengthExceeded),
            None => Err(Error::incomplete()),
        }
    }

    /// Decode a `BigNumber` payload.
    fn decode_big_number(&mut self) -> Result<BigNumber> {
        let exponent = self.read_zigzag()?;
        if exponent.unsigned_abs() > limits::MAX_BIGNUMBER_EXPONENT {
            return Err(Error::ValueOutOfRange);
        }

        let signed_length = self.read_zigzag()?;
        if signed_length == 0 {
            return Ok(BigNumber::new(1, 0, exponent));
        }

        let len = signed_length.unsigned_abs() as usize;
        if len > limits::MAX_BIGNUMBER_MAGNITUDE {
            return Err(Error::ValueOutOfRange);
        }

        let bytes = self.read_bytes(len)?;
        let mut buf = [0u8; 8];
        buf[..len].copy_from_slice(bytes);
        let significand = u64::from_le_bytes(buf);
        let sign = if signed_length < 0 { -1 } else { 1 };
        Ok(BigNumber::new(sign, significand, exponent))
    }

    // -------------------------------------------------------------------------
    // Typed arrays
    // -------------------------------------------------------------------------

    /// Begin expanding a typed array into ArrayStart + elements + ContainerEnd.
    fn begin_typed_array(&mut self, tc: u8) -> Result<DecodedValue<'a>> {
        let count = self.read_uleb128()?;
        if count > self.config.max_container_size as u64 {
            return Err(Error::MaxContainerSizeExceeded);
        }
        let elem_size = type_code::typed_array_element_size(tc) as u64;
        // Cheap truncation check up front: every element must be present
        if count.saturating_mul(elem_size) > (self.data.len() - self.pos) as u64 {
            return Err(Error::incomplete());
        }
        self.push_container(ContainerState::TypedArray {
            elem_code: tc,
            remaining: count,
        })?;
        Ok(DecodedValue::ArrayStart)
    }

    /// Produce the next element (or end) of the typed array on top of the stack.
    fn next_typed_array_event(&mut self) -> Result<DecodedValue<'a>> {
        let Some(ContainerState::TypedArray {
            elem_code,
            remaining,
        }) = self.containers.last_mut()
        else {
            unreachable!()
        };

        if *remaining == 0 {
            self.containers.pop();
            self.value_completed()?;
            return Ok(DecodedValue::ContainerEnd);
        }
        *remaining -= 1;
        let code = *elem_code;

        let size = type_code::typed_array_element_size(code);
        if type_code::typed_array_is_float(code) {
            return Ok(DecodedValue::Float(if size == 4 {
                self.read_float32()?
            } else {
                self.read_float64()?
            }));
        }
        if type_code::typed_array_is_signed_int(code) {
            return Ok(DecodedValue::Int(self.read_signed_int_sized(size)?));
        }
        Ok(DecodedValue::UInt(self.read_unsigned_int_sized(size)?))
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    /// Read a record definition: ULEB128 key count followed by that many strings.
    fn read_record_def(&mut self) -> Result<()> {
        if self.record_defs.len() >= limits::MAX_RECORD_DEFINITIONS {
            return Err(Error::invalid_data("too many record definitions"));
        }
        let count = self.read_uleb128()?;
        if count > (self.config.max_container_size / 2) as u64 {
            return Err(Error::MaxContainerSizeExceeded);
        }
        let count = count as usize;
        if self.config.reject_duplicate_keys && count > limits::MAX_TRACKED_KEYS {
            return Err(Error::TooManyKeys);
        }

        // Capacity is clamped: the count is attacker-controlled
        let mut keys: Vec<(usize, usize)> = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let tc = self.read_byte()?;
            if !type_code::is_any_string(tc) {
                return Err(Error::ExpectedObjectKey);
            }
            let (s, offset) = self.read_string(tc)?;
            let key = (offset, s.len());
            if self.config.reject_duplicate_keys {
                let bytes = &self.data[offset..offset + s.len()];
                for &(o, l) in &keys {
                    if &self.data[o..o + l] == bytes {
                        return Err(Error::DuplicateKey);
                    }
                }
            }
            keys.push(key);
        }
        self.record_defs.push(keys);
        Ok(())
    }

    /// Begin expanding a record instance into ObjectStart + pairs + ContainerEnd.
    fn begin_record_instance(&mut self) -> Result<DecodedValue<'a>> {
        let def_index = self.read_uleb128()? as usize;
        if def_index >= self.record_defs.len() {
            return Err(Error::invalid_data("unknown record definition"));
        }
        self.push_container(ContainerState::Record {
            def_index,
            next_key: 0,
            expecting_key: true,
        })?;
        Ok(DecodedValue::ObjectStart)
    }

    /// Produce the next synthesized key (or end) of the record on top of the stack.
    fn next_record_key_event(&mut self) -> Result<DecodedValue<'a>> {
        let Some(ContainerState::Record {
            def_index,
            next_key,
            expecting_key,
        }) = self.containers.last_mut()
        else {
            unreachable!()
        };
        let def_index = *def_index;
        let key_index = *next_key;

        if key_index == self.record_defs[def_index].len() {
            // All pairs emitted; the instance must close now
            let tc = self.read_type_code()?;
            if tc != type_code::CONTAINER_END {
                return Err(Error::invalid_data("record instance has surplus values"));
            }
            self.containers.pop();
            self.value_completed()?;
            return Ok(DecodedValue::ContainerEnd);
        }

        *next_key = key_index + 1;
        *expecting_key = false;
        let (offset, len) = self.record_defs[def_index][key_index];
        let bytes = &self.data[offset..offset + len];
        // Validated when the definition was read
        let s = utf8::to_str(bytes)?;
        Ok(DecodedValue::String(s))
    }

    // -------------------------------------------------------------------------
    // Driving
    // -------------------------------------------------------------------------

    /// Decode one complete document, invoking the visitor for each value in
    /// document order, then run the end-of-document checks.
    pub fn parse<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        self.check_document_size()?;
        loop {
            match self.decode_value()? {
                DecodedValue::Null => visitor.on_null()?,
                DecodedValue::Bool(b) => visitor.on_bool(b)?,
                DecodedValue::Int(n) => visitor.on_signed_int(n)?,
                DecodedValue::UInt(n) => visitor.on_unsigned_int(n)?,
                DecodedValue::Float(f) => visitor.on_float(f)?,
                DecodedValue::BigNumber(bn) => visitor.on_big_number(bn)?,
                DecodedValue::String(s) => visitor.on_string(s)?,
                DecodedValue::ArrayStart => visitor.on_begin_array()?,
                DecodedValue::ObjectStart => visitor.on_begin_object()?,
                DecodedValue::ContainerEnd => visitor.on_end_container()?,
            }
            if self.containers.is_empty() {
                break;
            }
        }
        self.finish()?;
        visitor.on_end_data()
    }

    /// Finish decoding and check for errors.
    pub fn finish(&self) -> Result<()> {
        if !self.containers.is_empty() {
            return Err(Error::UnclosedContainers);
        }
        if self.config.reject_trailing_bytes && self.pos < self.data.len() {
            return Err(Error::TrailingBytes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_small_ints() {
        // 0x64 → 0
        let mut dec = Decoder::new(&[0x64]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(0));

        // 0xc8 → 100
        let mut dec = Decoder::new(&[0xc8]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(100));

        // 0x00 → -100
        let mut dec = Decoder::new(&[0x00]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(-100));

        // 0x63 → -1
        let mut dec = Decoder::new(&[0x63]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(-1));

        // 0x8e → 42
        let mut dec = Decoder::new(&[0x8e]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(42));
    }

    #[test]
    fn test_decode_larger_ints() {
        // sint8: -101
        let mut dec = Decoder::new(&[0xe4, 0x9b]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(-101));

        // sint16: 1000 little-endian
        let mut dec = Decoder::new(&[0xe5, 0xe8, 0x03]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(1000));

        // uint8: 180 (zero-extended)
        let mut dec = Decoder::new(&[0xe0, 0xb4]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::UInt(180));

        // sint32 sign extension: -70000
        let bytes = [&[0xe6u8][..], &(-70000i32).to_le_bytes()[..]].concat();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(-70000));

        // uint64: u64::MAX
        let bytes = [&[0xe3u8][..], &u64::MAX.to_le_bytes()[..]].concat();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::UInt(u64::MAX));
    }

    #[test]
    fn test_decode_null_bool() {
        let mut dec = Decoder::new(&[0xcd]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Null);

        let mut dec = Decoder::new(&[0xcf]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Bool(true));

        let mut dec = Decoder::new(&[0xce]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Bool(false));
    }

    #[test]
    fn test_decode_floats() {
        // f32 1.5
        let mut dec = Decoder::new(&[0xcb, 0x00, 0x00, 0xc0, 0x3f]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Float(1.5));

        // f64 pi
        let bytes = [&[0xccu8][..], &std::f64::consts::PI.to_le_bytes()[..]].concat();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(
            dec.decode_value().unwrap(),
            DecodedValue::Float(std::f64::consts::PI)
        );
    }

    #[test]
    fn test_nan_infinity_rejected_by_default() {
        let bytes = [&[0xccu8][..], &f64::NAN.to_le_bytes()[..]].concat();
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(dec.decode_value(), Err(Error::InvalidData(_))));

        let bytes = [&[0xcbu8][..], &f32::INFINITY.to_le_bytes()[..]].concat();
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(dec.decode_value(), Err(Error::InvalidData(_))));

        // Allowed when the flag is off
        let config = DecoderConfig {
            reject_nan_infinity: false,
            ..DecoderConfig::default()
        };
        let bytes = [&[0xccu8][..], &f64::NAN.to_le_bytes()[..]].concat();
        let mut dec = Decoder::with_config(&bytes, config);
        match dec.decode_value().unwrap() {
            DecodedValue::Float(f) => assert!(f.is_nan()),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_short_string() {
        // Empty string: 0xd0
        let mut dec = Decoder::new(&[0xd0]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String(""));

        // "hi": 0xd2
        let mut dec = Decoder::new(&[0xd2, b'h', b'i']);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("hi"));
    }

    #[test]
    fn test_decode_long_string() {
        let mut bytes = vec![0xff];
        bytes.extend_from_slice(b"abcdefghijklmnop");
        bytes.push(0xff);
        let mut dec = Decoder::new(&bytes);
        assert_eq!(
            dec.decode_value().unwrap(),
            DecodedValue::String("abcdefghijklmnop")
        );
        dec.finish().unwrap();
    }

    #[test]
    fn test_unterminated_long_string() {
        let mut dec = Decoder::new(&[0xff, b'a', b'b']);
        assert!(matches!(dec.decode_value(), Err(Error::Incomplete)));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut dec = Decoder::new(&[0xd2, 0xc0, 0xaf]); // overlong '/'
        assert!(matches!(dec.decode_value(), Err(Error::InvalidUtf8)));
    }

    #[test]
    fn test_nul_rejected() {
        let mut dec = Decoder::new(&[0xd1, 0x00]);
        assert!(matches!(dec.decode_value(), Err(Error::NulCharacter)));

        let config = DecoderConfig {
            reject_nul: false,
            ..DecoderConfig::default()
        };
        let mut dec = Decoder::with_config(&[0xd1, 0x00], config);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("\0"));
    }

    #[test]
    fn test_decode_empty_containers() {
        let mut dec = Decoder::new(&[0xfc, 0xfe]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ArrayStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);
        dec.finish().unwrap();

        let mut dec = Decoder::new(&[0xfd, 0xfe]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ObjectStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);
        dec.finish().unwrap();
    }

    #[test]
    fn test_decode_array_with_values() {
        // [1, 2, 3]
        let data = [0xfc, 0x65, 0x66, 0x67, 0xfe];
        let mut dec = Decoder::new(&data);

        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ArrayStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(1));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(2));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(3));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);
        dec.finish().unwrap();
    }

    #[test]
    fn test_decode_object() {
        // {"a": true}
        let data = [0xfd, 0xd1, b'a', 0xcf, 0xfe];
        let mut dec = Decoder::new(&data);

        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ObjectStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("a"));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Bool(true));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);
        dec.finish().unwrap();
    }

    #[test]
    fn test_object_key_must_be_string() {
        // {1: ...} is malformed
        let data = [0xfd, 0x65, 0x66, 0xfe];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ObjectStart);
        assert!(matches!(dec.decode_value(), Err(Error::ExpectedObjectKey)));
    }

    #[test]
    fn test_object_end_while_expecting_value() {
        let data = [0xfd, 0xd1, b'a', 0xfe];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ObjectStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("a"));
        assert!(matches!(dec.decode_value(), Err(Error::ExpectedObjectValue)));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        // {"a": 1, "a": 2}
        let data = [0xfd, 0xd1, b'a', 0x65, 0xd1, b'a', 0x66, 0xfe];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ObjectStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("a"));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(1));
        assert!(matches!(dec.decode_value(), Err(Error::DuplicateKey)));

        // Accepted when the flag is off
        let config = DecoderConfig {
            reject_duplicate_keys: false,
            ..DecoderConfig::default()
        };
        let mut dec = Decoder::with_config(&data, config);
        for _ in 0..6 {
            dec.decode_value().unwrap();
        }
        dec.finish().unwrap();
    }

    #[test]
    fn test_too_many_keys() {
        // An object with 257 distinct keys overflows the tracker
        let mut data = vec![0xfd];
        for i in 0..257u32 {
            let key = format!("k{i}");
            data.push(0xd0 + key.len() as u8);
            data.extend_from_slice(key.as_bytes());
            data.push(0x64); // value 0
        }
        data.push(0xfe);
        let mut dec = Decoder::new(&data);
        let result = loop {
            match dec.decode_value() {
                Ok(DecodedValue::ContainerEnd) => break Ok(()),
                Ok(_) => continue,
                Err(e) => break Err(e),
            }
        };
        assert_eq!(result, Err(Error::TooManyKeys));
    }

    #[test]
    fn test_nested_containers() {
        // {"a": [1, {"b": null}]}
        let data = [
            0xfd, 0xd1, b'a', 0xfc, 0x65, 0xfd, 0xd1, b'b', 0xcd, 0xfe, 0xfe, 0xfe,
        ];
        let mut dec = Decoder::new(&data);
        let expected = [
            DecodedValue::ObjectStart,
            DecodedValue::String("a"),
            DecodedValue::ArrayStart,
            DecodedValue::Int(1),
            DecodedValue::ObjectStart,
            DecodedValue::String("b"),
            DecodedValue::Null,
            DecodedValue::ContainerEnd,
            DecodedValue::ContainerEnd,
            DecodedValue::ContainerEnd,
        ];
        for want in expected {
            assert_eq!(dec.decode_value().unwrap(), want);
        }
        dec.finish().unwrap();
    }

    #[test]
    fn test_reserved_type_codes() {
        for code in [0xc9u8, 0xe8, 0xe9, 0xec, 0xfa, 0xfb] {
            let data = [code];
            let mut dec = Decoder::new(&data);
            assert_eq!(
                dec.decode_value(),
                Err(Error::InvalidTypeCode(code)),
                "code 0x{code:02x}"
            );
        }
    }

    #[test]
    fn test_unbalanced_container_end() {
        let mut dec = Decoder::new(&[0xfe]);
        assert!(matches!(dec.decode_value(), Err(Error::UnbalancedContainers)));
    }

    #[test]
    fn test_truncated_payload() {
        // Missing second byte of sint16
        let mut dec = Decoder::new(&[0xe5, 0xe8]);
        assert!(matches!(dec.decode_value(), Err(Error::Incomplete)));

        // Missing string content
        let mut dec = Decoder::new(&[0xd5, b'h', b'i']);
        assert!(matches!(dec.decode_value(), Err(Error::Incomplete)));
    }

    #[test]
    fn test_unclosed_container() {
        // Array start, one element, no end marker
        let mut dec = Decoder::new(&[0xfc, 0x65]);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ArrayStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(1));
        assert!(matches!(dec.decode_value(), Err(Error::UnclosedContainers)));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut dec = Decoder::new(&[0x64, 0x64]);
        dec.decode_value().unwrap();
        assert!(matches!(dec.finish(), Err(Error::TrailingBytes)));

        let config = DecoderConfig {
            reject_trailing_bytes: false,
            ..DecoderConfig::default()
        };
        let mut dec = Decoder::with_config(&[0x64, 0x64], config);
        dec.decode_value().unwrap();
        dec.finish().unwrap();
    }

    #[test]
    fn test_depth_limit() {
        let config = DecoderConfig {
            max_depth: 3,
            ..DecoderConfig::default()
        };
        let data = [0xfc, 0xfc, 0xfc, 0xfc];
        let mut dec = Decoder::with_config(&data, config);
        dec.decode_value().unwrap();
        dec.decode_value().unwrap();
        dec.decode_value().unwrap();
        assert!(matches!(dec.decode_value(), Err(Error::MaxDepthExceeded)));
    }

    #[test]
    fn test_container_size_limit() {
        let config = DecoderConfig {
            max_container_size: 2,
            ..DecoderConfig::default()
        };
        let data = [0xfc, 0x65, 0x66, 0x67, 0xfe];
        let mut dec = Decoder::with_config(&data, config);
        dec.decode_value().unwrap();
        dec.decode_value().unwrap();
        dec.decode_value().unwrap();
        assert!(matches!(
            dec.decode_value(),
            Err(Error::MaxContainerSizeExceeded)
        ));
    }

    #[test]
    fn test_string_length_limit() {
        let config = DecoderConfig {
            max_string_length: 4,
            ..DecoderConfig::default()
        };
        let mut dec = Decoder::with_config(&[0xd5, b'h', b'e', b'l', b'l', b'o'], config);
        assert!(matches!(
            dec.decode_value(),
            Err(Error::MaxStringLengthExceeded)
        ));
    }

    #[test]
    fn test_document_size_limit() {
        let config = DecoderConfig {
            max_document_size: 2,
            ..DecoderConfig::default()
        };
        let dec = Decoder::with_config(&[0xfc, 0x65, 0xfe], config);
        assert!(matches!(
            dec.check_document_size(),
            Err(Error::MaxDocumentSizeExceeded)
        ));
    }

    #[test]
    fn test_decode_big_number() {
        // 15 × 10^5
        let mut dec = Decoder::new(&[0xca, 0x0a, 0x02, 0x0f]);
        assert_eq!(
            dec.decode_value().unwrap(),
            DecodedValue::BigNumber(BigNumber::new(1, 15, 5))
        );

        // -15 × 10^5
        let mut dec = Decoder::new(&[0xca, 0x0a, 0x01, 0x0f]);
        assert_eq!(
            dec.decode_value().unwrap(),
            DecodedValue::BigNumber(BigNumber::new(-1, 15, 5))
        );

        // Zero significand, no magnitude bytes
        let mut dec = Decoder::new(&[0xca, 0x00, 0x00]);
        assert_eq!(
            dec.decode_value().unwrap(),
            DecodedValue::BigNumber(BigNumber::zero())
        );

        // Magnitude longer than 8 bytes is out of range (signed_length 9 → zigzag 18 = 0x12)
        let data = [0xca, 0x00, 0x12, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut dec = Decoder::new(&data);
        assert!(matches!(dec.decode_value(), Err(Error::ValueOutOfRange)));
    }

    #[test]
    fn test_decode_typed_array() {
        // uint8 typed array [1, 2, 3]: 0xf9, count 3, elements
        let data = [0xf9, 0x03, 0x01, 0x02, 0x03];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ArrayStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::UInt(1));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::UInt(2));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::UInt(3));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);
        dec.finish().unwrap();

        // sint16 typed array [-2]: sign extension applies
        let data = [0xf4, 0x01, 0xfe, 0xff];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ArrayStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(-2));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);

        // float32 typed array [1.5]
        let data = [0xf1, 0x01, 0x00, 0x00, 0xc0, 0x3f];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ArrayStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Float(1.5));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);
    }

    #[test]
    fn test_typed_array_truncated() {
        // Claims 4 u32 elements but only has bytes for one
        let data = [0xf7, 0x04, 0x01, 0x00, 0x00, 0x00];
        let mut dec = Decoder::new(&data);
        assert!(matches!(dec.decode_value(), Err(Error::Incomplete)));
    }

    #[test]
    fn test_record_roundtrip_events() {
        // def ["x", "y"], then instance with values 1, 2
        let data = [
            0xea, 0x02, 0xd1, b'x', 0xd1, b'y', // definition 0
            0xeb, 0x00, // instance of definition 0
            0x65, 0x66, // values 1, 2
            0xfe,
        ];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ObjectStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("x"));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(1));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("y"));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(2));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);
        dec.finish().unwrap();
    }

    #[test]
    fn test_record_missing_values_fill_null() {
        // def ["x", "y"], instance supplies only one value
        let data = [
            0xea, 0x02, 0xd1, b'x', 0xd1, b'y', 0xeb, 0x00, 0x65, 0xfe,
        ];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ObjectStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("x"));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(1));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("y"));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Null);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ContainerEnd);
        dec.finish().unwrap();
    }

    #[test]
    fn test_record_surplus_values_rejected() {
        // def ["x"], instance supplies two values
        let data = [0xea, 0x01, 0xd1, b'x', 0xeb, 0x00, 0x65, 0x66, 0xfe];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::ObjectStart);
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::String("x"));
        assert_eq!(dec.decode_value().unwrap(), DecodedValue::Int(1));
        assert!(matches!(dec.decode_value(), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_record_unknown_definition() {
        let data = [0xeb, 0x05, 0xfe];
        let mut dec = Decoder::new(&data);
        assert!(matches!(dec.decode_value(), Err(Error::InvalidData(_))));
    }

    struct CollectingVisitor {
        events: Vec<String>,
    }

    impl Visitor for CollectingVisitor {
        fn on_null(&mut self) -> Result<()> {
            self.events.push("null".into());
            Ok(())
        }
        fn on_bool(&mut self, value: bool) -> Result<()> {
            self.events.push(format!("bool:{value}"));
            Ok(())
        }
        fn on_signed_int(&mut self, value: i64) -> Result<()> {
            self.events.push(format!("int:{value}"));
            Ok(())
        }
        fn on_unsigned_int(&mut self, value: u64) -> Result<()> {
            self.events.push(format!("uint:{value}"));
            Ok(())
        }
        fn on_float(&mut self, value: f64) -> Result<()> {
            self.events.push(format!("float:{value}"));
            Ok(())
        }
        fn on_big_number(&mut self, value: BigNumber) -> Result<()> {
            self.events.push(format!("big:{}", value.to_string_notation()));
            Ok(())
        }
        fn on_string(&mut self, value: &str) -> Result<()> {
            self.events.push(format!("str:{value}"));
            Ok(())
        }
        fn on_begin_array(&mut self) -> Result<()> {
            self.events.push("[".into());
            Ok(())
        }
        fn on_begin_object(&mut self) -> Result<()> {
            self.events.push("{".into());
            Ok(())
        }
        fn on_end_container(&mut self) -> Result<()> {
            self.events.push("end".into());
            Ok(())
        }
        fn on_end_data(&mut self) -> Result<()> {
            self.events.push("done".into());
            Ok(())
        }
    }

    #[test]
    fn test_visitor_document_order() {
        // {"a": [1, true], "b": "hi"}
        let data = [
            0xfd, 0xd1, b'a', 0xfc, 0x65, 0xcf, 0xfe, 0xd1, b'b', 0xd2, b'h', b'i', 0xfe,
        ];
        let mut visitor = CollectingVisitor { events: Vec::new() };
        let mut dec = Decoder::new(&data);
        dec.parse(&mut visitor).unwrap();
        assert_eq!(
            visitor.events,
            vec![
                "{", "str:a", "[", "int:1", "bool:true", "end", "str:b", "str:hi", "end", "done"
            ]
        );
    }

    struct AbortingVisitor;

    impl Visitor for AbortingVisitor {
        fn on_null(&mut self) -> Result<()> {
            Ok(())
        }
        fn on_bool(&mut self, _: bool) -> Result<()> {
            Ok(())
        }
        fn on_signed_int(&mut self, value: i64) -> Result<()> {
            if value == 2 {
                return Err(Error::Custom("stop".into()));
            }
            Ok(())
        }
        fn on_unsigned_int(&mut self, _: u64) -> Result<()> {
            Ok(())
        }
        fn on_float(&mut self, _: f64) -> Result<()> {
            Ok(())
        }
        fn on_big_number(&mut self, _: BigNumber) -> Result<()> {
            Ok(())
        }
        fn on_string(&mut self, _: &str) -> Result<()> {
            Ok(())
        }
        fn on_begin_array(&mut self) -> Result<()> {
            Ok(())
        }
        fn on_begin_object(&mut self) -> Result<()> {
            Ok(())
        }
        fn on_end_container(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_visitor_abort_propagates() {
        let data = [0xfc, 0x65, 0x66, 0x67, 0xfe];
        let mut dec = Decoder::new(&data);
        let err = dec.parse(&mut AbortingVisitor).unwrap_err();
        assert_eq!(err, Error::Custom("stop".into()));
        // The decoder reports where it stopped
        assert_eq!(dec.position(), 3);
    }
}
