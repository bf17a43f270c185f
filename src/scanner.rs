// ABOUTME: Position-map scanner producing a flat DFS-preorder entry array.
// ABOUTME: Enables random access, get_child, and find_key without re-parsing.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::decoder::DecoderConfig;
use crate::error::{Error, Result};
use crate::types::{leb128_decode, limits, type_code, zigzag_decode, BigNumber};
use crate::utf8;

/// Payload of one position-map entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryPayload {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    BigNumber(BigNumber),
    /// String content location in the input buffer
    String { offset: usize, len: usize },
    /// `count` is the number of direct children
    Array { first_child: usize, count: usize },
    /// `count` is keys plus values (2x the pair count)
    Object { first_child: usize, count: usize },
}

/// A flat, heap-free record describing one value in the document.
///
/// Entries are laid out in DFS preorder: a container at index `i` with
/// `subtree_size = s` occupies `[i, i+s)` and its first child sits at `i+1`.
/// The next sibling of any entry is found by skipping its subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    /// Total entries in this subtree, including this one (1 for primitives)
    pub subtree_size: usize,
    pub payload: EntryPayload,
}

impl Entry {
    #[inline]
    fn primitive(payload: EntryPayload) -> Self {
        Self {
            subtree_size: 1,
            payload,
        }
    }

    /// True for arrays and objects.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(
            self.payload,
            EntryPayload::Array { .. } | EntryPayload::Object { .. }
        )
    }
}

/// Scan frame for open containers.
enum FrameKind {
    Array,
    Object {
        expecting_key: bool,
        keys: Vec<(usize, usize)>,
    },
    Record {
        def_index: usize,
        next_key: usize,
        expecting_value: bool,
    },
}

struct Frame {
    entry_index: usize,
    child_count: usize,
    kind: FrameKind,
}

/// A random-access view of a BONJSON document.
///
/// Built by a single pass over the input; the input buffer is borrowed
/// read-only and string entries reference it by offset.
pub struct PositionMap<'a> {
    input: &'a [u8],
    entries: Vec<Entry>,
}

impl<'a> PositionMap<'a> {
    /// Scan a document with the default configuration.
    pub fn scan(input: &'a [u8]) -> Result<Self> {
        Self::scan_with_config(input, DecoderConfig::default())
    }

    /// Scan a document with custom configuration.
    ///
    /// With `reject_invalid_utf8` disabled, string bytes are not validated
    /// during the scan; [`PositionMap::get_string`] validates on access.
    pub fn scan_with_config(input: &'a [u8], config: DecoderConfig) -> Result<Self> {
        let mut scanner = Scanner {
            input,
            pos: 0,
            config,
            entries: Vec::with_capacity(input.len().min(4096) / 2 + 1),
            frames: Vec::new(),
            record_defs: Vec::new(),
            // Records can expand to many entries per input byte; bound it
            max_entries: input.len().saturating_mul(4) + 64,
        };
        scanner.run()?;
        Ok(Self {
            input,
            entries: scanner.entries,
        })
    }

    /// Index of the root entry (always 0).
    #[must_use]
    pub fn root(&self) -> usize {
        0
    }

    /// Total number of entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Get an entry by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// All entries in DFS preorder.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Get the string content of a string entry.
    /// Returns None for non-string entries or (when validation was skipped
    /// during the scan) malformed UTF-8.
    #[must_use]
    pub fn get_string(&self, index: usize) -> Option<&'a str> {
        match self.entries.get(index)?.payload {
            EntryPayload::String { offset, len } => {
                std::str::from_utf8(&self.input[offset..offset + len]).ok()
            }
            _ => None,
        }
    }

    /// Get the index of the k-th direct child of a container entry.
    /// O(k): siblings are reached by skipping subtrees, never by re-parsing.
    #[must_use]
    pub fn get_child(&self, container: usize, child: usize) -> Option<usize> {
        let entry = self.entries.get(container)?;
        let (first_child, count) = match entry.payload {
            EntryPayload::Array { first_child, count }
            | EntryPayload::Object { first_child, count } => (first_child, count),
            _ => return None,
        };
        if child >= count {
            return None;
        }
        let mut index = first_child;
        for _ in 0..child {
            index += self.entries[index].subtree_size;
        }
        Some(index)
    }

    /// Find the value for a key in an object entry.
    /// Returns the index of the value entry, or None if the key is absent
    /// (or the entry is not an object).
    #[must_use]
    pub fn find_key(&self, object: usize, key: &str) -> Option<usize> {
        let entry = self.entries.get(object)?;
        let EntryPayload::Object { first_child, count } = entry.payload else {
            return None;
        };
        let mut index = first_child;
        let mut remaining = count;
        while remaining >= 2 {
            let EntryPayload::String { offset, len } = self.entries[index].payload else {
                return None;
            };
            let value_index = index + 1;
            if &self.input[offset..offset + len] == key.as_bytes() {
                return Some(value_index);
            }
            index = value_index + self.entries[value_index].subtree_size;
            remaining -= 2;
        }
        None
    }

    /// Decode an array entry's children as i64 values.
    pub fn int64_array(&self, index: usize) -> Result<Vec<i64>> {
        self.collect_array(index, |payload| match payload {
            EntryPayload::Int(v) => Ok(*v),
            EntryPayload::UInt(v) => i64::try_from(*v).map_err(|_| Error::ValueOutOfRange),
            _ => Err(Error::invalid_data("expected integer element")),
        })
    }

    /// Decode an array entry's children as u64 values.
    pub fn uint64_array(&self, index: usize) -> Result<Vec<u64>> {
        self.collect_array(index, |payload| match payload {
            EntryPayload::UInt(v) => Ok(*v),
            EntryPayload::Int(v) => u64::try_from(*v).map_err(|_| Error::ValueOutOfRange),
            _ => Err(Error::invalid_data("expected integer element")),
        })
    }

    /// Decode an array entry's children as f64 values.
    #[allow(clippy::cast_precision_loss)]
    pub fn double_array(&self, index: usize) -> Result<Vec<f64>> {
        self.collect_array(index, |payload| match payload {
            EntryPayload::Float(v) => Ok(*v),
            EntryPayload::Int(v) => Ok(*v as f64),
            EntryPayload::UInt(v) => Ok(*v as f64),
            _ => Err(Error::invalid_data("expected numeric element")),
        })
    }

    /// Decode an array entry's children as booleans.
    pub fn bool_array(&self, index: usize) -> Result<Vec<bool>> {
        self.collect_array(index, |payload| match payload {
            EntryPayload::Bool(v) => Ok(*v),
            _ => Err(Error::invalid_data("expected boolean element")),
        })
    }

    /// Decode an array entry's children as strings.
    pub fn string_array(&self, index: usize) -> Result<Vec<&'a str>> {
        self.collect_array(index, |payload| match *payload {
            EntryPayload::String { offset, len } => {
                std::str::from_utf8(&self.input[offset..offset + len])
                    .map_err(|_| Error::InvalidUtf8)
            }
            _ => Err(Error::invalid_data("expected string element")),
        })
    }

    fn collect_array<T, F>(&self, index: usize, mut convert: F) -> Result<Vec<T>>
    where
        F: FnMut(&EntryPayload) -> Result<T>,
    {
        let entry = self
            .get(index)
            .ok_or_else(|| Error::invalid_data("entry index out of range"))?;
        let EntryPayload::Array { first_child, count } = entry.payload else {
            return Err(Error::invalid_data("expected an array entry"));
        };
        let mut out = Vec::with_capacity(count);
        let mut child = first_child;
        for _ in 0..count {
            out.push(convert(&self.entries[child].payload)?);
            child += self.entries[child].subtree_size;
        }
        Ok(out)
    }
}

/// One-shot scanning state.
struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
    config: DecoderConfig,
    entries: Vec<Entry>,
    frames: Vec<Frame>,
    record_defs: Vec<Vec<(usize, usize)>>,
    max_entries: usize,
}

impl<'a> Scanner<'a> {
    fn run(&mut self) -> Result<()> {
        if self.input.len() > self.config.max_document_size {
            return Err(Error::MaxDocumentSizeExceeded);
        }

        loop {
            if self.step_record_frame()? {
                if self.frames.is_empty() && !self.entries.is_empty() {
                    break;
                }
                continue;
            }

            let mut tc = self.read_type_code()?;
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

            self.dispatch(tc)?;

            if self.frames.is_empty() {
                break;
            }
        }

        if self.config.reject_trailing_bytes && self.pos < self.input.len() {
            return Err(Error::TrailingBytes);
        }
        Ok(())
    }

    /// Advance a record frame: synthesize key entries, null-fill missing
    /// values, and close the instance. Returns true if it produced an event
    /// (or closed the frame); false means the caller should parse a real
    /// value from the input.
    fn step_record_frame(&mut self) -> Result<bool> {
        let Some(Frame {
            kind:
                FrameKind::Record {
                    def_index,
                    next_key,
                    expecting_value,
                },
            ..
        }) = self.frames.last_mut()
        else {
            return Ok(false);
        };
        let def_index = *def_index;
        let key_index = *next_key;

        if *expecting_value {
            // A value is pending; if the instance ends here, fill with null
            if self.peek_byte()? != type_code::CONTAINER_END {
                return Ok(false);
            }
            self.push_entry(Entry::primitive(EntryPayload::Null))?;
            self.child_added_to_top()?;
            return Ok(true);
        }

        if key_index == self.record_defs[def_index].len() {
            let tc = self.read_type_code()?;
            if tc != type_code::CONTAINER_END {
                return Err(Error::invalid_data("record instance has surplus values"));
            }
            self.close_container()?;
            return Ok(true);
        }

        // Emit the next key from the definition
        let (offset, len) = self.record_defs[def_index][key_index];
        if let Some(Frame {
            kind:
                FrameKind::Record {
                    next_key,
                    expecting_value,
                    ..
                },
            child_count,
            ..
        }) = self.frames.last_mut()
        {
            *next_key += 1;
            *expecting_value = true;
            *child_count += 1;
        }
        self.push_entry(Entry::primitive(EntryPayload::String { offset, len }))?;
        Ok(true)
    }

    fn dispatch(&mut self, tc: u8) -> Result<()> {
        if type_code::is_small_int(tc) {
            self.push_entry(Entry::primitive(EntryPayload::Int(
                type_code::small_int_value(tc),
            )))?;
            return self.child_added_to_top();
        }

        if type_code::is_any_int(tc) {
            let size = type_code::int_size(tc);
            let payload = if type_code::int_is_signed(tc) {
                EntryPayload::Int(self.read_signed_int_sized(size)?)
            } else {
                EntryPayload::UInt(self.read_unsigned_int_sized(size)?)
            };
            self.push_entry(Entry::primitive(payload))?;
            return self.child_added_to_top();
        }

        if type_code::is_any_string(tc) {
            let is_key = self.at_key_position();
            let (offset, len) = self.read_string_slice(tc)?;
            self.validate_string(offset, len)?;
            if is_key {
                self.track_object_key(offset, len)?;
            }
            self.push_entry(Entry::primitive(EntryPayload::String { offset, len }))?;
            return self.child_added_to_top();
        }

        if type_code::is_typed_array(tc) {
            return self.scan_typed_array(tc);
        }

        match tc {
            type_code::NULL => {
                self.push_entry(Entry::primitive(EntryPayload::Null))?;
                self.child_added_to_top()
            }
            type_code::FALSE | type_code::TRUE => {
                self.push_entry(Entry::primitive(EntryPayload::Bool(
                    tc == type_code::TRUE,
                )))?;
                self.child_added_to_top()
            }
            type_code::FLOAT32 => {
                let v = self.read_float32()?;
                self.push_entry(Entry::primitive(EntryPayload::Float(v)))?;
                self.child_added_to_top()
            }
            type_code::FLOAT64 => {
                let v = self.read_float64()?;
                self.push_entry(Entry::primitive(EntryPayload::Float(v)))?;
                self.child_added_to_top()
            }
            type_code::BIG_NUMBER => {
                let bn = self.read_big_number()?;
                self.push_entry(Entry::primitive(EntryPayload::BigNumber(bn)))?;
                self.child_added_to_top()
            }
            type_code::ARRAY => {
                self.child_added_to_top()?;
                self.open_container(FrameKind::Array, false)
            }
            type_code::OBJECT => {
                self.child_added_to_top()?;
                self.open_container(
                    FrameKind::Object {
                        expecting_key: true,
                        keys: Vec::new(),
                    },
                    true,
                )
            }
            type_code::RECORD_INSTANCE => self.scan_record_instance(),
            type_code::CONTAINER_END => {
                if self.frames.is_empty() {
                    return Err(Error::UnbalancedContainers);
                }
                if matches!(
                    self.frames.last(),
                    Some(Frame {
                        kind: FrameKind::Object {
                            expecting_key: false,
                            ..
                        },
                        ..
                    })
                ) {
                    return Err(Error::ExpectedObjectValue);
                }
                self.close_container()
            }
            _ => Err(Error::invalid_type_code(tc)),
        }
    }

    /// Push a container entry placeholder and its frame.
    fn open_container(&mut self, kind: FrameKind, is_object: bool) -> Result<()> {
        if self.frames.len() >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        let entry_index = self.entries.len();
        let first_child = entry_index + 1;
        let payload = if is_object {
            EntryPayload::Object {
                first_child,
                count: 0,
            }
        } else {
            EntryPayload::Array {
                first_child,
                count: 0,
            }
        };
        self.push_entry(Entry {
            subtree_size: 1,
            payload,
        })?;
        self.frames.push(Frame {
            entry_index,
            child_count: 0,
            kind,
        });
        Ok(())
    }

    /// Pop the top frame and fix up its entry's subtree size and child count.
    fn close_container(&mut self) -> Result<()> {
        let frame = self.frames.pop().ok_or(Error::UnbalancedContainers)?;
        let subtree_size = self.entries.len() - frame.entry_index;
        let entry = &mut self.entries[frame.entry_index];
        entry.subtree_size = subtree_size;
        match &mut entry.payload {
            EntryPayload::Array { count, .. } | EntryPayload::Object { count, .. } => {
                *count = frame.child_count;
            }
            _ => {}
        }
        Ok(())
    }

    /// Account for a completed direct child of the current container.
    fn child_added_to_top(&mut self) -> Result<()> {
        match self.frames.last_mut() {
            Some(Frame {
                child_count,
                kind: FrameKind::Object { expecting_key, .. },
                ..
            }) => {
                *expecting_key = !*expecting_key;
                *child_count += 1;
                if *child_count > self.config.max_container_size {
                    return Err(Error::MaxContainerSizeExceeded);
                }
            }
            Some(Frame {
                child_count,
                kind: FrameKind::Record { expecting_value, .. },
                ..
            }) => {
                *expecting_value = false;
                *child_count += 1;
            }
            Some(Frame { child_count, .. }) => {
                *child_count += 1;
                if *child_count > self.config.max_container_size {
                    return Err(Error::MaxContainerSizeExceeded);
                }
            }
            None => {}
        }
        Ok(())
    }

    fn push_entry(&mut self, entry: Entry) -> Result<()> {
        if self.entries.len() >= self.max_entries {
            return Err(Error::MapFull);
        }
        self.entries.push(entry);
        Ok(())
    }

    fn at_key_position(&self) -> bool {
        matches!(
            self.frames.last(),
            Some(Frame {
                kind: FrameKind::Object {
                    expecting_key: true,
                    ..
                },
                ..
            })
        )
    }

    fn track_object_key(&mut self, offset: usize, len: usize) -> Result<()> {
        if !self.config.reject_duplicate_keys {
            return Ok(());
        }
        let input = self.input;
        let Some(Frame {
            kind: FrameKind::Object { keys, .. },
            ..
        }) = self.frames.last_mut()
        else {
            return Ok(());
        };
        if keys.len() >= limits::MAX_TRACKED_KEYS {
            return Err(Error::TooManyKeys);
        }
        let key = &input[offset..offset + len];
        for &(o, l) in keys.iter() {
            if &input[o..o + l] == key {
                return Err(Error::DuplicateKey);
            }
        }
        keys.push((offset, len));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Typed arrays and records
    // -------------------------------------------------------------------------

    /// Expand a typed array into an Array entry plus one entry per element.
    fn scan_typed_array(&mut self, tc: u8) -> Result<()> {
        let count = self.read_uleb128()?;
        if count > self.config.max_container_size as u64 {
            return Err(Error::MaxContainerSizeExceeded);
        }
        let count = count as usize;
        let elem_size = type_code::typed_array_element_size(tc);
        if count.saturating_mul(elem_size) > self.input.len() - self.pos {
            return Err(Error::incomplete());
        }

        self.child_added_to_top()?;
        let entry_index = self.entries.len();
        self.push_entry(Entry {
            subtree_size: count + 1,
            payload: EntryPayload::Array {
                first_child: entry_index + 1,
                count,
            },
        })?;

        for _ in 0..count {
            let payload = if type_code::typed_array_is_float(tc) {
                EntryPayload::Float(if elem_size == 4 {
                    self.read_float32()?
                } else {
                    self.read_float64()?
                })
            } else if type_code::typed_array_is_signed_int(tc) {
                EntryPayload::Int(self.read_signed_int_sized(elem_size)?)
            } else {
                EntryPayload::UInt(self.read_unsigned_int_sized(elem_size)?)
            };
            self.push_entry(Entry::primitive(payload))?;
        }
        Ok(())
    }

    /// Read a record definition: ULEB128 key count followed by strings.
    fn read_record_def(&mut self) -> Result<()> {
        if self.record_defs.len() >= limits::MAX_RECORD_DEFINITIONS {
            return Err(Error::invalid_data("too many record definitions"));
        }
        let count = self.read_uleb128()?;
        if count > (self.config.max_container_size / 2) as u64 {
            return Err(Error::MaxContainerSizeExceeded);
        }
        if self.config.reject_duplicate_keys && count > limits::MAX_TRACKED_KEYS as u64 {
            return Err(Error::TooManyKeys);
        }
        let count = count as usize;

        let mut keys: Vec<(usize, usize)> = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let tc = self.read_byte()?;
            if !type_code::is_any_string(tc) {
                return Err(Error::ExpectedObjectKey);
            }
            let (offset, len) = self.read_string_slice(tc)?;
            self.validate_string(offset, len)?;
            if self.config.reject_duplicate_keys {
                let bytes = &self.input[offset..offset + len];
                for &(o, l) in &keys {
                    if &self.input[o..o + l] == bytes {
                        return Err(Error::DuplicateKey);
                    }
                }
            }
            keys.push((offset, len));
        }
        self.record_defs.push(keys);
        Ok(())
    }

    /// Open a record instance as an Object entry; the main loop drives the
    /// key/value expansion through the frame.
    fn scan_record_instance(&mut self) -> Result<()> {
        let def_index = self.read_uleb128()? as usize;
        if def_index >= self.record_defs.len() {
            return Err(Error::invalid_data("unknown record definition"));
        }
        self.child_added_to_top()?;
        self.open_container(
            FrameKind::Record {
                def_index,
                next_key: 0,
                expecting_value: false,
            },
            true,
        )
    }

    // -------------------------------------------------------------------------
    // Input reading
    // -------------------------------------------------------------------------

    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        if self.pos >= self.input.len() {
            return Err(Error::incomplete());
        }
        let byte = self.input[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn peek_byte(&self) -> Result<u8> {
        if self.pos >= self.input.len() {
            return Err(if self.frames.is_empty() {
                Error::Incomplete
            } else {
                Error::UnclosedContainers
            });
        }
        Ok(self.input[self.pos])
    }

    #[inline]
    fn read_type_code(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.input.len() {
            return Err(Error::incomplete());
        }
        let bytes = &self.input[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_uleb128(&mut self) -> Result<u64> {
        let remaining = &self.input[self.pos..];
        match leb128_decode(remaining) {
            Some((value, consumed)) => {
                self.pos += consumed;
                Ok(value)
            }
            None if remaining.len() >= 10 => Err(Error::ValueOutOfRange),
            None => Err(Error::incomplete()),
        }
    }

    #[inline]
    fn read_unsigned_int_sized(&mut self, size: usize) -> Result<u64> {
        let bytes = self.read_bytes(size)?;
        let mut buf = [0u8; 8];
        buf[..size].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    #[inline]
    fn read_signed_int_sized(&mut self, size: usize) -> Result<i64> {
        let bytes = self.read_bytes(size)?;
        let sign_bit = (bytes[size - 1] >> 7) & 1;
        let fill: u8 = if sign_bit == 1 { 0xff } else { 0x00 };
        let mut buf = [fill; 8];
        buf[..size].copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    fn read_float32(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(4)?;
        let value = f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        self.check_float(value)?;
        Ok(value)
    }

    fn read_float64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        let value = f64::from_le_bytes(buf);
        self.check_float(value)?;
        Ok(value)
    }

    #[inline]
    fn check_float(&self, value: f64) -> Result<()> {
        if self.config.reject_nan_infinity && !value.is_finite() {
            return Err(Error::invalid_data("NaN or Infinity not allowed"));
        }
        Ok(())
    }

    fn read_big_number(&mut self) -> Result<BigNumber> {
        let exponent = zigzag_decode(self.read_uleb128()?);
        if exponent.unsigned_abs() > limits::MAX_BIGNUMBER_EXPONENT {
            return Err(Error::ValueOutOfRange);
        }

        let signed_length = zigzag_decode(self.read_uleb128()?);
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

    /// Locate string content for a string type code.
    fn read_string_slice(&mut self, tc: u8) -> Result<(usize, usize)> {
        if type_code::is_short_string(tc) {
            let len = type_code::short_string_len(tc);
            if len > self.config.max_string_length {
                return Err(Error::MaxStringLengthExceeded);
            }
            let offset = self.pos;
            if offset + len > self.input.len() {
                return Err(Error::incomplete());
            }
            self.pos += len;
            return Ok((offset, len));
        }

        let start = self.pos;
        let window_end = self
            .input
            .len()
            .min(start.saturating_add(self.config.max_string_length).saturating_add(1));
        match memchr::memchr(type_code::STRING_LONG, &self.input[start..window_end]) {
            Some(rel) => {
                if rel > self.config.max_string_length {
                    return Err(Error::MaxStringLengthExceeded);
                }
                self.pos = start + rel + 1;
                Ok((start, rel))
            }
            None if window_end < self.input.len() => Err(Error::MaxStringLengthExceeded),
            None => Err(Error::incomplete()),
        }
    }

    fn validate_string(&self, offset: usize, len: usize) -> Result<()> {
        let bytes = &self.input[offset..offset + len];
        if self.config.reject_invalid_utf8 {
            utf8::to_str(bytes)?;
        }
        if self.config.reject_nul && utf8::contains_nul(bytes) {
            return Err(Error::NulCharacter);
        }
        Ok(())
    }
}
