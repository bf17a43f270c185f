// ABOUTME: Serde Deserializer implementation for BONJSON decoding.
// ABOUTME: Allows BONJSON bytes to be decoded into any serde-deserializable Rust type.

use crate::decoder::{DecodedValue, Decoder, DecoderConfig};
use crate::error::{Error, Result};
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

/// A serde Deserializer that reads BONJSON.
///
/// Container ends are detected by peeking one decoded event ahead, which also
/// makes typed arrays and record instances deserialize transparently as
/// ordinary sequences and maps.
pub struct Deserializer<'de> {
    decoder: Decoder<'de>,
    /// Peeked value for look-ahead
    peeked: Option<DecodedValue<'de>>,
}

impl<'de> Deserializer<'de> {
    /// Create a new Deserializer from a byte slice.
    #[must_use]
    pub fn from_slice(data: &'de [u8]) -> Self {
        Self {
            decoder: Decoder::new(data),
            peeked: None,
        }
    }

    /// Create a new Deserializer with custom configuration.
    #[must_use]
    pub fn from_slice_with_config(data: &'de [u8], config: DecoderConfig) -> Self {
        Self {
            decoder: Decoder::with_config(data, config),
            peeked: None,
        }
    }

    /// Get the underlying decoder (consumes self).
    #[must_use]
    pub fn into_decoder(self) -> Decoder<'de> {
        self.decoder
    }

    fn peek_value(&mut self) -> Result<&DecodedValue<'de>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.decoder.decode_value()?);
        }
        Ok(self.peeked.as_ref().expect("just filled"))
    }

    fn next_value(&mut self) -> Result<DecodedValue<'de>> {
        match self.peeked.take() {
            Some(v) => Ok(v),
            None => self.decoder.decode_value(),
        }
    }
}

/// Deserialize a value from a BONJSON byte slice.
pub fn from_slice<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T> {
    let mut de = Deserializer::from_slice(data);
    de.decoder.check_document_size()?;
    let value = T::deserialize(&mut de)?;
    de.decoder.finish()?;
    Ok(value)
}

/// Deserialize a value from a BONJSON byte slice with custom configuration.
pub fn from_slice_with_config<'de, T: Deserialize<'de>>(
    data: &'de [u8],
    config: DecoderConfig,
) -> Result<T> {
    let mut de = Deserializer::from_slice_with_config(data, config);
    de.decoder.check_document_size()?;
    let value = T::deserialize(&mut de)?;
    de.decoder.finish()?;
    Ok(value)
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::Null => visitor.visit_unit(),
            DecodedValue::Bool(b) => visitor.visit_bool(b),
            DecodedValue::Int(n) => visitor.visit_i64(n),
            DecodedValue::UInt(n) => visitor.visit_u64(n),
            DecodedValue::Float(f) => visitor.visit_f64(f),
            DecodedValue::BigNumber(bn) => {
                // Try to convert to a native type
                if let Some(i) = bn.to_i64() {
                    visitor.visit_i64(i)
                } else if let Some(u) = bn.to_u64() {
                    visitor.visit_u64(u)
                } else {
                    visitor.visit_f64(bn.to_f64())
                }
            }
            DecodedValue::String(s) => visitor.visit_borrowed_str(s),
            DecodedValue::ArrayStart => visitor.visit_seq(SeqDeserializer::new(self)),
            DecodedValue::ObjectStart => visitor.visit_map(MapDeserializer::new(self)),
            DecodedValue::ContainerEnd => Err(Error::UnbalancedContainers),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::Bool(b) => visitor.visit_bool(b),
            other => Err(Error::Custom(format!("expected bool, got {other:?}"))),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::Int(n) => visitor.visit_i64(n),
            DecodedValue::UInt(n) => visitor.visit_u64(n),
            other => Err(Error::Custom(format!("expected integer, got {other:?}"))),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::UInt(n) => visitor.visit_u64(n),
            DecodedValue::Int(n) if n >= 0 => visitor.visit_u64(n as u64),
            DecodedValue::Int(_) => Err(Error::ValueOutOfRange),
            other => Err(Error::Custom(format!("expected integer, got {other:?}"))),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_f64(visitor)
    }

    #[allow(clippy::cast_precision_loss)]
    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::Float(f) => visitor.visit_f64(f),
            DecodedValue::Int(n) => visitor.visit_f64(n as f64),
            DecodedValue::UInt(n) => visitor.visit_f64(n as f64),
            DecodedValue::BigNumber(bn) => visitor.visit_f64(bn.to_f64()),
            other => Err(Error::Custom(format!("expected number, got {other:?}"))),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => visitor.visit_char(c),
                    _ => Err(Error::Custom("expected single character".into())),
                }
            }
            _ => Err(Error::Custom("expected string".into())),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::String(s) => visitor.visit_borrowed_str(s),
            other => Err(Error::Custom(format!("expected string, got {other:?}"))),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        // Byte slices travel as arrays of integers
        match self.next_value()? {
            DecodedValue::ArrayStart => {
                let mut bytes = Vec::new();
                loop {
                    match self.next_value()? {
                        DecodedValue::ContainerEnd => break,
                        DecodedValue::Int(n) if (0..=255).contains(&n) => bytes.push(n as u8),
                        DecodedValue::UInt(n) if n <= 255 => bytes.push(n as u8),
                        _ => return Err(Error::Custom("expected byte array".into())),
                    }
                }
                visitor.visit_bytes(&bytes)
            }
            _ => Err(Error::Custom("expected array of bytes".into())),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if matches!(self.peek_value()?, DecodedValue::Null) {
            self.peeked = None;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::Null => visitor.visit_unit(),
            _ => Err(Error::Custom("expected null".into())),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::ArrayStart => visitor.visit_seq(SeqDeserializer::new(self)),
            other => Err(Error::Custom(format!("expected array, got {other:?}"))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.next_value()? {
            DecodedValue::ObjectStart => visitor.visit_map(MapDeserializer::new(self)),
            other => Err(Error::Custom(format!("expected object, got {other:?}"))),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.peek_value()? {
            // Unit variant: just a string
            DecodedValue::String(_) => visitor.visit_enum(UnitVariantDeserializer::new(self)),
            // Other variants: object with single key
            DecodedValue::ObjectStart => {
                self.peeked = None;
                visitor.visit_enum(EnumDeserializer::new(self))
            }
            _ => Err(Error::Custom("expected string or object for enum".into())),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        // Field names are always strings
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }
}

struct SeqDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> SeqDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        SeqDeserializer { de }
    }
}

impl<'a, 'de> SeqAccess<'de> for SeqDeserializer<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>> {
        if matches!(self.de.peek_value()?, DecodedValue::ContainerEnd) {
            self.de.peeked = None;
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

struct MapDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> MapDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        MapDeserializer { de }
    }
}

impl<'a, 'de> MapAccess<'de> for MapDeserializer<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if matches!(self.de.peek_value()?, DecodedValue::ContainerEnd) {
            self.de.peeked = None;
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }
}

struct UnitVariantDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> UnitVariantDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        UnitVariantDeserializer { de }
    }
}

impl<'a, 'de> de::EnumAccess<'de> for UnitVariantDeserializer<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'a, 'de> de::VariantAccess<'de> for UnitVariantDeserializer<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, _seed: T) -> Result<T::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }
}

struct EnumDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> EnumDeserializer<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        EnumDeserializer { de }
    }

    fn expect_container_end(&mut self) -> Result<()> {
        match self.de.next_value()? {
            DecodedValue::ContainerEnd => Ok(()),
            _ => Err(Error::Custom("expected container end".into())),
        }
    }
}

impl<'a, 'de> de::EnumAccess<'de> for EnumDeserializer<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'a, 'de> de::VariantAccess<'de> for EnumDeserializer<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Err(Error::Custom("expected newtype, tuple, or struct variant".into()))
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(mut self, seed: T) -> Result<T::Value> {
        let value = seed.deserialize(&mut *self.de)?;
        self.expect_container_end()?;
        Ok(value)
    }

    fn tuple_variant<V: Visitor<'de>>(mut self, _len: usize, visitor: V) -> Result<V::Value> {
        match self.de.next_value()? {
            DecodedValue::ArrayStart => {
                let value = visitor.visit_seq(SeqDeserializer::new(self.de))?;
                self.expect_container_end()?;
                Ok(value)
            }
            _ => Err(Error::Custom("expected array for tuple variant".into())),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        mut self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.de.next_value()? {
            DecodedValue::ObjectStart => {
                let value = visitor.visit_map(MapDeserializer::new(self.de))?;
                self.expect_container_end()?;
                Ok(value)
            }
            _ => Err(Error::Custom("expected object for struct variant".into())),
        }
    }
}
