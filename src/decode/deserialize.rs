//! Serde Bridge
//!
//! Types that already derive `serde::Deserialize` can skip the schema table
//! and decode straight from the document. Aliases are then declared with
//! `#[serde(rename = "...")]`.
//!
//! `&Value` and `&Document` implement `serde::Deserializer` directly, so
//! nothing is lost on the way: non-finite doubles reach `visit_f64`, binary
//! payloads reach `visit_bytes` (or a `u8` sequence for `Vec<u8>`), and
//! document entries are visited in document order.
//!
//! Serde is strict about shapes: a double never deserializes into a
//! `String` field here, unlike [`Decode`](crate::decode::Decode).

use crate::decode::convert::DecodeError;
use crate::document::{Document, Value};
use serde::de::value::{MapAccessDeserializer, MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use std::fmt;

/// Decodes a document into any `DeserializeOwned` type.
///
/// # Example
///
/// ```
/// use docbind::decode::from_document;
/// use docbind::document::Document;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Count {
///     #[serde(rename = "n")]
///     total: f64,
/// }
///
/// let count: Count = from_document(&Document::new().with("n", 3.0)).unwrap();
/// assert_eq!(count.total, 3.0);
/// ```
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T, DecodeError> {
    T::deserialize(doc)
}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DecodeError::Deserialize(msg.to_string())
    }
}

fn visit_document<'de, V: Visitor<'de>>(
    doc: &'de Document,
    visitor: V,
) -> Result<V::Value, DecodeError> {
    let mut entries: MapDeserializer<'de, _, DecodeError> = MapDeserializer::new(doc.iter());
    let value = visitor.visit_map(&mut entries)?;
    entries.end()?;
    Ok(value)
}

fn visit_array<'de, V: Visitor<'de>>(
    values: &'de [Value],
    visitor: V,
) -> Result<V::Value, DecodeError> {
    let mut elements: SeqDeserializer<_, DecodeError> = SeqDeserializer::new(values.iter());
    let value = visitor.visit_seq(&mut elements)?;
    elements.end()?;
    Ok(value)
}

/// An externally tagged enum: `{ Variant: content }`.
fn visit_tagged<'de, V: Visitor<'de>>(
    doc: &'de Document,
    visitor: V,
) -> Result<V::Value, DecodeError> {
    if doc.len() != 1 {
        return Err(de::Error::invalid_length(
            doc.len(),
            &"a document with exactly one key",
        ));
    }
    let entries: MapDeserializer<'de, _, DecodeError> = MapDeserializer::new(doc.iter());
    visitor.visit_enum(MapAccessDeserializer::new(entries))
}

impl<'de> Deserializer<'de> for &'de Value {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Int(n) => visitor.visit_i64(*n),
            Value::Double(d) => visitor.visit_f64(*d),
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Binary(data) => visitor.visit_borrowed_bytes(data),
            Value::Array(values) => visit_array(values, visitor),
            Value::Document(doc) => visit_document(doc, visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    // `Vec<u8>` asks for a sequence, not bytes
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Binary(data) => {
                let mut bytes: SeqDeserializer<_, DecodeError> =
                    SeqDeserializer::new(data.iter().copied());
                let value = visitor.visit_seq(&mut bytes)?;
                bytes.end()?;
                Ok(value)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self {
            Value::String(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            Value::Document(doc) => visit_tagged(doc, visitor),
            _ => self.deserialize_any(visitor),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple tuple_struct map struct
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, DecodeError> for &'de Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> Deserializer<'de> for &'de Document {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visit_document(self, visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visit_tagged(self, visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}
