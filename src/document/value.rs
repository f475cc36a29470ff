//! Document Values
//!
//! This module defines [`Value`], the dynamically-typed value stored in a
//! [`Document`](crate::document::Document).
//!
//! ## Literal Form
//!
//! `Display` renders a value in the same relaxed document syntax that the
//! template parser reads. That makes the display form double as the
//! parameter encoding used by the binder:
//!
//! | Value              | Literal                  |
//! |--------------------|--------------------------|
//! | `Null`             | `null`                   |
//! | `Bool(true)`       | `true`                   |
//! | `Int(42)`          | `42`                     |
//! | `Double(1.0)`      | `1.0`                    |
//! | `Double(NaN)`      | `NaN`                    |
//! | `String("a\"b")`   | `"a\"b"`                 |
//! | `Binary([0x0a])`   | `HexData(0, "0a")`       |
//! | `Array([1, 2])`    | `[ 1, 2 ]`               |
//! | `Document`         | `{ "k" : 1 }`            |
//!
//! Doubles always carry a fractional part or an exponent, so an integer and
//! a double with the same magnitude never collapse into each other.

use crate::document::Document;
use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt::{self, Write};

/// A value inside a document.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent or explicit null value.
    #[default]
    Null,

    /// Boolean.
    Bool(bool),

    /// 64-bit signed integer.
    Int(i64),

    /// 64-bit IEEE-754 floating point number.
    Double(f64),

    /// UTF-8 string.
    String(String),

    /// Opaque binary payload.
    Binary(Bytes),

    /// Ordered sequence of values.
    Array(Vec<Value>),

    /// Embedded document.
    Document(Document),
}

impl Value {
    /// Creates a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Creates a binary value.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Value::Binary(data.into())
    }

    /// Creates an array value.
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(values)
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns a short name for the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    /// Attempts to extract a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer. Doubles qualify only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
            _ => None,
        }
    }

    /// Attempts to extract a number as `f64`, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Attempts to extract the inner array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Attempts to extract the inner document.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Consumes self and returns the inner document if this is a Document.
    pub fn into_document(self) -> Option<Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Writes the literal form of this value into `out`.
    pub fn write_literal<W: Write>(&self, out: &mut W) -> fmt::Result {
        match self {
            Value::Null => out.write_str("null"),
            Value::Bool(b) => write!(out, "{}", b),
            Value::Int(n) => write!(out, "{}", n),
            Value::Double(d) => write_double(out, *d),
            Value::String(s) => write_quoted(out, s),
            Value::Binary(data) => {
                out.write_str("HexData(0, \"")?;
                for byte in data.iter() {
                    write!(out, "{:02x}", byte)?;
                }
                out.write_str("\")")
            }
            Value::Array(values) => {
                if values.is_empty() {
                    return out.write_str("[ ]");
                }
                out.write_str("[ ")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    value.write_literal(out)?;
                }
                out.write_str(" ]")
            }
            Value::Document(doc) => doc.write_literal(out),
        }
    }
}

/// Writes a double so that it always reads back as a double.
fn write_double<W: Write>(out: &mut W, d: f64) -> fmt::Result {
    if d.is_nan() {
        out.write_str("NaN")
    } else if d.is_infinite() {
        out.write_str(if d > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        // Debug keeps a trailing `.0` or an exponent on every finite f64
        write!(out, "{:?}", d)
    }
}

/// Writes a double-quoted, escaped string literal.
pub(crate) fn write_quoted<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_literal(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Value::Binary(data)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(values) => {
                Value::Array(values.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut doc = Document::new();
                for (key, value) in map {
                    doc.insert(key, Value::from(value));
                }
                Value::Document(doc)
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Binary(data) => serde_json::Value::String(hex(data)),
            Value::Array(values) => {
                serde_json::Value::Array(values.iter().map(serde_json::Value::from).collect())
            }
            Value::Document(doc) => serde_json::Value::from(doc),
        }
    }
}

/// Lowercase hex encoding of a byte slice.
pub(crate) fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(s) => serializer.serialize_str(s),
            Value::Binary(data) => serializer.serialize_str(&hex(data)),
            Value::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            Value::Document(doc) => {
                let mut map = serializer.serialize_map(Some(doc.len()))?;
                for (key, value) in doc.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Builds a positional parameter list from mixed values.
///
/// ```
/// use docbind::params;
/// let params = params!["friends", 1, 2.5, true];
/// assert_eq!(params.len(), 4);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::document::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::document::Value::from($value)),+]
    };
}
