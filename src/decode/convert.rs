//! Value Conversion
//!
//! [`Decode`] converts a document [`Value`] into a Rust type. Scalars convert
//! directly and never coerce across shapes: a document where a string was
//! expected is a [`DecodeError::TypeMismatch`], not an empty string.
//!
//! The one widening that does happen is number-to-text: a number or a bool
//! decodes into a `String` as its literal text (`1.0` becomes `"1.0"`),
//! matching how the engine's own shell prints it.

use crate::document::{Document, Value};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding a response.
///
/// `field` is the dotted path of the failing field inside the decoded
/// type (for example `locations[0].dis`); it is empty for the root.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// The source value's shape is incompatible with the target type
    #[error("type mismatch at '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A field declared required is absent or null
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    /// Serde-based decoding failed
    #[error("deserialize error: {0}")]
    Deserialize(String),
}

impl DecodeError {
    /// Creates a mismatch error at the root.
    pub fn mismatch(expected: &'static str, found: &Value) -> Self {
        DecodeError::TypeMismatch {
            field: String::new(),
            expected,
            found: found.kind(),
        }
    }

    /// Prefixes the error path with a field name.
    pub fn within(self, name: &str) -> Self {
        self.map_path(|path| {
            if path.is_empty() {
                name.to_string()
            } else if path.starts_with('[') {
                format!("{}{}", name, path)
            } else {
                format!("{}.{}", name, path)
            }
        })
    }

    /// Prefixes the error path with a sequence index.
    pub fn within_index(self, index: usize) -> Self {
        self.map_path(|path| {
            if path.is_empty() || path.starts_with('[') {
                format!("[{}]{}", index, path)
            } else {
                format!("[{}].{}", index, path)
            }
        })
    }

    /// The dotted path of the failing field, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            DecodeError::TypeMismatch { field, .. } | DecodeError::MissingField { field } => {
                Some(field)
            }
            DecodeError::Deserialize(_) => None,
        }
    }

    fn map_path(self, f: impl FnOnce(&str) -> String) -> Self {
        match self {
            DecodeError::TypeMismatch {
                field,
                expected,
                found,
            } => DecodeError::TypeMismatch {
                field: f(&field),
                expected,
                found,
            },
            DecodeError::MissingField { field } => DecodeError::MissingField { field: f(&field) },
            other => other,
        }
    }
}

/// Conversion from a document value.
///
/// Implemented for scalars, `Option`, `Vec`, `Value` and `Document`. Record
/// types implement it through a [`Schema`](crate::decode::Schema), usually
/// with [`impl_decode_record!`](crate::impl_decode_record).
pub trait Decode: Sized {
    /// Decodes a present, non-null value.
    fn decode_value(value: &Value) -> Result<Self, DecodeError>;

    /// Decodes a whole document.
    fn decode_document(doc: &Document) -> Result<Self, DecodeError> {
        Self::decode_value(&Value::Document(doc.clone()))
    }
}

impl Decode for f64 {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        value
            .as_f64()
            .ok_or_else(|| DecodeError::mismatch("double", value))
    }
}

impl Decode for f32 {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        f64::decode_value(value).map(|d| d as f32)
    }
}

impl Decode for i64 {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Int(n) => Ok(*n),
            Value::Double(d)
                if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d < i64::MAX as f64 =>
            {
                Ok(*d as i64)
            }
            _ => Err(DecodeError::mismatch("int", value)),
        }
    }
}

impl Decode for i32 {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        let n = i64::decode_value(value)?;
        i32::try_from(n).map_err(|_| DecodeError::TypeMismatch {
            field: String::new(),
            expected: "int32",
            found: "out-of-range int",
        })
    }
}

impl Decode for u32 {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        let n = i64::decode_value(value)?;
        u32::try_from(n).map_err(|_| DecodeError::TypeMismatch {
            field: String::new(),
            expected: "uint32",
            found: "out-of-range int",
        })
    }
}

impl Decode for u64 {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        let n = i64::decode_value(value)?;
        u64::try_from(n).map_err(|_| DecodeError::TypeMismatch {
            field: String::new(),
            expected: "uint64",
            found: "out-of-range int",
        })
    }
}

impl Decode for bool {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        value
            .as_bool()
            .ok_or_else(|| DecodeError::mismatch("bool", value))
    }
}

impl Decode for String {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Int(_) | Value::Double(_) | Value::Bool(_) => Ok(value.to_string()),
            _ => Err(DecodeError::mismatch("string", value)),
        }
    }
}

impl Decode for Bytes {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Binary(data) => Ok(data.clone()),
            _ => Err(DecodeError::mismatch("binary", value)),
        }
    }
}

impl Decode for Value {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        Ok(value.clone())
    }

    fn decode_document(doc: &Document) -> Result<Self, DecodeError> {
        Ok(Value::Document(doc.clone()))
    }
}

impl Decode for Document {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        value
            .as_document()
            .cloned()
            .ok_or_else(|| DecodeError::mismatch("document", value))
    }

    fn decode_document(doc: &Document) -> Result<Self, DecodeError> {
        Ok(doc.clone())
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            other => T::decode_value(other).map(Some),
        }
    }

    fn decode_document(doc: &Document) -> Result<Self, DecodeError> {
        T::decode_document(doc).map(Some)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode_value(value: &Value) -> Result<Self, DecodeError> {
        let values = value
            .as_array()
            .ok_or_else(|| DecodeError::mismatch("array", value))?;

        values
            .iter()
            .enumerate()
            .map(|(i, element)| T::decode_value(element).map_err(|e| e.within_index(i)))
            .collect()
    }
}

/// Decodes a raw response document into `T`.
///
/// # Example
///
/// ```
/// use docbind::decode::decode;
/// use docbind::document::Document;
///
/// let doc = Document::new().with("ok", 1.0).with("n", 3.0);
/// let raw: Document = decode(&doc).unwrap();
/// assert_eq!(raw, doc);
/// ```
pub fn decode<T: Decode>(doc: &Document) -> Result<T, DecodeError> {
    T::decode_document(doc)
}
