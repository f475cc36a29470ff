//! Record Schemas
//!
//! A [`Schema`] is the decode table for one record type: an ordered list of
//! field descriptors, each holding the field's name, the document key it is
//! read from, whether it is required, and a setter.
//!
//! Schemas are built once (typically in a `OnceLock`) and reused, so
//! decoding is a plain loop over the table with no per-call lookup of type
//! metadata.
//!
//! ## Source Keys
//!
//! A field reads from its own name unless it declares an alias. An alias
//! may be a dotted path that reaches through envelope documents:
//!
//! ```text
//! { results: [ { dis: 0.0000173, obj: { name: "Paris" } } ] }
//!
//! GeoNearResult.locations  <- "results"
//! Location.dis             <- "dis"
//! Location.name            <- "obj.name"
//! ```
//!
//! ## Absent Fields
//!
//! A field that is absent or null keeps the record's `Default` value,
//! unless it is declared required, in which case decoding fails with
//! [`DecodeError::MissingField`].

use crate::decode::convert::{Decode, DecodeError};
use crate::document::{Document, Value};
use std::fmt;

type Setter<T> = Box<dyn Fn(&mut T, &Value) -> Result<(), DecodeError> + Send + Sync>;

/// One field descriptor in a [`Schema`].
pub struct FieldSpec<T> {
    name: &'static str,
    source: &'static str,
    required: bool,
    apply: Setter<T>,
}

impl<T> FieldSpec<T> {
    /// The field's own name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The document key (or dotted path) the field is read from.
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Whether the field must be present.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the field reads from a key other than its own name.
    pub fn is_aliased(&self) -> bool {
        self.name != self.source
    }
}

impl<T> fmt::Debug for FieldSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("required", &self.required)
            .finish()
    }
}

/// The decode table of a record type.
///
/// # Example
///
/// ```
/// use docbind::decode::{decode, Record, Schema};
/// use docbind::document::Document;
/// use docbind::impl_decode_record;
/// use std::sync::OnceLock;
///
/// #[derive(Debug, Default)]
/// struct ServerStatus {
///     ok: String,
///     host: String,
/// }
///
/// impl Record for ServerStatus {
///     fn schema() -> &'static Schema<Self> {
///         static SCHEMA: OnceLock<Schema<ServerStatus>> = OnceLock::new();
///         SCHEMA.get_or_init(|| {
///             Schema::builder("ServerStatus")
///                 .field("ok", |s: &mut ServerStatus, v: String| s.ok = v)
///                 .field("host", |s: &mut ServerStatus, v: String| s.host = v)
///                 .build()
///         })
///     }
/// }
/// impl_decode_record!(ServerStatus);
///
/// let doc = Document::new().with("host", "db1").with("ok", 1.0);
/// let status: ServerStatus = decode(&doc).unwrap();
/// assert_eq!(status.ok, "1.0");
/// assert_eq!(status.host, "db1");
/// ```
pub struct Schema<T> {
    type_name: &'static str,
    fields: Vec<FieldSpec<T>>,
}

impl<T> Schema<T> {
    /// Starts building a schema for the named type.
    pub fn builder(type_name: &'static str) -> SchemaBuilder<T> {
        SchemaBuilder {
            type_name,
            fields: Vec::new(),
        }
    }

    /// Name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldSpec<T>] {
        &self.fields
    }

    /// Looks up a field descriptor by its own name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec<T>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl<T: Default> Schema<T> {
    /// Decodes a document into a new record.
    ///
    /// Aborts on the first failing field; no partially filled record is
    /// ever returned.
    pub fn decode_document(&self, doc: &Document) -> Result<T, DecodeError> {
        let mut record = T::default();
        for field in &self.fields {
            match doc.get_path(field.source) {
                Some(value) if !value.is_null() => {
                    (field.apply)(&mut record, value).map_err(|e| e.within(field.name))?
                }
                _ if field.required => {
                    return Err(DecodeError::MissingField {
                        field: field.name.to_string(),
                    })
                }
                _ => {}
            }
        }
        Ok(record)
    }

    /// Decodes a value, which must be a document.
    pub fn decode_value(&self, value: &Value) -> Result<T, DecodeError> {
        match value {
            Value::Document(doc) => self.decode_document(doc),
            other => Err(DecodeError::mismatch("document", other)),
        }
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder<T> {
    type_name: &'static str,
    fields: Vec<FieldSpec<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Adds an optional field read from its own name.
    pub fn field<V, F>(self, name: &'static str, setter: F) -> Self
    where
        V: Decode + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push(name, name, false, setter)
    }

    /// Adds an optional field read from `source`.
    pub fn aliased<V, F>(self, name: &'static str, source: &'static str, setter: F) -> Self
    where
        V: Decode + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push(name, source, false, setter)
    }

    /// Adds a required field read from its own name.
    pub fn required<V, F>(self, name: &'static str, setter: F) -> Self
    where
        V: Decode + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push(name, name, true, setter)
    }

    /// Adds a required field read from `source`.
    pub fn required_aliased<V, F>(self, name: &'static str, source: &'static str, setter: F) -> Self
    where
        V: Decode + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push(name, source, true, setter)
    }

    fn push<V, F>(mut self, name: &'static str, source: &'static str, required: bool, setter: F) -> Self
    where
        V: Decode + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let apply: Setter<T> = Box::new(move |record: &mut T, value: &Value| {
            setter(record, V::decode_value(value)?);
            Ok(())
        });
        self.fields.push(FieldSpec {
            name,
            source,
            required,
            apply,
        });
        self
    }

    /// Finishes the schema.
    pub fn build(self) -> Schema<T> {
        Schema {
            type_name: self.type_name,
            fields: self.fields,
        }
    }
}

/// A record type with a static decode table.
pub trait Record: Default + Sized + 'static {
    /// The type's schema, built once and reused.
    fn schema() -> &'static Schema<Self>;
}

/// Implements [`Decode`] for record types by delegating to [`Record::schema`].
#[macro_export]
macro_rules! impl_decode_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::decode::Decode for $ty {
                fn decode_value(
                    value: &$crate::document::Value,
                ) -> ::std::result::Result<Self, $crate::decode::DecodeError> {
                    <$ty as $crate::decode::Record>::schema().decode_value(value)
                }

                fn decode_document(
                    doc: &$crate::document::Document,
                ) -> ::std::result::Result<Self, $crate::decode::DecodeError> {
                    <$ty as $crate::decode::Record>::schema().decode_document(doc)
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::template::bind;
    use std::sync::OnceLock;

    #[derive(Debug, Default, PartialEq)]
    struct GeoNearResult {
        locations: Vec<Location>,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Location {
        dis: f64,
        nested: NestedLocation,
    }

    #[derive(Debug, Default, PartialEq)]
    struct NestedLocation {
        name: String,
    }

    #[derive(Debug, Default, PartialEq)]
    struct FlatLocation {
        dis: f64,
        name: String,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Counted {
        n: i64,
        label: Option<String>,
    }

    impl Record for GeoNearResult {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<GeoNearResult>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::builder("GeoNearResult")
                    .aliased("locations", "results", |r: &mut GeoNearResult, v| {
                        r.locations = v
                    })
                    .build()
            })
        }
    }

    impl Record for Location {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<Location>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::builder("Location")
                    .field("dis", |l: &mut Location, v| l.dis = v)
                    .aliased("nested", "obj", |l: &mut Location, v| l.nested = v)
                    .build()
            })
        }
    }

    impl Record for NestedLocation {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<NestedLocation>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::builder("NestedLocation")
                    .field("name", |l: &mut NestedLocation, v| l.name = v)
                    .build()
            })
        }
    }

    impl Record for FlatLocation {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<FlatLocation>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::builder("FlatLocation")
                    .required("dis", |l: &mut FlatLocation, v| l.dis = v)
                    .aliased("name", "obj.name", |l: &mut FlatLocation, v| l.name = v)
                    .build()
            })
        }
    }

    impl Record for Counted {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<Counted>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::builder("Counted")
                    .field("n", |c: &mut Counted, v| c.n = v)
                    .field("label", |c: &mut Counted, v| c.label = v)
                    .build()
            })
        }
    }

    impl_decode_record!(GeoNearResult, Location, NestedLocation, FlatLocation, Counted);

    fn geo_response() -> Document {
        bind(
            "{ ns: 'test.friends', results: [ \
               { dis: 0.0000173, obj: { _id: 1, name: 'Paris' } }, \
               { dis: 0.5, obj: { _id: 2, name: 'Lyon' } } ], ok: 1.0 }",
            &[],
        )
        .unwrap()
    }

    #[test]
    fn test_decode_enveloped_sequence() {
        let result: GeoNearResult = decode(&geo_response()).unwrap();

        assert_eq!(result.locations.len(), 2);
        assert_eq!(result.locations[0].nested.name, "Paris");
        assert!(result.locations[0].dis > 1.7e-5 && result.locations[0].dis < 1.8e-5);
        assert_eq!(result.locations[1].nested.name, "Lyon");
        assert_eq!(result.locations[1].dis, 0.5);
    }

    #[test]
    fn test_decode_dotted_alias() {
        let locations: Vec<FlatLocation> = match geo_response().get("results") {
            Some(value) => Vec::decode_value(value).unwrap(),
            None => panic!("missing results"),
        };
        assert_eq!(
            locations[0],
            FlatLocation {
                dis: 0.0000173,
                name: "Paris".to_string()
            }
        );
    }

    #[test]
    fn test_absent_field_uses_default() {
        let doc = Document::new().with("ok", 1.0);
        let result: GeoNearResult = decode(&doc).unwrap();
        assert!(result.locations.is_empty());

        let counted: Counted = decode(&Document::new().with("n", 2.0).with("label", Value::Null))
            .unwrap();
        assert_eq!(counted, Counted { n: 2, label: None });
    }

    #[test]
    fn test_required_field_missing() {
        let doc = Document::new().with("obj", Document::new().with("name", "x"));
        let err = FlatLocation::decode_document(&doc).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingField {
                field: "dis".to_string()
            }
        );
    }

    #[test]
    fn test_mismatch_reports_full_path() {
        let doc = bind(
            "{ results: [ { dis: 1.0, obj: { name: 'ok' } }, { dis: 2.0, obj: { name: { first: 'x' } } } ] }",
            &[],
        )
        .unwrap();
        let err = decode::<GeoNearResult>(&doc).unwrap_err();
        assert_eq!(err.field(), Some("locations[1].nested.name"));
        assert!(matches!(
            err,
            DecodeError::TypeMismatch { expected: "string", found: "document", .. }
        ));
    }

    #[test]
    fn test_non_document_record() {
        let doc = Document::new().with("obj", "not a document");
        let err = decode::<Location>(&doc).unwrap_err();
        assert_eq!(err.field(), Some("nested"));
    }

    #[test]
    fn test_schema_introspection() {
        let schema = Location::schema();
        assert_eq!(schema.type_name(), "Location");
        assert_eq!(
            schema.fields().iter().map(FieldSpec::name).collect::<Vec<_>>(),
            vec!["dis", "nested"]
        );
        let nested = schema.field("nested").unwrap();
        assert!(nested.is_aliased());
        assert_eq!(nested.source(), "obj");
        assert!(!nested.is_required());
        assert!(FlatLocation::schema().field("dis").unwrap().is_required());
    }
}
