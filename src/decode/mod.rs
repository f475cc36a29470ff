//! Result Decoding
//!
//! This module maps raw response documents onto typed Rust values.
//!
//! ## Modules
//!
//! - `convert`: The [`Decode`] trait, scalar/sequence conversions and [`DecodeError`]
//! - `schema`: Per-type decode tables ([`Schema`]) with field aliases
//! - `deserialize`: A serde-based alternative for `Deserialize` types
//!
//! ## Decoding Pipeline
//!
//! ```text
//! Document ──> Schema<T> ──> for each field:
//!                              resolve source key (alias or name)
//!                              absent/null ──> default (or MissingField)
//!                              present     ──> V::decode_value ──> setter
//! ```
//!
//! Nested records and sequences recurse through the same pipeline, so an
//! aliased envelope key is traversed one full level before leaf data is
//! reached.

pub mod convert;
pub mod deserialize;
pub mod schema;

pub use convert::{decode, Decode, DecodeError};
pub use deserialize::from_document;
pub use schema::{FieldSpec, Record, Schema, SchemaBuilder};
