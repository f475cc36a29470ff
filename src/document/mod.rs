//! Document Model
//!
//! This module defines the structured values exchanged with a document
//! engine: templates bind into a [`Document`], the engine answers with a
//! [`Document`], and the decoder reads typed results out of one.
//!
//! ## Modules
//!
//! - `value`: The [`Value`] enum and its literal form
//! - `doc`: The insertion-ordered [`Document`]
//!
//! ## Example
//!
//! ```
//! use docbind::document::{Document, Value};
//!
//! let doc = Document::new().with("count", "friends").with("limit", 10);
//! assert_eq!(doc.first_key(), Some("count"));
//! assert_eq!(doc.to_string(), r#"{ "count" : "friends", "limit" : 10 }"#);
//! assert_eq!(doc.get("limit"), Some(&Value::Int(10)));
//! ```

pub mod doc;
pub mod value;

pub use doc::Document;
pub use value::Value;
