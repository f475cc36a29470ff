//! Template Binding
//!
//! This module turns human-authored templates with positional `#`
//! placeholders into structured documents.
//!
//! ## Modules
//!
//! - `binder`: Placeholder scanning, parameter substitution and [`BindError`]
//! - `parser`: Parser for the relaxed document syntax used in templates
//!
//! ## Example
//!
//! ```
//! use docbind::template::{bind, BindError};
//! use docbind::params;
//!
//! let doc = bind("{ geoNear: #, near: [#, #] }", &params!["friends", 48.690, 9.140]).unwrap();
//! assert_eq!(doc.first_key(), Some("geoNear"));
//!
//! let err = bind("{ count: # }", &params![]).unwrap_err();
//! assert!(matches!(err, BindError::Arity { placeholders: 1, params: 0 }));
//! ```

pub mod binder;
pub mod parser;

pub use binder::{bind, render, BindError, Template, PLACEHOLDER};
pub use parser::{parse_document, DocumentParser};
