//! # docbind - Parameterized Document Templates and Typed Results
//!
//! docbind lets callers write queries and administrative commands for a
//! document database as text templates with positional `#` placeholders,
//! and read the engine's answers back as typed Rust values.
//!
//! ## Features
//!
//! - **Template Binding**: `{ geoNear: #, near: [#, #] }` plus parameters
//!   becomes a structured document; parameters can never inject syntax
//! - **Typed Decoding**: Per-type schemas with field aliases, including
//!   dotted aliases into nested documents
//! - **Explicit Validation**: Command results decode without checking the
//!   success indicator until `throw_on_error()` is called
//! - **In-Memory Engine**: A sharded, thread-safe engine for tests and the shell
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               docbind                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────────┐     │
//! │  │  Template   │───>│   Client /  │───>│      DocumentEngine      │     │
//! │  │  Binder     │    │  Collection │    │  (trait, MemoryEngine)   │     │
//! │  └─────────────┘    └──────┬──────┘    └────────────┬─────────────┘     │
//! │                            │                        │ response          │
//! │                            ▼                        ▼                   │
//! │                     ┌─────────────┐    ┌──────────────────────────┐     │
//! │                     │  Decoder    │<───│ CommandResult /          │     │
//! │                     │  (Schema)   │    │ QueryResult              │     │
//! │                     └─────────────┘    └──────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use docbind::client::Client;
//! use docbind::engine::MemoryEngine;
//! use docbind::params;
//! use std::sync::Arc;
//!
//! let client = Client::new(Arc::new(MemoryEngine::new()), "test");
//!
//! let result = client.run_command("{ ping: 1 }", &[]).unwrap();
//! assert!(result.is_success());
//!
//! let failure = client
//!     .run_command("{ invalid: # }", &params![1])
//!     .unwrap()
//!     .throw_on_error()
//!     .unwrap_err();
//! assert_eq!(failure.message, "no such cmd: invalid");
//! ```
//!
//! ## Module Overview
//!
//! - [`document`]: The `Document`/`Value` model and its literal form
//! - [`template`]: Placeholder binding and the template parser
//! - [`engine`]: The engine gateway trait and the in-memory engine
//! - [`result`]: Command and query result interpretation
//! - [`decode`]: Typed decoding with schemas and a serde bridge
//! - [`client`]: The `Client` and `Collection` façade
//! - [`shell`]: The interactive line shell behind the `docbind` binary
//!
//! ## Design Highlights
//!
//! ### Parse After Substitution
//!
//! Parameters are rendered as literals into the template text and the
//! result is parsed once. A string parameter is always a quoted, escaped
//! literal, so it stays a single value whatever it contains.
//!
//! ### Transport vs Logical Failure
//!
//! A failed round trip is a `TransportError`. A command the engine ran and
//! rejected is a normal response with `ok: 0.0`; it only becomes an error
//! through `throw_on_error()`.

pub mod client;
pub mod decode;
pub mod document;
pub mod engine;
pub mod error;
pub mod result;
pub mod shell;
pub mod template;

// Re-export commonly used types for convenience
pub use client::{Client, Collection};
pub use decode::{decode, Decode, DecodeError, Record, Schema};
pub use document::{Document, Value};
pub use engine::{DocumentEngine, MemoryEngine, Namespace, TransportError};
pub use error::{Error, Result};
pub use result::{CommandFailure, CommandResult, QueryResult, ResultHandler};
pub use template::{bind, BindError, Template};

/// The default database of the shell
pub const DEFAULT_DB: &str = "test";

/// Version of docbind
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
