//! Document Engine
//!
//! This module defines the gateway to a document database and ships an
//! in-memory implementation of it.
//!
//! ## Modules
//!
//! - `gateway`: The [`DocumentEngine`] trait, [`Namespace`] and [`TransportError`]
//! - `memory`: [`MemoryEngine`], a sharded in-memory engine
//! - `commands`: Administrative commands understood by [`MemoryEngine`]
//! - `matcher`: Query filter evaluation
//!
//! ## Example
//!
//! ```
//! use docbind::engine::{DocumentEngine, MemoryEngine};
//! use docbind::template::bind;
//!
//! let engine = MemoryEngine::new();
//! let response = engine.execute_command("test", &bind("{ ping: 1 }", &[]).unwrap()).unwrap();
//! assert_eq!(response.get("ok").and_then(|ok| ok.as_f64()), Some(1.0));
//! ```

pub mod commands;
pub mod gateway;
pub mod matcher;
pub mod memory;

pub use commands::{CommandHandler, ENGINE_VERSION};
pub use gateway::{DocumentEngine, Namespace, TransportError};
pub use memory::{CollectionData, EngineStats, MemoryEngine};
