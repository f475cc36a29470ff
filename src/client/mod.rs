//! Client Façade
//!
//! [`Client`] binds templates and sends them to a [`DocumentEngine`];
//! [`Collection`] does the same for one collection.
//!
//! ```text
//! template + params ──> bind() ──> Document ──> DocumentEngine
//!                                                     │
//!         CommandResult / QueryResult <── response ───┘
//! ```
//!
//! ## Modules
//!
//! - `collection`: Per-collection operations (insert, index, find, count)

pub mod collection;

pub use collection::Collection;

use crate::document::{Document, Value};
use crate::engine::{DocumentEngine, Namespace};
use crate::error::Result;
use crate::result::CommandResult;
use crate::template::Template;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A handle on one database of a document engine.
///
/// Cloning is cheap; clones share the engine.
///
/// # Example
///
/// ```
/// use docbind::client::Client;
/// use docbind::engine::MemoryEngine;
/// use docbind::params;
/// use std::sync::Arc;
///
/// let client = Client::new(Arc::new(MemoryEngine::new()), "test");
/// let friends = client.collection("friends");
/// friends.insert("{ name: # }", &params!["Paris"]).unwrap();
///
/// let n: f64 = client
///     .run_command("{ count: # }", &params!["friends"])
///     .unwrap()
///     .throw_on_error()
///     .unwrap()
///     .get("n")
///     .and_then(|n| n.as_f64())
///     .unwrap();
/// assert_eq!(n, 1.0);
/// ```
#[derive(Clone)]
pub struct Client {
    engine: Arc<dyn DocumentEngine>,
    db: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("db", &self.db).finish()
    }
}

impl Client {
    pub fn new(engine: Arc<dyn DocumentEngine>, db: impl Into<String>) -> Self {
        Self {
            engine,
            db: db.into(),
        }
    }

    /// The database this client talks to.
    pub fn database(&self) -> &str {
        &self.db
    }

    /// Binds a command template and runs it.
    ///
    /// A command the engine reports as failed is still `Ok`; call
    /// [`CommandResult::throw_on_error`] to turn it into an error.
    pub fn run_command(&self, template: &str, params: &[Value]) -> Result<CommandResult> {
        let command = Template::new(template).bind(params)?;
        self.run_command_document(&command)
    }

    /// Runs an already-built command document.
    pub fn run_command_document(&self, command: &Document) -> Result<CommandResult> {
        debug!(
            db = %self.db,
            command = command.first_key().unwrap_or(""),
            "Running command"
        );
        let response = self.engine.execute_command(&self.db, command)?;
        Ok(CommandResult::new(response))
    }

    /// A handle on a collection of this database.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(
            Arc::clone(&self.engine),
            Namespace::new(self.db.clone(), name),
        )
    }
}
