//! Document Engine Gateway
//!
//! The [`DocumentEngine`] trait is the boundary between this crate and the
//! database. Everything behind it (network transport, pooling, wire
//! encoding, write concerns) belongs to the implementation.
//!
//! Two kinds of failure must stay apart:
//!
//! - **Transport failure**: the round trip did not complete. The gateway
//!   returns `Err(TransportError)`.
//! - **Logical failure**: the engine answered, and the answer says the
//!   command failed (`ok` is not `1.0`). The gateway returns `Ok(response)`
//!   and leaves interpretation to [`CommandResult`](crate::result::CommandResult).

use crate::document::Document;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised when the engine round trip itself fails.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The engine could not be reached
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The round trip exceeded its deadline
    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),

    /// The engine answered with something that is not a response
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error on the underlying channel
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A collection identifier: database plus collection name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub db: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(db: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.collection)
    }
}

/// A document-oriented database engine.
///
/// All methods are a single blocking round trip. Implementations own
/// cancellation and timeouts and report them as [`TransportError`]; callers
/// never retry.
pub trait DocumentEngine: Send + Sync {
    /// Runs an administrative command against a database.
    ///
    /// The command name is the first key of `command`.
    fn execute_command(&self, db: &str, command: &Document) -> Result<Document, TransportError>;

    /// Runs a query against a collection and returns the matching documents.
    fn execute_query(&self, ns: &Namespace, query: &Document)
        -> Result<Vec<Document>, TransportError>;

    /// Inserts one document into a collection.
    fn insert(&self, ns: &Namespace, document: &Document) -> Result<(), TransportError>;

    /// Creates an index on a collection if it does not exist yet.
    fn ensure_index(&self, ns: &Namespace, keys: &Document) -> Result<(), TransportError>;
}
