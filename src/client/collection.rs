//! Collection Operations

use crate::decode::Decode;
use crate::document::{Document, Value};
use crate::engine::{DocumentEngine, Namespace};
use crate::error::Result;
use crate::result::{CommandResult, QueryResult, Validated};
use crate::template::Template;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A handle on one collection.
#[derive(Clone)]
pub struct Collection {
    engine: Arc<dyn DocumentEngine>,
    ns: Namespace,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection").field("ns", &self.ns).finish()
    }
}

impl Collection {
    pub fn new(engine: Arc<dyn DocumentEngine>, ns: Namespace) -> Self {
        Self { engine, ns }
    }

    pub fn name(&self) -> &str {
        &self.ns.collection
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    /// Binds a document template and inserts the result.
    pub fn insert(&self, template: &str, params: &[Value]) -> Result<()> {
        let document = Template::new(template).bind(params)?;
        self.insert_document(&document)
    }

    /// Inserts an already-built document.
    pub fn insert_document(&self, document: &Document) -> Result<()> {
        debug!(ns = %self.ns, "Inserting document");
        self.engine.insert(&self.ns, document)?;
        Ok(())
    }

    /// Creates an index from a key template, e.g. `{ loc: '2d' }`.
    pub fn ensure_index(&self, template: &str, params: &[Value]) -> Result<()> {
        let keys = Template::new(template).bind(params)?;
        debug!(ns = %self.ns, keys = %keys, "Ensuring index");
        self.engine.ensure_index(&self.ns, &keys)?;
        Ok(())
    }

    /// Finds the documents matching a query template.
    pub fn find(&self, template: &str, params: &[Value]) -> Result<QueryResult> {
        let query = Template::new(template).bind(params)?;
        debug!(ns = %self.ns, query = %query, "Running query");
        let documents = self.engine.execute_query(&self.ns, &query)?;
        Ok(QueryResult::new(documents))
    }

    /// Finds the first document matching a query template.
    pub fn find_one(&self, template: &str, params: &[Value]) -> Result<Option<Document>> {
        Ok(self.find(template, params)?.into_documents().into_iter().next())
    }

    /// Number of documents in the collection, via the `count` command.
    pub fn count(&self) -> Result<u64> {
        let result = self.command("count")?;
        let n = result.get("n").map(f64::decode_value).transpose()?;
        Ok(n.unwrap_or(0.0) as u64)
    }

    /// Drops the collection.
    pub fn drop(&self) -> Result<()> {
        self.command("drop")?;
        Ok(())
    }

    /// Runs `{ <name>: <collection> }` and validates the response.
    fn command(&self, name: &str) -> Result<CommandResult<Validated>> {
        let command = Document::new().with(name, self.ns.collection.as_str());
        let response = self.engine.execute_command(&self.ns.db, &command)?;
        Ok(CommandResult::new(response).throw_on_error()?)
    }
}
