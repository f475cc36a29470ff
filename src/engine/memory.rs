//! In-Memory Document Engine
//!
//! This module implements [`DocumentEngine`] entirely in memory. It backs
//! fixtures, tests, the interactive shell and the benchmarks.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Collections are spread over several shards, each
//!    behind its own `RwLock`, so unrelated collections never contend.
//! 2. **Atomic Counters**: Operation counts are lock-free and reported by
//!    the `serverStatus` command.
//! 3. **Offline Switch**: The engine can be taken offline to exercise the
//!    transport-failure path without a real network.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MemoryEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │            │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Namespaces are distributed across shards using a hash function.

use crate::document::{Document, Value};
use crate::engine::commands::CommandHandler;
use crate::engine::gateway::{DocumentEngine, Namespace, TransportError};
use crate::engine::matcher;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// Number of shards for the engine.
const NUM_SHARDS: usize = 16;

/// Index type that enables `geoNear`.
pub const GEO_INDEX_TYPE: &str = "2d";

/// The documents and index specifications of one collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionData {
    /// Documents in insertion order
    pub documents: Vec<Document>,
    /// Index key specifications, e.g. `{ loc: "2d" }`
    pub indexes: Vec<Document>,
}

impl CollectionData {
    /// Returns the field carrying a `2d` index, if any.
    pub fn geo_index_field(&self) -> Option<&str> {
        self.indexes.iter().find_map(|spec| {
            spec.iter()
                .find(|(_, kind)| kind.as_str() == Some(GEO_INDEX_TYPE))
                .map(|(field, _)| field)
        })
    }
}

/// Operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub inserts: u64,
    pub queries: u64,
    pub commands: u64,
}

/// A single shard containing a portion of the collections.
#[derive(Debug, Default)]
struct Shard {
    collections: RwLock<HashMap<Namespace, CollectionData>>,
}

impl Shard {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Namespace, CollectionData>> {
        self.collections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Namespace, CollectionData>> {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A thread-safe in-memory document engine.
///
/// # Example
///
/// ```
/// use docbind::engine::{DocumentEngine, MemoryEngine, Namespace};
/// use docbind::template::bind;
///
/// let engine = MemoryEngine::new();
/// let ns = Namespace::new("test", "friends");
///
/// engine.insert(&ns, &bind("{ name: 'Paris' }", &[]).unwrap()).unwrap();
/// let found = engine.execute_query(&ns, &bind("{ name: 'Paris' }", &[]).unwrap()).unwrap();
/// assert_eq!(found.len(), 1);
///
/// let response = engine.execute_command("test", &bind("{ count: 'friends' }", &[]).unwrap()).unwrap();
/// assert_eq!(response.get("n").and_then(|n| n.as_f64()), Some(1.0));
/// ```
pub struct MemoryEngine {
    /// Sharded collections
    shards: Vec<Shard>,

    /// Engine start time, for `serverStatus`
    start_time: Instant,

    /// When set, every call fails with a transport error
    offline: AtomicBool,

    /// Counter used to generate `_id` values
    next_id: AtomicU64,

    /// Statistics: documents inserted
    insert_count: AtomicU64,

    /// Statistics: queries executed
    query_count: AtomicU64,

    /// Statistics: commands executed
    command_count: AtomicU64,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("shards", &self.shards.len())
            .field("offline", &self.offline.load(Ordering::Relaxed))
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Creates an empty, online engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            start_time: Instant::now(),
            offline: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            insert_count: AtomicU64::new(0),
            query_count: AtomicU64::new(0),
            command_count: AtomicU64::new(0),
        }
    }

    /// Creates an engine that fails every call with a transport error.
    pub fn offline() -> Self {
        let engine = Self::new();
        engine.set_offline(true);
        engine
    }

    /// Takes the engine offline or brings it back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Time since the engine was created.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Snapshot of the operation counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            inserts: self.insert_count.load(Ordering::Relaxed),
            queries: self.query_count.load(Ordering::Relaxed),
            commands: self.command_count.load(Ordering::Relaxed),
        }
    }

    /// Determines which shard a namespace belongs to.
    #[inline]
    fn shard_index(&self, ns: &Namespace) -> usize {
        let mut hasher = DefaultHasher::new();
        ns.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    /// Gets the shard for a given namespace.
    #[inline]
    fn get_shard(&self, ns: &Namespace) -> &Shard {
        &self.shards[self.shard_index(ns)]
    }

    fn check_online(&self) -> Result<(), TransportError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(TransportError::Unavailable("engine is offline".to_string()));
        }
        Ok(())
    }

    /// Runs `f` against a collection, or returns `None` if it does not exist.
    pub fn with_collection<R>(
        &self,
        ns: &Namespace,
        f: impl FnOnce(&CollectionData) -> R,
    ) -> Option<R> {
        let collections = self.get_shard(ns).read();
        collections.get(ns).map(f)
    }

    /// Removes a collection, returning its data.
    pub fn drop_collection(&self, ns: &Namespace) -> Option<CollectionData> {
        self.get_shard(ns).write().remove(ns)
    }

    /// Names of the collections in a database, sorted.
    pub fn collection_names(&self, db: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .keys()
                    .filter(|ns| ns.db == db)
                    .map(|ns| ns.collection.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        names.sort();
        names
    }

    /// Removes every collection.
    pub fn flush(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
    }

    /// Generates a 24-hex-digit identifier, unique within this engine.
    fn generate_id(&self) -> String {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        let counter = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{:08x}{:016x}", secs as u32, counter)
    }
}

impl DocumentEngine for MemoryEngine {
    fn execute_command(&self, db: &str, command: &Document) -> Result<Document, TransportError> {
        self.check_online()?;
        self.command_count.fetch_add(1, Ordering::Relaxed);

        let response = CommandHandler::new(self, db).execute(command);
        trace!(db = db, response = %response, "Command executed");
        Ok(response)
    }

    fn execute_query(
        &self,
        ns: &Namespace,
        query: &Document,
    ) -> Result<Vec<Document>, TransportError> {
        self.check_online()?;
        self.query_count.fetch_add(1, Ordering::Relaxed);

        let found = self
            .with_collection(ns, |data| {
                data.documents
                    .iter()
                    .filter(|doc| matcher::matches(doc, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(found)
    }

    fn insert(&self, ns: &Namespace, document: &Document) -> Result<(), TransportError> {
        self.check_online()?;

        let mut document = document.clone();
        if !document.contains_key("_id") {
            // `_id` goes first, as the engine stores it
            let mut with_id = Document::new().with("_id", Value::String(self.generate_id()));
            for (key, value) in document {
                with_id.insert(key, value);
            }
            document = with_id;
        }

        self.get_shard(ns)
            .write()
            .entry(ns.clone())
            .or_default()
            .documents
            .push(document);
        self.insert_count.fetch_add(1, Ordering::Relaxed);
        debug!(ns = %ns, "Inserted document");
        Ok(())
    }

    fn ensure_index(&self, ns: &Namespace, keys: &Document) -> Result<(), TransportError> {
        self.check_online()?;

        let mut collections = self.get_shard(ns).write();
        let data = collections.entry(ns.clone()).or_default();
        if !data.indexes.contains(keys) {
            data.indexes.push(keys.clone());
            debug!(ns = %ns, keys = %keys, "Created index");
        }
        Ok(())
    }
}
