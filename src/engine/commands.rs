//! Engine Command Handler
//!
//! Implements the administrative commands understood by
//! [`MemoryEngine`](crate::engine::MemoryEngine). The command name is the
//! first key of the command document; its value is usually the target
//! collection.
//!
//! ## Supported Commands
//!
//! - `{ ping: 1 }` - Liveness check
//! - `{ buildInfo: 1 }` - Engine version
//! - `{ serverStatus: 1 }` - Host, uptime and operation counters
//! - `{ count: coll [, query] }` - Number of matching documents
//! - `{ distinct: coll, key [, query] }` - Distinct values of a field
//! - `{ geoNear: coll, near: [x, y] [, spherical, num, maxDistance, query] }`
//! - `{ drop: coll }` - Remove a collection
//! - `{ forceerror: 1 }` - Always fails
//!
//! Failures are reported inside the response as `{ ok: 0.0, errmsg, code }`,
//! never as a transport error.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ first key   │───>│  dispatch() │───>│  cmd_*()    │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                        MemoryEngine         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::document::{Document, Value};
use crate::engine::gateway::Namespace;
use crate::engine::matcher;
use crate::engine::memory::MemoryEngine;
use tracing::{debug, warn};

/// Version reported by `buildInfo` and `serverStatus`.
pub const ENGINE_VERSION: &str = "2.4.0-docbind";

/// Default number of `geoNear` results.
const DEFAULT_GEO_NEAR_LIMIT: usize = 100;

/// Error code of `forceerror`.
const FORCED_ERROR_CODE: i64 = 10038;

/// Error code of an unknown command.
const UNKNOWN_COMMAND_CODE: i64 = 59;

/// Builds a success response from the given fields.
fn ok(response: Document) -> Document {
    response.with("ok", 1.0)
}

/// Builds a logical failure response.
fn failure(errmsg: impl Into<String>, code: Option<i64>) -> Document {
    let mut response = Document::new()
        .with("ok", 0.0)
        .with("errmsg", errmsg.into());
    if let Some(code) = code {
        response.insert("code", code);
    }
    response
}

/// Dispatches command documents to their handlers.
pub struct CommandHandler<'a> {
    /// The engine the command runs against
    engine: &'a MemoryEngine,
    /// Database the command was sent to
    db: &'a str,
}

impl<'a> CommandHandler<'a> {
    pub fn new(engine: &'a MemoryEngine, db: &'a str) -> Self {
        Self { engine, db }
    }

    /// Executes a command and returns the engine's response.
    pub fn execute(&self, command: &Document) -> Document {
        let name = match command.first_key() {
            Some(name) => name,
            None => return failure("empty command", None),
        };

        debug!(db = self.db, command = name, "Executing command");
        self.dispatch(name, command)
    }

    fn dispatch(&self, name: &str, command: &Document) -> Document {
        match name {
            "ping" => ok(Document::new()),
            "buildInfo" | "buildinfo" => self.cmd_build_info(),
            "serverStatus" => self.cmd_server_status(),
            "count" => self.cmd_count(command),
            "distinct" => self.cmd_distinct(command),
            "geoNear" => self.cmd_geo_near(command),
            "drop" => self.cmd_drop(command),
            "forceerror" => failure("exception: forced error", Some(FORCED_ERROR_CODE)),
            _ => {
                warn!(db = self.db, command = name, "Unknown command");
                failure(format!("no such cmd: {}", name), Some(UNKNOWN_COMMAND_CODE))
                    .with("bad cmd", command.clone())
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Namespace named by the command's first value.
    fn target(&self, command: &Document, name: &str) -> Option<Namespace> {
        command
            .get(name)
            .and_then(Value::as_str)
            .map(|collection| Namespace::new(self.db, collection))
    }

    /// The optional `query` filter of a command; empty when absent.
    fn query(command: &Document) -> Document {
        command
            .get("query")
            .and_then(Value::as_document)
            .cloned()
            .unwrap_or_default()
    }

    // ========================================================================
    // Server Commands
    // ========================================================================

    fn cmd_build_info(&self) -> Document {
        ok(Document::new().with("version", ENGINE_VERSION))
    }

    fn cmd_server_status(&self) -> Document {
        let stats = self.engine.stats();
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());

        let opcounters = Document::new()
            .with("insert", stats.inserts as i64)
            .with("query", stats.queries as i64)
            .with("command", stats.commands as i64);

        ok(Document::new()
            .with("host", host)
            .with("version", ENGINE_VERSION)
            .with("process", env!("CARGO_PKG_NAME"))
            .with("uptime", self.engine.uptime().as_secs_f64())
            .with("opcounters", opcounters))
    }

    // ========================================================================
    // Collection Commands
    // ========================================================================

    fn cmd_count(&self, command: &Document) -> Document {
        let ns = match self.target(command, "count") {
            Some(ns) => ns,
            None => return failure("count requires a collection name", None),
        };
        let query = Self::query(command);

        let n = self
            .engine
            .with_collection(&ns, |data| {
                data.documents
                    .iter()
                    .filter(|doc| matcher::matches(doc, &query))
                    .count()
            })
            .unwrap_or(0);

        ok(Document::new().with("n", n as f64))
    }

    fn cmd_distinct(&self, command: &Document) -> Document {
        let ns = match self.target(command, "distinct") {
            Some(ns) => ns,
            None => return failure("distinct requires a collection name", None),
        };
        let key = match command.get("key").and_then(Value::as_str) {
            Some(key) => key,
            None => return failure("distinct requires a key", None),
        };
        let query = Self::query(command);

        let values = self
            .engine
            .with_collection(&ns, |data| {
                let mut values: Vec<Value> = Vec::new();
                let found = data
                    .documents
                    .iter()
                    .filter(|doc| matcher::matches(doc, &query))
                    .filter_map(|doc| doc.get_path(key));

                for value in found {
                    // Array fields contribute their elements
                    let candidates = match value {
                        Value::Array(elements) => elements.as_slice(),
                        other => std::slice::from_ref(other),
                    };
                    for candidate in candidates {
                        if !values.iter().any(|v| matcher::values_equal(v, candidate)) {
                            values.push(candidate.clone());
                        }
                    }
                }
                values
            })
            .unwrap_or_default();

        ok(Document::new().with("values", Value::Array(values)))
    }

    fn cmd_drop(&self, command: &Document) -> Document {
        let ns = match self.target(command, "drop") {
            Some(ns) => ns,
            None => return failure("drop requires a collection name", None),
        };

        match self.engine.drop_collection(&ns) {
            // The implicit `_id` index counts too
            Some(data) => ok(Document::new()
                .with("ns", ns.to_string())
                .with("nIndexesWas", data.indexes.len() as i64 + 1)),
            None => failure("ns not found", Some(26)),
        }
    }

    // ========================================================================
    // Geospatial Commands
    // ========================================================================

    fn cmd_geo_near(&self, command: &Document) -> Document {
        let ns = match self.target(command, "geoNear") {
            Some(ns) => ns,
            None => return failure("geoNear requires a collection name", None),
        };
        let near = match command.get("near").and_then(point) {
            Some(near) => near,
            None => return failure("'near' param missing/invalid", Some(17304)),
        };

        let spherical = command
            .get("spherical")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let limit = command
            .get("num")
            .or_else(|| command.get("limit"))
            .and_then(Value::as_i64)
            .map(|n| n.max(0) as usize)
            .unwrap_or(DEFAULT_GEO_NEAR_LIMIT);
        let max_distance = command.get("maxDistance").and_then(Value::as_f64);
        let query = Self::query(command);

        let scan = self.engine.with_collection(&ns, |data| {
            let field = data.geo_index_field()?;
            let mut nscanned = 0i64;
            let mut hits: Vec<(f64, &Document)> = Vec::new();

            for doc in &data.documents {
                let location = match doc.get_path(field).and_then(point) {
                    Some(location) => location,
                    None => continue,
                };
                nscanned += 1;
                if !matcher::matches(doc, &query) {
                    continue;
                }
                let dis = if spherical {
                    haversine(near, location)
                } else {
                    planar(near, location)
                };
                if max_distance.is_some_and(|max| dis > max) {
                    continue;
                }
                hits.push((dis, doc));
            }

            hits.sort_by(|a, b| a.0.total_cmp(&b.0));
            hits.truncate(limit);

            let results: Vec<Value> = hits
                .iter()
                .map(|(dis, doc)| {
                    Value::Document(Document::new().with("dis", *dis).with("obj", (*doc).clone()))
                })
                .collect();
            let loaded = hits.len();
            let total: f64 = hits.iter().map(|(dis, _)| dis).sum();
            let avg = if loaded == 0 { 0.0 } else { total / loaded as f64 };
            let max = hits.last().map(|(dis, _)| *dis).unwrap_or(0.0);

            let stats = Document::new()
                .with("nscanned", nscanned)
                .with("objectsLoaded", loaded as i64)
                .with("avgDistance", avg)
                .with("maxDistance", max);

            Some((results, stats))
        });

        match scan.flatten() {
            Some((results, stats)) => ok(Document::new()
                .with("ns", ns.to_string())
                .with("near", vec![near.0, near.1])
                .with("results", Value::Array(results))
                .with("stats", stats)),
            None => failure("no geo index :(", None),
        }
    }
}

/// Reads a legacy coordinate pair: `[x, y]` or the first two numeric
/// values of a sub-document, e.g. `{ lat: 48.69, lng: 9.14 }`.
fn point(value: &Value) -> Option<(f64, f64)> {
    let mut numbers: Box<dyn Iterator<Item = Option<f64>> + '_> = match value {
        Value::Array(elements) => Box::new(elements.iter().map(Value::as_f64)),
        Value::Document(doc) => Box::new(doc.iter().map(|(_, v)| v.as_f64())),
        _ => return None,
    };
    let x = numbers.next()??;
    let y = numbers.next()??;
    Some((x, y))
}

/// Euclidean distance in coordinate units.
fn planar(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Great-circle distance in radians; `x` is longitude and `y` latitude,
/// both in degrees.
fn haversine(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lng1, lat1) = (a.0.to_radians(), a.1.to_radians());
    let (lng2, lat2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}
