//! Codec contracts and backend implementations.
//!
//! # Responsibility
//! - Define the narrow object <-> bytes contract every backend implements.
//! - Host the process-wide registry that picks a backend per object.
//!
//! # Invariants
//! - `encode` and `decode` are pure: no I/O, no global state, no caching.
//! - A codec either returns a full payload or an error, never partial bytes.

pub mod columnar;
pub mod graph;
pub mod registry;

use crate::bundle::sidecar::Sidecar;
use crate::error::BundleResult;
use crate::model::object::Object;
use serde_json::{Map, Value};

/// Arrow IPC streaming format, used for tabular objects.
pub const ARROW_STREAM_CONTENT_TYPE: &str = "application/vnd.apache.arrow.stream";
/// Versioned object-graph format, used for everything else.
pub const OBJECT_GRAPH_CONTENT_TYPE: &str = "application/vnd.mimebundle.object-graph";

/// Default resolve priority: columnar first, object graph last.
pub const DEFAULT_PRIORITY: &[&str] = &[ARROW_STREAM_CONTENT_TYPE, OBJECT_GRAPH_CONTENT_TYPE];

/// Bytes produced by one codec plus backend-specific sidecar hints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedPayload {
    pub bytes: Vec<u8>,
    /// Backend hints (row/column counts, ...) checked again on decode.
    pub hints: Map<String, Value>,
}

impl EncodedPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            hints: Map::new(),
        }
    }

    pub fn with_hint(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.hints.insert(key.to_string(), value.into());
        self
    }
}

/// Backend registered under one content type.
///
/// Implementations must be stateless so one instance can serve concurrent
/// callers.
pub trait Codec: Send + Sync {
    /// Content type this codec produces and consumes.
    fn content_type(&self) -> &str;

    /// Returns whether this codec can encode `object`.
    fn matches(&self, object: &Object) -> bool;

    /// Serializes `object` into a self-describing byte payload.
    fn encode(&self, object: &Object) -> BundleResult<EncodedPayload>;

    /// Rebuilds an object from payload bytes and their sidecar.
    fn decode(&self, bytes: &[u8], sidecar: &Sidecar) -> BundleResult<Object>;
}
