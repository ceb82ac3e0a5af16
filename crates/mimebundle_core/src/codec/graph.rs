//! Generic object-graph codec, the terminal fallback of every registry.
//!
//! # Responsibility
//! - Serialize any `Object` tree except live handles.
//! - Preserve shared references and reference cycles across the round trip.
//!
//! # Invariants
//! - Payload = 4-byte magic + bincode document with an explicit version.
//! - Every shared node is written once; later visits become `Ref(index)`.
//! - Decode never trusts indices: dangling refs fail with integrity errors.
//! - Containers nest at most `MAX_GRAPH_DEPTH` levels on both encode and
//!   decode; deeper input fails with an error instead of exhausting the stack.
//!
//! # See also
//! - `codec::columnar` for the Arrow stream used by embedded tables.

use crate::bundle::sidecar::Sidecar;
use crate::codec::columnar::{read_stream, write_stream};
use crate::codec::{Codec, EncodedPayload, OBJECT_GRAPH_CONTENT_TYPE};
use crate::error::{BundleError, BundleResult};
use crate::model::object::{Object, SharedObject};
use crate::model::table::{DataFrame, Series};
use bincode::Options;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

/// Leading bytes of every object-graph payload.
pub const GRAPH_MAGIC: &[u8; 4] = b"MBOG";
/// Document layout version written by this build.
pub const GRAPH_FORMAT_VERSION: u32 = 1;

/// Deepest container nesting accepted in either direction. Shared nodes
/// count as one level on encode.
pub const MAX_GRAPH_DEPTH: usize = 128;

/// Sidecar hint: document layout version.
pub const HINT_FORMAT_VERSION: &str = "format_version";
/// Sidecar hint: number of shared nodes in the document.
pub const HINT_SHARED_NODES: &str = "shared_nodes";

/// Codec accepting any object; always registered last.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectGraphCodec;

#[derive(Debug, Serialize, Deserialize)]
struct GraphDocument {
    version: u32,
    root: Node,
    shared: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum TableKind {
    Frame,
    Series,
}

#[derive(Debug, Serialize, Deserialize)]
enum Node {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(#[serde(deserialize_with = "nested")] Vec<Node>),
    Tuple(#[serde(deserialize_with = "nested")] Vec<Node>),
    Dict(#[serde(deserialize_with = "nested")] Vec<(String, Node)>),
    Ref(u32),
    Table { kind: TableKind, ipc: Vec<u8> },
}

impl Codec for ObjectGraphCodec {
    fn content_type(&self) -> &str {
        OBJECT_GRAPH_CONTENT_TYPE
    }

    fn matches(&self, _object: &Object) -> bool {
        true
    }

    fn encode(&self, object: &Object) -> BundleResult<EncodedPayload> {
        let mut encoder = GraphEncoder::default();
        let root = encoder.encode(object)?;
        let shared = encoder.finish()?;
        let shared_nodes = shared.len();
        let document = GraphDocument {
            version: GRAPH_FORMAT_VERSION,
            root,
            shared,
        };

        let mut bytes = GRAPH_MAGIC.to_vec();
        wire_options()
            .serialize_into(&mut bytes, &document)
            .map_err(|err| BundleError::encode(OBJECT_GRAPH_CONTENT_TYPE, err))?;
        Ok(EncodedPayload::new(bytes)
            .with_hint(HINT_FORMAT_VERSION, GRAPH_FORMAT_VERSION)
            .with_hint(HINT_SHARED_NODES, shared_nodes))
    }

    fn decode(&self, bytes: &[u8], sidecar: &Sidecar) -> BundleResult<Object> {
        let body = bytes
            .strip_prefix(GRAPH_MAGIC.as_slice())
            .ok_or_else(|| decode_error("payload does not start with object-graph magic"))?;
        let document: GraphDocument = wire_options()
            .with_limit(body.len() as u64)
            .deserialize(body)
            .map_err(decode_error)?;

        if document.version != GRAPH_FORMAT_VERSION {
            return Err(decode_error(format!(
                "unsupported object-graph version {}",
                document.version
            )));
        }
        if let Some(expected) = sidecar.hint_u64(HINT_SHARED_NODES) {
            if expected != document.shared.len() as u64 {
                return Err(BundleError::integrity(
                    OBJECT_GRAPH_CONTENT_TYPE,
                    format!(
                        "document holds {} shared nodes, sidecar declares {expected}",
                        document.shared.len()
                    ),
                ));
            }
        }

        GraphDecoder::new(document.shared.len()).decode(&document)
    }
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .reject_trailing_bytes()
}

fn decode_error(err: impl ToString) -> BundleError {
    BundleError::decode(OBJECT_GRAPH_CONTENT_TYPE, err)
}

thread_local! {
    static DECODE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of decode nesting for the current thread.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Option<Self> {
        DECODE_DEPTH.with(|depth| {
            if depth.get() >= MAX_GRAPH_DEPTH {
                return None;
            }
            depth.set(depth.get() + 1);
            Some(Self)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Deserializes container children one nesting level down.
fn nested<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let _guard = DepthGuard::enter().ok_or_else(|| {
        D::Error::custom(format!(
            "object graph nests deeper than {MAX_GRAPH_DEPTH} levels"
        ))
    })?;
    T::deserialize(deserializer)
}

enum Segment {
    Key(String),
    Index(usize),
}

/// Walks an object tree, memoizing shared nodes by address.
#[derive(Default)]
struct GraphEncoder {
    shared: Vec<Option<Node>>,
    index_by_addr: HashMap<usize, u32>,
    path: Vec<Segment>,
    depth: usize,
}

impl GraphEncoder {
    fn descend(&mut self) -> BundleResult<()> {
        self.depth += 1;
        if self.depth > MAX_GRAPH_DEPTH {
            return Err(BundleError::encode(
                OBJECT_GRAPH_CONTENT_TYPE,
                format!(
                    "object nests deeper than {MAX_GRAPH_DEPTH} levels at {}",
                    self.render_path()
                ),
            ));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn encode(&mut self, object: &Object) -> BundleResult<Node> {
        let node = match object {
            Object::None => Node::None,
            Object::Bool(value) => Node::Bool(*value),
            Object::Int(value) => Node::Int(*value),
            Object::Float(value) => Node::Float(*value),
            Object::Str(value) => Node::Str(value.clone()),
            Object::Bytes(value) => Node::Bytes(value.clone()),
            Object::List(items) => Node::List(self.encode_items(items)?),
            Object::Tuple(items) => Node::Tuple(self.encode_items(items)?),
            Object::Dict(entries) => {
                self.descend()?;
                let mut encoded = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    self.path.push(Segment::Key(key.clone()));
                    let node = self.encode(value)?;
                    self.path.pop();
                    encoded.push((key.clone(), node));
                }
                self.ascend();
                Node::Dict(encoded)
            }
            Object::Shared(node) => self.encode_shared(node)?,
            Object::Frame(frame) => Node::Table {
                kind: TableKind::Frame,
                ipc: write_stream(frame.batch())
                    .map_err(|err| BundleError::encode(OBJECT_GRAPH_CONTENT_TYPE, err))?,
            },
            Object::Series(series) => {
                let batch = series
                    .to_batch()
                    .map_err(|err| BundleError::encode(OBJECT_GRAPH_CONTENT_TYPE, err))?;
                Node::Table {
                    kind: TableKind::Series,
                    ipc: write_stream(&batch)
                        .map_err(|err| BundleError::encode(OBJECT_GRAPH_CONTENT_TYPE, err))?,
                }
            }
            Object::Handle(_) => {
                return Err(BundleError::UnserializableObject {
                    type_name: object.type_name(),
                    path: self.render_path(),
                })
            }
        };
        Ok(node)
    }

    fn encode_items(&mut self, items: &[Object]) -> BundleResult<Vec<Node>> {
        self.descend()?;
        let mut encoded = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            self.path.push(Segment::Index(position));
            let node = self.encode(item)?;
            self.path.pop();
            encoded.push(node);
        }
        self.ascend();
        Ok(encoded)
    }

    fn encode_shared(&mut self, node: &SharedObject) -> BundleResult<Node> {
        if let Some(index) = self.index_by_addr.get(&node.addr()) {
            return Ok(Node::Ref(*index));
        }
        let index = u32::try_from(self.shared.len()).map_err(|_| {
            BundleError::encode(OBJECT_GRAPH_CONTENT_TYPE, "too many shared nodes")
        })?;
        // Reserve the slot first so a cycle back to this node sees the index.
        self.shared.push(None);
        self.index_by_addr.insert(node.addr(), index);
        self.descend()?;
        let encoded = {
            let value = node.read();
            self.encode(&value)?
        };
        self.ascend();
        self.shared[index as usize] = Some(encoded);
        Ok(Node::Ref(index))
    }

    fn finish(self) -> BundleResult<Vec<Node>> {
        self.shared
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| {
                    BundleError::encode(OBJECT_GRAPH_CONTENT_TYPE, "shared node left unfilled")
                })
            })
            .collect()
    }

    fn render_path(&self) -> String {
        let mut rendered = String::from("$");
        for segment in &self.path {
            let _ = match segment {
                Segment::Key(key) => write!(rendered, ".{key}"),
                Segment::Index(position) => write!(rendered, "[{position}]"),
            };
        }
        rendered
    }
}

/// Rebuilds objects; shared nodes exist as empty placeholders before any
/// content is filled in, so refs (including cyclic ones) always resolve.
struct GraphDecoder {
    nodes: Vec<SharedObject>,
}

impl GraphDecoder {
    fn new(shared_count: usize) -> Self {
        Self {
            nodes: (0..shared_count)
                .map(|_| SharedObject::new(Object::None))
                .collect(),
        }
    }

    fn decode(self, document: &GraphDocument) -> BundleResult<Object> {
        for (index, node) in document.shared.iter().enumerate() {
            let value = self.build(node)?;
            self.nodes[index].replace(value);
        }
        self.build(&document.root)
    }

    fn build(&self, node: &Node) -> BundleResult<Object> {
        let object = match node {
            Node::None => Object::None,
            Node::Bool(value) => Object::Bool(*value),
            Node::Int(value) => Object::Int(*value),
            Node::Float(value) => Object::Float(*value),
            Node::Str(value) => Object::Str(value.clone()),
            Node::Bytes(value) => Object::Bytes(value.clone()),
            Node::List(items) => Object::List(self.build_items(items)?),
            Node::Tuple(items) => Object::Tuple(self.build_items(items)?),
            Node::Dict(entries) => {
                let mut built = BTreeMap::new();
                for (key, value) in entries {
                    if built.insert(key.clone(), self.build(value)?).is_some() {
                        return Err(BundleError::integrity(
                            OBJECT_GRAPH_CONTENT_TYPE,
                            format!("duplicate dict key `{key}`"),
                        ));
                    }
                }
                Object::Dict(built)
            }
            Node::Ref(index) => {
                let shared = self.nodes.get(*index as usize).ok_or_else(|| {
                    BundleError::integrity(
                        OBJECT_GRAPH_CONTENT_TYPE,
                        format!("dangling shared reference {index}"),
                    )
                })?;
                Object::Shared(shared.clone())
            }
            Node::Table { kind, ipc } => {
                let batch = read_stream(ipc).map_err(decode_error)?;
                match kind {
                    TableKind::Frame => Object::Frame(DataFrame::new(batch)),
                    TableKind::Series => {
                        Object::Series(Series::from_batch(&batch).map_err(decode_error)?)
                    }
                }
            }
        };
        Ok(object)
    }

    fn build_items(&self, items: &[Node]) -> BundleResult<Vec<Object>> {
        items.iter().map(|item| self.build(item)).collect()
    }
}
