//! Dynamic object model carried through bundles.
//!
//! # Responsibility
//! - Define the closed set of values the core can encode and decode.
//! - Give shared nodes an identity so graphs keep sharing and cycles.
//!
//! # Invariants
//! - Two `Object::Shared` values are the same object iff they point at the
//!   same `SharedObject` node (`SharedObject::ptr_eq`).
//! - Structural equality terminates on cyclic graphs.
//! - `LiveHandle` never has a serialized form.

use crate::model::table::{DataFrame, Series};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Qualified type names recorded as bundle provenance.
pub const TYPE_NONE: &str = "mimebundle.none";
pub const TYPE_BOOL: &str = "mimebundle.bool";
pub const TYPE_INT: &str = "mimebundle.int";
pub const TYPE_FLOAT: &str = "mimebundle.float";
pub const TYPE_STR: &str = "mimebundle.str";
pub const TYPE_BYTES: &str = "mimebundle.bytes";
pub const TYPE_LIST: &str = "mimebundle.list";
pub const TYPE_TUPLE: &str = "mimebundle.tuple";
pub const TYPE_DICT: &str = "mimebundle.dict";
pub const TYPE_DATAFRAME: &str = "mimebundle.DataFrame";
pub const TYPE_SERIES: &str = "mimebundle.Series";
pub const TYPE_HANDLE: &str = "mimebundle.LiveHandle";
/// Reported for a chain of shared nodes that only leads back to itself.
pub const TYPE_SHARED: &str = "mimebundle.shared";

/// One value in a host namespace.
#[derive(Debug, Clone, Default)]
pub enum Object {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Object>),
    Tuple(Vec<Object>),
    Dict(BTreeMap<String, Object>),
    /// Reference to a node that may be reachable from several places.
    Shared(SharedObject),
    Frame(DataFrame),
    Series(Series),
    Handle(LiveHandle),
}

impl Object {
    /// Builds a dict from `(key, value)` pairs.
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Object)>,
    {
        Self::Dict(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Stable qualified type name of this value.
    ///
    /// Shared nodes report the type of the first non-shared value down their
    /// chain, or `TYPE_SHARED` when the chain loops.
    pub fn type_name(&self) -> String {
        let Self::Shared(first) = self else {
            return self.static_type_name().to_string();
        };
        let mut visited = vec![first.addr()];
        let mut current = first.clone();
        loop {
            let next = match &*current.read() {
                Self::Shared(next) => next.clone(),
                other => return other.static_type_name().to_string(),
            };
            if visited.contains(&next.addr()) {
                return TYPE_SHARED.to_string();
            }
            visited.push(next.addr());
            current = next;
        }
    }

    fn static_type_name(&self) -> &'static str {
        match self {
            Self::None => TYPE_NONE,
            Self::Bool(_) => TYPE_BOOL,
            Self::Int(_) => TYPE_INT,
            Self::Float(_) => TYPE_FLOAT,
            Self::Str(_) => TYPE_STR,
            Self::Bytes(_) => TYPE_BYTES,
            Self::List(_) => TYPE_LIST,
            Self::Tuple(_) => TYPE_TUPLE,
            Self::Dict(_) => TYPE_DICT,
            Self::Shared(_) => TYPE_SHARED,
            Self::Frame(_) => TYPE_DATAFRAME,
            Self::Series(_) => TYPE_SERIES,
            Self::Handle(_) => TYPE_HANDLE,
        }
    }

    /// Returns whether this value is one of the tabular containers.
    ///
    /// A table behind `Object::Shared` is not tabular here: it goes through
    /// the object graph so its identity survives, while its `type_name` still
    /// names the table it holds.
    pub fn is_tabular(&self) -> bool {
        matches!(self, Self::Frame(_) | Self::Series(_))
    }

    pub fn as_frame(&self) -> Option<&DataFrame> {
        match self {
            Self::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Self::Series(series) => Some(series),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, Object>> {
        match self {
            Self::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_shared(&self) -> Option<&SharedObject> {
        match self {
            Self::Shared(node) => Some(node),
            _ => None,
        }
    }

    fn eq_with(&self, other: &Self, in_progress: &mut Vec<(usize, usize)>) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(left, right)| left.eq_with(right, in_progress))
            }
            (Self::Dict(a), Self::Dict(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                        ka == kb && va.eq_with(vb, in_progress)
                    })
            }
            (Self::Shared(a), Self::Shared(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                let pair = (a.addr(), b.addr());
                // Pair already under comparison further up: assume equal.
                if in_progress.contains(&pair) {
                    return true;
                }
                in_progress.push(pair);
                let equal = {
                    let left = a.read();
                    let right = b.read();
                    left.eq_with(&right, in_progress)
                };
                in_progress.pop();
                equal
            }
            (Self::Frame(a), Self::Frame(b)) => a == b,
            (Self::Series(a), Self::Series(b)) => a == b,
            (Self::Handle(a), Self::Handle(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, &mut Vec::new())
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Self::List(value)
    }
}

impl From<DataFrame> for Object {
    fn from(value: DataFrame) -> Self {
        Self::Frame(value)
    }
}

impl From<Series> for Object {
    fn from(value: Series) -> Self {
        Self::Series(value)
    }
}

impl From<SharedObject> for Object {
    fn from(value: SharedObject) -> Self {
        Self::Shared(value)
    }
}

/// Reference-counted node with identity.
///
/// Cloning a `SharedObject` yields another reference to the same node. A node
/// that (directly or indirectly) contains itself forms a reference cycle and is
/// only released at process exit.
#[derive(Clone, Default)]
pub struct SharedObject {
    inner: Arc<RwLock<Object>>,
}

impl SharedObject {
    pub fn new(value: Object) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Shared read access; recursive so nested reads of one node cannot
    /// deadlock behind a queued writer.
    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.inner.read_recursive()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.inner.write()
    }

    /// Replaces the held value, returning the previous one.
    pub fn replace(&self, value: Object) -> Object {
        std::mem::replace(&mut *self.inner.write(), value)
    }

    /// Returns whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Node address, stable for the node lifetime.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl Debug for SharedObject {
    // Contents are not printed: a cyclic node would recurse forever.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedObject(@{:#x})", self.addr())
    }
}

/// Live resource (OS handle, socket, callback) with no serialized form.
#[derive(Clone)]
pub struct LiveHandle {
    label: String,
    resource: Arc<dyn Any + Send + Sync>,
}

impl LiveHandle {
    pub fn new(label: impl Into<String>, resource: impl Any + Send + Sync) -> Self {
        Self {
            label: label.into(),
            resource: Arc::new(resource),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.resource.downcast_ref::<T>()
    }
}

impl PartialEq for LiveHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl Debug for LiveHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHandle")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
