//! Ordered codec registry and the process-wide bootstrap instance.
//!
//! # Responsibility
//! - Map content types to codecs for decode.
//! - Pick the first structurally matching codec for encode.
//!
//! # Invariants
//! - Insertion order is priority order.
//! - The fallback codec is always the terminal entry and accepts any object.
//! - The global registry is built once and never mutated afterwards.

use crate::codec::columnar::ArrowStreamCodec;
use crate::codec::graph::ObjectGraphCodec;
use crate::codec::Codec;
use crate::error::{BundleError, BundleResult};
use crate::model::object::Object;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

static CONTENT_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9!#$&^_.+-]*/[a-z0-9][a-z0-9!#$&^_.+-]*$")
        .expect("valid content type regex")
});

static GLOBAL_REGISTRY: Lazy<CodecRegistry> = Lazy::new(|| {
    let registry = CodecRegistry::bootstrap();
    info!(
        "event=registry_init module=codec status=ok codecs={}",
        registry.content_types().join(",")
    );
    registry
});

/// Returns the process-wide registry (columnar codec, then object graph).
pub fn global_registry() -> &'static CodecRegistry {
    &GLOBAL_REGISTRY
}

/// Returns whether `value` follows the `type/subtype` grammar.
pub fn is_valid_content_type(value: &str) -> bool {
    CONTENT_TYPE_RE.is_match(value)
}

/// Ordered codec table; the last entry is the catch-all fallback.
#[derive(Clone)]
pub struct CodecRegistry {
    specific: Vec<Arc<dyn Codec>>,
    fallback: Arc<dyn Codec>,
}

impl CodecRegistry {
    /// Creates a registry whose terminal entry is `fallback`.
    pub fn with_fallback(fallback: Arc<dyn Codec>) -> BundleResult<Self> {
        validate_content_type(fallback.content_type())?;
        Ok(Self {
            specific: Vec::new(),
            fallback,
        })
    }

    /// Builds the bootstrap pair: Arrow stream codec before the object graph.
    pub fn bootstrap() -> Self {
        Self {
            specific: vec![Arc::new(ArrowStreamCodec) as Arc<dyn Codec>],
            fallback: Arc::new(ObjectGraphCodec),
        }
    }

    /// Appends one codec ahead of the fallback.
    pub fn register(&mut self, codec: Arc<dyn Codec>) -> BundleResult<()> {
        let content_type = codec.content_type();
        validate_content_type(content_type)?;
        if self.get(content_type).is_some() {
            return Err(BundleError::DuplicateContentType(content_type.to_string()));
        }
        self.specific.push(codec);
        Ok(())
    }

    /// Returns the first codec that matches `object`, else the fallback.
    pub fn resolve_for_encode(&self, object: &Object) -> &dyn Codec {
        self.specific
            .iter()
            .find(|codec| codec.matches(object))
            .map(|codec| codec.as_ref())
            .unwrap_or_else(|| self.fallback.as_ref())
    }

    /// Exact lookup by content type.
    pub fn resolve_for_decode(&self, content_type: &str) -> BundleResult<&dyn Codec> {
        self.get(content_type)
            .ok_or_else(|| BundleError::UnknownContentType(content_type.to_string()))
    }

    /// Returns whether `content_type` is registered.
    pub fn contains(&self, content_type: &str) -> bool {
        self.get(content_type).is_some()
    }

    /// Content types in priority order, fallback last.
    pub fn content_types(&self) -> Vec<&str> {
        self.iter().map(|codec| codec.content_type()).collect()
    }

    pub fn fallback(&self) -> &dyn Codec {
        self.fallback.as_ref()
    }

    pub fn len(&self) -> usize {
        self.specific.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn get(&self, content_type: &str) -> Option<&dyn Codec> {
        self.iter().find(|codec| codec.content_type() == content_type)
    }

    fn iter(&self) -> impl Iterator<Item = &dyn Codec> {
        self.specific
            .iter()
            .map(|codec| codec.as_ref())
            .chain(std::iter::once(self.fallback.as_ref()))
    }
}

impl Debug for CodecRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}

fn validate_content_type(value: &str) -> BundleResult<()> {
    if is_valid_content_type(value) {
        Ok(())
    } else {
        Err(BundleError::InvalidContentType(value.to_string()))
    }
}
