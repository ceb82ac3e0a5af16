//! MIME bundle serialization core.
//!
//! Converts in-memory objects into content-type keyed bundles and back:
//! a read-only codec registry picks the backend (Arrow stream for tables,
//! object graph for everything else), the builder encodes, the resolver
//! validates and decodes.

pub mod bundle;
pub mod codec;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod model;
pub mod namespace;

pub use bundle::builder::{build_bundle, BundleBuilder};
pub use bundle::proxy::{BundleProducer, ProxyObject};
pub use bundle::resolver::{get_variable, resolve, resolve_with_order, set_variable, BundleResolver};
pub use bundle::sidecar::{PayloadEncoding, Sidecar};
pub use bundle::{Bundle, Payload};
pub use codec::registry::{global_registry, CodecRegistry};
pub use codec::{Codec, EncodedPayload, ARROW_STREAM_CONTENT_TYPE, OBJECT_GRAPH_CONTENT_TYPE};
pub use config::{ConfigError, ResolverConfig, TrustPolicy};
pub use display::{DisplayHost, MimeFilter, Rendered, SummaryHost};
pub use error::{BundleError, BundleResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::object::{LiveHandle, Object, SharedObject};
pub use model::table::{DataFrame, Series};
pub use namespace::Namespace;

/// Minimal health-check API for embedders.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
