//! Bundle -> object decoding and named-variable helpers.
//!
//! # Responsibility
//! - Choose one representation by preferred order and decode it.
//! - Validate sidecar, size and digest before any codec sees the bytes.
//! - Offer `get_variable`/`set_variable` on top of build + resolve.
//!
//! # Invariants
//! - Only the selected entry is validated and decoded; other entries
//!   (host renderings, unknown types) are tolerated and ignored.
//! - Decode is all-or-nothing: no best-effort reconstruction on mismatch.
//! - Under `TrustPolicy::RejectObjectGraph` the object-graph entry is
//!   skipped; it only surfaces as `UntrustedRepresentation` when no other
//!   preferred entry is usable.
//!
//! # Security
//! The object-graph representation rebuilds arbitrary object trees from
//! bytes. Decode bundles only when they come from a trusted producer, or run
//! the resolver with `TrustPolicy::RejectObjectGraph`.

use crate::bundle::builder::BundleBuilder;
use crate::bundle::sidecar::{sha256_hex, PayloadEncoding, Sidecar};
use crate::bundle::{Bundle, Payload};
use crate::codec::registry::{global_registry, CodecRegistry};
use crate::codec::{Codec, OBJECT_GRAPH_CONTENT_TYPE};
use crate::config::{ResolverConfig, TrustPolicy};
use crate::error::{BundleError, BundleResult};
use crate::model::object::Object;
use crate::namespace::Namespace;
use log::{info, warn};

/// Decodes bundles against one registry snapshot and one config.
#[derive(Debug, Clone)]
pub struct BundleResolver<'r> {
    registry: &'r CodecRegistry,
    config: ResolverConfig,
}

impl BundleResolver<'static> {
    /// Resolver over the process-wide registry with default config.
    pub fn global() -> Self {
        Self::new(global_registry(), ResolverConfig::default())
    }
}

impl<'r> BundleResolver<'r> {
    pub fn new(registry: &'r CodecRegistry, config: ResolverConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Decodes the first configured content type present in `bundle`.
    pub fn resolve(&self, bundle: &Bundle) -> BundleResult<Object> {
        self.resolve_with_order(bundle, &self.config.preferred_order)
    }

    /// Decodes the first type of `preferred_order` that is both present and
    /// registered.
    pub fn resolve_with_order<S: AsRef<str>>(
        &self,
        bundle: &Bundle,
        preferred_order: &[S],
    ) -> BundleResult<Object> {
        let result = self.select(bundle, preferred_order).and_then(|(content_type, codec)| {
            self.decode_entry(bundle, content_type, codec)
                .map(|object| (content_type, object))
        });
        match result {
            Ok((content_type, object)) => {
                info!(
                    "event=bundle_resolve module=resolver status=ok content_type={} type_name={}",
                    content_type,
                    object.type_name()
                );
                Ok(object)
            }
            Err(err) => {
                warn!(
                    "event=bundle_resolve module=resolver status=error error_code={} entries={}",
                    err.code(),
                    bundle.len()
                );
                Err(err)
            }
        }
    }

    /// Encodes the binding of `name` and decodes it back, so the caller gets
    /// what an external consumer would reconstruct, not the live value.
    pub fn get_variable<N: Namespace + ?Sized>(
        &self,
        namespace: &N,
        name: &str,
        content_type_hint: Option<&str>,
    ) -> BundleResult<Object> {
        let object = namespace
            .get(name)
            .ok_or_else(|| BundleError::VariableNotFound(name.to_string()))?;
        let bundle = BundleBuilder::new(self.registry).build(object, content_type_hint)?;
        match content_type_hint {
            Some(hint) => {
                let mut order = vec![hint];
                order.extend(
                    self.config
                        .preferred_order
                        .iter()
                        .map(String::as_str)
                        .filter(|content_type| *content_type != hint),
                );
                self.resolve_with_order(&bundle, &order)
            }
            None => self.resolve(&bundle),
        }
    }

    /// Decodes `bundle` and binds the result to `name`, replacing any
    /// previous binding. The namespace is untouched when decoding fails.
    pub fn set_variable<N: Namespace + ?Sized>(
        &self,
        namespace: &mut N,
        name: &str,
        bundle: &Bundle,
    ) -> BundleResult<()> {
        let object = self.resolve(bundle)?;
        namespace.set(name, object);
        Ok(())
    }

    fn select<'b, S: AsRef<str>>(
        &self,
        bundle: &'b Bundle,
        preferred_order: &[S],
    ) -> BundleResult<(&'b str, &'r dyn Codec)> {
        let mut untrusted = None;
        for candidate in preferred_order {
            let Some((content_type, _)) = bundle.data().get_key_value(candidate.as_ref()) else {
                continue;
            };
            let Ok(codec) = self.registry.resolve_for_decode(content_type) else {
                continue;
            };
            if content_type == OBJECT_GRAPH_CONTENT_TYPE
                && self.config.trust == TrustPolicy::RejectObjectGraph
            {
                untrusted = Some(content_type.as_str());
                continue;
            }
            return Ok((content_type.as_str(), codec));
        }
        if let Some(content_type) = untrusted {
            return Err(BundleError::UntrustedRepresentation(content_type.to_string()));
        }
        Err(BundleError::NoUsableRepresentation {
            available: bundle.content_types().map(str::to_string).collect(),
        })
    }

    fn decode_entry(
        &self,
        bundle: &Bundle,
        content_type: &str,
        codec: &dyn Codec,
    ) -> BundleResult<Object> {
        let Some((payload, sidecar)) = bundle.get(content_type) else {
            return Err(BundleError::MalformedBundle(format!(
                "entry `{content_type}` has no metadata"
            )));
        };
        let bytes = self.verified_bytes(content_type, payload, sidecar)?;
        codec.decode(&bytes, sidecar)
    }

    fn verified_bytes(
        &self,
        content_type: &str,
        payload: &Payload,
        sidecar: &Sidecar,
    ) -> BundleResult<Vec<u8>> {
        let integrity = |message: String| {
            warn!(
                "event=integrity_check module=resolver status=error content_type={}",
                content_type
            );
            BundleError::integrity(content_type, message)
        };

        if sidecar.encoding == PayloadEncoding::Utf8 {
            return Err(integrity(
                "host-rendered text cannot be decoded by a codec".to_string(),
            ));
        }
        let Some(byte_length) = sidecar.byte_length else {
            return Err(integrity("sidecar is missing `byte_length`".to_string()));
        };
        if sidecar.type_name.is_none() {
            return Err(integrity("sidecar is missing `type_name`".to_string()));
        }
        if byte_length > self.config.max_payload_bytes {
            return Err(BundleError::PayloadTooLarge {
                content_type: content_type.to_string(),
                byte_length,
                limit: self.config.max_payload_bytes,
            });
        }

        let bytes = payload.to_bytes(sidecar.encoding).map_err(integrity)?;
        if bytes.len() as u64 != byte_length {
            return Err(integrity(format!(
                "payload is {} bytes, sidecar declares {byte_length}",
                bytes.len()
            )));
        }
        if let Some(expected) = sidecar.sha256.as_deref() {
            if sha256_hex(&bytes) != expected.to_ascii_lowercase() {
                return Err(integrity("sha256 digest does not match payload".to_string()));
            }
        }
        Ok(bytes.into_owned())
    }
}

/// Decodes `bundle` with the process-wide registry and default config.
pub fn resolve(bundle: &Bundle) -> BundleResult<Object> {
    BundleResolver::global().resolve(bundle)
}

/// Decodes `bundle` with an explicit preferred order.
pub fn resolve_with_order<S: AsRef<str>>(
    bundle: &Bundle,
    preferred_order: &[S],
) -> BundleResult<Object> {
    BundleResolver::global().resolve_with_order(bundle, preferred_order)
}

/// Round-trips the binding of `name` through encode and decode.
pub fn get_variable<N: Namespace + ?Sized>(
    namespace: &N,
    name: &str,
    content_type_hint: Option<&str>,
) -> BundleResult<Object> {
    BundleResolver::global().get_variable(namespace, name, content_type_hint)
}

/// Decodes `bundle` into `namespace[name]`.
pub fn set_variable<N: Namespace + ?Sized>(
    namespace: &mut N,
    name: &str,
    bundle: &Bundle,
) -> BundleResult<()> {
    BundleResolver::global().set_variable(namespace, name, bundle)
}

#[cfg(test)]
mod tests {
    use super::{resolve, resolve_with_order, BundleResolver};
    use crate::bundle::builder::build_bundle;
    use crate::bundle::sidecar::Sidecar;
    use crate::bundle::{Bundle, Payload};
    use crate::codec::registry::global_registry;
    use crate::codec::{ARROW_STREAM_CONTENT_TYPE, OBJECT_GRAPH_CONTENT_TYPE};
    use crate::config::{ResolverConfig, TrustPolicy};
    use crate::error::BundleError;
    use crate::model::object::Object;
    use crate::model::table::DataFrame;
    use arrow::array::{ArrayRef, Int64Array};
    use std::sync::Arc;

    fn dict() -> Object {
        Object::dict([("a", Object::Int(1))])
    }

    #[test]
    fn unregistered_types_are_skipped_in_order() {
        let mut bundle = build_bundle(&dict(), None).expect("bundle");
        bundle.insert(
            "application/x-other",
            Payload::Text("AAAA".to_string()),
            Sidecar::new("x", 3),
        );
        let decoded = resolve_with_order(
            &bundle,
            &["application/x-other", OBJECT_GRAPH_CONTENT_TYPE],
        )
        .expect("graph entry resolves");
        assert_eq!(decoded, dict());
    }

    #[test]
    fn order_without_present_types_finds_nothing() {
        let bundle = build_bundle(&dict(), None).expect("bundle");
        let err = resolve_with_order(&bundle, &[ARROW_STREAM_CONTENT_TYPE])
            .expect_err("graph not in order");
        assert_eq!(
            err,
            BundleError::NoUsableRepresentation {
                available: vec![OBJECT_GRAPH_CONTENT_TYPE.to_string()],
            }
        );
    }

    #[test]
    fn trust_policy_rejects_object_graph() {
        let bundle = build_bundle(&dict(), None).expect("bundle");
        let resolver = BundleResolver::new(
            global_registry(),
            ResolverConfig::default().with_trust(TrustPolicy::RejectObjectGraph),
        );
        let err = resolver.resolve(&bundle).expect_err("graph refused");
        assert_eq!(
            err,
            BundleError::UntrustedRepresentation(OBJECT_GRAPH_CONTENT_TYPE.to_string())
        );
    }

    #[test]
    fn untrusted_graph_entry_yields_to_columnar_entry() {
        let frame = Object::Frame(
            DataFrame::try_from_columns(vec![(
                "a",
                Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
            )])
            .expect("frame"),
        );
        let mut bundle =
            build_bundle(&frame, Some(OBJECT_GRAPH_CONTENT_TYPE)).expect("graph bundle");
        bundle.merge(build_bundle(&frame, None).expect("columnar bundle"));

        let resolver = BundleResolver::new(
            global_registry(),
            ResolverConfig::default()
                .with_preferred_order([OBJECT_GRAPH_CONTENT_TYPE, ARROW_STREAM_CONTENT_TYPE])
                .with_trust(TrustPolicy::RejectObjectGraph),
        );
        assert_eq!(resolver.resolve(&bundle).expect("columnar entry used"), frame);

        let graph_only =
            build_bundle(&frame, Some(OBJECT_GRAPH_CONTENT_TYPE)).expect("graph bundle");
        assert_eq!(
            resolver.resolve(&graph_only),
            Err(BundleError::UntrustedRepresentation(
                OBJECT_GRAPH_CONTENT_TYPE.to_string()
            ))
        );
    }

    #[test]
    fn declared_size_over_limit_is_refused_before_decoding() {
        let bundle = build_bundle(&dict(), None).expect("bundle");
        let resolver = BundleResolver::new(
            global_registry(),
            ResolverConfig::default().with_max_payload_bytes(4),
        );
        let err = resolver.resolve(&bundle).expect_err("over limit");
        assert!(matches!(err, BundleError::PayloadTooLarge { limit: 4, .. }));
    }

    #[test]
    fn missing_type_name_is_an_integrity_error() {
        let bundle = build_bundle(&dict(), None).expect("bundle");
        let (data, mut metadata) = bundle.into_parts();
        if let Some(sidecar) = metadata.get_mut(OBJECT_GRAPH_CONTENT_TYPE) {
            sidecar.type_name = None;
        }
        let stripped = Bundle::from_parts(data, metadata).expect("keys still match");
        let err = resolve(&stripped).expect_err("missing type name");
        assert!(matches!(err, BundleError::Integrity { .. }));
    }

    #[test]
    fn raw_payloads_resolve_in_process() {
        let bundle = build_bundle(&dict(), None)
            .expect("bundle")
            .into_raw()
            .expect("raw form");
        assert_eq!(resolve(&bundle).expect("raw resolves"), dict());
    }
}
