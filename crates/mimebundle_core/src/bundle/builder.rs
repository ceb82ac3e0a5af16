//! Object -> bundle encoding.
//!
//! # Responsibility
//! - Pick a codec (explicit hint or first structural match) and encode once.
//! - Attach provenance and integrity data to the single produced entry.
//!
//! # Invariants
//! - Every built bundle holds exactly one entry.
//! - Failures never yield a partial bundle.

use crate::bundle::sidecar::Sidecar;
use crate::bundle::{Bundle, Payload};
use crate::codec::registry::{global_registry, CodecRegistry};
use crate::codec::Codec;
use crate::error::{BundleError, BundleResult};
use crate::model::object::Object;
use log::{info, warn};

/// Encodes objects against one registry snapshot.
#[derive(Clone, Copy)]
pub struct BundleBuilder<'r> {
    registry: &'r CodecRegistry,
}

impl BundleBuilder<'static> {
    /// Builder over the process-wide registry.
    pub fn global() -> Self {
        Self::new(global_registry())
    }
}

impl<'r> BundleBuilder<'r> {
    pub fn new(registry: &'r CodecRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r CodecRegistry {
        self.registry
    }

    /// Encodes `object` into a one-entry bundle.
    ///
    /// With `content_type_hint`, the named codec must exist and accept the
    /// object; otherwise the first matching codec in priority order is used.
    pub fn build(&self, object: &Object, content_type_hint: Option<&str>) -> BundleResult<Bundle> {
        let result = self.select(object, content_type_hint).and_then(|codec| {
            encode_entry(codec, object)
        });
        match &result {
            Ok(bundle) => {
                for (content_type, sidecar) in bundle.metadata() {
                    info!(
                        "event=bundle_build module=bundle status=ok content_type={} type_name={} byte_length={}",
                        content_type,
                        sidecar.type_name.as_deref().unwrap_or_default(),
                        sidecar.byte_length.unwrap_or_default()
                    );
                }
            }
            Err(err) => warn!(
                "event=bundle_build module=bundle status=error error_code={} type_name={}",
                err.code(),
                object.type_name()
            ),
        }
        result
    }

    fn select(&self, object: &Object, content_type_hint: Option<&str>) -> BundleResult<&'r dyn Codec> {
        let Some(content_type) = content_type_hint else {
            return Ok(self.registry.resolve_for_encode(object));
        };
        let codec = self.registry.resolve_for_decode(content_type)?;
        if !codec.matches(object) {
            return Err(BundleError::CodecMismatch {
                content_type: content_type.to_string(),
                type_name: object.type_name(),
            });
        }
        Ok(codec)
    }
}

fn encode_entry(codec: &dyn Codec, object: &Object) -> BundleResult<Bundle> {
    let encoded = codec.encode(object)?;
    let sidecar = Sidecar::new(object.type_name(), encoded.bytes.len() as u64)
        .with_digest_of(&encoded.bytes)
        .with_hints(encoded.hints);
    Ok(Bundle::single(
        codec.content_type(),
        Payload::base64(&encoded.bytes),
        sidecar,
    ))
}

/// Encodes `object` with the process-wide registry.
pub fn build_bundle(object: &Object, content_type_hint: Option<&str>) -> BundleResult<Bundle> {
    BundleBuilder::global().build(object, content_type_hint)
}
