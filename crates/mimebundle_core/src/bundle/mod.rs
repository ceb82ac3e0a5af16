//! Bundle data model: payloads keyed by content type plus their sidecars.
//!
//! # Responsibility
//! - Hold one or more representations of a single object.
//! - Convert between the JSON wire shape and the in-memory model.
//!
//! # Invariants
//! - `data` and `metadata` always have the same key set.
//! - Deserializing a bundle whose key sets differ fails.
//!
//! # See also
//! - `bundle::builder` for producing bundles.
//! - `bundle::resolver` for consuming them.

pub mod builder;
pub mod proxy;
pub mod resolver;
pub mod sidecar;

use crate::bundle::sidecar::{PayloadEncoding, Sidecar};
use crate::error::{BundleError, BundleResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Payload of one entry. The sidecar `encoding` says how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    /// Base64 text for `bytes`.
    pub fn base64(bytes: &[u8]) -> Self {
        Self::Text(STANDARD.encode(bytes))
    }

    /// Recovers raw bytes according to `encoding`.
    pub fn to_bytes(&self, encoding: PayloadEncoding) -> Result<Cow<'_, [u8]>, String> {
        match (self, encoding) {
            (Self::Text(text), PayloadEncoding::Base64) => STANDARD
                .decode(text.as_bytes())
                .map(Cow::Owned)
                .map_err(|err| format!("payload is not valid base64: {err}")),
            (Self::Text(text), PayloadEncoding::Utf8) => Ok(Cow::Borrowed(text.as_bytes())),
            (Self::Bytes(bytes), PayloadEncoding::Raw) => Ok(Cow::Borrowed(bytes.as_slice())),
            (payload, encoding) => Err(format!(
                "{} payload declared as `{}`",
                payload.kind(),
                encoding.as_str()
            )),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// Multi-representation form of one object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "BundleParts")]
pub struct Bundle {
    data: BTreeMap<String, Payload>,
    metadata: BTreeMap<String, Sidecar>,
}

#[derive(Deserialize)]
struct BundleParts {
    #[serde(default)]
    data: BTreeMap<String, Payload>,
    #[serde(default)]
    metadata: BTreeMap<String, Sidecar>,
}

impl TryFrom<BundleParts> for Bundle {
    type Error = BundleError;

    fn try_from(parts: BundleParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.data, parts.metadata)
    }
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle with exactly one entry.
    pub fn single(content_type: impl Into<String>, payload: Payload, sidecar: Sidecar) -> Self {
        let mut bundle = Self::new();
        bundle.insert(content_type, payload, sidecar);
        bundle
    }

    /// Builds a bundle from separate maps, rejecting differing key sets.
    pub fn from_parts(
        data: BTreeMap<String, Payload>,
        metadata: BTreeMap<String, Sidecar>,
    ) -> BundleResult<Self> {
        if !data.keys().eq(metadata.keys()) {
            let missing_metadata: Vec<&str> = data
                .keys()
                .filter(|key| !metadata.contains_key(*key))
                .map(String::as_str)
                .collect();
            let missing_data: Vec<&str> = metadata
                .keys()
                .filter(|key| !data.contains_key(*key))
                .map(String::as_str)
                .collect();
            return Err(BundleError::MalformedBundle(format!(
                "data/metadata keys differ (no metadata: [{}], no data: [{}])",
                missing_metadata.join(", "),
                missing_data.join(", ")
            )));
        }
        Ok(Self { data, metadata })
    }

    /// Adds or replaces one entry.
    pub fn insert(&mut self, content_type: impl Into<String>, payload: Payload, sidecar: Sidecar) {
        let content_type = content_type.into();
        self.data.insert(content_type.clone(), payload);
        self.metadata.insert(content_type, sidecar);
    }

    /// Removes one entry, returning it when present.
    pub fn remove(&mut self, content_type: &str) -> Option<(Payload, Sidecar)> {
        let payload = self.data.remove(content_type)?;
        let sidecar = self.metadata.remove(content_type)?;
        Some((payload, sidecar))
    }

    pub fn get(&self, content_type: &str) -> Option<(&Payload, &Sidecar)> {
        Some((self.data.get(content_type)?, self.metadata.get(content_type)?))
    }

    pub fn contains(&self, content_type: &str) -> bool {
        self.data.contains_key(content_type)
    }

    /// Content types present, in key order.
    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn data(&self) -> &BTreeMap<String, Payload> {
        &self.data
    }

    pub fn metadata(&self) -> &BTreeMap<String, Sidecar> {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (BTreeMap<String, Payload>, BTreeMap<String, Sidecar>) {
        (self.data, self.metadata)
    }

    /// Transport merge: entries of `other` replace entries with the same key.
    pub fn merge(&mut self, other: Bundle) {
        let (data, mut metadata) = other.into_parts();
        for (content_type, payload) in data {
            if let Some(sidecar) = metadata.remove(&content_type) {
                self.insert(content_type, payload, sidecar);
            }
        }
    }

    /// Rewrites raw codec payloads as base64 text.
    pub fn into_transport(mut self) -> Self {
        for (content_type, payload) in self.data.iter_mut() {
            let Some(sidecar) = self.metadata.get_mut(content_type) else {
                continue;
            };
            if let (Payload::Bytes(bytes), PayloadEncoding::Raw) = (&*payload, sidecar.encoding) {
                *payload = Payload::base64(bytes);
                sidecar.encoding = PayloadEncoding::Base64;
            }
        }
        self
    }

    /// Rewrites base64 codec payloads as raw bytes.
    pub fn into_raw(mut self) -> BundleResult<Self> {
        for (content_type, payload) in self.data.iter_mut() {
            let Some(sidecar) = self.metadata.get_mut(content_type) else {
                continue;
            };
            if sidecar.encoding != PayloadEncoding::Base64 {
                continue;
            }
            let bytes = payload
                .to_bytes(PayloadEncoding::Base64)
                .map_err(|message| BundleError::integrity(content_type, message))?
                .into_owned();
            *payload = Payload::Bytes(bytes);
            sidecar.encoding = PayloadEncoding::Raw;
        }
        Ok(self)
    }

    pub fn to_json_value(&self) -> BundleResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|err| BundleError::MalformedBundle(err.to_string()))
    }

    pub fn to_json_string(&self) -> BundleResult<String> {
        serde_json::to_string(self).map_err(|err| BundleError::MalformedBundle(err.to_string()))
    }

    pub fn from_json_str(text: &str) -> BundleResult<Self> {
        serde_json::from_str(text).map_err(|err| BundleError::MalformedBundle(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Bundle, Payload};
    use crate::bundle::sidecar::{PayloadEncoding, Sidecar};
    use crate::error::BundleError;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn entry(bytes: &[u8]) -> (Payload, Sidecar) {
        (
            Payload::base64(bytes),
            Sidecar::new("mimebundle.bytes", bytes.len() as u64),
        )
    }

    #[test]
    fn wire_shape_is_string_data_and_object_metadata() {
        let (payload, sidecar) = entry(b"hello");
        let bundle = Bundle::single("application/x-test", payload, sidecar);
        let value = bundle.to_json_value().expect("bundle to json");
        assert_eq!(
            value,
            json!({
                "data": {"application/x-test": "aGVsbG8="},
                "metadata": {"application/x-test": {
                    "byte_length": 5,
                    "type_name": "mimebundle.bytes",
                    "encoding": "base64"
                }}
            })
        );

        let text = bundle.to_json_string().expect("bundle to string");
        assert_eq!(Bundle::from_json_str(&text).expect("bundle parses"), bundle);
    }

    #[test]
    fn mismatched_keys_are_rejected() {
        let (payload, _) = entry(b"x");
        let data = BTreeMap::from([("a/b".to_string(), payload)]);
        let err = Bundle::from_parts(data, BTreeMap::new()).expect_err("keys differ");
        assert!(matches!(err, BundleError::MalformedBundle(_)));

        let err = Bundle::from_json_str(r#"{"data": {}, "metadata": {"a/b": {}}}"#)
            .expect_err("metadata without data");
        assert!(matches!(err, BundleError::MalformedBundle(_)));
    }

    #[test]
    fn merge_keeps_both_sources_and_later_wins() {
        let (first_payload, first_sidecar) = entry(b"one");
        let mut merged = Bundle::single("a/one", first_payload, first_sidecar);

        let (second_payload, second_sidecar) = entry(b"two");
        let (replacement, replacement_sidecar) = entry(b"uno");
        let mut other = Bundle::single("a/two", second_payload, second_sidecar);
        other.insert("a/one", replacement.clone(), replacement_sidecar);

        merged.merge(other);
        assert_eq!(merged.content_types().collect::<Vec<_>>(), vec!["a/one", "a/two"]);
        assert_eq!(merged.get("a/one").map(|(payload, _)| payload), Some(&replacement));
    }

    #[test]
    fn raw_and_text_forms_interconvert() {
        let (payload, sidecar) = entry(&[0, 1, 2, 250]);
        let bundle = Bundle::single("a/b", payload, sidecar);

        let raw = bundle.clone().into_raw().expect("base64 decodes");
        let (payload, sidecar) = raw.get("a/b").expect("entry");
        assert_eq!(payload, &Payload::Bytes(vec![0, 1, 2, 250]));
        assert_eq!(sidecar.encoding, PayloadEncoding::Raw);

        assert_eq!(raw.into_transport(), bundle);
    }

    #[test]
    fn payload_form_must_match_declared_encoding() {
        let payload = Payload::Bytes(vec![1, 2]);
        assert!(payload.to_bytes(PayloadEncoding::Base64).is_err());
        assert_eq!(
            payload.to_bytes(PayloadEncoding::Raw).expect("raw").as_ref(),
            &[1, 2]
        );
        assert!(Payload::Text("%%%".into())
            .to_bytes(PayloadEncoding::Base64)
            .is_err());
    }

    #[test]
    fn remove_drops_both_halves() {
        let (payload, sidecar) = entry(b"x");
        let mut bundle = Bundle::single("a/b", payload, sidecar);
        assert!(bundle.remove("a/b").is_some());
        assert!(bundle.is_empty());
        assert!(bundle.metadata().is_empty());
    }
}
