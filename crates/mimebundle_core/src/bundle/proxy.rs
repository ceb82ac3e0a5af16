//! Lazy bundle producer wrapping one owned object.
//!
//! # Responsibility
//! - Own exactly one target and encode it on request.
//! - Merge host renderings with the codec representation for display.
//!
//! # Invariants
//! - Nothing is cached: every request is a fresh encode of the current target.
//! - The target is never mutated by bundle production.

use crate::bundle::builder::BundleBuilder;
use crate::bundle::Bundle;
use crate::codec::registry::{global_registry, CodecRegistry};
use crate::display::{format_object, DisplayHost, MimeFilter};
use crate::error::BundleResult;
use crate::model::object::Object;

/// Anything a display host can ask for a bundle.
pub trait BundleProducer {
    fn produce_bundle(&self) -> BundleResult<Bundle>;
}

/// Owns one object and produces its bundle lazily.
#[derive(Debug)]
pub struct ProxyObject<'r> {
    target: Object,
    content_type_hint: Option<String>,
    registry: &'r CodecRegistry,
}

impl ProxyObject<'static> {
    /// Proxy over the process-wide registry.
    pub fn new(target: impl Into<Object>) -> Self {
        Self::with_registry(target, global_registry())
    }
}

impl<'r> ProxyObject<'r> {
    pub fn with_registry(target: impl Into<Object>, registry: &'r CodecRegistry) -> Self {
        Self {
            target: target.into(),
            content_type_hint: None,
            registry,
        }
    }

    /// Forces one codec instead of priority selection.
    pub fn with_content_type_hint(mut self, content_type: impl Into<String>) -> Self {
        self.content_type_hint = Some(content_type.into());
        self
    }

    pub fn get_ref(&self) -> &Object {
        &self.target
    }

    pub fn get_mut(&mut self) -> &mut Object {
        &mut self.target
    }

    pub fn into_inner(self) -> Object {
        self.target
    }

    /// Fresh one-entry bundle of the current target.
    pub fn bundle(&self) -> BundleResult<Bundle> {
        BundleBuilder::new(self.registry).build(&self.target, self.content_type_hint.as_deref())
    }

    /// Host renderings plus the codec entry, each admitted by `filter`.
    ///
    /// Codec errors are returned, not dropped from the display output.
    pub fn display_bundle(&self, host: &dyn DisplayHost, filter: &MimeFilter) -> BundleResult<Bundle> {
        let mut bundle = format_object(host, &self.target, filter);
        let codec_content_type = match self.content_type_hint.as_deref() {
            Some(content_type) => content_type,
            None => self.registry.resolve_for_encode(&self.target).content_type(),
        };
        if filter.allows(codec_content_type) {
            bundle.merge(self.bundle()?);
        }
        Ok(bundle)
    }
}

impl BundleProducer for ProxyObject<'_> {
    fn produce_bundle(&self) -> BundleResult<Bundle> {
        self.bundle()
    }
}

#[cfg(test)]
mod tests {
    use super::{BundleProducer, ProxyObject};
    use crate::bundle::resolver::resolve;
    use crate::codec::{ARROW_STREAM_CONTENT_TYPE, OBJECT_GRAPH_CONTENT_TYPE};
    use crate::display::{MimeFilter, SummaryHost, TEXT_HTML, TEXT_PLAIN};
    use crate::model::object::{Object, SharedObject};
    use crate::model::table::DataFrame;
    use arrow::array::{ArrayRef, Int64Array};
    use std::sync::Arc;

    fn frame_proxy() -> ProxyObject<'static> {
        ProxyObject::new(
            DataFrame::try_from_columns(vec![(
                "a",
                Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
            )])
            .expect("frame builds"),
        )
    }

    #[test]
    fn every_request_sees_current_target_state() {
        let mut proxy = ProxyObject::new(Object::List(vec![Object::Int(1)]));
        let before = resolve(&proxy.produce_bundle().expect("bundle")).expect("resolve");
        assert_eq!(before, Object::List(vec![Object::Int(1)]));

        if let Object::List(items) = proxy.get_mut() {
            items.push(Object::Int(2));
        }
        let after = resolve(&proxy.produce_bundle().expect("bundle")).expect("resolve");
        assert_eq!(after, Object::List(vec![Object::Int(1), Object::Int(2)]));
    }

    #[test]
    fn shared_target_mutation_through_another_handle_is_visible() {
        let node = SharedObject::new(Object::Int(1));
        let proxy = ProxyObject::new(node.clone());
        node.replace(Object::Int(2));

        let decoded = resolve(&proxy.bundle().expect("bundle")).expect("resolve");
        assert_eq!(decoded, Object::Shared(SharedObject::new(Object::Int(2))));
        assert!(proxy.get_ref().as_shared().expect("shared").ptr_eq(&node));
    }

    #[test]
    fn display_bundle_merges_host_and_codec_entries() {
        let bundle = frame_proxy()
            .display_bundle(&SummaryHost, &MimeFilter::all())
            .expect("display bundle");
        assert_eq!(
            bundle.content_types().collect::<Vec<_>>(),
            vec![ARROW_STREAM_CONTENT_TYPE, TEXT_HTML, TEXT_PLAIN]
        );
    }

    #[test]
    fn display_bundle_honours_filters() {
        let proxy = frame_proxy();

        let included = proxy
            .display_bundle(
                &SummaryHost,
                &MimeFilter::all().include([ARROW_STREAM_CONTENT_TYPE, TEXT_PLAIN]),
            )
            .expect("include filter");
        assert_eq!(
            included.content_types().collect::<Vec<_>>(),
            vec![ARROW_STREAM_CONTENT_TYPE, TEXT_PLAIN]
        );

        let no_host = proxy
            .display_bundle(&SummaryHost, &MimeFilter::all().exclude([TEXT_HTML, TEXT_PLAIN]))
            .expect("exclude host formats");
        assert_eq!(
            no_host.content_types().collect::<Vec<_>>(),
            vec![ARROW_STREAM_CONTENT_TYPE]
        );

        let no_codec = proxy
            .display_bundle(
                &SummaryHost,
                &MimeFilter::all().exclude([ARROW_STREAM_CONTENT_TYPE]),
            )
            .expect("exclude codec");
        assert_eq!(
            no_codec.content_types().collect::<Vec<_>>(),
            vec![TEXT_HTML, TEXT_PLAIN]
        );
    }

    #[test]
    fn hint_selects_fallback_for_tabular_target() {
        let bundle = frame_proxy()
            .with_content_type_hint(OBJECT_GRAPH_CONTENT_TYPE)
            .produce_bundle()
            .expect("hinted bundle");
        assert_eq!(
            bundle.content_types().collect::<Vec<_>>(),
            vec![OBJECT_GRAPH_CONTENT_TYPE]
        );
    }

    #[test]
    fn into_inner_returns_the_target() {
        let proxy = ProxyObject::new("value");
        assert_eq!(proxy.into_inner(), Object::from("value"));
    }
}
