//! Host display collaborator.
//!
//! # Responsibility
//! - Describe the host's native formatters (`text/plain`, `text/html`, ...).
//! - Filter representations by include/exclude sets.
//!
//! # Invariants
//! - Host renderings are literal UTF-8 entries, never decoded by codecs.
//! - The core only calls a host when asked to; it never pushes output.

use crate::bundle::sidecar::{PayloadEncoding, Sidecar};
use crate::bundle::{Bundle, Payload};
use crate::model::object::Object;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::Write as _;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

/// One host-rendered representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rendered {
    pub text: String,
    pub metadata: Map<String, Value>,
}

impl Rendered {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
        }
    }
}

/// Host display system: native formatters keyed by format type.
pub trait DisplayHost: Send + Sync {
    /// Format types this host can render, in host order.
    fn format_types(&self) -> Vec<String>;

    /// Renders `object` for one format type; `None` when not applicable.
    fn format(&self, format_type: &str, object: &Object) -> Option<Rendered>;
}

/// Include/exclude selection over content types.
///
/// An empty include set admits everything not excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeFilter {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl MimeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(content_types.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(content_types.into_iter().map(Into::into));
        self
    }

    pub fn allows(&self, content_type: &str) -> bool {
        (self.include.is_empty() || self.include.contains(content_type))
            && !self.exclude.contains(content_type)
    }
}

/// Runs every admitted host formatter over `object`.
pub fn format_object(host: &dyn DisplayHost, object: &Object, filter: &MimeFilter) -> Bundle {
    let mut bundle = Bundle::new();
    for format_type in host.format_types() {
        if !filter.allows(&format_type) {
            continue;
        }
        let Some(rendered) = host.format(&format_type, object) else {
            continue;
        };
        let sidecar = Sidecar::new(object.type_name(), rendered.text.len() as u64)
            .with_encoding(PayloadEncoding::Utf8)
            .with_hints(rendered.metadata);
        bundle.insert(format_type, Payload::Text(rendered.text), sidecar);
    }
    bundle
}

/// Built-in host rendering short `text/plain` and `text/html` summaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryHost;

impl DisplayHost for SummaryHost {
    fn format_types(&self) -> Vec<String> {
        vec![TEXT_PLAIN.to_string(), TEXT_HTML.to_string()]
    }

    fn format(&self, format_type: &str, object: &Object) -> Option<Rendered> {
        match format_type {
            TEXT_PLAIN => Some(Rendered::new(summarize(object))),
            TEXT_HTML => Some(Rendered::new(html_summary(object))),
            _ => None,
        }
    }
}

fn summarize(object: &Object) -> String {
    match object {
        Object::None => "None".to_string(),
        Object::Bool(value) => value.to_string(),
        Object::Int(value) => value.to_string(),
        Object::Float(value) => value.to_string(),
        Object::Str(value) => format!("{value:?}"),
        Object::Bytes(value) => format!("<{} bytes>", value.len()),
        Object::List(items) => format!("<list of {}>", items.len()),
        Object::Tuple(items) => format!("<tuple of {}>", items.len()),
        Object::Dict(entries) => format!("<dict with {} keys>", entries.len()),
        // Contents are not walked: the node may be part of a cycle.
        Object::Shared(_) => format!("<shared {}>", object.type_name()),
        Object::Frame(frame) => {
            let (rows, columns) = frame.shape();
            format!("<DataFrame {rows}x{columns}: {}>", frame.column_names().join(", "))
        }
        Object::Series(series) => format!("<Series {:?} len={}>", series.name(), series.len()),
        Object::Handle(handle) => format!("<LiveHandle {}>", handle.label()),
    }
}

fn html_summary(object: &Object) -> String {
    let Object::Frame(frame) = object else {
        return format!("<pre>{}</pre>", escape_html(&summarize(object)));
    };
    let mut html = String::from("<table><thead><tr>");
    for name in frame.column_names() {
        let _ = write!(html, "<th>{}</th>", escape_html(&name));
    }
    let _ = write!(
        html,
        "</tr></thead></table><p>{} rows</p>",
        frame.num_rows()
    );
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{format_object, MimeFilter, SummaryHost, TEXT_HTML, TEXT_PLAIN};
    use crate::bundle::sidecar::PayloadEncoding;
    use crate::bundle::Payload;
    use crate::model::object::Object;

    #[test]
    fn filter_include_and_exclude() {
        let all = MimeFilter::all();
        assert!(all.allows(TEXT_PLAIN));

        let only_plain = MimeFilter::all().include([TEXT_PLAIN]);
        assert!(only_plain.allows(TEXT_PLAIN));
        assert!(!only_plain.allows(TEXT_HTML));

        let no_html = MimeFilter::all().exclude([TEXT_HTML]);
        assert!(no_html.allows(TEXT_PLAIN));
        assert!(!no_html.allows(TEXT_HTML));
    }

    #[test]
    fn host_entries_are_utf8_text() {
        let bundle = format_object(&SummaryHost, &Object::Int(42), &MimeFilter::all());
        let (payload, sidecar) = bundle.get(TEXT_PLAIN).expect("plain entry");
        assert_eq!(payload, &Payload::Text("42".to_string()));
        assert_eq!(sidecar.encoding, PayloadEncoding::Utf8);
        assert_eq!(sidecar.byte_length, Some(2));
        assert!(bundle.contains(TEXT_HTML));
    }

    #[test]
    fn html_is_escaped() {
        let bundle = format_object(
            &SummaryHost,
            &Object::from("<b>"),
            &MimeFilter::all().include([TEXT_HTML]),
        );
        let (payload, _) = bundle.get(TEXT_HTML).expect("html entry");
        assert_eq!(
            payload,
            &Payload::Text("<pre>&quot;&lt;b&gt;&quot;</pre>".to_string())
        );
        assert!(!bundle.contains(TEXT_PLAIN));
    }
}
