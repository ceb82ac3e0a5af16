//! Error taxonomy for bundle encode/decode.
//!
//! # Responsibility
//! - Define one error type shared by registry, codecs, builder and resolver.
//! - Keep variants stable so hosts can branch on failure kind.
//!
//! # Invariants
//! - Errors are local to one encode/decode call; nothing here is retried.
//! - No variant carries payload bytes, only sizes, type names and paths.

use thiserror::Error;

/// Result type for bundle APIs.
pub type BundleResult<T> = Result<T, BundleError>;

/// Failure of one registry, encode or decode call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    /// Decode (or an explicit hint) named a content type nobody registered.
    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    /// Explicit content-type hint cannot encode the given object.
    #[error("codec `{content_type}` cannot encode object of type `{type_name}`")]
    CodecMismatch {
        content_type: String,
        type_name: String,
    },

    /// Object graph holds a node that has no serialized form.
    #[error("object of type `{type_name}` at `{path}` is not serializable")]
    UnserializableObject { type_name: String, path: String },

    /// Payload bytes or shape disagree with the declared metadata.
    #[error("integrity check failed for `{content_type}`: {message}")]
    Integrity {
        content_type: String,
        message: String,
    },

    /// Bundle carries no content type the resolver can decode.
    #[error("no usable representation in bundle (available: {})", .available.join(", "))]
    NoUsableRepresentation { available: Vec<String> },

    /// Content type does not follow the `type/subtype` grammar.
    #[error("content type is invalid: {0}")]
    InvalidContentType(String),

    /// Content type was registered twice.
    #[error("content type already registered: {0}")]
    DuplicateContentType(String),

    /// Backend failed while producing bytes.
    #[error("encode failed for `{content_type}`: {message}")]
    Encode {
        content_type: String,
        message: String,
    },

    /// Backend rejected the payload bytes.
    #[error("decode failed for `{content_type}`: {message}")]
    Decode {
        content_type: String,
        message: String,
    },

    /// Declared payload size exceeds the configured limit.
    #[error("payload for `{content_type}` is {byte_length} bytes, limit is {limit}")]
    PayloadTooLarge {
        content_type: String,
        byte_length: u64,
        limit: u64,
    },

    /// Trust policy refuses to decode this representation.
    #[error("representation `{0}` is refused by the trust policy")]
    UntrustedRepresentation(String),

    /// Namespace has no binding for the requested name.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// Bundle shape is broken (data/metadata keys disagree, bad JSON).
    #[error("malformed bundle: {0}")]
    MalformedBundle(String),
}

impl BundleError {
    pub(crate) fn integrity(content_type: &str, message: impl Into<String>) -> Self {
        Self::Integrity {
            content_type: content_type.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn encode(content_type: &str, message: impl ToString) -> Self {
        Self::Encode {
            content_type: content_type.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn decode(content_type: &str, message: impl ToString) -> Self {
        Self::Decode {
            content_type: content_type.to_string(),
            message: message.to_string(),
        }
    }

    /// Stable short code, used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownContentType(_) => "unknown_content_type",
            Self::CodecMismatch { .. } => "codec_mismatch",
            Self::UnserializableObject { .. } => "unserializable_object",
            Self::Integrity { .. } => "integrity",
            Self::NoUsableRepresentation { .. } => "no_usable_representation",
            Self::InvalidContentType(_) => "invalid_content_type",
            Self::DuplicateContentType(_) => "duplicate_content_type",
            Self::Encode { .. } => "encode",
            Self::Decode { .. } => "decode",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::UntrustedRepresentation(_) => "untrusted_representation",
            Self::VariableNotFound(_) => "variable_not_found",
            Self::MalformedBundle(_) => "malformed_bundle",
        }
    }
}
