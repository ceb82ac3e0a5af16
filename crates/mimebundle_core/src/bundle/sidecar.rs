//! Per-representation metadata carried next to each payload.
//!
//! # Invariants
//! - `byte_length` is the length of the raw bytes, never of the base64 text.
//! - `sha256`, when present, is the lowercase hex digest of the raw bytes.
//! - Backend hints are flattened into the same JSON object as the fixed keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// How the payload of one entry is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// Standard base64 text, no line wrapping.
    #[default]
    Base64,
    /// Raw bytes, in-process only.
    Raw,
    /// Literal UTF-8 text produced by a display host (`text/plain`, ...).
    Utf8,
}

impl PayloadEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Raw => "raw",
            Self::Utf8 => "utf8",
        }
    }
}

/// Provenance and validation data for one bundle entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sidecar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub encoding: PayloadEncoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Backend-specific hints (`rows`, `columns`, ...).
    #[serde(flatten)]
    pub hints: Map<String, Value>,
}

impl Sidecar {
    pub fn new(type_name: impl Into<String>, byte_length: u64) -> Self {
        Self {
            byte_length: Some(byte_length),
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    pub fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Records the digest of `bytes`.
    pub fn with_digest_of(mut self, bytes: &[u8]) -> Self {
        self.sha256 = Some(sha256_hex(bytes));
        self
    }

    pub fn with_hints(mut self, hints: Map<String, Value>) -> Self {
        self.hints.extend(hints);
        self
    }

    pub fn hint(&self, key: &str) -> Option<&Value> {
        self.hints.get(key)
    }

    pub fn hint_u64(&self, key: &str) -> Option<u64> {
        self.hints.get(key).and_then(Value::as_u64)
    }
}

/// Lowercase hex sha256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
