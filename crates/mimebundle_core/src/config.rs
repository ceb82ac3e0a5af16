//! Resolver configuration and trust policy.
//!
//! # Responsibility
//! - Parse resolver settings from JSON with a default for every field.
//! - Validate settings before a resolver is built from them.
//!
//! # Invariants
//! - Unknown keys are rejected, so typos never silently fall back to defaults.
//! - A validated config has a non-empty order of well-formed content types.

use crate::codec::registry::is_valid_content_type;
use crate::codec::DEFAULT_PRIORITY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Default cap on one decoded payload (256 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Whether object-graph payloads may be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicy {
    /// Bundles come from a trusted producer; every registered type decodes.
    #[default]
    TrustedProducer,
    /// Object-graph payloads are refused with `UntrustedRepresentation`.
    RejectObjectGraph,
}

/// Settings consumed by `BundleResolver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Content types tried in order; the first one present and registered wins.
    pub preferred_order: Vec<String>,
    pub trust: TrustPolicy,
    /// Largest declared `byte_length` accepted for one entry.
    pub max_payload_bytes: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            preferred_order: DEFAULT_PRIORITY.iter().map(|value| value.to_string()).collect(),
            trust: TrustPolicy::default(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl ResolverConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_preferred_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trust(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    pub fn with_max_payload_bytes(mut self, limit: u64) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preferred_order.is_empty() {
            return Err(ConfigError::EmptyPreferredOrder);
        }
        let mut seen = BTreeSet::new();
        for content_type in &self.preferred_order {
            if !is_valid_content_type(content_type) {
                return Err(ConfigError::InvalidContentType(content_type.clone()));
            }
            if !seen.insert(content_type.as_str()) {
                return Err(ConfigError::DuplicateContentType(content_type.clone()));
            }
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::ZeroPayloadLimit);
        }
        Ok(())
    }
}

/// Configuration parse/validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON for this schema: {0}")]
    Parse(String),
    #[error("preferred_order must not be empty")]
    EmptyPreferredOrder,
    #[error("preferred_order has an invalid content type: {0}")]
    InvalidContentType(String),
    #[error("preferred_order lists a content type twice: {0}")]
    DuplicateContentType(String),
    #[error("max_payload_bytes must be positive")]
    ZeroPayloadLimit,
}
