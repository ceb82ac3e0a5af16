//! Object model shared by codecs, builder and resolver.
//!
//! # Responsibility
//! - Define the values a host namespace can hold.
//! - Define the tabular containers handled by the columnar codec.
//!
//! # Invariants
//! - Every value is `Send + Sync` so bundles can be built from any thread.

pub mod object;
pub mod table;
