//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `mimebundle_core` linkage with one encode/decode round trip.
//! - Keep output deterministic for quick local sanity checks.

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::error::ArrowError;
use mimebundle_core::{build_bundle, resolve, Bundle, BundleError, DataFrame, Object};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("sample frame: {0}")]
    SampleFrame(#[from] ArrowError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::SampleFrame(_) => "sample_frame",
            Self::Bundle(err) => err.code(),
        }
    }
}

fn main() -> ExitCode {
    println!("mimebundle_core ping={}", mimebundle_core::ping());
    println!("mimebundle_core version={}", mimebundle_core::core_version());
    match round_trip() {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("round_trip status=error code={} message={err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn round_trip() -> Result<String, CliError> {
    let frame = DataFrame::try_from_columns(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
        ("label", Arc::new(StringArray::from(vec!["a", "b", "c"])) as ArrayRef),
    ])?;
    let object = Object::Frame(frame);

    let wire = build_bundle(&object, None)?.to_json_string()?;
    let decoded = resolve(&Bundle::from_json_str(&wire)?)?;
    let shape = decoded.as_frame().map(DataFrame::shape).unwrap_or_default();

    Ok(format!(
        "round_trip status={} wire_bytes={} rows={} columns={}",
        if decoded == object { "ok" } else { "mismatch" },
        wire.len(),
        shape.0,
        shape.1
    ))
}
