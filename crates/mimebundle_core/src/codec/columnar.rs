//! Arrow IPC stream codec for tabular objects.
//!
//! # Responsibility
//! - Encode `DataFrame`/`Series` as one self-describing Arrow stream.
//! - Rebuild the same container kind with schema preserved.
//!
//! # Invariants
//! - Column names, order and declared types survive the round trip.
//! - Decoded shape must equal the `rows`/`columns` hints, otherwise the
//!   decode fails with an integrity error instead of being corrected.

use crate::bundle::sidecar::Sidecar;
use crate::codec::{Codec, EncodedPayload, ARROW_STREAM_CONTENT_TYPE};
use crate::error::{BundleError, BundleResult};
use crate::model::object::{Object, TYPE_SERIES};
use crate::model::table::{DataFrame, Series};
use arrow::compute::concat_batches;
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::io::Cursor;

/// Sidecar hint: number of rows at encode time.
pub const HINT_ROWS: &str = "rows";
/// Sidecar hint: number of columns at encode time.
pub const HINT_COLUMNS: &str = "columns";
/// Sidecar hint: column names in schema order.
pub const HINT_COLUMN_NAMES: &str = "column_names";

/// Codec for `Object::Frame` and `Object::Series`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowStreamCodec;

impl Codec for ArrowStreamCodec {
    fn content_type(&self) -> &str {
        ARROW_STREAM_CONTENT_TYPE
    }

    fn matches(&self, object: &Object) -> bool {
        object.is_tabular()
    }

    fn encode(&self, object: &Object) -> BundleResult<EncodedPayload> {
        let batch = match object {
            Object::Frame(frame) => frame.batch().clone(),
            Object::Series(series) => series.to_batch().map_err(encode_error)?,
            other => {
                return Err(BundleError::CodecMismatch {
                    content_type: ARROW_STREAM_CONTENT_TYPE.to_string(),
                    type_name: other.type_name(),
                })
            }
        };

        let bytes = write_stream(&batch).map_err(encode_error)?;
        let column_names: Vec<Value> = batch
            .schema()
            .fields()
            .iter()
            .map(|field| Value::from(field.name().as_str()))
            .collect();
        Ok(EncodedPayload::new(bytes)
            .with_hint(HINT_ROWS, batch.num_rows())
            .with_hint(HINT_COLUMNS, batch.num_columns())
            .with_hint(HINT_COLUMN_NAMES, column_names))
    }

    fn decode(&self, bytes: &[u8], sidecar: &Sidecar) -> BundleResult<Object> {
        let batch = read_stream(bytes).map_err(decode_error)?;
        verify_shape(&batch, sidecar)?;

        if sidecar.type_name.as_deref() == Some(TYPE_SERIES) {
            let series = Series::from_batch(&batch).map_err(|err| {
                BundleError::integrity(ARROW_STREAM_CONTENT_TYPE, err.to_string())
            })?;
            return Ok(Object::Series(series));
        }
        Ok(Object::Frame(DataFrame::new(batch)))
    }
}

/// Serializes one batch (schema + data) into an Arrow IPC stream.
pub fn write_stream(batch: &RecordBatch) -> Result<Vec<u8>, ArrowError> {
    let mut buffer = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buffer, batch.schema().as_ref())?;
        writer.write(batch)?;
        writer.finish()?;
    }
    Ok(buffer)
}

/// Reads an Arrow IPC stream back into a single batch.
///
/// Streams carrying several batches are concatenated in order.
pub fn read_stream(bytes: &[u8]) -> Result<RecordBatch, ArrowError> {
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    let schema = reader.schema();
    let mut batches = reader.collect::<Result<Vec<_>, _>>()?;
    if batches.len() == 1 {
        if let Some(batch) = batches.pop() {
            return Ok(batch);
        }
    }
    concat_batches(&schema, &batches)
}

fn verify_shape(batch: &RecordBatch, sidecar: &Sidecar) -> BundleResult<()> {
    let expected_rows = sidecar.hint_u64(HINT_ROWS);
    let expected_columns = sidecar.hint_u64(HINT_COLUMNS);
    let (Some(rows), Some(columns)) = (expected_rows, expected_columns) else {
        return Err(BundleError::integrity(
            ARROW_STREAM_CONTENT_TYPE,
            "sidecar is missing `rows`/`columns` shape hints",
        ));
    };

    let actual = (batch.num_rows() as u64, batch.num_columns() as u64);
    if actual != (rows, columns) {
        return Err(BundleError::integrity(
            ARROW_STREAM_CONTENT_TYPE,
            format!(
                "decoded shape ({}, {}) does not match declared shape ({rows}, {columns})",
                actual.0, actual.1
            ),
        ));
    }
    Ok(())
}

fn encode_error(err: ArrowError) -> BundleError {
    BundleError::encode(ARROW_STREAM_CONTENT_TYPE, err)
}

fn decode_error(err: ArrowError) -> BundleError {
    BundleError::decode(ARROW_STREAM_CONTENT_TYPE, err)
}
