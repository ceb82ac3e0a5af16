//! Tabular containers backed by Arrow arrays.
//!
//! # Responsibility
//! - Provide the two tabular shapes the columnar codec understands.
//! - Keep schema (names, order, declared types) together with the data.
//!
//! # Invariants
//! - `DataFrame` column order is the schema order and never re-sorted.
//! - `Series` always projects to exactly one named column.

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::sync::Arc;

/// Two-dimensional table with named, ordered, typed columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    batch: RecordBatch,
}

impl DataFrame {
    /// Wraps an existing record batch.
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Builds a frame from `(column name, array)` pairs in the given order.
    ///
    /// Nullability of each column follows its data: a column holding nulls is
    /// declared nullable.
    pub fn try_from_columns<I, S>(columns: I) -> Result<Self, ArrowError>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: AsRef<str>,
    {
        let batch = RecordBatch::try_from_iter(columns)?;
        Ok(Self { batch })
    }

    /// Frame with no columns and `row_count` rows.
    pub fn empty(row_count: usize) -> Self {
        let options = RecordBatchOptions::new().with_row_count(Some(row_count));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::empty()), vec![], &options)
            .unwrap_or_else(|_| RecordBatch::new_empty(Arc::new(Schema::empty())));
        Self { batch }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Returns `(row_count, column_count)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }

    /// Returns one column by name.
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }
}

/// Named one-dimensional column.
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    values: ArrayRef,
}

impl Series {
    pub fn new(name: impl Into<String>, values: ArrayRef) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Projects the series to a one-column record batch.
    pub fn to_batch(&self) -> Result<RecordBatch, ArrowError> {
        let field = Field::new(
            self.name.as_str(),
            self.values.data_type().clone(),
            self.values.null_count() > 0,
        );
        RecordBatch::try_new(Arc::new(Schema::new(vec![field])), vec![self.values.clone()])
    }

    /// Rebuilds a series from a one-column record batch.
    pub fn from_batch(batch: &RecordBatch) -> Result<Self, ArrowError> {
        if batch.num_columns() != 1 {
            return Err(ArrowError::SchemaError(format!(
                "series requires exactly one column, got {}",
                batch.num_columns()
            )));
        }
        let schema = batch.schema();
        Ok(Self {
            name: schema.field(0).name().clone(),
            values: batch.column(0).clone(),
        })
    }
}

impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.values.to_data() == other.values.to_data()
    }
}
