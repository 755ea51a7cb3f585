//! Raw performance table storage (Arrow/Parquet)
//!
//! **Append-Only Design**:
//! - Raw advertising exports arrive as whole files or record batches
//! - Write pattern: append batches with an identical schema
//! - Repairs happen downstream in [`crate::validation`], never in place
//!
//! The table is the untyped input of a run. It is never mutated after the
//! orchestrator starts validating it.

use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use std::path::Path;

/// Raw performance records as Arrow batches.
#[derive(Debug, Clone, Default)]
pub struct PerformanceTable {
    batches: Vec<RecordBatch>,
}

impl PerformanceTable {
    /// Create a table from existing batches
    ///
    /// Useful for testing and for in-memory exports
    #[must_use]
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    /// Load table from Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::fs::File;

        let file = File::open(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to open Parquet file: {e}"))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file: {e}"))
        })?;

        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            batches.push(batch);
        }

        tracing::debug!(
            path = %path.as_ref().display(),
            batches = batches.len(),
            "loaded performance table"
        );

        Ok(Self { batches })
    }

    /// Get all record batches
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of raw rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Append a batch of raw rows.
    ///
    /// # Errors
    ///
    /// Returns error if batch schema doesn't match existing batches
    pub fn append_batch(&mut self, batch: RecordBatch) -> Result<()> {
        if let Some(first) = self.batches.first() {
            let existing_schema = first.schema();
            if batch.schema() != existing_schema {
                return Err(Error::StorageError(format!(
                    "Schema mismatch: expected {:?}, got {:?}",
                    existing_schema,
                    batch.schema()
                )));
            }
        }

        self.batches.push(batch);
        Ok(())
    }

    /// Concatenate all batches into the single batch the validator consumes.
    ///
    /// # Errors
    ///
    /// Returns error if the table holds no batches or concatenation fails
    pub fn combined(&self) -> Result<RecordBatch> {
        match self.batches.as_slice() {
            [] => Err(Error::InvalidInput(
                "Performance table has no record batches".to_string(),
            )),
            [single] => Ok(single.clone()),
            batches => arrow::compute::concat_batches(&batches[0].schema(), batches)
                .map_err(|e| Error::StorageError(format!("Failed to combine batches: {e}"))),
        }
    }
}
