//! Parquet reader for the airdrop transfer table.
//!
//! Warehouse exports often land as Parquet rather than CSV. Column types vary
//! between exports (amount as `DOUBLE`, `DECIMAL` or text; block number as
//! `BIGINT` or `DOUBLE`), so every column of interest is cast to UTF-8 with
//! Arrow and then goes through the same cell parser as the CSV loader.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatchReader;
use eyre::{Context, ContextCompat, Result};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

use crate::loader::{parse_transfer_fields, TransferColumns};
use crate::types::{LoadReport, TransferRecord};

/// Read transfer records from a Parquet file.
///
/// Null address or amount cells count as malformed rows.
///
/// # Errors
/// Returns error if the file cannot be opened, is not valid Parquet, or its
/// schema lacks a required column.
pub fn read_transfers_parquet(path: &Path) -> Result<(Vec<TransferRecord>, LoadReport)> {
    read_with_batch_size(path, BATCH_SIZE)
}

/// Rows per decoded record batch.
const BATCH_SIZE: usize = 8192;

fn read_with_batch_size(
    path: &Path,
    batch_size: usize,
) -> Result<(Vec<TransferRecord>, LoadReport)> {
    let source = path.display().to_string();
    let file = File::open(path)
        .wrap_err_with(|| format!("failed to open parquet file: {source}"))?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .wrap_err("failed to parse parquet metadata")?
        .with_batch_size(batch_size)
        .build()
        .wrap_err("failed to build parquet record batch reader")?;

    let schema = reader.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let columns = TransferColumns::locate(&names, &source)?;

    let mut records = Vec::new();
    let mut report = LoadReport::default();

    for batch_result in reader {
        let batch = batch_result.wrap_err("failed to read record batch")?;

        let recipient = as_text(batch.column(columns.recipient))?;
        let sent_to = as_text(batch.column(columns.sent_to))?;
        let amount = as_text(batch.column(columns.amount))?;
        let block_number = columns
            .block_number
            .map(|ix| as_text(batch.column(ix)))
            .transpose()?;

        for row in 0..batch.num_rows() {
            report.rows_read += 1;
            let parsed = parse_transfer_fields(
                cell(&recipient, row),
                cell(&sent_to, row),
                cell(&amount, row),
                block_number.as_ref().and_then(|col| cell(col, row)),
            );
            match parsed {
                Some(record) => records.push(record),
                None => {
                    report.rows_skipped += 1;
                    // 1-based row number across all batches.
                    debug!(
                        file = source.as_str(),
                        row = report.rows_read,
                        "skipping malformed transfer row"
                    );
                }
            }
        }
    }

    Ok((records, report))
}

fn as_text(column: &ArrayRef) -> Result<StringArray> {
    let casted = cast(column, &DataType::Utf8)
        .wrap_err_with(|| format!("cannot read {} column as text", column.data_type()))?;
    casted
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .context("cast to Utf8 did not produce a string array")
}

fn cell(column: &StringArray, row: usize) -> Option<&str> {
    (!column.is_null(row)).then(|| column.value(row))
}
