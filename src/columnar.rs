use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use parquet::{
    arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder},
    basic::Compression,
    errors::ParquetError,
    file::properties::WriterProperties,
};

pub const DEFAULT_MAX_ROW_GROUP_ROWS: usize = 1024 * 1024;

pub fn writer_properties(max_row_group_rows: usize) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_max_row_group_size(max_row_group_rows.max(1))
        .set_created_by(concat!("openpayments-ingest ", env!("CARGO_PKG_VERSION")).to_string())
        .build()
}

pub fn open_writer(
    file: File,
    schema: SchemaRef,
    max_row_group_rows: usize,
) -> Result<ArrowWriter<File>, ParquetError> {
    ArrowWriter::try_new(file, schema, Some(writer_properties(max_row_group_rows)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone)]
pub struct ParquetSummary {
    pub columns: Vec<ColumnSummary>,
    pub rows: i64,
    pub row_groups: usize,
}

pub fn inspect(path: &Path) -> Result<ParquetSummary> {
    let file = File::open(path).with_context(|| format!("Opening Parquet file {path:?}"))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Reading Parquet metadata from {path:?}"))?;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|field| ColumnSummary {
            name: field.name().clone(),
            data_type: field.data_type().to_string(),
        })
        .collect();
    let metadata = builder.metadata();
    Ok(ParquetSummary {
        columns,
        rows: metadata.file_metadata().num_rows(),
        row_groups: metadata.num_row_groups(),
    })
}

pub fn read_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).with_context(|| format!("Opening Parquet file {path:?}"))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Reading Parquet metadata from {path:?}"))?
        .build()
        .context("Building Parquet batch reader")?;
    reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Decoding Parquet batches from {path:?}"))
}
