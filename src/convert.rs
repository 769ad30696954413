use std::{
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};

use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::ConvertResult,
    io_utils::{self, DEFAULT_CSV_DELIMITER},
    lenient, printable_delimiter,
    schema::ColumnSchema,
    strict,
};

pub const DEFAULT_SAMPLE_ROWS: usize = 10_000;
pub const DEFAULT_BATCH_ROWS: usize = 8_192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Load the whole file; any coercion failure aborts the conversion
    Strict,
    /// Stream in batches; malformed rows are dropped
    Lenient,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Strict => f.write_str("strict"),
            Strategy::Lenient => f.write_str("lenient"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Leading rows the lenient strategy samples to infer undeclared columns.
    pub sample_rows: usize,
    /// Rows per record batch handed to the Parquet writer.
    pub batch_rows: usize,
    pub delimiter: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
            batch_rows: DEFAULT_BATCH_ROWS,
            delimiter: DEFAULT_CSV_DELIMITER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub strategy: Strategy,
    pub rows_read: u64,
    pub rows_written: u64,
    pub columns: usize,
}

impl ConversionReport {
    pub fn rows_dropped(&self) -> u64 {
        self.rows_read - self.rows_written
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub rows_read: u64,
    pub rows_written: u64,
    pub columns: usize,
}

pub fn convert(
    input: &Path,
    output: &Path,
    schema: &ColumnSchema,
    strategy: Strategy,
    options: &ConvertOptions,
) -> ConvertResult<ConversionReport> {
    io_utils::ensure_input_exists(input)?;
    info!(
        "Converting '{}' -> '{}' ({strategy}, delimiter '{}')",
        input.display(),
        output.display(),
        printable_delimiter(options.delimiter)
    );
    let started = Instant::now();
    let outcome = match strategy {
        Strategy::Strict => strict::convert(input, output, schema, options)?,
        Strategy::Lenient => lenient::convert(input, output, schema, options)?,
    };
    let report = ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        strategy,
        rows_read: outcome.rows_read,
        rows_written: outcome.rows_written,
        columns: outcome.columns,
    };
    if report.rows_dropped() > 0 {
        warn!(
            "Dropped {} of {} row(s) from '{}' as malformed",
            report.rows_dropped(),
            report.rows_read,
            input.display()
        );
    }
    info!(
        "Converted '{}' -> '{}': {} row(s) x {} column(s) in {:.2?}",
        input.display(),
        output.display(),
        report.rows_written,
        report.columns,
        started.elapsed()
    );
    Ok(report)
}
