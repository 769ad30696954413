use std::path::PathBuf;

use thiserror::Error;

use crate::schema::SemanticType;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Input file {0:?} does not exist")]
    MissingInput(PathBuf),

    #[error("Input file {0:?} has no header row")]
    MissingHeader(PathBuf),

    #[error("Invalid header in {path:?}: {reason}")]
    InvalidHeader { path: PathBuf, reason: String },

    #[error("Line {line} column '{column}': cannot coerce '{value}' to {expected}")]
    Coercion {
        line: u64,
        column: String,
        value: String,
        expected: SemanticType,
    },

    #[error("Line {line}: expected {expected} field(s) but found {found}")]
    MalformedRecord {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Reading CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Building Arrow batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Writing Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl ConvertError {
    /// True for failures caused by the data itself rather than the environment.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ConvertError::Coercion { .. }
                | ConvertError::MalformedRecord { .. }
                | ConvertError::MissingHeader(_)
                | ConvertError::InvalidHeader { .. }
        )
    }
}

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
