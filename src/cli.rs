use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    convert::{DEFAULT_BATCH_ROWS, DEFAULT_SAMPLE_ROWS, Strategy},
    file_type::FileType,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Ingest the CMS Open Payments dataset into typed Parquet files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert one CSV file to Parquet using a declared column schema
    Convert(ConvertArgs),
    /// Write the built-in schema of an Open Payments file type as YAML
    Schema(SchemaArgs),
    /// Print the schema and row counts of a Parquet file
    Inspect(InspectArgs),
    /// Download, convert and archive one program year
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input CSV file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output Parquet file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// YAML schema declaring column types
    #[arg(short = 's', long = "schema", conflicts_with = "file_type")]
    pub schema: Option<PathBuf>,
    /// Use the built-in schema and default strategy of an Open Payments file type
    #[arg(short = 't', long = "file-type", value_parser = parse_file_type)]
    pub file_type: Option<FileType>,
    /// Coercion strategy (defaults to the file type's, else strict)
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,
    /// Rows sampled to type undeclared columns in lenient mode (0 types them as text)
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
    pub sample_rows: usize,
    /// Rows per batch written in lenient mode
    #[arg(long, default_value_t = DEFAULT_BATCH_ROWS, value_parser = parse_positive)]
    pub batch_rows: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// File type whose schema to emit (RSRCH, OWNRSHP, GNRL)
    #[arg(short = 't', long = "file-type", value_parser = parse_file_type)]
    pub file_type: FileType,
    /// Destination YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Parquet file to describe
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Pipeline configuration YAML
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Program year to ingest (defaults to the previous calendar year)
    #[arg(short = 'y', long = "year")]
    pub year: Option<i32>,
    /// Keep the extraction directory after a successful run
    #[arg(long = "keep-extracted")]
    pub keep_extracted: bool,
}

pub fn parse_file_type(value: &str) -> Result<FileType, String> {
    value.parse().map_err(|err: anyhow::Error| err.to_string())
}

pub fn parse_positive(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("Value must be at least 1".to_string()),
        Ok(parsed) => Ok(parsed),
        Err(err) => Err(err.to_string()),
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
