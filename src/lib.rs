pub mod archive;
pub mod cli;
pub mod columnar;
pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod fetch;
pub mod file_type;
pub mod io_utils;
pub mod lenient;
pub mod pipeline;
pub mod schema;
pub mod strict;
pub mod table;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    archive::LocalObjectStore,
    cli::{Cli, Commands},
    config::IngestConfig,
    convert::{ConvertOptions, Strategy},
    io_utils::resolve_input_delimiter,
    schema::ColumnSchema,
};

pub use crate::convert::convert;
pub use crate::error::ConvertError;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("openpayments_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => handle_convert(&args),
        Commands::Schema(args) => handle_schema(&args),
        Commands::Inspect(args) => handle_inspect(&args),
        Commands::Ingest(args) => handle_ingest(&args),
    }
}

fn handle_convert(args: &cli::ConvertArgs) -> Result<()> {
    let schema = match (&args.schema, args.file_type) {
        (Some(path), _) => ColumnSchema::load(path)
            .with_context(|| format!("Loading schema from {path:?}"))?,
        (None, Some(file_type)) => file_type.builtin_schema()?,
        (None, None) => ColumnSchema::empty(),
    };
    let strategy = args
        .strategy
        .or_else(|| args.file_type.map(|ty| ty.default_strategy()))
        .unwrap_or(Strategy::Strict);
    let options = ConvertOptions {
        sample_rows: args.sample_rows,
        batch_rows: args.batch_rows,
        delimiter: resolve_input_delimiter(&args.input, args.delimiter),
    };
    let report = convert::convert(&args.input, &args.output, &schema, strategy, &options)
        .with_context(|| format!("Converting {:?}", args.input))?;
    println!(
        "rows_read={} rows_written={} rows_dropped={}",
        report.rows_read,
        report.rows_written,
        report.rows_dropped()
    );
    Ok(())
}

fn handle_schema(args: &cli::SchemaArgs) -> Result<()> {
    let schema = args.file_type.builtin_schema()?;
    match &args.output {
        Some(path) => {
            schema
                .save(path)
                .with_context(|| format!("Writing schema to {path:?}"))?;
            info!(
                "{} schema with {} column(s) written to {:?}",
                args.file_type,
                schema.len(),
                path
            );
        }
        None => {
            let yaml = schema.to_yaml_string()?;
            std::io::stdout()
                .write_all(yaml.as_bytes())
                .context("Writing schema to stdout")?;
        }
    }
    Ok(())
}

fn handle_inspect(args: &cli::InspectArgs) -> Result<()> {
    let summary = columnar::inspect(&args.input)?;
    let mut out = std::io::stdout().lock();
    for column in &summary.columns {
        writeln!(out, "{}\t{}", column.name, column.data_type)?;
    }
    writeln!(out, "rows={} row_groups={}", summary.rows, summary.row_groups)?;
    Ok(())
}

fn handle_ingest(args: &cli::IngestArgs) -> Result<()> {
    let mut config = IngestConfig::resolve(&args.config)?;
    if args.keep_extracted {
        config.keep_extracted = true;
    }
    let year = args.year.unwrap_or_else(|| Local::now().year() - 1);
    let store = LocalObjectStore::new(&config.archive.root, &config.archive.bucket);
    let report = pipeline::ingest(&config, year, &store)
        .with_context(|| format!("Ingesting program year {year}"))?;
    for (conversion, location) in report.conversions.iter().zip(&report.uploads) {
        println!(
            "{location} rows_written={} rows_dropped={}",
            conversion.rows_written,
            conversion.rows_dropped()
        );
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
