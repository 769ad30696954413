//! One program year, from the published archive to the object store.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    archive::ObjectStore,
    config::IngestConfig,
    convert::{self, ConversionReport},
    fetch,
    file_type::FileType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFile {
    pub file_type: FileType,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub year: i32,
    pub conversions: Vec<ConversionReport>,
    /// Stored locations, in the same order as `conversions`.
    pub uploads: Vec<String>,
}

pub fn ingest(config: &IngestConfig, year: i32, store: &dyn ObjectStore) -> Result<IngestReport> {
    info!("Ingesting Open Payments program year {year}");
    let work_dir = year_dir(&config.extract_dir, year);
    let extract_dir = work_dir.as_path();
    if extract_dir.exists() {
        info!("Clearing leftovers of an earlier run in {}", extract_dir.display());
        fs::remove_dir_all(extract_dir)
            .with_context(|| format!("Clearing extraction directory {extract_dir:?}"))?;
    }
    let source = fetch::source_location(&config.source, year);
    let zip_path = fetch::stage_archive(&source, extract_dir)?;
    fetch::extract_archive(&zip_path, extract_dir)?;

    let names = fetch::list_csv_files(extract_dir)?;
    let tagged = tag_files(extract_dir, &names, &config.file_types)?;

    let options = config.convert_options();
    let mut conversions = Vec::with_capacity(tagged.len());
    for file in &tagged {
        let schema = file.file_type.builtin_schema()?;
        let output = extract_dir.join(file.file_type.output_file_name(year));
        let report = convert::convert(
            &file.path,
            &output,
            &schema,
            file.file_type.default_strategy(),
            &options,
        )
        .with_context(|| format!("Converting {} file {:?}", file.file_type, file.path))?;
        conversions.push(report);
    }

    let mut uploads = Vec::with_capacity(conversions.len());
    for (file, report) in tagged.iter().zip(&conversions) {
        let key = object_key(&config.archive.prefix, &file.file_type.output_file_name(year));
        let location = store
            .upload(&report.output, &key)
            .with_context(|| format!("Archiving {} output", file.file_type))?;
        uploads.push(location);
    }

    if config.keep_extracted {
        info!("Keeping extracted files in {}", extract_dir.display());
    } else {
        fs::remove_dir_all(extract_dir)
            .with_context(|| format!("Removing extraction directory {extract_dir:?}"))?;
        info!("Removed {}", extract_dir.display());
    }

    Ok(IngestReport {
        year,
        conversions,
        uploads,
    })
}

/// Each program year is staged in its own subdirectory of `extract_dir`.
pub fn year_dir(extract_dir: &Path, year: i32) -> PathBuf {
    extract_dir.join(year.to_string())
}

pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}

/// Tags each CSV once and returns the wanted ones in `wanted` order.
pub fn tag_files(dir: &Path, names: &[String], wanted: &[FileType]) -> Result<Vec<TaggedFile>> {
    let mut found: BTreeMap<FileType, &str> = BTreeMap::new();
    for name in names {
        let Some(file_type) = FileType::detect(name) else {
            info!("Skipping {name}: not an Open Payments detail file");
            continue;
        };
        if let Some(previous) = found.insert(file_type, name) {
            bail!("Both {previous} and {name} look like {file_type} files");
        }
    }

    let mut tagged = Vec::with_capacity(wanted.len());
    for file_type in wanted {
        let Some(name) = found.get(file_type) else {
            bail!("No {file_type} file found in {}", dir.display());
        };
        info!("Tagged {name} as {file_type}");
        tagged.push(TaggedFile {
            file_type: *file_type,
            path: dir.join(name),
        });
    }
    Ok(tagged)
}
