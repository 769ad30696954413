//! Pipeline configuration.
//!
//! ```yaml
//! source: https://download.cms.gov/openpayments/PGYR{year}_P01302025_01212025.zip
//! extract_dir: /opt/ingest/downloaded_files
//! archive:
//!   root: /srv/object-store
//!   bucket: cms_bucket
//!   prefix: raw
//! file_types: [RSRCH, OWNRSHP, GNRL]
//! ```

use std::{
    collections::HashSet,
    env,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    convert::{ConvertOptions, DEFAULT_BATCH_ROWS, DEFAULT_SAMPLE_ROWS},
    file_type::FileType,
};

pub const ENV_SOURCE: &str = "OPENPAYMENTS_SOURCE";
pub const ENV_EXTRACT_DIR: &str = "OPENPAYMENTS_EXTRACT_DIR";
pub const ENV_ARCHIVE_ROOT: &str = "OPENPAYMENTS_ARCHIVE_ROOT";
pub const ENV_BUCKET: &str = "OPENPAYMENTS_BUCKET";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    pub root: PathBuf,
    pub bucket: String,
    #[serde(default = "ArchiveConfig::default_prefix")]
    pub prefix: String,
}

impl ArchiveConfig {
    fn default_prefix() -> String {
        "raw".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Archive URL or local path; `{year}` is replaced by the program year.
    pub source: String,
    #[serde(default = "IngestConfig::default_extract_dir")]
    pub extract_dir: PathBuf,
    pub archive: ArchiveConfig,
    #[serde(default = "IngestConfig::default_file_types")]
    pub file_types: Vec<FileType>,
    #[serde(default = "IngestConfig::default_sample_rows")]
    pub sample_rows: usize,
    #[serde(default = "IngestConfig::default_batch_rows")]
    pub batch_rows: usize,
    #[serde(default)]
    pub keep_extracted: bool,
}

impl IngestConfig {
    fn default_extract_dir() -> PathBuf {
        PathBuf::from("downloaded_files")
    }

    fn default_file_types() -> Vec<FileType> {
        FileType::ALL.to_vec()
    }

    const fn default_sample_rows() -> usize {
        DEFAULT_SAMPLE_ROWS
    }

    const fn default_batch_rows() -> usize {
        DEFAULT_BATCH_ROWS
    }

    /// Loads `path`, applies environment overrides and validates the result.
    pub fn resolve(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_overrides(env::vars());
        config
            .validate()
            .with_context(|| format!("Validating configuration {path:?}"))?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Parsing config YAML")
    }

    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_str() {
                ENV_SOURCE => self.source = value,
                ENV_EXTRACT_DIR => self.extract_dir = PathBuf::from(value),
                ENV_ARCHIVE_ROOT => self.archive.root = PathBuf::from(value),
                ENV_BUCKET => self.archive.bucket = value,
                _ => continue,
            }
            debug!("Configuration override from {key}");
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.source.trim().is_empty(), "source must not be empty");
        ensure!(
            !self.archive.bucket.trim().is_empty(),
            "archive.bucket must not be empty"
        );
        ensure!(!self.file_types.is_empty(), "file_types must not be empty");
        let mut seen = HashSet::new();
        for ty in &self.file_types {
            ensure!(seen.insert(ty), "file type {ty} is listed more than once");
        }
        ensure!(self.batch_rows > 0, "batch_rows must be positive");
        Ok(())
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            sample_rows: self.sample_rows,
            batch_rows: self.batch_rows,
            ..ConvertOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "source: https://example.test/PGYR{year}.zip\narchive:\n  root: /tmp/store\n  bucket: cms\n";

    #[test]
    fn minimal_config_fills_defaults() {
        let config = IngestConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.extract_dir, PathBuf::from("downloaded_files"));
        assert_eq!(config.archive.prefix, "raw");
        assert_eq!(
            config.file_types,
            vec![FileType::Research, FileType::Ownership, FileType::General]
        );
        assert_eq!(config.sample_rows, DEFAULT_SAMPLE_ROWS);
        assert!(!config.keep_extracted);
        config.validate().unwrap();
    }

    #[test]
    fn environment_overrides_replace_deployment_settings() {
        let mut config = IngestConfig::from_yaml_str(MINIMAL).unwrap();
        config.apply_overrides([
            (ENV_BUCKET.to_string(), "other".to_string()),
            (ENV_EXTRACT_DIR.to_string(), "/data/x".to_string()),
            (ENV_SOURCE.to_string(), "   ".to_string()),
            ("UNRELATED".to_string(), "1".to_string()),
        ]);
        assert_eq!(config.archive.bucket, "other");
        assert_eq!(config.extract_dir, PathBuf::from("/data/x"));
        assert!(config.source.contains("{year}"));
    }

    #[test]
    fn duplicate_file_types_fail_validation() {
        let yaml = format!("{MINIMAL}file_types: [GNRL, gnrl]\n");
        let config = IngestConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = format!("{MINIMAL}bukket: typo\n");
        assert!(IngestConfig::from_yaml_str(&yaml).is_err());
    }
}
