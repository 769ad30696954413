use std::{
    collections::HashSet,
    fs::{self, File},
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use crate::error::{ConvertError, ConvertResult};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn ensure_input_exists(path: &Path) -> ConvertResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConvertError::MissingInput(path.to_path_buf()))
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_literal_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .quoting(false)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_input(path: &Path) -> ConvertResult<BufReader<File>> {
    ensure_input_exists(path)?;
    Ok(BufReader::new(File::open(path)?))
}

pub fn read_headers<R>(
    reader: &mut csv::Reader<R>,
    path: &Path,
    strip_quotes: bool,
) -> ConvertResult<Vec<String>>
where
    R: Read,
{
    let raw = reader.byte_headers()?.clone();
    if raw.is_empty() {
        return Err(ConvertError::MissingHeader(path.to_path_buf()));
    }
    let mut headers = Vec::with_capacity(raw.len());
    for field in raw.iter() {
        let name = std::str::from_utf8(field).map_err(|_| ConvertError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "header is not valid UTF-8".to_string(),
        })?;
        let name = if strip_quotes {
            crate::data::strip_enclosing_quotes(name)
        } else {
            name
        };
        headers.push(name.to_string());
    }
    validate_headers(&headers, path)?;
    Ok(headers)
}

pub fn validate_headers(headers: &[String], path: &Path) -> ConvertResult<()> {
    let mut seen = HashSet::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        if name.is_empty() {
            return Err(ConvertError::InvalidHeader {
                path: path.to_path_buf(),
                reason: format!("column {} has an empty name", idx + 1),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(ConvertError::InvalidHeader {
                path: path.to_path_buf(),
                reason: format!("column '{name}' appears more than once"),
            });
        }
    }
    Ok(())
}

/// An output file written under a temporary name and renamed on commit.
/// Dropping it uncommitted removes the partial file.
#[derive(Debug)]
pub struct StagedOutput {
    target: PathBuf,
    staging: PathBuf,
    committed: bool,
}

impl StagedOutput {
    pub fn new(target: &Path) -> Self {
        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let staging = target.with_file_name(format!(".{file_name}.partial"));
        Self {
            target: target.to_path_buf(),
            staging,
            committed: false,
        }
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    pub fn create(&self) -> io::Result<File> {
        File::create(&self.staging)
    }

    pub fn commit(mut self) -> io::Result<()> {
        fs::rename(&self.staging, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.staging);
        }
    }
}
