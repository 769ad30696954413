use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use itertools::Itertools;
use log::info;

const ARCHIVE_FILE_NAME: &str = "downloaded_file.zip";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Renders the configured source for one program year.
pub fn source_location(template: &str, year: i32) -> String {
    template.replace("{year}", &year.to_string())
}

fn is_remote(source: &str) -> bool {
    let lowered = source.to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Downloads (HTTP) or copies (local path) the archive into `dest_dir`.
pub fn stage_archive(source: &str, dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Creating extraction directory {dest_dir:?}"))?;
    let zip_path = dest_dir.join(ARCHIVE_FILE_NAME);
    if is_remote(source) {
        download(source, &zip_path)?;
    } else {
        info!("Copying archive from {source}...");
        fs::copy(source, &zip_path)
            .with_context(|| format!("Copying archive {source} to {zip_path:?}"))?;
    }
    Ok(zip_path)
}

fn download(url: &str, dest: &Path) -> Result<()> {
    info!("Downloading file from {url}...");
    let agent = ureq::AgentBuilder::new().timeout(DOWNLOAD_TIMEOUT).build();
    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            bail!("Failed to download file from {url}: HTTP status {code}")
        }
        Err(ureq::Error::Transport(err)) => {
            bail!("Failed to download file from {url}: {err}")
        }
    };
    let mut body = response.into_reader();
    let mut file = BufWriter::new(
        File::create(dest).with_context(|| format!("Creating download target {dest:?}"))?,
    );
    let bytes = io::copy(&mut body, &mut file)
        .with_context(|| format!("Writing download from {url} to {dest:?}"))?;
    info!("Downloaded {bytes} byte(s) to {dest:?}");
    Ok(())
}

/// Extracts every entry of `zip_path` into `dest_dir`, then removes the zip.
pub fn extract_archive(zip_path: &Path, dest_dir: &Path) -> Result<()> {
    info!("Extracting files...");
    let file = File::open(zip_path).with_context(|| format!("Opening archive {zip_path:?}"))?;
    let mut archive =
        zip::ZipArchive::new(file).with_context(|| format!("Reading archive {zip_path:?}"))?;
    archive
        .extract(dest_dir)
        .with_context(|| format!("Extracting {zip_path:?} into {dest_dir:?}"))?;
    fs::remove_file(zip_path).with_context(|| format!("Removing archive {zip_path:?}"))?;
    info!("Download and extraction complete.");
    Ok(())
}

/// CSV file names directly under `dir`, sorted.
pub fn list_csv_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Listing {dir:?}"))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if Path::new(&name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            names.push(name);
        }
    }
    names.sort();
    info!("Found CSV files: {}", names.iter().join(", "));
    Ok(names)
}
