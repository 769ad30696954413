use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use log::{error, info};

pub trait ObjectStore {
    /// Stores `local` under `key` and returns the stored object's location.
    fn upload(&self, local: &Path, key: &str) -> Result<String>;
}

/// An object store backed by a local directory laid out as `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.join(&self.bucket), |path, segment| {
                path.join(segment)
            })
    }
}

impl ObjectStore for LocalObjectStore {
    fn upload(&self, local: &Path, key: &str) -> Result<String> {
        ensure_local_file(local)?;
        if key.split('/').any(|segment| segment == "..") {
            bail!("Object key '{key}' must not contain '..'");
        }
        let location = format!("local://{}/{}", self.bucket, key.trim_start_matches('/'));
        info!("Uploading {} to {location}...", local.display());
        let target = self.object_path(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating object directory {parent:?}"))?;
        }
        fs::copy(local, &target)
            .with_context(|| format!("Copying {local:?} to {target:?}"))?;
        info!("Uploaded {} to {location}", local.display());
        Ok(location)
    }
}

/// Fails when `local` is missing, logging what its directory does contain.
pub fn ensure_local_file(local: &Path) -> Result<()> {
    if local.is_file() {
        return Ok(());
    }
    error!("File {} does not exist", local.display());
    if let Some(dir) = local.parent()
        && let Ok(entries) = fs::read_dir(dir)
    {
        error!("Contents of {}:", dir.display());
        for entry in entries.flatten() {
            error!("  - {}", entry.file_name().to_string_lossy());
        }
    }
    bail!("{} does not exist", local.display())
}
