#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use openpayments_ingest::columnar::{inspect, read_batches};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

/// Column names and Arrow type names of a Parquet file, in file order.
pub fn parquet_columns(path: &Path) -> Vec<(String, String)> {
    inspect(path)
        .expect("inspect parquet")
        .columns
        .into_iter()
        .map(|c| (c.name, c.data_type))
        .collect()
}

/// Every row of a Parquet file rendered as strings; nulls render as `""`.
pub fn parquet_rows(path: &Path) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for batch in read_batches(path).expect("read parquet") {
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|column| render_cell(column.as_ref(), row))
                .collect();
            rows.push(cells);
        }
    }
    rows
}

fn render_cell(column: &dyn Array, row: usize) -> String {
    if column.is_null(row) {
        return String::new();
    }
    if let Some(values) = column.as_any().downcast_ref::<Int64Array>() {
        return values.value(row).to_string();
    }
    if let Some(values) = column.as_any().downcast_ref::<Float64Array>() {
        return values.value(row).to_string();
    }
    if let Some(values) = column.as_any().downcast_ref::<StringArray>() {
        return values.value(row).to_string();
    }
    panic!("unexpected column type {:?}", column.data_type());
}
