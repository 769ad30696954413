mod common;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use common::{TestWorkspace, parquet_columns, parquet_rows};
use openpayments_ingest::{
    archive::LocalObjectStore, config::IngestConfig, file_type::FileType, pipeline,
};
use predicates::str::contains;

const GNRL: &str = "Record_ID,Program_Year,Number_of_Payments_Included_in_Total_Amount,Recipient_City\n\
1,2023,1,Boston\n\
2,2023,x,Austin\n\
3,2023,2,O\"Fallon\n";
const RSRCH: &str = "Record_ID,Principal_Investigator_1_NPI,Total_Amount\n10,0012345,99.5\n11,,100\n";
const OWNRSHP: &str = "Record_ID,Value_of_Interest,Interest_Held_by\n20,1500,Physician\n";

fn write_archive(path: &Path, year: i32, include_research: bool) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    let mut entries = vec![
        (format!("OP_DTL_GNRL_PGYR{year}_P01302025.csv"), GNRL),
        (format!("OP_DTL_OWNRSHP_PGYR{year}_P01302025.csv"), OWNRSHP),
        (format!("OP_PGYR{year}_README_P01302025.txt"), "readme"),
    ];
    if include_research {
        entries.push((format!("OP_DTL_RSRCH_PGYR{year}_P01302025.csv"), RSRCH));
    }
    for (name, contents) in entries {
        zip.start_file(name, options).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn config_yaml(ws: &TestWorkspace, keep: bool) -> String {
    format!(
        "source: {}\nextract_dir: {}\narchive:\n  root: {}\n  bucket: cms_bucket\nkeep_extracted: {keep}\n",
        ws.join("PGYR{year}.zip").display(),
        ws.join("downloaded_files").display(),
        ws.join("store").display(),
    )
}

#[test]
fn ingest_converts_and_archives_every_file_type() {
    let ws = TestWorkspace::new();
    write_archive(&ws.join("PGYR2023.zip"), 2023, true);
    let config = IngestConfig::from_yaml_str(&config_yaml(&ws, false)).unwrap();
    let store = LocalObjectStore::new(ws.join("store"), "cms_bucket");

    let report = pipeline::ingest(&config, 2023, &store).expect("ingest");

    assert_eq!(
        report.uploads,
        vec![
            "local://cms_bucket/raw/RSRCH_2023.parquet",
            "local://cms_bucket/raw/OWNRSHP_2023.parquet",
            "local://cms_bucket/raw/GNRL_2023.parquet",
        ]
    );
    assert!(!ws.join("downloaded_files/2023").exists());

    let raw = ws.join("store/cms_bucket/raw");
    let gnrl = raw.join("GNRL_2023.parquet");
    assert_eq!(parquet_rows(&gnrl).len(), 2);
    assert_eq!(report.conversions[2].rows_dropped(), 1);
    assert_eq!(
        parquet_rows(&gnrl)[1][3],
        "O\"Fallon",
        "stray quote kept literally"
    );

    let rsrch = raw.join("RSRCH_2023.parquet");
    assert_eq!(
        parquet_columns(&rsrch)[1],
        (
            "Principal_Investigator_1_NPI".to_string(),
            "Utf8".to_string()
        )
    );
    assert_eq!(parquet_rows(&rsrch)[0][1], "0012345");

    let ownrshp = raw.join("OWNRSHP_2023.parquet");
    assert_eq!(
        parquet_columns(&ownrshp),
        vec![
            ("Record_ID".to_string(), "Int64".to_string()),
            ("Value_of_Interest".to_string(), "Int64".to_string()),
            ("Interest_Held_by".to_string(), "Utf8".to_string()),
        ]
    );
}

#[test]
fn ingest_fails_when_a_file_type_is_missing_and_keeps_files() {
    let ws = TestWorkspace::new();
    write_archive(&ws.join("PGYR2022.zip"), 2022, false);
    let config = IngestConfig::from_yaml_str(&config_yaml(&ws, false)).unwrap();
    let store = LocalObjectStore::new(ws.join("store"), "cms_bucket");

    let err = pipeline::ingest(&config, 2022, &store).unwrap_err();

    assert!(err.to_string().contains("No RSRCH file"), "{err:#}");
    assert!(ws.join("downloaded_files/2022").exists());
    assert!(!ws.join("store").exists());
}

#[test]
fn ingest_respects_configured_file_types() {
    let ws = TestWorkspace::new();
    write_archive(&ws.join("PGYR2022.zip"), 2022, false);
    let mut config = IngestConfig::from_yaml_str(&config_yaml(&ws, true)).unwrap();
    config.file_types = vec![FileType::General];
    let store = LocalObjectStore::new(ws.join("store"), "cms_bucket");

    let report = pipeline::ingest(&config, 2022, &store).unwrap();

    assert_eq!(report.conversions.len(), 1);
    assert!(ws.join("downloaded_files/2022/GNRL_2022.parquet").exists());
    assert!(!ws.join("store/cms_bucket/raw/OWNRSHP_2022.parquet").exists());
}

#[test]
fn failed_year_does_not_block_the_next_one() {
    let ws = TestWorkspace::new();
    write_archive(&ws.join("PGYR2022.zip"), 2022, false);
    write_archive(&ws.join("PGYR2023.zip"), 2023, true);
    let config = IngestConfig::from_yaml_str(&config_yaml(&ws, false)).unwrap();
    let store = LocalObjectStore::new(ws.join("store"), "cms_bucket");

    assert!(pipeline::ingest(&config, 2022, &store).is_err());
    let report = pipeline::ingest(&config, 2023, &store).expect("next year ingests");

    assert_eq!(report.uploads.len(), 3);
    assert!(ws.join("store/cms_bucket/raw/GNRL_2023.parquet").exists());
    assert!(ws.join("downloaded_files/2022").exists());
    assert!(!ws.join("downloaded_files/2023").exists());
}

#[test]
fn retry_clears_leftovers_of_the_same_year() {
    let ws = TestWorkspace::new();
    write_archive(&ws.join("PGYR2023.zip"), 2023, true);
    let stale = ws.join("downloaded_files/2023");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("OP_DTL_GNRL_PGYR2023_OLD.csv"), GNRL).unwrap();
    let config = IngestConfig::from_yaml_str(&config_yaml(&ws, true)).unwrap();
    let store = LocalObjectStore::new(ws.join("store"), "cms_bucket");

    pipeline::ingest(&config, 2023, &store).expect("retry ingests");

    assert!(!stale.join("OP_DTL_GNRL_PGYR2023_OLD.csv").exists());
    assert!(stale.join("GNRL_2023.parquet").exists());
}

#[test]
fn ingest_command_runs_from_config_file() {
    let ws = TestWorkspace::new();
    write_archive(&ws.join("PGYR2021.zip"), 2021, true);
    let config = ws.write("ingest.yaml", &config_yaml(&ws, false));

    Command::cargo_bin("openpayments-ingest")
        .expect("binary exists")
        .env_remove("OPENPAYMENTS_SOURCE")
        .env_remove("OPENPAYMENTS_EXTRACT_DIR")
        .env_remove("OPENPAYMENTS_ARCHIVE_ROOT")
        .env("OPENPAYMENTS_BUCKET", "override_bucket")
        .args(["ingest", "-c", config.to_str().unwrap(), "--year", "2021"])
        .assert()
        .success()
        .stdout(contains("local://override_bucket/raw/GNRL_2021.parquet"));

    assert!(
        fs::metadata(ws.join("store/override_bucket/raw/RSRCH_2021.parquet"))
            .unwrap()
            .is_file()
    );
}
