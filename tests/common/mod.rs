#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use price_parity::{
    ComparisonPair, MetadataColumn, PricePolicy, RunResult, Selection, SourceTable,
    source::{LoadOptions, load_table},
};
use tempfile::{TempDir, tempdir};

pub const PORTAL_FIXTURE: &str = "portal_prices.csv";
pub const OMNI_FIXTURE: &str = "omni_prices.csv";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn load_fixture(name: &str) -> SourceTable {
    load_table(&fixture_path(name), &LoadOptions::default()).expect("load fixture")
}

/// The three marketplace pairs shared by both price fixtures.
pub fn fixture_selection() -> Selection {
    Selection {
        portal_id: Some("SKU".into()),
        omni_id: Some("SKU".into()),
        pairs: vec![
            ComparisonPair::new("Shopee", "Harga Shopee", "Shopee"),
            ComparisonPair::new("Tokopedia", "Harga Tokopedia", "Tokopedia"),
            ComparisonPair::new("Web", "Harga Web", "Web"),
        ],
        metadata: vec![MetadataColumn::new("Nama Produk")],
        ..Selection::default()
    }
}

pub fn fixture_run() -> RunResult {
    price_parity::compare_tables(
        &load_fixture(PORTAL_FIXTURE),
        &load_fixture(OMNI_FIXTURE),
        &fixture_selection(),
        &PricePolicy::default(),
    )
    .expect("fixture run")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

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
}
