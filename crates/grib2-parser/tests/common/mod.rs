//! Common test utilities for grib2-parser tests
//!
//! Locates sample GRIB2 files and skips tests when they are unavailable.

use std::path::PathBuf;

/// Returns the path to the testdata directory
pub fn testdata_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

/// Returns the path to a test file, checking `$TEST_DATA_DIR`, then the
/// crate and workspace testdata directories
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::env::var("TEST_DATA_DIR")
        .map(|dir| vec![PathBuf::from(dir).join(name)])
        .unwrap_or_default();
    candidates.push(testdata_dir().join(name));
    candidates.push(
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.join("testdata").join(name))
            .unwrap_or_default(),
    );
    candidates.into_iter().find(|p| p.exists())
}

/// Macro to skip a test if the required file is not found
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::common::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: Test file '{}' not found", $name);
                return;
            }
        }
    }};
}
