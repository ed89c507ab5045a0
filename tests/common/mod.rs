#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;

use tempfile::TempDir;

use devwatch::fs::mock::MockFileSystem;
use devwatch::store::StatusStore;

pub use devwatch_test_utils::init_tracing;

pub type TestResult = Result<(), Box<dyn Error>>;

/// Store rooted in a fresh temporary directory. Keep the `TempDir` alive
/// for as long as the store is used.
pub fn temp_store() -> Result<(TempDir, StatusStore), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let store = StatusStore::new(dir.path().join(".cursor"));
    Ok((dir, store))
}

/// Store backed by an in-memory filesystem, plus a handle for inspection.
pub fn mock_store() -> (MockFileSystem, StatusStore) {
    let fs = MockFileSystem::new();
    let store = StatusStore::with_fs(".cursor", Arc::new(fs.clone()));
    (fs, store)
}
