// src/store/mod.rs

//! Durable, atomically replaced status snapshots keyed by stage name.
//!
//! Each stage lives in `<dir>/<name>-log.json`. Writes go to a temporary
//! sibling first and are renamed over the target, so a concurrent reader
//! sees either the previous snapshot or the new one, never a torn file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::record::StatusSnapshot;

const SNAPSHOT_SUFFIX: &str = "-log.json";

/// File name of the persisted pipeline report.
pub const REPORT_FILE: &str = "pipeline-report.json";

/// File name of the markdown feedback written after a pipeline run.
pub const FEEDBACK_FILE: &str = "feedback.md";

#[derive(Debug, Clone)]
pub struct StatusStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl StatusStore {
    /// Store backed by the real filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_fs(dir, Arc::new(RealFileSystem))
    }

    pub fn with_fs(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the snapshot for `name` lives.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}{SNAPSHOT_SUFFIX}"))
    }

    /// Create the backing directory if needed. Idempotent.
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.fs.exists(&self.dir) {
            debug!(dir = %self.dir.display(), "creating status directory");
        }
        self.fs.create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Atomically replace the snapshot for `name`.
    ///
    /// Synchronous: callers on an async runtime should expect it to block
    /// briefly.
    pub fn write(&self, name: &str, snapshot: &StatusSnapshot) -> Result<()> {
        self.write_json(&self.path_for(name), snapshot)
    }

    /// Read the snapshot for `name`, treating absent and malformed files
    /// alike as "nothing there yet".
    pub fn read(&self, name: &str) -> Option<StatusSnapshot> {
        match self.try_read(name) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(stage = name, error = %e, "ignoring unreadable snapshot");
                None
            }
        }
    }

    /// Like [`read`](Self::read) but reports malformed files as errors.
    pub fn try_read(&self, name: &str) -> Result<Option<StatusSnapshot>> {
        self.read_json(&self.path_for(name))
    }

    /// Names of all stages that currently have a snapshot, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.fs.exists(&self.dir) {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = self
            .fs
            .read_dir(&self.dir)?
            .iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
            .filter_map(|file| file.strip_suffix(SNAPSHOT_SUFFIX))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Persist the pipeline report next to the stage snapshots.
    pub fn write_report<T: Serialize>(&self, report: &T) -> Result<()> {
        self.write_json(&self.dir.join(REPORT_FILE), report)
    }

    pub fn read_report<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.read_json(&self.dir.join(REPORT_FILE))
    }

    /// Replace the markdown feedback document.
    pub fn write_feedback(&self, markdown: &str) -> Result<()> {
        self.write_atomic(&self.dir.join(FEEDBACK_FILE), markdown.as_bytes())
    }

    pub fn read_feedback(&self) -> Result<Option<String>> {
        let path = self.dir.join(FEEDBACK_FILE);
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        Ok(Some(self.fs.read_to_string(&path)?))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_atomic(path, json.as_bytes())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.ensure_dir()?;
        let tmp_path = tmp_path_for(path);
        self.fs.write(&tmp_path, contents)?;
        self.fs.rename(&tmp_path, path)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !self.fs.exists(path) {
            return Ok(None);
        }
        let contents = self.fs.read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

/// Temporary sibling used for the write-then-rename dance. The pid keeps two
/// processes pointed at the same directory from clobbering each other's
/// half-written file.
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
