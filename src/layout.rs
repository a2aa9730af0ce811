//! Deterministic channel directory layout.
//!
//! A channel is a directory tree derived from nothing but the cadence
//! buckets: one subdirectory per directory period, named by its UTC start
//! time (`YYYY-MM-DDTHH-MM-SS`), holding one file per file period, named by
//! the file's epoch start time in seconds and milliseconds
//! (`rf@<secs>.<mmm>.dat`). A single JSON properties sidecar sits at the
//! channel root.

use std::path::{Path, PathBuf};

use crate::clock::CalendarTime;
use crate::error::Result;

/// File name of the per-channel properties sidecar.
pub const PROPERTIES_FILE: &str = "drf_properties.json";

/// Subdirectory name for a directory bucket start time.
pub fn subdir_name(dir_epoch_secs: u64) -> Result<String> {
    let t = CalendarTime::from_epoch(dir_epoch_secs, 0)?;
    Ok(format!(
        "{:04}-{:02}-{:02}T{:02}-{:02}-{:02}",
        t.year, t.month, t.day, t.hour, t.minute, t.second
    ))
}

/// File name for a file bucket start time.
pub fn file_name(file_epoch_millis: u64) -> String {
    format!(
        "rf@{}.{:03}.dat",
        file_epoch_millis / 1000,
        file_epoch_millis % 1000
    )
}

/// Path derivation rooted at one channel directory.
#[derive(Debug, Clone)]
pub struct ChannelLayout {
    root: PathBuf,
}

impl ChannelLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn properties_path(&self) -> PathBuf {
        self.root.join(PROPERTIES_FILE)
    }

    pub fn subdir_path(&self, dir_epoch_secs: u64) -> Result<PathBuf> {
        Ok(self.root.join(subdir_name(dir_epoch_secs)?))
    }

    pub fn file_path(&self, dir_epoch_secs: u64, file_epoch_millis: u64) -> Result<PathBuf> {
        Ok(self
            .subdir_path(dir_epoch_secs)?
            .join(file_name(file_epoch_millis)))
    }
}
