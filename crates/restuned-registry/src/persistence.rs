use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{RegistryError, Result};

/// A single `<path>,<defaultIntegerValue>` restore line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreEntry {
    pub path: String,
    pub default_value: i32,
}

/// Reads, replays and writes the CSV default-value restore file used to
/// recover safe kernel state across a daemon restart or crash.
pub struct RestoreFile {
    path: PathBuf,
}

impl RestoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RestoreFile { path: path.into() }
    }

    /// Parse every `<path>,<defaultIntegerValue>` line present on disk.
    /// Returns an empty vec (not an error) if the file does not exist —
    /// a clean first boot has nothing to restore.
    pub fn read(&self) -> Result<Vec<RestoreEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (path, value) = line
                .rsplit_once(',')
                .ok_or_else(|| RegistryError::MalformedRestoreLine(line.to_string()))?;
            let default_value = value
                .trim()
                .parse::<i32>()
                .map_err(|_| RegistryError::MalformedRestoreLine(line.to_string()))?;
            entries.push(RestoreEntry { path: path.to_string(), default_value });
        }
        Ok(entries)
    }

    /// Replay every entry through `write_knob`, then delete the file.
    /// Called on startup before the CCT accepts any request.
    pub fn replay_and_delete<F>(&self, mut write_knob: F) -> Result<usize>
    where
        F: FnMut(&str, i32) -> std::io::Result<()>,
    {
        let entries = self.read()?;
        let mut restored = 0usize;
        for entry in &entries {
            match write_knob(&entry.path, entry.default_value) {
                Ok(()) => restored += 1,
                Err(e) => warn!(path = %entry.path, error = %e, "failed to replay restore entry"),
            }
        }
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        info!(restored, "replayed default-value restore file");
        Ok(restored)
    }

    /// Re-emit the restore file from the in-memory default-value cache on
    /// normal shutdown, so a crash between write and kernel-apply still has
    /// something to restore from on the next boot.
    pub fn emit(&self, entries: &[RestoreEntry]) -> Result<()> {
        let mut body = String::new();
        for entry in entries {
            body.push_str(&entry.path);
            body.push(',');
            body.push_str(&entry.default_value.to_string());
            body.push('\n');
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, body)?;
        Ok(())
    }

    pub fn delete_if_present(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
