//! Directory of timestamp-named artifacts: `<prefix>_<YYYYMMDDHHMMSS>[_n].<ext>`.
//!
//! File names arriving from HTTP are checked against the exact pattern
//! before touching the filesystem, so path traversal is impossible.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use super::StorageError;

/// Listing entry for one stored file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    pub filename: String,
    pub created: String,
    pub size: u64,
}

pub struct ArtifactDir {
    dir: PathBuf,
    prefix: &'static str,
    extension: &'static str,
    pattern: Regex,
}

impl ArtifactDir {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: &'static str,
        extension: &'static str,
    ) -> Result<Self, StorageError> {
        let pattern = Regex::new(&format!(
            r"^{}_(\d{{14}})(?:_(\d+))?\.{}$",
            regex::escape(prefix),
            regex::escape(extension)
        ))
        .map_err(|e| StorageError::Pattern(e.to_string()))?;
        Ok(Self {
            dir: dir.into(),
            prefix,
            extension,
            pattern,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_valid_name(&self, filename: &str) -> bool {
        self.pattern.is_match(filename)
    }

    /// `(timestamp, suffix)` ordering key of a valid name.
    fn sort_key(&self, filename: &str) -> Option<(u64, u64)> {
        let caps = self.pattern.captures(filename)?;
        let stamp = caps.get(1)?.as_str().parse().ok()?;
        let suffix = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        Some((stamp, suffix))
    }

    /// Resolve a caller-supplied name to a path inside the directory.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, StorageError> {
        if !self.is_valid_name(filename) {
            return Err(StorageError::InvalidFileName(filename.to_string()));
        }
        let path = self.dir.join(filename);
        if !path.is_file() {
            return Err(StorageError::NotFound(filename.to_string()));
        }
        Ok(path)
    }

    /// Write `bytes` under a fresh name derived from `at`. A name already
    /// taken gets a `_n` suffix.
    pub fn write_new(&self, at: DateTime<Utc>, bytes: &[u8]) -> Result<String, StorageError> {
        self.write_new_with(at, |_| Ok(bytes.to_vec()))
    }

    /// Like [`write_new`](Self::write_new), for contents that embed their
    /// own file name.
    pub fn write_new_with<F>(&self, at: DateTime<Utc>, contents: F) -> Result<String, StorageError>
    where
        F: Fn(&str) -> Result<Vec<u8>, StorageError>,
    {
        fs::create_dir_all(&self.dir)?;
        let stem = format!("{}_{}", self.prefix, at.format("%Y%m%d%H%M%S"));
        let mut filename = format!("{stem}.{}", self.extension);
        let mut n = 1;
        loop {
            let path = self.dir.join(&filename);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let bytes = contents(filename.as_str());
                    let written =
                        bytes.and_then(|b| file.write_all(&b).map_err(StorageError::from));
                    if let Err(e) = written {
                        drop(file);
                        let _ = fs::remove_file(&path);
                        return Err(e);
                    }
                    return Ok(filename);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    filename = format!("{stem}_{n}.{}", self.extension);
                    n += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Valid names in the directory, newest first.
    pub fn names(&self) -> Result<Vec<String>, StorageError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keyed: Vec<((u64, u64), String)> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| self.sort_key(&name).map(|key| (key, name)))
            .collect();
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }

    pub fn list(&self, limit: usize) -> Result<Vec<StoredFile>, StorageError> {
        let mut out = Vec::new();
        for filename in self.names()?.into_iter().take(limit) {
            let meta = match fs::metadata(self.dir.join(&filename)) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(file = %filename, error = %e, "Skipping unreadable file");
                    continue;
                }
            };
            let created = meta
                .modified()
                .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            out.push(StoredFile {
                filename,
                created,
                size: meta.len(),
            });
        }
        Ok(out)
    }

    pub fn count(&self) -> usize {
        self.names().map(|n| n.len()).unwrap_or(0)
    }

    pub fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(filename)?;
        Ok(fs::read(path)?)
    }

    pub fn delete(&self, filename: &str) -> Result<(), StorageError> {
        let path = self.resolve(filename)?;
        fs::remove_file(path)?;
        tracing::info!(file = %filename, "Deleted");
        Ok(())
    }

    /// Delete everything but the `keep` newest files. Returns how many were
    /// removed.
    pub fn enforce_retention(&self, keep: usize) -> Result<usize, StorageError> {
        let mut removed = 0;
        for filename in self.names()?.into_iter().skip(keep) {
            match fs::remove_file(self.dir.join(&filename)) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(file = %filename, error = %e, "Retention delete failed"),
            }
        }
        if removed > 0 {
            tracing::info!(dir = %self.dir.display(), removed, keep, "Retention applied");
        }
        Ok(removed)
    }
}
