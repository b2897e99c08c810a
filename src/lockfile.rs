//! The lock file (`dream.lock`).
//!
//! A lock file lists every external source a project needs. It is written
//! by the translator and only re-read and mutated by the orchestrator for
//! the combined-hash pass. Fields the orchestrator does not interpret are
//! carried through untouched, in their original order.
//!
//! A finished lock file is in exactly one of two modes:
//!
//! ```text
//! PerSource: every source has a `hash`, sourcesCombinedHash empty
//! Combined:  no source has a `hash`,     sourcesCombinedHash set
//! ```
//!
//! Anything else is [`LockMode::Intermediate`], which a failed in-place
//! consolidation may leave behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TranslateError;

const HASH_FIELD: &str = "hash";

// ---------------------------------------------------------------------------
// LockFile
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    pub generic: GenericSection,

    /// `sourceId → { hash, ... }`.
    pub sources: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericSection {
    /// Translators write `null` here in per-source mode.
    #[serde(rename = "sourcesCombinedHash", default)]
    pub sources_combined_hash: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which hashing mode a lock file is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    PerSource,
    Combined,
    Intermediate,
}

impl LockFile {
    /// Parse lock file JSON.
    ///
    /// # Errors
    ///
    /// Fails if `json` is not a lock file.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read and parse the lock file at `path`.
    ///
    /// Missing and unparsable files are both output-contract violations:
    /// the translator was supposed to produce a valid lock here.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::OutputMissing`] if the file does not exist and
    /// [`TranslateError::OutputUnparsable`] if it is not a lock file.
    pub fn read(path: &Path) -> Result<Self, TranslateError> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TranslateError::OutputMissing {
                    path: path.to_owned(),
                });
            }
            Err(e) => {
                return Err(TranslateError::io(format!("read {}", path.display()), e));
            }
        };
        Self::from_json(&contents).map_err(|e| TranslateError::OutputUnparsable {
            path: path.to_owned(),
            message: e.to_string(),
        })
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Fails only if a preserved field cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the lock file atomically: temp file in the same directory,
    /// fsync, rename over `path`.
    ///
    /// # Errors
    ///
    /// Fails if the temporary file cannot be written, synced, or renamed.
    pub fn write_atomic(&self, path: &Path) -> Result<(), TranslateError> {
        let json = self.to_json().map_err(|e| {
            TranslateError::io(
                format!("serialize {}", path.display()),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        let tmp_path = tmp_path_for(path);

        let mut file = fs::File::create(&tmp_path)
            .map_err(|e| TranslateError::io(format!("create {}", tmp_path.display()), e))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .map_err(|e| TranslateError::io(format!("write {}", tmp_path.display()), e))?;
        file.sync_all()
            .map_err(|e| TranslateError::io(format!("fsync {}", tmp_path.display()), e))?;
        drop(file);

        fs::rename(&tmp_path, path).map_err(|e| {
            TranslateError::io(
                format!("rename {} → {}", tmp_path.display(), path.display()),
                e,
            )
        })
    }

    /// Remove the `hash` field from every source entry.
    ///
    /// Returns how many entries had one.
    pub fn strip_source_hashes(&mut self) -> usize {
        self.sources
            .values_mut()
            .filter_map(Value::as_object_mut)
            .filter_map(|entry| entry.remove(HASH_FIELD))
            .count()
    }

    pub fn set_combined_hash(&mut self, hash: impl Into<String>) {
        self.generic.sources_combined_hash = Some(hash.into());
    }

    #[must_use]
    pub fn combined_hash(&self) -> Option<&str> {
        self.generic
            .sources_combined_hash
            .as_deref()
            .filter(|h| !h.is_empty())
    }

    /// Number of source entries carrying a `hash`.
    #[must_use]
    pub fn hashed_source_count(&self) -> usize {
        self.sources
            .values()
            .filter(|entry| entry.get(HASH_FIELD).is_some())
            .count()
    }

    #[must_use]
    pub fn mode(&self) -> LockMode {
        let hashed = self.hashed_source_count();
        match (self.combined_hash(), hashed) {
            (None, n) if n == self.sources.len() => LockMode::PerSource,
            (Some(_), 0) => LockMode::Combined,
            _ => LockMode::Intermediate,
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "dream.lock".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}
