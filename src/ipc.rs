//! The transient argument file shared by the oracle query and the
//! translator invocation.
//!
//! One file is created per run and rewritten in place between the two
//! calls. It is deleted when the [`ArgumentFile`] is dropped, on every exit
//! path including early errors.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::TranslateError;

#[derive(Debug)]
pub struct ArgumentFile {
    file: NamedTempFile,
}

impl ArgumentFile {
    /// # Errors
    ///
    /// Fails if the temporary file cannot be created.
    pub fn create() -> Result<Self, TranslateError> {
        let file = tempfile::Builder::new()
            .prefix("dream-args-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| TranslateError::io("create argument file", e))?;
        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Replace the file's contents with `value` as pretty JSON and flush it
    /// to storage so an external reader sees the complete payload.
    ///
    /// # Errors
    ///
    /// Fails if `value` cannot be serialized or the file cannot be written.
    pub fn write_json<T: Serialize>(&mut self, value: &T) -> Result<(), TranslateError> {
        let json = serde_json::to_vec_pretty(value).map_err(|e| {
            TranslateError::io(
                "serialize arguments",
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        let path = self.file.path().display().to_string();
        rewrite(self.file.as_file_mut(), &json)
            .map_err(|e| TranslateError::io(format!("write argument file {path}"), e))
    }
}

fn rewrite(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()
}
