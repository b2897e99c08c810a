//! The translate request and the argument payload derived from it.
//!
//! A [`TranslateRequest`] is built once per invocation. It is sent to the
//! selection oracle as-is, and later overlaid onto the oracle's defaults to
//! form [`MergedArguments`], the sole payload handed to the translator.
//!
//! Precedence, lowest first: oracle defaults < computed request fields <
//! explicit `--arg_*` values.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::TranslateError;
use crate::special_args::SpecialArgs;
use crate::validate::InputPaths;

/// Everything the caller asked for, normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslateRequest {
    pub inputs: InputPaths,
    /// Absolute path of the lock file to produce.
    pub output_file: PathBuf,
    /// `subsystem.type.name`, or empty for auto-detection.
    pub selector: String,
    pub special_args: SpecialArgs,
}

impl TranslateRequest {
    /// The request as a flat JSON object: computed fields overlaid with the
    /// explicit special args.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("inputFiles".to_owned(), paths_json(&self.inputs.files));
        map.insert(
            "inputDirectories".to_owned(),
            paths_json(&self.inputs.directories),
        );
        map.insert(
            "outputFile".to_owned(),
            Value::String(self.output_file.display().to_string()),
        );
        map.insert("selector".to_owned(), Value::String(self.selector.clone()));
        for (name, value) in self.special_args.iter() {
            map.insert(name.to_owned(), Value::String(value.to_owned()));
        }
        map
    }

    /// Overlay this request onto the oracle's defaults.
    #[must_use]
    pub fn merge_onto(&self, defaults: &Map<String, Value>) -> MergedArguments {
        let mut merged = defaults.clone();
        for (key, value) in self.to_json() {
            merged.insert(key, value);
        }
        MergedArguments(merged)
    }
}

fn paths_json(paths: &[PathBuf]) -> Value {
    Value::Array(
        paths
            .iter()
            .map(|p| Value::String(p.display().to_string()))
            .collect(),
    )
}

/// The flat argument object the translator receives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergedArguments(pub Map<String, Value>);

impl MergedArguments {
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Turn the `--output` flag into the absolute lock file path.
///
/// A directory gets `file_name` appended. The parent directory is
/// canonicalized when it exists so the translator and the oracle see the
/// same path regardless of symlinks in the working directory.
///
/// # Errors
///
/// Fails if the current directory cannot be determined.
pub fn resolve_output_path(output: &Path, file_name: &str) -> Result<PathBuf, TranslateError> {
    let target = if output.is_dir() {
        output.join(file_name)
    } else {
        output.to_owned()
    };
    let absolute = std::path::absolute(&target)
        .map_err(|e| TranslateError::io(format!("resolve output {}", target.display()), e))?;

    let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) else {
        return Ok(absolute);
    };
    match parent.canonicalize() {
        Ok(parent) => Ok(parent.join(name)),
        Err(_) => Ok(absolute),
    }
}

/// Delete a previous lock file so stale content can never pass for a
/// fresh result.
///
/// # Errors
///
/// Fails if an existing file cannot be removed.
pub fn remove_stale_output(output: &Path) -> Result<bool, TranslateError> {
    match std::fs::remove_file(output) {
        Ok(()) => {
            tracing::debug!(path = %output.display(), "removed stale output");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(TranslateError::io(
            format!("remove stale output {}", output.display()),
            e,
        )),
    }
}
