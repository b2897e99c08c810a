//! Building and running the resolved translator.
//!
//! The translator is built into a standalone executable by the build
//! engine, then run out-of-process with the merged argument file. The
//! translator alone is responsible for writing the lock file; its exit
//! status and output streams are not used to judge success.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::instrument;

use crate::catalog::TranslatorKey;
use crate::engine::BuildEngine;
use crate::error::{ToolStep, TranslateError};
use crate::ipc::ArgumentFile;
use crate::request::MergedArguments;

const OUT_LINK: &str = "translator";

/// Build `key` and return the resolved path of the build result.
///
/// The build-output link lives in a scratch directory owned by this call.
/// Any stale link is removed before the build and the fresh one is removed
/// right after it has been resolved, so repeated runs never accumulate
/// links.
///
/// # Errors
///
/// Returns [`TranslateError::ExternalTool`] if the build fails, or an I/O
/// error if the build link cannot be managed.
#[instrument(skip_all, fields(translator = %key))]
pub fn build_translator<E: BuildEngine + ?Sized>(
    engine: &E,
    key: &TranslatorKey,
) -> Result<PathBuf, TranslateError> {
    let scratch = TempDir::with_prefix("dream-build-")
        .map_err(|e| TranslateError::io("create build scratch directory", e))?;
    let out_link = scratch.path().join(OUT_LINK);
    remove_link(&out_link)?;

    engine
        .build_translator(key, &out_link)?
        .into_success(ToolStep::BuildTranslator)?;

    let resolved = out_link
        .canonicalize()
        .map_err(|e| TranslateError::io(format!("resolve build result {}", out_link.display()), e))?;
    remove_link(&out_link)?;
    tracing::info!(path = %resolved.display(), "translator built");
    Ok(resolved)
}

/// Path of the translate executable inside a built translator.
#[must_use]
pub fn translator_executable(build_result: &Path) -> PathBuf {
    build_result.join("bin").join("translate")
}

/// Write the merged arguments to `args` and run the translator.
///
/// The translator gets the argument file path followed by `passthrough`
/// (the orchestrator's own command line). Its stdio is inherited.
///
/// # Errors
///
/// Fails if the argument file cannot be written or the translator cannot
/// be started. A non-zero exit is not an error.
#[instrument(skip_all, fields(executable = %executable.display()))]
pub fn run_translator(
    executable: &Path,
    merged: &MergedArguments,
    args: &mut ArgumentFile,
    passthrough: &[OsString],
) -> Result<(), TranslateError> {
    args.write_json(merged.as_map())?;
    let status = Command::new(executable)
        .arg(args.path())
        .args(passthrough)
        .status()
        .map_err(|e| TranslateError::io(format!("run translator {}", executable.display()), e))?;
    if status.success() {
        tracing::debug!("translator exited successfully");
    } else {
        tracing::warn!(code = ?status.code(), "translator exited non-zero");
    }
    Ok(())
}

fn remove_link(path: &Path) -> Result<(), TranslateError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TranslateError::io(
            format!("remove build link {}", path.display()),
            e,
        )),
    }
}
