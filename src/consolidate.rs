//! Combined-hash consolidation.
//!
//! Replaces the per-source hashes of a lock file with one hash over all
//! sources:
//!
//! 1. strip `hash` from every source,
//! 2. set `sourcesCombinedHash` to `""` and persist (checkpoint A),
//! 3. build all sources as one fixed-output unit with no declared hash,
//!    which fails and reports the real hash,
//! 4. extract the hash from the diagnostics,
//! 5. store it and persist (checkpoint B).
//!
//! Only checkpoint B is a valid finished lock. With
//! [`CheckpointMode::Staged`] checkpoint A goes to a staging file next to
//! the output, so a failure between A and B leaves the output as the
//! translator wrote it. With [`CheckpointMode::InPlace`] checkpoint A
//! overwrites the output and a failure leaves it hash-stripped.

use std::path::Path;

use tracing::instrument;

use crate::config::CheckpointMode;
use crate::engine::BuildEngine;
use crate::error::TranslateError;
use crate::hash_extract::HashExtractor;
use crate::lockfile::LockFile;

/// Run the combined-hash pass on `lock`, whose finished form belongs at
/// `output`. Returns the lock as persisted at checkpoint B.
///
/// # Errors
///
/// Fails if a checkpoint cannot be written, the build cannot be started, or
/// its diagnostics carry no hash.
#[instrument(skip_all, fields(output = %output.display(), %checkpoint))]
pub fn consolidate<E, X>(
    engine: &E,
    extractor: &X,
    output: &Path,
    mut lock: LockFile,
    checkpoint: CheckpointMode,
) -> Result<LockFile, TranslateError>
where
    E: BuildEngine + ?Sized,
    X: HashExtractor + ?Sized,
{
    let stripped = lock.strip_source_hashes();
    lock.set_combined_hash("");
    tracing::debug!(stripped, sources = lock.sources.len(), "source hashes stripped");

    let build = match checkpoint {
        CheckpointMode::Staged => {
            let dir = output.parent().unwrap_or_else(|| Path::new("."));
            let staging = tempfile::Builder::new()
                .prefix(".dream-lock-staging-")
                .suffix(".json")
                .tempfile_in(dir)
                .map_err(|e| {
                    TranslateError::io(format!("create staging file in {}", dir.display()), e)
                })?;
            lock.write_atomic(staging.path())?;
            // `staging` is dropped (and deleted) once the build has read it.
            engine.build_combined_sources(staging.path())?
        }
        CheckpointMode::InPlace => {
            lock.write_atomic(output)?;
            engine.build_combined_sources(output)?
        }
    };

    if build.success {
        tracing::warn!("combined sources build succeeded; expected a hash mismatch failure");
    }
    let hash = extractor.extract(&build)?;
    println!("Computed FOD hash: {hash}");

    lock.set_combined_hash(hash);
    lock.write_atomic(output)?;
    tracing::info!("combined hash stored");
    Ok(lock)
}
