//! The `translate` pipeline.
//!
//! ```text
//! validate inputs → collect special args → resolve translator
//!   → build translator → run translator → read lock → [consolidate]
//! ```
//!
//! Every step is synchronous and every failure aborts the run. The
//! argument file is shared by the oracle query and the translator run and
//! is removed on every exit path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::catalog::TranslatorCatalog;
use crate::config::Settings;
use crate::consolidate::consolidate;
use crate::engine::BuildEngine;
use crate::error::TranslateError;
use crate::executor::{build_translator, run_translator, translator_executable};
use crate::hash_extract::HashExtractor;
use crate::ipc::ArgumentFile;
use crate::lockfile::{LockFile, LockMode};
use crate::request::{TranslateRequest, remove_stale_output, resolve_output_path};
use crate::resolve::resolve_translator;
use crate::special_args::SpecialArgs;
use crate::validate::validate_inputs;

/// What the caller asked for, before any normalization.
#[derive(Clone, Debug, Default)]
pub struct TranslateOptions {
    /// Input files or directories.
    pub inputs: Vec<PathBuf>,
    /// Output file, or a directory to put the default file name in.
    pub output: PathBuf,
    /// `subsystem.type.name`, or empty to auto-detect.
    pub selector: String,
    /// Replace per-source hashes with one combined hash.
    pub combined: bool,
    pub special_args: SpecialArgs,
    /// Arguments handed to the translator after the argument file path.
    pub passthrough: Vec<OsString>,
}

/// Result of a successful run.
#[derive(Clone, Debug)]
pub struct Translated {
    pub output: PathBuf,
    pub lock: LockFile,
}

/// Collaborators of a translate run.
pub struct Translator<'a, E: ?Sized, X: ?Sized> {
    pub catalog: &'a TranslatorCatalog,
    pub settings: &'a Settings,
    pub engine: &'a E,
    pub extractor: &'a X,
}

impl<E, X> Translator<'_, E, X>
where
    E: BuildEngine + ?Sized,
    X: HashExtractor + ?Sized,
{
    /// # Errors
    ///
    /// Returns the first error of any step; see [`TranslateError`].
    #[instrument(skip_all, fields(
        selector = %opts.selector,
        combined = opts.combined,
        special_args = opts.special_args.len(),
    ))]
    pub fn run(&self, opts: &TranslateOptions) -> Result<Translated, TranslateError> {
        let inputs = validate_inputs(&opts.inputs)?;
        let output_file =
            resolve_output_path(&opts.output, &self.settings.config.output.file_name)?;

        let request = TranslateRequest {
            inputs,
            output_file: output_file.clone(),
            selector: opts.selector.clone(),
            special_args: opts.special_args.clone(),
        };

        remove_stale_output(&output_file)?;

        {
            let mut args = ArgumentFile::create()?;
            let resolution = resolve_translator(self.engine, &request, &mut args)?;
            request
                .special_args
                .validate_for(self.catalog, &resolution.key)?;

            let merged = request.merge_onto(&resolution.defaults);
            let build_result = build_translator(self.engine, &resolution.key)?;
            run_translator(
                &translator_executable(&build_result),
                &merged,
                &mut args,
                &opts.passthrough,
            )?;
        }

        let lock = read_produced_lock(&output_file)?;
        let lock = if opts.combined {
            println!("Start building FOD for combined sources to get output hash");
            consolidate(
                self.engine,
                self.extractor,
                &output_file,
                lock,
                self.settings.config.consolidation.checkpoint,
            )?
        } else {
            lock
        };

        println!("Created {}", output_file.display());
        Ok(Translated {
            output: output_file,
            lock,
        })
    }
}

fn read_produced_lock(path: &Path) -> Result<LockFile, TranslateError> {
    if !path.is_file() {
        return Err(TranslateError::OutputMissing {
            path: path.to_owned(),
        });
    }
    let lock = LockFile::read(path)?;
    let mode = lock.mode();
    if mode != LockMode::PerSource {
        tracing::warn!(?mode, "translator produced a lock that is not in per-source mode");
    }
    Ok(lock)
}
