//! The external build/evaluation engine.
//!
//! [`BuildEngine`] is the seam between the orchestrator and the outside
//! world: it runs the selection oracle, builds translators, and runs the
//! deliberately failing fixed-output build of all sources. [`NixEngine`]
//! is the real implementation; tests substitute their own.
//!
//! Engine methods report what the process did ([`ToolOutput`]) and leave
//! the judgement of success to the caller. The consolidation build, for
//! one, is expected to fail.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::catalog::TranslatorKey;
use crate::config::BuilderConfig;
use crate::error::{ToolStep, TranslateError};

/// Environment variable through which the oracle receives the argument file.
pub const FUNC_ARGS_ENV: &str = "FUNC_ARGS";

// ---------------------------------------------------------------------------
// ToolOutput
// ---------------------------------------------------------------------------

/// Captured result of one external process run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Turn a non-zero exit into [`TranslateError::ExternalTool`], carrying
    /// the full stderr.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::ExternalTool`] when the process failed.
    pub fn into_success(self, step: ToolStep) -> Result<Self, TranslateError> {
        if self.success {
            Ok(self)
        } else {
            Err(TranslateError::ExternalTool {
                step,
                code: self.code,
                diagnostics: self.stderr,
            })
        }
    }
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildEngine
// ---------------------------------------------------------------------------

pub trait BuildEngine {
    /// Ask the selection oracle which translator handles the request stored
    /// in `argument_file`. On success stdout holds the oracle's JSON answer.
    ///
    /// # Errors
    ///
    /// Returns an error only if the oracle could not be started.
    fn select_translator(&self, argument_file: &Path) -> Result<ToolOutput, TranslateError>;

    /// Build the translator `key`, leaving a link to the build result at
    /// `out_link`. The executable is `<result>/bin/translate`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the build could not be started.
    fn build_translator(
        &self,
        key: &TranslatorKey,
        out_link: &Path,
    ) -> Result<ToolOutput, TranslateError>;

    /// Build all sources declared by `lock_file` as one fixed-output unit
    /// without a declared hash. Diagnostics carry `FOD_PATH=<hash>`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the build could not be started.
    fn build_combined_sources(&self, lock_file: &Path) -> Result<ToolOutput, TranslateError>;
}

// ---------------------------------------------------------------------------
// NixEngine
// ---------------------------------------------------------------------------

/// Runs the build definitions under `source_root` with the `nix` CLI (or
/// whatever `builder.program` names).
#[derive(Clone, Debug)]
pub struct NixEngine {
    program: String,
    extra_args: Vec<String>,
    source_root: PathBuf,
}

impl NixEngine {
    #[must_use]
    pub fn new(builder: &BuilderConfig, source_root: impl Into<PathBuf>) -> Self {
        Self {
            program: builder.program.clone(),
            extra_args: builder.extra_args.clone(),
            source_root: source_root.into(),
        }
    }

    fn import_root(&self) -> String {
        format!("(import {} {{}})", self.source_root.display())
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(subcommand).args(&self.extra_args);
        cmd
    }

    fn run(&self, mut cmd: Command, what: &str) -> Result<ToolOutput, TranslateError> {
        tracing::debug!(program = %self.program, ?cmd, "running build engine");
        let output = cmd
            .output()
            .map_err(|e| TranslateError::io(format!("run {} ({what})", self.program), e))?;
        let output = ToolOutput::from(output);
        tracing::debug!(code = ?output.code, what, "build engine finished");
        Ok(output)
    }

    #[must_use]
    pub fn select_expr(&self) -> String {
        format!("({}.translators.selectTranslatorJSON {{}})", self.import_root())
    }

    #[must_use]
    pub fn translator_expr(&self, key: &TranslatorKey) -> String {
        format!(
            "{}.translators.translators.{}.{}.{}.translateBin",
            self.import_root(),
            key.subsystem,
            key.kind,
            key.name
        )
    }

    #[must_use]
    pub fn combined_sources_expr(&self, lock_file: &Path) -> String {
        format!(
            "{}.fetchSources {{ genericLock = {}; }}",
            self.import_root(),
            lock_file.display()
        )
    }
}

impl BuildEngine for NixEngine {
    fn select_translator(&self, argument_file: &Path) -> Result<ToolOutput, TranslateError> {
        let mut cmd = self.command("eval");
        cmd.args(["--impure", "--raw", "--expr"])
            .arg(self.select_expr())
            .env(FUNC_ARGS_ENV, argument_file);
        self.run(cmd, "select translator")
    }

    fn build_translator(
        &self,
        key: &TranslatorKey,
        out_link: &Path,
    ) -> Result<ToolOutput, TranslateError> {
        let mut cmd = self.command("build");
        cmd.args(["--impure", "-o"])
            .arg(out_link)
            .arg("--expr")
            .arg(self.translator_expr(key));
        self.run(cmd, "build translator")
    }

    fn build_combined_sources(&self, lock_file: &Path) -> Result<ToolOutput, TranslateError> {
        let mut cmd = self.command("build");
        cmd.args(["--impure", "-L", "--expr"])
            .arg(self.combined_sources_expr(lock_file));
        self.run(cmd, "build combined sources")
    }
}
