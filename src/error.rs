//! Error types for the translate pipeline.
//!
//! [`TranslateError`] is the single error type returned by every pipeline
//! step. Each variant belongs to one [`ErrorKind`], which is what callers
//! match on when they only care about the failure category. Every error is
//! fatal: nothing in the pipeline retries.
//!
//! Diagnostics captured from external tools are carried verbatim so the
//! user sees exactly what the oracle or build engine printed.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;

/// Which external step produced an [`TranslateError::ExternalTool`] failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolStep {
    /// The selection oracle (translator auto-detection / validation).
    SelectTranslator,
    /// Building the translator executable.
    BuildTranslator,
}

impl fmt::Display for ToolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectTranslator => write!(f, "Selecting translator"),
            Self::BuildTranslator => write!(f, "Building translator"),
        }
    }
}

/// Failure categories. All of them terminate the run with exit status 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input path, or a malformed/undeclared special argument.
    Validation,
    /// The oracle or the translator build failed.
    ExternalTool,
    /// The lock file the translator should have produced is missing or unparsable.
    OutputContract,
    /// The consolidation build's diagnostics lack the hash token.
    HashExtraction,
    /// Catalog or `dream.toml` could not be loaded.
    Configuration,
    /// Local filesystem or process-spawn failure.
    Io,
}

/// Errors returned by the translate pipeline.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// An input path does not exist.
    #[error("Input path '{}' does not exist", path.display())]
    InputNotFound {
        /// The missing path, as given by the caller.
        path: PathBuf,
    },

    /// A special argument flag could not be parsed.
    #[error("invalid special argument `{flag}`: {reason}")]
    MalformedSpecialArg {
        /// The raw flag as it appeared on the command line.
        flag: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A special argument was given that the resolved translator does not declare.
    #[error(
        "translator `{translator}` does not accept --arg_{name}\n  accepted: {}",
        if accepted.is_empty() { "(none)".to_owned() } else { accepted.join(", ") }
    )]
    UnknownSpecialArg {
        /// The argument name without the `arg_` prefix.
        name: String,
        /// Dotted translator key (`subsystem.type.name`).
        translator: String,
        /// Names the translator does declare.
        accepted: Vec<String>,
    },

    /// An external tool exited non-zero. `diagnostics` is its stderr, verbatim.
    #[error("{step} failed (exit code {})\n{diagnostics}", display_code(*code))]
    ExternalTool {
        /// The step that failed.
        step: ToolStep,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Captured stderr of the tool.
        diagnostics: String,
    },

    /// The oracle exited zero but its answer could not be understood.
    #[error("Selecting translator returned an unreadable answer: {message}\n{stdout}")]
    OracleResponse {
        /// Parser message.
        message: String,
        /// The raw stdout that failed to parse.
        stdout: String,
    },

    /// The translator did not produce the expected lock file.
    #[error("Translator failed to create {}", path.display())]
    OutputMissing {
        /// Where the lock file was expected.
        path: PathBuf,
    },

    /// The produced lock file is not a valid lock.
    #[error("lock file {} is unparsable: {message}", path.display())]
    OutputUnparsable {
        /// Path of the lock file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The consolidation build's diagnostics did not contain `FOD_PATH=<hash>`.
    #[error("Could not find FOD hash in FOD log\n--- stderr ---\n{stderr}\n--- stdout ---\n{stdout}")]
    HashExtraction {
        /// Captured stdout of the consolidation build.
        stdout: String,
        /// Captured stderr of the consolidation build.
        stderr: String,
    },

    /// The translator catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// `dream.toml` could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A filesystem or process-spawn operation failed.
    #[error("{context}")]
    Io {
        /// What was being attempted, including the path involved.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl TranslateError {
    /// Wrap an I/O error with a description of what was being attempted.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The failure category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound { .. }
            | Self::MalformedSpecialArg { .. }
            | Self::UnknownSpecialArg { .. } => ErrorKind::Validation,
            Self::ExternalTool { .. } | Self::OracleResponse { .. } => ErrorKind::ExternalTool,
            Self::OutputMissing { .. } | Self::OutputUnparsable { .. } => {
                ErrorKind::OutputContract
            }
            Self::HashExtraction { .. } => ErrorKind::HashExtraction,
            Self::Catalog(_) | Self::Config(_) => ErrorKind::Configuration,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

fn display_code(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_owned(), |c| c.to_string())
}
