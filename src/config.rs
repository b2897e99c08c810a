//! Orchestrator configuration (`dream.toml`).
//!
//! Defines the typed configuration for the build-engine invocation, the
//! default lock file name, and how the combined-hash pass checkpoints its
//! intermediate state. Missing file → all defaults.
//!
//! The paths to the translator catalog and the build definitions are not
//! part of this file; they come from the environment (see [`Settings`]).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level `dream.toml` configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DreamConfig {
    /// External build engine settings.
    #[serde(default)]
    pub builder: BuilderConfig,

    /// Lock file output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Combined-hash settings.
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
}

// ---------------------------------------------------------------------------
// BuilderConfig
// ---------------------------------------------------------------------------

/// How to invoke the external build/evaluation engine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuilderConfig {
    /// Program name or path (default: `"nix"`).
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra arguments inserted right after the `eval`/`build` subcommand,
    /// e.g. `["--extra-experimental-features", "nix-command flakes"]`.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            extra_args: Vec::new(),
        }
    }
}

fn default_program() -> String {
    "nix".to_owned()
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// File name used when `--output` names a directory (default: `"dream.lock"`).
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
        }
    }
}

fn default_file_name() -> String {
    "dream.lock".to_owned()
}

// ---------------------------------------------------------------------------
// ConsolidationConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsolidationConfig {
    /// Where the hash-stripped intermediate lock is written.
    #[serde(default)]
    pub checkpoint: CheckpointMode,
}

/// Where the combined-hash pass persists its intermediate state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckpointMode {
    /// Intermediate lock goes to a staging file; the output is replaced
    /// only after the combined hash is known. A failed pass leaves the
    /// output untouched.
    #[default]
    Staged,
    /// Intermediate lock overwrites the output. A failed pass leaves the
    /// output hash-stripped with an empty combined hash.
    InPlace,
}

impl fmt::Display for CheckpointMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staged => write!(f, "staged"),
            Self::InPlace => write!(f, "in-place"),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error loading `dream.toml`.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "config error in {}: {}", p.display(), self.message),
            None => write!(f, "config error: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl DreamConfig {
    /// Load from a TOML file.
    ///
    /// - File not found → returns defaults (no error).
    /// - Parse error → returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for invalid TOML or unknown keys.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything a `translate` run needs from its environment, resolved once
/// at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Root of the external build definitions.
    pub source_root: PathBuf,
    /// Parsed `dream.toml`.
    pub config: DreamConfig,
}

impl Settings {
    /// Combine the environment-provided paths with the config file.
    ///
    /// `builder_override` (from `--builder` / `DREAM_BUILDER`) wins over
    /// `builder.program` in the file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config file cannot be loaded.
    pub fn new(
        source_root: PathBuf,
        config_path: &Path,
        builder_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = DreamConfig::load(config_path)?;
        if let Some(program) = builder_override {
            config.builder.program = program;
        }
        Ok(Self {
            source_root,
            config,
        })
    }
}
