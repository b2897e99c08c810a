//! Recovering the combined-sources hash from build diagnostics.
//!
//! The consolidation build is run without a declared output hash, so it
//! fails and the fetcher reports the hash it actually computed as a
//! `FOD_PATH=<hash>` line. Scraping another program's failure text is
//! fragile; everything that depends on the format sits behind
//! [`HashExtractor`] so a structured source can replace it.

use std::sync::LazyLock;

use regex::Regex;

use crate::engine::ToolOutput;
use crate::error::TranslateError;

/// Produces the combined hash from the consolidation build's output.
pub trait HashExtractor {
    /// # Errors
    ///
    /// Returns [`TranslateError::HashExtraction`] when no hash is found.
    fn extract(&self, output: &ToolOutput) -> Result<String, TranslateError>;
}

/// Hash alphabets include `=` padding; the token runs to the last `=` on
/// its line.
static FOD_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FOD_PATH=(.*=)").expect("FOD_PATH pattern is valid"));

/// Scrapes `FOD_PATH=<hash>` from the build's stderr. First match wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct FodPathScraper;

impl FodPathScraper {
    /// The hash in `text`, if any.
    #[must_use]
    pub fn find(text: &str) -> Option<&str> {
        FOD_PATH
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl HashExtractor for FodPathScraper {
    fn extract(&self, output: &ToolOutput) -> Result<String, TranslateError> {
        Self::find(&output.stderr)
            .map(str::to_owned)
            .ok_or_else(|| TranslateError::HashExtraction {
                stdout: output.stdout.clone(),
                stderr: output.stderr.clone(),
            })
    }
}
