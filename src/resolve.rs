//! Translator resolution through the selection oracle.
//!
//! The oracle is always consulted, even when a selector was given: with an
//! empty selector it detects the translator from the inputs, otherwise it
//! validates the explicit one. Either way it answers with the translator's
//! key and its special-argument defaults.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::catalog::TranslatorKey;
use crate::engine::BuildEngine;
use crate::error::{ToolStep, TranslateError};
use crate::ipc::ArgumentFile;
use crate::request::TranslateRequest;

/// The oracle's answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub key: TranslatorKey,
    pub defaults: Map<String, Value>,
}

#[derive(Deserialize)]
struct OracleAnswer {
    subsystem: String,
    #[serde(rename = "type")]
    kind: String,
    name: String,
    #[serde(rename = "SpecialArgsDefaults", default)]
    special_args_defaults: Option<Map<String, Value>>,
}

/// Write the request to `args` and ask the oracle to resolve it.
///
/// # Errors
///
/// Fails if the argument file cannot be written, the oracle exits non-zero,
/// or its answer cannot be parsed.
#[instrument(skip_all, fields(selector = %request.selector))]
pub fn resolve_translator<E: BuildEngine + ?Sized>(
    engine: &E,
    request: &TranslateRequest,
    args: &mut ArgumentFile,
) -> Result<Resolution, TranslateError> {
    args.write_json(&request.to_json())?;
    let output = engine
        .select_translator(args.path())?
        .into_success(ToolStep::SelectTranslator)?;
    let resolution = parse_answer(&output.stdout)?;
    tracing::info!(translator = %resolution.key, "translator resolved");
    Ok(resolution)
}

/// Parse the oracle's stdout.
///
/// # Errors
///
/// Returns [`TranslateError::OracleResponse`] if `stdout` is not an answer.
pub fn parse_answer(stdout: &str) -> Result<Resolution, TranslateError> {
    let answer: OracleAnswer =
        serde_json::from_str(stdout).map_err(|e| TranslateError::OracleResponse {
            message: e.to_string(),
            stdout: stdout.to_owned(),
        })?;
    Ok(Resolution {
        key: TranslatorKey::new(answer.subsystem, answer.kind, answer.name),
        defaults: answer.special_args_defaults.unwrap_or_default(),
    })
}
