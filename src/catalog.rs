//! Translator catalog (`translators.json`).
//!
//! The catalog is a static, read-only description of every translator the
//! build definitions provide, nested as
//! `subsystem → type → name → argName → { default, examples }`. It is loaded
//! once at startup and passed by reference to whoever needs it.
//!
//! Iteration order is the order of the JSON file; listing and lookups never
//! reorder entries.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// TranslatorKey
// ---------------------------------------------------------------------------

/// Unique address of a translator: `(subsystem, type, name)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranslatorKey {
    pub subsystem: String,
    pub kind: String,
    pub name: String,
}

impl TranslatorKey {
    #[must_use]
    pub fn new(
        subsystem: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subsystem: subsystem.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TranslatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.subsystem, self.kind, self.name)
    }
}

// ---------------------------------------------------------------------------
// Spec types
// ---------------------------------------------------------------------------

/// Declaration of one special argument a translator accepts.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ArgSpec {
    /// Default value, shown in the listing.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub default: String,
    /// Example values, in declaration order.
    #[serde(default)]
    pub examples: Vec<String>,
}

/// One catalog entry: a translator and its special-argument surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslatorSpec {
    pub key: TranslatorKey,
    /// `(argName, spec)` pairs in declaration order.
    pub args: Vec<(String, ArgSpec)>,
}

impl TranslatorSpec {
    /// Look up a declared argument by name (without the `arg_` prefix).
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&ArgSpec> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, spec)| spec)
    }

    /// Declared argument names, in order.
    pub fn arg_names(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|(n, _)| n.as_str())
    }
}

// ---------------------------------------------------------------------------
// CatalogError
// ---------------------------------------------------------------------------

/// The catalog file could not be read or does not have the expected shape.
#[derive(Debug)]
pub struct CatalogError {
    /// The path being loaded (if loaded from a file).
    pub path: Option<PathBuf>,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "translator catalog {}: {}", p.display(), self.message),
            None => write!(f, "translator catalog: {}", self.message),
        }
    }
}

impl std::error::Error for CatalogError {}

// ---------------------------------------------------------------------------
// TranslatorCatalog
// ---------------------------------------------------------------------------

/// The full, immutable translator catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslatorCatalog {
    /// Subsystems in file order; each holds its translators in file order.
    subsystems: Vec<(String, Vec<TranslatorSpec>)>,
}

impl TranslatorCatalog {
    /// Load the catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the file cannot be read or is not a valid
    /// catalog.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError {
            path: Some(path.to_owned()),
            message: format!("could not read file: {e}"),
        })?;
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse catalog JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] for invalid JSON or a value of the wrong shape.
    pub fn parse(json: &str) -> Result<Self, CatalogError> {
        let root: Value = serde_json::from_str(json).map_err(|e| CatalogError {
            path: None,
            message: format!("line {}: {e}", e.line()),
        })?;

        let mut subsystems = Vec::new();
        for (subsystem, kinds) in as_object(&root, "top level")? {
            let mut specs = Vec::new();
            for (kind, names) in as_object(kinds, subsystem)? {
                for (name, args) in as_object(names, &format!("{subsystem}.{kind}"))? {
                    let key = TranslatorKey::new(subsystem, kind, name);
                    let args = parse_args(&key, args)?;
                    specs.push(TranslatorSpec { key, args });
                }
            }
            subsystems.push((subsystem.clone(), specs));
        }
        Ok(Self { subsystems })
    }

    /// Every translator exactly once, in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = &TranslatorSpec> {
        self.subsystems.iter().flat_map(|(_, specs)| specs.iter())
    }

    /// Find a translator by key.
    #[must_use]
    pub fn get(&self, key: &TranslatorKey) -> Option<&TranslatorSpec> {
        self.entries().find(|spec| &spec.key == key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Render the human-readable listing printed by `dream list`.
    #[must_use]
    pub fn render_listing(&self) -> String {
        let mut out = String::from("Available translators per build system");
        for (_, specs) in &self.subsystems {
            if specs.is_empty() {
                continue;
            }
            out.push('\n');
            for spec in specs {
                let _ = write!(out, "\n  - {}", spec.key);
                if spec.args.is_empty() {
                    continue;
                }
                out.push_str("\n      special args:");
                for (name, arg) in &spec.args {
                    let _ = write!(
                        out,
                        "\n        --arg_{name} {{value}}\n            default: {}\n            examples: {}",
                        arg.default,
                        arg.examples.join(", ")
                    );
                }
            }
        }
        out
    }
}

fn as_object<'a>(
    value: &'a Value,
    at: &str,
) -> Result<&'a serde_json::Map<String, Value>, CatalogError> {
    value.as_object().ok_or_else(|| CatalogError {
        path: None,
        message: format!("expected an object at `{at}`"),
    })
}

fn parse_args(key: &TranslatorKey, args: &Value) -> Result<Vec<(String, ArgSpec)>, CatalogError> {
    // A translator without special args may be written as `null` or `{}`.
    if args.is_null() {
        return Ok(Vec::new());
    }
    as_object(args, &key.to_string())?
        .iter()
        .map(|(name, spec)| {
            let parsed = ArgSpec::deserialize(spec).map_err(|e| CatalogError {
                path: None,
                message: format!("argument `{name}` of `{key}`: {e}"),
            })?;
            Ok((name.clone(), parsed))
        })
        .collect()
}

/// Defaults are usually strings but booleans and numbers show up too.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
