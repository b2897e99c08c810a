//! Special-argument collection.
//!
//! Each translator declares its own optional flags, and which translator
//! runs is only known after the oracle answers. The static CLI therefore
//! cannot declare them. Instead, every `--arg_<name>` flag is pulled out of
//! the argument vector before clap sees it, collected into a plain
//! name → value map, and checked against the catalog once the translator
//! is resolved.
//!
//! Accepted forms: `--arg_name=value` and `--arg_name value`. In the second
//! form the value may not look like a flag (`-c`, `--combined`), so a
//! forgotten value never swallows the next option. The last occurrence of
//! a name wins. Scanning stops at a bare `--`.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use crate::catalog::{TranslatorCatalog, TranslatorKey};
use crate::error::TranslateError;

const PREFIX: &str = "--arg_";

/// Collected `arg_<name>` values, keyed by `<name>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpecialArgs(BTreeMap<String, String>);

impl SpecialArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check every collected name against the resolved translator's
    /// declared arguments.
    ///
    /// A translator missing from the catalog is not an error: the oracle
    /// may know translators the catalog file does not, so validation is
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::UnknownSpecialArg`] for the first name the
    /// translator does not declare.
    pub fn validate_for(
        &self,
        catalog: &TranslatorCatalog,
        key: &TranslatorKey,
    ) -> Result<(), TranslateError> {
        let Some(spec) = catalog.get(key) else {
            if !self.is_empty() {
                tracing::warn!(
                    translator = %key,
                    "translator not in catalog, special args passed through unchecked"
                );
            }
            return Ok(());
        };
        for (name, _) in self.iter() {
            if spec.arg(name).is_none() {
                return Err(TranslateError::UnknownSpecialArg {
                    name: name.to_owned(),
                    translator: key.to_string(),
                    accepted: spec.arg_names().map(str::to_owned).collect(),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for SpecialArgs {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Split an argument vector into the arguments clap should parse and the
/// collected special args.
///
/// Arguments are taken as `OsString` so paths that are not valid UTF-8 pass
/// through to clap untouched. Only special-arg names and values must be
/// UTF-8, since they end up in the JSON argument file. The first element
/// (program name) is passed through untouched.
///
/// # Errors
///
/// Returns [`TranslateError::MalformedSpecialArg`] for a flag with no value,
/// an empty name, non-UTF-8 text, or a separate value that looks like
/// another flag.
pub fn split_special_args<I>(argv: I) -> Result<(Vec<OsString>, SpecialArgs), TranslateError>
where
    I: IntoIterator<Item = OsString>,
{
    let mut rest = Vec::new();
    let mut special = SpecialArgs::new();
    let mut iter = argv.into_iter().peekable();
    let mut positional_only = false;

    while let Some(arg) = iter.next() {
        let is_special = !positional_only
            && arg
                .as_encoded_bytes()
                .starts_with(PREFIX.as_bytes());
        if !is_special {
            if arg == "--" {
                positional_only = true;
            }
            rest.push(arg);
            continue;
        }

        let flag = arg.into_string().map_err(|raw| TranslateError::MalformedSpecialArg {
            flag: raw.to_string_lossy().into_owned(),
            reason: "not valid UTF-8".to_owned(),
        })?;
        let body = &flag[PREFIX.len()..];
        let (name, value) = match body.split_once('=') {
            Some((name, value)) => (name.to_owned(), value.to_owned()),
            None => {
                let value = match iter.peek() {
                    Some(next) if !looks_like_flag(next) => iter.next(),
                    Some(next) => {
                        return Err(TranslateError::MalformedSpecialArg {
                            reason: format!(
                                "expected a value, found flag `{}`",
                                next.to_string_lossy()
                            ),
                            flag,
                        });
                    }
                    None => None,
                };
                let Some(value) = value else {
                    return Err(TranslateError::MalformedSpecialArg {
                        flag,
                        reason: "expected a value".to_owned(),
                    });
                };
                let value = value.into_string().map_err(|_| {
                    TranslateError::MalformedSpecialArg {
                        flag: flag.clone(),
                        reason: "value is not valid UTF-8".to_owned(),
                    }
                })?;
                (body.to_owned(), value)
            }
        };
        if name.is_empty() {
            return Err(TranslateError::MalformedSpecialArg {
                flag,
                reason: "empty argument name".to_owned(),
            });
        }
        special.insert(name, value);
    }

    Ok((rest, special))
}

/// A dash-prefixed token other than a lone `-` or a negative number.
fn looks_like_flag(arg: &OsStr) -> bool {
    let bytes = arg.as_encoded_bytes();
    match bytes {
        [b'-', tail @ ..] if !tail.is_empty() => !is_negative_number_tail(tail),
        _ => false,
    }
}

fn is_negative_number_tail(tail: &[u8]) -> bool {
    tail.iter().any(u8::is_ascii_digit)
        && tail.iter().all(|b| b.is_ascii_digit() || *b == b'.')
        && tail.iter().filter(|b| **b == b'.').count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn splits_equals_form() {
        let (rest, special) = split_special_args(argv(&[
            "dream",
            "translate",
            "--arg_name=my-pkg",
            "-t",
            "nodejs.pure.package-lock",
            "pkg.json",
        ]))
        .unwrap();
        assert_eq!(
            rest,
            argv(&["dream", "translate", "-t", "nodejs.pure.package-lock", "pkg.json"])
        );
        assert_eq!(special.get("name"), Some("my-pkg"));
        assert_eq!(special.len(), 1);
    }

    #[test]
    fn splits_separate_value_form() {
        let (rest, special) =
            split_special_args(argv(&["dream", "translate", "--arg_noDev", "true", "."])).unwrap();
        assert_eq!(rest, argv(&["dream", "translate", "."]));
        assert_eq!(special.get("noDev"), Some("true"));
    }

    #[test]
    fn value_may_contain_equals() {
        let (_, special) =
            split_special_args(argv(&["dream", "--arg_expr=a=b=c"])).unwrap();
        assert_eq!(special.get("expr"), Some("a=b=c"));
    }

    #[test]
    fn empty_value_is_allowed() {
        let (_, special) = split_special_args(argv(&["dream", "--arg_name="])).unwrap();
        assert_eq!(special.get("name"), Some(""));
    }

    #[test]
    fn last_occurrence_wins() {
        let (_, special) =
            split_special_args(argv(&["dream", "--arg_name=a", "--arg_name", "b"])).unwrap();
        assert_eq!(special.get("name"), Some("b"));
    }

    #[test]
    fn stops_at_double_dash() {
        let (rest, special) =
            split_special_args(argv(&["dream", "translate", "--", "--arg_x=1"])).unwrap();
        assert!(special.is_empty());
        assert_eq!(rest, argv(&["dream", "translate", "--", "--arg_x=1"]));
    }

    #[test]
    fn missing_value_is_rejected() {
        let err = split_special_args(argv(&["dream", "--arg_name"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = split_special_args(argv(&["dream", "--arg_name", "--combined"])).unwrap_err();
        assert!(err.to_string().contains("expected a value"));
    }

    #[test]
    fn short_flag_is_not_taken_as_value() {
        let err = split_special_args(argv(&["dream", "translate", "--arg_noDev", "-c", "pkgA.json"]))
            .unwrap_err();
        match err {
            TranslateError::MalformedSpecialArg { flag, reason } => {
                assert_eq!(flag, "--arg_noDev");
                assert!(reason.contains("`-c`"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_number_and_lone_dash_are_values() {
        let (_, special) =
            split_special_args(argv(&["dream", "--arg_depth", "-1", "--arg_src", "-"])).unwrap();
        assert_eq!(special.get("depth"), Some("-1"));
        assert_eq!(special.get("src"), Some("-"));

        let (_, special) = split_special_args(argv(&["dream", "--arg_ratio", "-0.5"])).unwrap();
        assert_eq!(special.get("ratio"), Some("-0.5"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_arguments_pass_through() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b"\xff.json".to_vec());
        let args = vec![OsString::from("dream"), OsString::from("translate"), raw.clone()];
        let (rest, special) = split_special_args(args.clone()).unwrap();
        assert_eq!(rest, args);
        assert!(special.is_empty());

        let err = split_special_args(vec![
            OsString::from("dream"),
            OsString::from("--arg_name"),
            raw,
        ])
        .unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = split_special_args(argv(&["dream", "--arg_=x"])).unwrap_err();
        assert!(err.to_string().contains("empty argument name"));
    }

    #[test]
    fn ordinary_flags_untouched() {
        let args = argv(&["dream", "translate", "--argument", "-c", "-o", "out", "in"]);
        let (rest, special) = split_special_args(args.clone()).unwrap();
        assert_eq!(rest, args);
        assert!(special.is_empty());
    }

    const CATALOG: &str = r#"{
      "nodejs": { "pure": { "package-lock": {
        "name": { "default": "", "examples": [] },
        "noDev": { "default": "false", "examples": [] }
      } } }
    }"#;

    #[test]
    fn validate_accepts_declared_names() {
        let catalog = TranslatorCatalog::parse(CATALOG).unwrap();
        let key = TranslatorKey::new("nodejs", "pure", "package-lock");
        let special: SpecialArgs = [("noDev".to_owned(), "true".to_owned())]
            .into_iter()
            .collect();
        special.validate_for(&catalog, &key).unwrap();
    }

    #[test]
    fn validate_rejects_undeclared_names() {
        let catalog = TranslatorCatalog::parse(CATALOG).unwrap();
        let key = TranslatorKey::new("nodejs", "pure", "package-lock");
        let mut special = SpecialArgs::new();
        special.insert("bogus", "1");
        let err = special.validate_for(&catalog, &key).unwrap_err();
        match err {
            TranslateError::UnknownSpecialArg { name, accepted, .. } => {
                assert_eq!(name, "bogus");
                assert_eq!(accepted, vec!["name", "noDev"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_skips_translators_missing_from_catalog() {
        let catalog = TranslatorCatalog::parse(CATALOG).unwrap();
        let key = TranslatorKey::new("python", "impure", "pip");
        let mut special = SpecialArgs::new();
        special.insert("anything", "1");
        special.validate_for(&catalog, &key).unwrap();
    }
}
