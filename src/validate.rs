//! Input path validation.

use std::path::{Path, PathBuf};

use crate::error::TranslateError;

/// Inputs partitioned by filesystem type, each in caller order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputPaths {
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
}

/// Check that every input exists and split them into files and directories.
///
/// Fails on the first missing path. Paths that exist but are neither a
/// regular file nor a directory (sockets, fifos) land in neither list.
///
/// # Errors
///
/// Returns [`TranslateError::InputNotFound`] for the first missing path.
pub fn validate_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<InputPaths, TranslateError> {
    let mut partitioned = InputPaths::default();
    for input in inputs {
        let path = input.as_ref();
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TranslateError::InputNotFound {
                    path: path.to_owned(),
                });
            }
            Err(e) => {
                return Err(TranslateError::io(
                    format!("inspect input {}", path.display()),
                    e,
                ));
            }
        };
        if meta.is_file() {
            partitioned.files.push(path.to_owned());
        } else if meta.is_dir() {
            partitioned.directories.push(path.to_owned());
        }
    }
    Ok(partitioned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn partitions_preserving_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("sub");
        let c = dir.path().join("c.json");
        let d = dir.path().join("other");
        std::fs::write(&a, "{}").unwrap();
        std::fs::create_dir(&b).unwrap();
        std::fs::write(&c, "{}").unwrap();
        std::fs::create_dir(&d).unwrap();

        let got = validate_inputs(&[&c, &b, &a, &d]).unwrap();
        assert_eq!(got.files, vec![c, a]);
        assert_eq!(got.directories, vec![b, d]);
    }

    #[test]
    fn missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        std::fs::write(&a, "{}").unwrap();
        let missing = dir.path().join("nope.json");

        let err = validate_inputs(&[&a, &missing]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn empty_input_is_empty_partition() {
        let got = validate_inputs::<PathBuf>(&[]).unwrap();
        assert_eq!(got, InputPaths::default());
    }
}
