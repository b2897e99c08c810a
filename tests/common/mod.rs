//! Shared test helpers for dream integration tests.
//!
//! All tests use temp directories. The build engine is replaced by a shell
//! script (`fake_builder`) that plays oracle, translator builder, and
//! fixed-output build, recording what it was given under `$FAKE_RECORD`.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

pub const CATALOG: &str = r#"{
  "nodejs": {
    "pure": {
      "package-lock": {
        "name": { "default": "{automatic}", "examples": ["my-package"] },
        "noDev": { "default": "false", "examples": ["true", "false"] }
      },
      "yarn-lock": {}
    }
  },
  "python": {
    "impure": {
      "pip": {}
    }
  }
}"#;

/// What the fake translator writes: two sources, each with its own hash.
pub const PER_SOURCE_LOCK: &str = r#"{
  "generic": {
    "buildSystem": "nodejs",
    "mainPackageName": "pkgA",
    "sourcesCombinedHash": null
  },
  "sources": {
    "left-pad#1.3.0": { "type": "fetchurl", "url": "https://registry/left-pad-1.3.0.tgz", "hash": "sha256-LEFTPAD=" },
    "is-odd#3.0.1": { "type": "fetchurl", "url": "https://registry/is-odd-3.0.1.tgz", "hash": "sha256-ISODD=" }
  }
}"#;

pub const COMBINED_HASH: &str = "sha256-combinedXYZ==";

/// Stand-in for the build engine.
///
/// - `eval`: copies `$FUNC_ARGS` to `$FAKE_RECORD/oracle-request.json` and
///   prints the oracle answer (fails when `$FAKE_ORACLE_FAIL` is set)
/// - `build -o <link>`: writes a translator and links it at `<link>`
///   (fails when `$FAKE_BUILD_FAIL` is set)
/// - `build -L`: fails, reporting `FOD_PATH=` unless `$FAKE_NO_FOD` is set
///
/// The translator copies its argument file and argv into `$FAKE_RECORD`
/// and writes the lock to the `outputFile` it was given, unless
/// `$FAKE_TRANSLATOR_NOOP` is set.
pub fn fake_builder_script() -> String {
    format!(
        r##"#!/bin/sh
cmd="$1"
shift
case "$cmd" in
  eval)
    if [ -n "$FAKE_ORACLE_FAIL" ]; then
      echo "error: could not find a translator for the given inputs" >&2
      exit 1
    fi
    cp "$FUNC_ARGS" "$FAKE_RECORD/oracle-request.json"
    printf '%s' '{{"subsystem":"nodejs","type":"pure","name":"package-lock","SpecialArgsDefaults":{{"name":"default-name","noDev":"false"}}}}'
    ;;
  build)
    link=""
    combined=""
    while [ $# -gt 0 ]; do
      case "$1" in
        -o) link="$2"; shift ;;
        -L) combined=1 ;;
      esac
      shift
    done
    if [ -n "$combined" ]; then
      echo "fetch-sources> building combined sources" >&2
      if [ -z "$FAKE_NO_FOD" ]; then
        echo "fetch-sources> FOD_PATH={hash}" >&2
      fi
      echo "error: hash mismatch in fixed-output derivation" >&2
      exit 1
    fi
    if [ -n "$FAKE_BUILD_FAIL" ]; then
      echo "error: attribute 'package-lock' missing" >&2
      exit 1
    fi
    mkdir -p "$FAKE_RECORD/translator/bin"
    cat > "$FAKE_RECORD/translator/bin/translate" <<'TRANSLATOR'
#!/bin/sh
cp "$1" "$FAKE_RECORD/translator-args.json"
echo "$@" > "$FAKE_RECORD/translator-argv.txt"
if [ -n "$FAKE_TRANSLATOR_NOOP" ]; then
  exit 0
fi
out=$(sed -n 's/.*"outputFile": "\([^"]*\)".*/\1/p' "$1")
cat > "$out" <<'LOCK'
{lock}
LOCK
TRANSLATOR
    chmod +x "$FAKE_RECORD/translator/bin/translate"
    ln -s "$FAKE_RECORD/translator" "$link"
    ;;
  *)
    echo "unexpected subcommand $cmd" >&2
    exit 2
    ;;
esac
"##,
        hash = COMBINED_HASH,
        lock = PER_SOURCE_LOCK,
    )
}

/// A scratch environment: catalog, fake builder, record dir, work dir.
pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        for dir in ["record", "work", "bin"] {
            std::fs::create_dir(root.path().join(dir)).unwrap();
        }
        std::fs::write(root.path().join("translators.json"), CATALOG).unwrap();
        let builder = root.path().join("bin").join("fake-nix");
        std::fs::write(&builder, fake_builder_script()).unwrap();
        std::fs::set_permissions(&builder, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(root.path().join("work").join("pkgA.json"), "{}").unwrap();
        Self { root }
    }

    pub fn record(&self) -> PathBuf {
        self.root.path().join("record")
    }

    pub fn work(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn builder(&self) -> PathBuf {
        self.root.path().join("bin").join("fake-nix")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.path().join("translators.json")
    }

    /// `dream` with the fixture's environment, run in the work dir.
    pub fn dream(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_dream"));
        cmd.current_dir(self.work())
            .env("DREAM_TRANSLATORS_FILE", self.catalog_path())
            .env("DREAM_SRC", self.root.path().join("defs"))
            .env("DREAM_BUILDER", self.builder())
            .env("DREAM_CONFIG", self.root.path().join("dream.toml"))
            .env("FAKE_RECORD", self.record())
            .env_remove("FAKE_ORACLE_FAIL")
            .env_remove("FAKE_BUILD_FAIL")
            .env_remove("FAKE_NO_FOD")
            .env_remove("FAKE_TRANSLATOR_NOOP")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn read_record_json(&self, name: &str) -> serde_json::Value {
        let text = std::fs::read_to_string(self.record().join(name))
            .unwrap_or_else(|e| panic!("missing record {name}: {e}"));
        serde_json::from_str(&text).unwrap()
    }
}

pub fn run(mut cmd: Command, args: &[&str]) -> Output {
    cmd.args(args).output().expect("failed to execute dream")
}

/// Run and assert success. Returns stdout.
pub fn run_ok(cmd: Command, args: &[&str]) -> String {
    let out = run(cmd, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "dream {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run and assert exit status 1. Returns stderr.
pub fn run_fails(cmd: Command, args: &[&str]) -> String {
    let out = run(cmd, args);
    assert_eq!(
        out.status.code(),
        Some(1),
        "Expected dream {} to exit 1.\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}

pub fn read_lock(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
