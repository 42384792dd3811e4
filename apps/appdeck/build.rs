//! Build script for the appdeck CLI.
//!
//! Exposes `APPDECK_BUILD_INFO` for the long `--version` output: the described git
//! revision (marked `-dirty` for uncommitted changes) and the target triple.

use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown-target".to_string());

    let revision = git(&manifest_dir, &["describe", "--always", "--dirty", "--abbrev=10"])
        .unwrap_or_else(|| "no-git".to_string());
    println!("cargo:rustc-env=APPDECK_BUILD_INFO={revision}, {target}");

    if let Some(git_dir) = git(&manifest_dir, &["rev-parse", "--absolute-git-dir"]) {
        for tracked in ["HEAD", "index", "refs"] {
            println!("cargo:rerun-if-changed={git_dir}/{tracked}");
        }
    }
    println!("cargo:rerun-if-changed=build.rs");
}

/// Trimmed stdout of a successful, non-empty `git` invocation in `dir`.
fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git").current_dir(dir).args(args).output().ok()?;
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (output.status.success() && !text.is_empty()).then(|| text.to_string())
}
