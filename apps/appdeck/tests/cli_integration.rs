#![warn(clippy::pedantic)]

//! Integration tests for the appdeck CLI.
//!
//! These tests spawn the compiled `appdeck` binary against a throwaway state
//! directory and validate its behavior through stdout, stderr and exit codes.
//!
//! ## Test Strategy
//!
//! 1. **Metadata**: help and version output
//! 2. **Error paths**: missing registry, repeated init, unsupported updates
//! 3. **Lifecycle**: init, install from a local file, list, view, run,
//!    rename, uninstall and tidy-broken
//!
//! ## Test Infrastructure
//!
//! - `APPDECK_CONFIG_DIR` points every run at a temporary state directory
//! - `APPDECK_DESKTOP_MENU=true` stands in for `xdg-desktop-menu`
//! - The bundle is a shell script that mimics `--appimage-extract`
//!
//! No test touches the network.

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serial_test::serial;
use std::os::unix::fs::PermissionsExt;
use std::process::Command;

const FAKE_BUNDLE: &str = r#"#!/bin/sh
if [ "$1" = "--appimage-extract" ]; then
  mkdir -p squashfs-root
  printf '[Desktop Entry]\nType=Application\nName=Demo\nExec=demo %%U\nIcon=demo\n' > squashfs-root/demo.desktop
  printf 'PNG' > squashfs-root/.DirIcon
  exit 0
fi
if [ "$1" = "--fail" ]; then
  exit 7
fi
echo "demo ran with: $*"
"#;

/// A sandbox with its own state, apps, desktop and symlink directories.
struct Sandbox {
    root: assert_fs::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            root: assert_fs::TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.root.path().join(name)
    }

    fn appdeck(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("appdeck"));
        cmd.env("APPDECK_CONFIG_DIR", self.path("state"))
            .env("APPDECK_DESKTOP_MENU", "true")
            .env_remove("APPDECK_LOG");
        cmd
    }

    fn init(&self) {
        self.appdeck()
            .arg("init")
            .arg("--apps-dir")
            .arg(self.path("apps"))
            .arg("--desktop-dir")
            .arg(self.path("desktop"))
            .arg("--symlinks-dir")
            .arg(self.path("bin"))
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration written to"));
    }

    fn bundle(&self) -> std::path::PathBuf {
        let file = self.root.child("Demo-x86_64.AppImage");
        file.write_str(FAKE_BUNDLE).unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        file.path().to_path_buf()
    }

    fn install_demo(&self) {
        let bundle = self.bundle();
        self.appdeck()
            .args(["install", "local"])
            .arg(&bundle)
            .args(["--id", "demo", "--version", "1.0", "--link", "-y"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed 1 app(s)."));
    }
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn help_lists_subcommands() {
    Command::new(assert_cmd::cargo::cargo_bin!("appdeck"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tidy-broken"))
        .stdout(predicate::str::contains("app-config"))
        .stdout(predicate::str::contains("APPDECK_CONFIG_DIR"));
}

#[test]
fn version_is_printed() {
    Command::new(assert_cmd::cargo::cargo_bin!("appdeck"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Error Paths
// =============================================================================

#[test]
fn list_without_config_asks_for_init() {
    let sandbox = Sandbox::new();
    sandbox
        .appdeck()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("appdeck init"));
}

#[test]
fn init_refuses_to_overwrite() {
    let sandbox = Sandbox::new();
    sandbox.init();

    sandbox
        .appdeck()
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--overwrite"));
}

#[test]
fn view_unknown_app_fails() {
    let sandbox = Sandbox::new();
    sandbox.init();

    sandbox
        .appdeck()
        .args(["view", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost is not installed"));
}

#[test]
fn install_tagged_without_tag_fails() {
    let sandbox = Sandbox::new();
    sandbox.init();

    sandbox
        .appdeck()
        .args(["install", "github", "owner/repo", "--release", "tagged", "-y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires --tag"));
}

#[test]
fn update_needs_ids_or_all() {
    Command::new(assert_cmd::cargo::cargo_bin!("appdeck"))
        .arg("update")
        .assert()
        .failure();
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
#[serial]
fn install_then_inspect() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.install_demo();

    assert!(sandbox.path("apps/demo/demo.AppImage").is_file());
    assert!(sandbox.path("apps/demo/demo.png").is_file());
    assert!(sandbox.path("apps/demo/app.json").is_file());
    assert!(sandbox.path("apps/demo/source.json").is_file());
    assert!(sandbox.path("bin/demo").is_symlink());

    let desktop = std::fs::read_to_string(sandbox.path("desktop/demo.desktop")).unwrap();
    assert!(desktop.contains("APPIMAGELAUNCHER_DISABLE=1"));
    assert!(desktop.contains("demo.png"));

    sandbox
        .appdeck()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"));

    sandbox
        .appdeck()
        .args(["view", "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0"))
        .stdout(predicate::str::contains("local"));

    sandbox
        .appdeck()
        .arg("tidy-broken")
        .arg("-y")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to clean."));
}

#[test]
#[serial]
fn local_installs_cannot_update() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.install_demo();

    sandbox
        .appdeck()
        .args(["update", "demo", "-y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "local source does not support updates",
        ));

    sandbox
        .appdeck()
        .args(["update", "--all", "-y"])
        .assert()
        .success();
}

#[test]
#[serial]
fn run_forwards_arguments_and_exit_code() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.install_demo();

    sandbox
        .appdeck()
        .args(["run", "demo", "--", "a", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo ran with: a b"));

    sandbox
        .appdeck()
        .args(["run", "demo", "--", "--fail"])
        .assert()
        .code(7);
}

#[test]
#[serial]
fn rename_then_uninstall() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.install_demo();

    sandbox
        .appdeck()
        .args(["app-config", "set-id", "demo", "demo2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renamed demo to demo2."));

    assert!(sandbox.path("apps/demo2/demo2.AppImage").is_file());
    assert!(sandbox.path("desktop/demo2.desktop").is_file());
    assert!(!sandbox.path("desktop/demo.desktop").exists());
    assert!(sandbox.path("bin/demo2").is_symlink());
    assert!(!sandbox.path("bin/demo").exists());

    sandbox
        .appdeck()
        .args(["uninstall", "demo2", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled demo2."));

    assert!(!sandbox.path("apps/demo2").exists());
    assert!(!sandbox.path("desktop/demo2.desktop").exists());
    sandbox
        .appdeck()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No applications are installed."));
}
