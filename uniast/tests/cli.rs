//! End-to-end CLI tests (spec §7 "User-visible failure: CLI exit codes: 0
//! success, non-zero on fatal only"). These only exercise paths that fail
//! during workspace discovery, before any language server would be spawned,
//! so they run without `rust-analyzer`/`jdtls`/etc. installed.

use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn missing_manifest_is_a_fatal_boot_error() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("uniast-collect").unwrap();
    cmd.arg(dir.path()).arg("--lang").arg("rust");
    cmd.assert().failure().stderr(contains("Cargo.toml"));
}

#[test]
fn unknown_language_is_rejected_by_the_cli_parser() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("uniast-collect").unwrap();
    cmd.arg(dir.path()).arg("--lang").arg("cobol");
    cmd.assert().failure();
}

#[test]
fn help_exits_successfully() {
    let mut cmd = Command::cargo_bin("uniast-collect").unwrap();
    cmd.arg("--help");
    cmd.assert().success().stdout(contains("uniast-collect"));
}

#[test]
fn go_bypasses_lsp_but_still_needs_a_go_mod() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("uniast-collect").unwrap();
    cmd.arg(dir.path()).arg("--lang").arg("go");
    cmd.assert().failure().stderr(contains("go.mod"));
}
