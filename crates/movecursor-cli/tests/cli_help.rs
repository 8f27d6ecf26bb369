use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("move-cursor")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("--no-horizontal"))
        .stdout(predicate::str::contains("--log-level"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("move-cursor")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("move-cursor")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}

#[test]
fn test_unknown_subcommand_fails() {
    cargo_bin_cmd!("move-cursor")
        .arg("scroll-everything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
