//! The `version` command family, against fake installs under `M_PREFIX`.

use crate::common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_bare_version_prints_help() {
    let env = TestEnv::new();
    env.command()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("MongoDB Version Manager").and(predicate::str::contains("available")));
}

#[test]
fn test_list_shows_fake_install() {
    let env = TestEnv::new();
    env.install_fake_version("7.0.14");
    env.install_fake_version("6.0.16");

    let output = env.run(&["version", "list"]);
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("Installed MongoDB versions:"));
    let newer = output.stdout.find("7.0.14").unwrap();
    let older = output.stdout.find("6.0.16").unwrap();
    assert!(newer < older, "versions should be listed newest first:\n{}", output.stdout);
}

#[test]
fn test_info_reports_primary_location() {
    let env = TestEnv::new();
    env.install_fake_version("7.0.14");

    let output = env.run(&["version", "info"]);
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("MongoDB Installation Information"));
    assert!(output.stdout.contains(&env.versions_dir().display().to_string()));
    assert!(output.stdout.contains("7.0.14"));
}

#[test]
fn test_install_existing_is_a_no_op() {
    let env = TestEnv::new();
    env.install_fake_version("7.0.14");

    env.command()
        .args(["version", "install", "7.0.14"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MongoDB 7.0.14 is already installed"));
}

#[test]
fn test_remove() {
    let env = TestEnv::new();
    let dir = env.install_fake_version("7.0.14");

    env.command()
        .args(["version", "remove", "7.0.14"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed MongoDB version 7.0.14"));
    assert!(!dir.exists());
}

#[test]
fn test_remove_not_installed() {
    let env = TestEnv::new();
    let output = env.run(&["version", "remove", "9.9.9"]);
    assert!(!output.success);
    assert!(output.stderr.contains("MongoDB version 9.9.9 is not installed"), "{}", output.stderr);
    assert!(output.stderr.contains("version list"), "{}", output.stderr);
}

#[test]
fn test_remove_invalid_version() {
    let env = TestEnv::new();
    let output = env.run(&["version", "remove", "seven"]);
    assert!(!output.success);
    assert!(output.stderr.contains("Invalid MongoDB version format: seven"), "{}", output.stderr);
}
