//! Version, help and global flag handling.

use crate::common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_version_flag_reports_package_version() {
    let env = TestEnv::new();
    env.command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mongo-launcher").and(predicate::str::contains(env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_version_matches_formula() {
    assert_eq!(env!("CARGO_PKG_VERSION"), "1.0.4");
}

#[test]
fn test_help_lists_commands() {
    let env = TestEnv::new();
    let output = env.run(&["--help"]);
    assert!(output.success);
    assert!(output.stdout.contains("MongoDB Cluster Management Tool"));
    for command in ["launch", "status", "start", "stop", "destroy", "list", "version", "config"] {
        assert!(output.stdout.contains(command), "missing {command} in:\n{}", output.stdout);
    }
}

#[test]
fn test_launch_help_lists_options() {
    let env = TestEnv::new();
    env.command()
        .args(["launch", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--type")
                .and(predicate::str::contains("--name"))
                .and(predicate::str::contains("--non-interactive"))
                .and(predicate::str::contains("SPEC_FILE")),
        );
}

#[test]
fn test_verbose_and_quiet_conflict() {
    let env = TestEnv::new();
    env.command().args(["-v", "-q", "list"]).assert().failure();
}

#[test]
fn test_unknown_command_fails() {
    let env = TestEnv::new();
    env.command().arg("deploy").assert().failure().stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_invalid_cluster_type_rejected() {
    let env = TestEnv::new();
    env.command().args(["launch", "--type", "cloud"]).assert().failure();
}

#[test]
fn test_verbose_logs_to_stderr_only() {
    let env = TestEnv::new();
    let output = env.run(&["--verbose", "list", "--format", "json"]);
    assert!(output.success, "{}", output.stderr);
    assert_eq!(output.stdout.trim(), "[]");
}
