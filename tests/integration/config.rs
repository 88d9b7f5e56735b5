//! The `config` command family.

use crate::common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_bare_config_prints_help_and_file() {
    let env = TestEnv::new();
    let output = env.run(&["config"]);
    assert!(output.success);
    assert!(output.stdout.contains("set <key> <value>"));
    assert!(output.stdout.contains(&format!(
        "Configuration file: {}",
        env.config_dir().join("config.json").display()
    )));
}

#[test]
fn test_set_then_get() {
    let env = TestEnv::new();

    env.command()
        .args(["config", "set", "defaultAtlasProjectId", "5f1a2b3c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defaultAtlasProjectId = 5f1a2b3c"));

    env.command()
        .args(["config", "get", "defaultatlasprojectid"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5f1a2b3c\n"));

    let saved = std::fs::read_to_string(env.config_dir().join("config.json")).unwrap();
    assert!(saved.contains("\"defaultAtlasProjectId\": \"5f1a2b3c\""));
}

#[test]
fn test_get_missing_key_fails() {
    let env = TestEnv::new();
    let output = env.run(&["config", "get", "doesNotExist"]);
    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("Configuration key 'doesNotExist' not found"), "{}", output.stderr);
}

#[test]
fn test_set_invalid_boolean_fails() {
    let env = TestEnv::new();
    let output = env.run(&["config", "set", "interactiveMode", "perhaps"]);
    assert!(!output.success);
    assert!(output.stderr.contains("interactiveMode"), "{}", output.stderr);
    assert!(!env.config_dir().join("config.json").exists());
}

#[test]
fn test_set_misspelled_key_is_kept_with_hint() {
    let env = TestEnv::new();
    let output = env.run(&["config", "set", "defaultRegoin", "EU_WEST_1"]);
    assert!(output.success, "{}", output.stderr);
    assert!(output.stderr.contains("Did you mean 'defaultRegion'"), "{}", output.stderr);

    env.command().args(["config", "get", "defaultRegoin"]).assert().success().stdout(predicate::str::diff("EU_WEST_1\n"));
    env.command().args(["config", "get", "defaultRegion"]).assert().success().stdout(predicate::str::diff("US_EAST_1\n"));
}

#[test]
fn test_show_masks_secret_and_lists_custom() {
    let env = TestEnv::new();
    env.run(&["config", "set", "atlasClientSecret", "my-very-secret-value"]);
    env.run(&["config", "set", "team", "platform"]);

    let output = env.run(&["config", "show"]);
    assert!(output.success);
    assert!(output.stdout.contains("MongoLauncher Configuration"));
    assert!(output.stdout.contains("****alue"));
    assert!(!output.stdout.contains("my-very-secret-value"));
    assert!(output.stdout.contains("team"));
    assert!(output.stdout.contains("platform"));
}

#[test]
fn test_unset() {
    let env = TestEnv::new();
    env.run(&["config", "set", "defaultMongoVersion", "8.0"]);

    env.command().args(["config", "unset", "defaultMongoVersion"]).assert().success();
    env.command().args(["config", "get", "defaultMongoVersion"]).assert().success().stdout(predicate::str::diff("7.0\n"));

    env.command().args(["config", "unset", "neverSet"]).assert().failure();
}

#[test]
fn test_reset_confirmation() {
    let env = TestEnv::new();
    env.run(&["config", "set", "defaultMongoVersion", "8.0"]);

    let declined = env.run_with_stdin(&["config", "reset"], "n\n");
    assert!(declined.success);
    assert!(declined.stdout.contains("Reset cancelled"));
    assert!(env.config_dir().join("config.json").exists());

    let accepted = env.run_with_stdin(&["config", "reset"], "y\n");
    assert!(accepted.success);
    assert!(accepted.stdout.contains("Configuration reset to defaults"));
    assert!(!env.config_dir().join("config.json").exists());
}

#[test]
fn test_reset_force() {
    let env = TestEnv::new();
    env.run(&["config", "set", "defaultMongoVersion", "8.0"]);
    env.command().args(["config", "reset", "--force"]).assert().success();
    env.command().args(["config", "get", "defaultMongoVersion"]).assert().success().stdout(predicate::str::diff("7.0\n"));
}

#[test]
fn test_config_path_and_dir_flag() {
    let env = TestEnv::new();
    env.command()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{}\n", env.config_dir().join("config.json").display())));

    let other = env.path().join("other-config");
    env.command()
        .args(["--config-dir", other.to_str().unwrap(), "config", "set", "defaultRegion", "EU_WEST_1"])
        .assert()
        .success();
    assert!(other.join("config.json").exists());
    assert!(!env.config_dir().join("config.json").exists());
}
