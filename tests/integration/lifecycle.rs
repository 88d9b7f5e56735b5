//! `launch` validation and the cluster lifecycle commands.
//!
//! Registered clusters point at pids that cannot exist, so `status`,
//! `stop` and `destroy` run against a cluster whose processes are gone.

use crate::common::TestEnv;
use predicates::prelude::*;
use serde_json::json;

const DEAD_PID: u32 = 4_000_000_000;

/// Register a stopped-behind-our-back local standalone named `name`.
fn register_local(env: &TestEnv, name: &str) -> std::path::PathBuf {
    let data_dir = env.path().join("data").join(name);
    let log_dir = env.path().join("logs").join(name);
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::create_dir_all(&log_dir).unwrap();
    std::fs::write(data_dir.join("WiredTiger"), "").unwrap();

    env.write_registry(&json!([{
        "id": format!("local-{name}-1718000000000"),
        "name": name,
        "spec": {
            "type": "local",
            "name": name,
            "mongoVersion": "7.0.14",
            "port": 27017,
            "topology": "standalone"
        },
        "connectionString": "mongodb://localhost:27017",
        "status": "READY",
        "createdAt": "2024-06-10T08:00:00Z",
        "lastUpdated": "2024-06-10T08:00:00Z",
        "processes": [{
            "pid": DEAD_PID,
            "port": 27017,
            "role": "mongod",
            "binary": "/nonexistent/mongod",
            "args": ["--port", "27017"],
            "logPath": log_dir.join("mongod.log")
        }],
        "metadata": {
            "mongoVersion": "7.0.14",
            "dataDir": data_dir,
            "logDir": log_dir
        }
    }]));
    data_dir
}

#[test]
fn test_list_empty() {
    let env = TestEnv::new();
    env.command().arg("list").assert().success().stdout(predicate::str::contains("No clusters found"));
    env.command().args(["list", "--format", "json"]).assert().success().stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_non_interactive_launch_requires_name() {
    let env = TestEnv::new();
    let output = env.run(&["launch", "--non-interactive"]);
    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("Cluster name is required"), "{}", output.stderr);
    assert!(output.stderr.contains("--name"), "{}", output.stderr);
}

#[test]
fn test_non_interactive_atlas_requires_project() {
    let env = TestEnv::new();
    let output = env.run(&["launch", "-t", "atlas", "-n", "prod", "--non-interactive"]);
    assert!(!output.success);
    assert!(output.stderr.contains("Atlas project ID is required"), "{}", output.stderr);
}

#[test]
fn test_interactive_mode_disabled_in_config() {
    let env = TestEnv::new();
    env.write_config(&json!({ "interactiveMode": false }));
    let output = env.run(&["launch"]);
    assert!(!output.success);
    assert!(output.stderr.contains("Cluster name is required"), "{}", output.stderr);
}

#[test]
fn test_missing_spec_file() {
    let env = TestEnv::new();
    let missing = env.path().join("missing.json");
    env.command()
        .args(["launch", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));
}

#[test]
fn test_invalid_spec_file_is_rejected_before_launch() {
    let env = TestEnv::new();
    let spec = env.path().join("bad.json");
    std::fs::write(&spec, r#"{"type": "local", "name": "dev", "topology": "replica-set", "replicaSetSize": 0}"#).unwrap();

    let output = env.run(&["launch", spec.to_str().unwrap()]);
    assert!(!output.success);
    assert!(output.stderr.contains("Replica set size must be between"), "{}", output.stderr);
    assert!(!env.config_dir().join("clusters.json").exists());
}

#[test]
fn test_interactive_launch_can_be_cancelled() {
    let env = TestEnv::new();
    let output = env.run_with_stdin(
        &["launch", "-t", "local", "-n", "dev", "--mongo-version", "7.0", "--port", "28017", "--topology", "standalone"],
        "\nn\n",
    );
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("Cluster Configuration Summary:"));
    assert!(output.stdout.contains("Cluster creation cancelled."));
    assert!(!env.config_dir().join("clusters.json").exists());
}

#[test]
fn test_launch_rejects_duplicate_name() {
    let env = TestEnv::new();
    register_local(&env, "dev");
    let output = env.run(&["launch", "-n", "dev", "--non-interactive"]);
    assert!(!output.success);
    assert!(output.stderr.contains("A cluster named 'dev' already exists"), "{}", output.stderr);
}

#[test]
fn test_unknown_cluster() {
    let env = TestEnv::new();
    for args in [&["status", "ghost"][..], &["start", "ghost"][..], &["stop", "ghost"][..], &["destroy", "ghost", "--force"][..]] {
        let output = env.run(args);
        assert!(!output.success, "{args:?} should fail");
        assert!(output.stderr.contains("Cluster 'ghost' not found"), "{args:?}: {}", output.stderr);
    }
}

#[test]
fn test_list_shows_registered_cluster() {
    let env = TestEnv::new();
    register_local(&env, "dev");

    let output = env.run(&["list"]);
    assert!(output.success);
    assert!(output.stdout.contains("NAME"));
    assert!(output.stdout.contains("dev"));
    assert!(output.stdout.contains("READY"));
    assert!(output.stdout.contains("local-dev-1718000000000"));

    let json = env.run(&["list", "--format", "json"]);
    let clusters: serde_json::Value = serde_json::from_str(&json.stdout).unwrap();
    assert_eq!(clusters[0]["name"], "dev");
}

#[test]
fn test_status_refreshes_dead_cluster() {
    let env = TestEnv::new();
    register_local(&env, "dev");

    let output = env.run(&["status", "dev"]);
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("STOPPED"));
    assert!(output.stdout.contains("mongodb://localhost:27017"));

    let registry = env.read_registry();
    assert_eq!(registry["clusters"][0]["status"], "STOPPED");
}

#[test]
fn test_stop_by_id() {
    let env = TestEnv::new();
    register_local(&env, "dev");

    env.command()
        .args(["stop", "local-dev-1718000000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped cluster 'dev'"));
    assert_eq!(env.read_registry()["clusters"][0]["status"], "STOPPED");
}

#[test]
fn test_destroy_requires_confirmation() {
    let env = TestEnv::new();
    let data_dir = register_local(&env, "dev");

    let output = env.run(&["destroy", "dev"]);
    assert!(output.success);
    assert!(output.stdout.contains("Destroy cancelled."));
    assert!(data_dir.exists());
    assert_eq!(env.read_registry()["clusters"].as_array().unwrap().len(), 1);
}

#[test]
fn test_destroy_removes_data_and_registration() {
    let env = TestEnv::new();
    let data_dir = register_local(&env, "dev");

    let output = env.run_with_stdin(&["destroy", "dev"], "y\n");
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("Destroyed cluster 'dev'"));
    assert!(!data_dir.exists());
    assert!(env.read_registry()["clusters"].as_array().unwrap().is_empty());

    env.command().arg("list").assert().success().stdout(predicate::str::contains("No clusters found"));
}

#[test]
fn test_destroy_force_skips_prompt() {
    let env = TestEnv::new();
    register_local(&env, "dev");

    env.command()
        .args(["destroy", "dev", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Destroyed cluster 'dev'"));
    assert!(env.read_registry()["clusters"].as_array().unwrap().is_empty());
}
