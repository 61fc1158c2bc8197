use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const OVERRIDE_VARS: [&str; 9] = [
    "DATA_PATH",
    "CONFIGURATION_PATH",
    "ENVIRONMENT",
    "APP_ENV",
    "AUTH_ENABLED",
    "IAM_ADDRESS",
    "IAM_APP_SECRET",
    "SERVER_PORT",
    "RUST_LOG",
];

/// Command with a clean environment, run from `dir`
fn cmdbauth(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cmdbauth").unwrap();
    cmd.current_dir(dir);
    for name in OVERRIDE_VARS {
        cmd.env_remove(name);
    }
    cmd
}

/// Helper function to create a deployment directory with a dev configuration
fn create_mock_deployment() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::create_dir(root.join("config")).unwrap();
    fs::create_dir(root.join("data")).unwrap();

    fs::write(
        root.join("config").join("config.auth.dev.yaml"),
        r#"server: { host: 127.0.0.1, port: 39999 }
database: { path: data/test-auth.db }
auth:
  enabled: true
  app_code: bk_cmdb
  app_secret: "do-not-print"
  iam_address: http://iam.example:5001
  request_timeout_secs: 3
"#,
    )
    .unwrap();

    temp_dir
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    cmdbauth(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("CMDB auth CLI"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("policy"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    cmdbauth(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cmdbauth"));
}

#[test]
fn test_config_show_text() {
    let deployment = create_mock_deployment();

    cmdbauth(deployment.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CMDB Auth Configuration"))
        .stdout(predicate::str::contains("http://iam.example:5001"))
        .stdout(predicate::str::contains("test-auth.db"))
        .stdout(predicate::str::contains("<set>"))
        .stdout(predicate::str::contains("do-not-print").not());
}

#[test]
fn test_config_show_json_hides_secret() {
    let deployment = create_mock_deployment();

    cmdbauth(deployment.path())
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"environment\": \"dev\""))
        .stdout(predicate::str::contains("39999"))
        .stdout(predicate::str::contains("do-not-print").not());
}

#[test]
fn test_config_show_defaults_without_file() {
    let dir = TempDir::new().unwrap();

    cmdbauth(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defaults"))
        .stdout(predicate::str::contains("http://127.0.0.1:5001"));
}

#[test]
fn test_env_overrides() {
    let deployment = create_mock_deployment();

    cmdbauth(deployment.path())
        .env("IAM_ADDRESS", "http://override:7001")
        .env("AUTH_ENABLED", "false")
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://override:7001"))
        .stdout(predicate::str::contains("\"enabled\": false"));
}

#[test]
fn test_invalid_port_override_fails() {
    let deployment = create_mock_deployment();

    cmdbauth(deployment.path())
        .env("SERVER_PORT", "not-a-port")
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SERVER_PORT"));
}

#[test]
fn test_cli_from_subdirectory() {
    let deployment = create_mock_deployment();
    let subdir = deployment.path().join("data").join("nested");
    fs::create_dir_all(&subdir).unwrap();

    // The deployment root is found from a subdirectory
    cmdbauth(&subdir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://iam.example:5001"));
}

#[test]
fn test_health_command_json() {
    let deployment = create_mock_deployment();

    cmdbauth(deployment.path())
        .args(["health", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"components\""))
        .stdout(predicate::str::contains("\"not_initialized\""))
        .stdout(predicate::str::contains("\"offline\""));
}

#[test]
fn test_health_command_text() {
    let deployment = create_mock_deployment();

    cmdbauth(deployment.path())
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("CMDB Auth Health Check"))
        .stdout(predicate::str::contains("Overall Status"));
}

#[test]
fn test_seed_then_health_reports_database() {
    let deployment = create_mock_deployment();
    let seed = deployment.path().join("seed.json");
    fs::write(
        &seed,
        r#"{"cc_ApplicationBase": [{"bk_biz_id": 3, "bk_biz_name": "blueking"}]}"#,
    )
    .unwrap();

    cmdbauth(deployment.path())
        .args(["seed", seed.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 1 documents"));

    assert!(deployment.path().join("data").join("test-auth.db").exists());

    cmdbauth(deployment.path())
        .args(["health", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Database file exists and is accessible",
        ));
}

#[test]
fn test_policy_compile_leaf() {
    let dir = TempDir::new().unwrap();

    cmdbauth(dir.path())
        .args([
            "policy",
            "compile",
            "--type",
            "host",
            r#"{"op": "eq", "field": "host.id", "value": "42"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"bk_host_id\""))
        .stdout(predicate::str::contains("\"$eq\": \"42\""));
}

#[test]
fn test_policy_compile_other_type_is_null() {
    let dir = TempDir::new().unwrap();

    cmdbauth(dir.path())
        .args([
            "policy",
            "compile",
            "--type",
            "biz",
            r#"{"op": "eq", "field": "host.id", "value": "42"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("null\n"));
}

#[test]
fn test_policy_compile_host_path_with_seed() {
    let dir = TempDir::new().unwrap();
    let seed = dir.path().join("relations.json");
    fs::write(
        &seed,
        r#"{"cc_ModuleHostConfig": [
            {"bk_biz_id": 3, "bk_module_id": 10, "bk_host_id": 7},
            {"bk_biz_id": 4, "bk_module_id": 11, "bk_host_id": 8}
        ]}"#,
    )
    .unwrap();
    let policy = dir.path().join("policy.json");
    fs::write(
        &policy,
        r#"{"op": "starts_with", "field": "host._bk_iam_path_", "value": "/biz,3/"}"#,
    )
    .unwrap();

    cmdbauth(dir.path())
        .args([
            "policy",
            "compile",
            "--type",
            "host",
            &format!("@{}", policy.display()),
            "--seed",
            seed.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"$in\""))
        .stdout(predicate::str::contains("7"))
        .stdout(predicate::str::contains("8").not());
}

#[test]
fn test_policy_compile_rejects_mixed_in_values() {
    let dir = TempDir::new().unwrap();

    cmdbauth(dir.path())
        .args([
            "policy",
            "compile",
            "--type",
            "host",
            r#"{"op": "in", "field": "host.id", "value": ["a", 1, true]}"#,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("type"));
}

#[test]
fn test_subcommand_help() {
    let dir = TempDir::new().unwrap();

    cmdbauth(dir.path())
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration management"));

    cmdbauth(dir.path())
        .args(["policy", "compile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("@path"));
}

#[test]
fn test_iam_commands_with_auth_disabled() {
    let deployment = create_mock_deployment();

    for action in ["register", "sync", "status"] {
        cmdbauth(deployment.path())
            .env("AUTH_ENABLED", "false")
            .args(["iam", action])
            .assert()
            .success()
            .stdout(predicate::str::contains("Authorization is disabled"));
    }
}

#[test]
fn test_iam_status_unreachable_authority() {
    let deployment = create_mock_deployment();

    cmdbauth(deployment.path())
        .env("IAM_ADDRESS", "http://127.0.0.1:1")
        .args(["iam", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to query the policy authority"));
}
