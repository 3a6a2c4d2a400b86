// file: tests/integration_test.rs
// version: 1.1.0
// guid: 4e61c8a9-0b27-4df3-86e5-19a3d7f40c82

//! End-to-end tests driving the real binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fresh command with a hermetic environment
fn runstage() -> Command {
    let mut cmd = Command::cargo_bin("runstage").unwrap();
    cmd.env_remove("RUNSTAGE_CONFIG");
    cmd
}

/// Find the single run file in `dir` whose name ends with `suffix`
fn find_run_file(dir: &Path, suffix: &str) -> PathBuf {
    std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", dir.display(), e))
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().ends_with(suffix))
                .unwrap_or(false)
        })
        .unwrap_or_else(|| panic!("no *{} file under {}", suffix, dir.display()))
}

/// The persistent workspace directory created for a run, if any
fn find_workspace_dir(log_dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(log_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .map(|name| name.to_string_lossy().ends_with("-workspace"))
                    .unwrap_or(false)
        })
}

#[test]
fn test_child_exit_code_is_propagated() {
    let temp_dir = TempDir::new().unwrap();

    runstage()
        .args(["--log-dir"])
        .arg(temp_dir.path().join("logs"))
        .args(["--no-persist", "--", "sh", "-c", "exit 7"])
        .assert()
        .code(7);
}

#[test]
fn test_echo_hello_end_to_end() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let log_dir = temp_dir.path().join("logs");
    let artifacts = temp_dir.path().join("artifacts");

    runstage()
        .arg("--log-dir")
        .arg(&log_dir)
        .arg("--artifacts-dir")
        .arg(&artifacts)
        .args(["--artifacts", "out.txt", "--no-persist", "--", "echo", "hello"])
        .assert()
        .success()
        .stderr(predicate::str::contains("matched nothing"));

    let stdout_log = find_run_file(&log_dir, ".stdout.log");
    assert_eq!(std::fs::read(&stdout_log)?, b"hello\n");

    let event_log = find_run_file(&log_dir, ".json");
    let event_log = event_log.with_extension("").with_extension("log");
    let content = std::fs::read_to_string(&event_log)?;
    assert!(content.contains("WARNING: artifact pattern 'out.txt' matched nothing"));
    assert!(content.contains("Command succeeded (exit code 0)"));

    // Staging works entirely inside the temp dir, never in the cwd
    assert!(artifacts.is_dir());

    Ok(())
}

#[test]
fn test_streams_are_captured_byte_for_byte() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");

    runstage()
        .arg("--log-dir")
        .arg(&log_dir)
        .args([
            "--no-persist",
            "--",
            "sh",
            "-c",
            r#"printf 'out1'; printf 'err1' >&2; printf 'out2'"#,
        ])
        .assert()
        .success();

    let stdout_log = find_run_file(&log_dir, ".stdout.log");
    let stderr_log = find_run_file(&log_dir, ".stderr.log");
    assert_eq!(std::fs::read(&stdout_log).unwrap(), b"out1out2");
    assert_eq!(std::fs::read(&stderr_log).unwrap(), b"err1");
}

#[test]
fn test_no_persist_removes_the_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");

    runstage()
        .arg("--log-dir")
        .arg(&log_dir)
        .args(["--no-persist", "--", "sh", "-c", "echo scratch > file.txt; pwd"])
        .assert()
        .success();

    let stdout_log = find_run_file(&log_dir, ".stdout.log");
    let workspace = std::fs::read_to_string(&stdout_log).unwrap();
    assert!(!Path::new(workspace.trim()).exists());
    assert!(find_workspace_dir(&log_dir).is_none());
}

#[test]
fn test_workspace_persists_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");

    runstage()
        .arg("--log-dir")
        .arg(&log_dir)
        .args(["--", "sh", "-c", "echo kept > produced.txt"])
        .assert()
        .success();

    let workspace = find_workspace_dir(&log_dir).expect("workspace directory should survive");
    assert_eq!(
        std::fs::read_to_string(workspace.join("produced.txt")).unwrap(),
        "kept\n"
    );
}

#[test]
fn test_copied_artifacts_are_independent_of_the_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("ws");
    let artifacts = temp_dir.path().join("artifacts");

    runstage()
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .arg("--workspace")
        .arg(&workspace)
        .arg("--artifacts-dir")
        .arg(&artifacts)
        .args(["--artifacts", "out.txt", "--", "sh", "-c", "echo v1 > out.txt"])
        .assert()
        .success();

    let staged = artifacts.join("out.txt");
    assert_eq!(std::fs::read_to_string(&staged).unwrap(), "v1\n");

    // Mutating the staged copy leaves the workspace original untouched
    std::fs::write(&staged, "mutated\n").unwrap();
    assert_eq!(
        std::fs::read_to_string(workspace.join("out.txt")).unwrap(),
        "v1\n"
    );
}

#[cfg(unix)]
#[test]
fn test_symlinked_artifacts_resolve_into_the_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("ws");
    let artifacts = temp_dir.path().join("artifacts");

    runstage()
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .arg("--workspace")
        .arg(&workspace)
        .arg("--artifacts-dir")
        .arg(&artifacts)
        .args([
            "--symlink-to-artifacts",
            "--artifacts",
            "out.txt",
            "--",
            "sh",
            "-c",
            "echo linked > out.txt",
        ])
        .assert()
        .success();

    let staged = artifacts.join("out.txt");
    let metadata = std::fs::symlink_metadata(&staged).unwrap();
    assert!(metadata.file_type().is_symlink());
    let target = std::fs::read_link(&staged).unwrap();
    assert!(target.ends_with("ws/out.txt"));
    assert_eq!(std::fs::read_to_string(&staged).unwrap(), "linked\n");
}

#[test]
fn test_artifacts_staged_even_when_the_command_fails() {
    let temp_dir = TempDir::new().unwrap();
    let artifacts = temp_dir.path().join("artifacts");

    runstage()
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .arg("--artifacts-dir")
        .arg(&artifacts)
        .args([
            "--artifacts",
            "partial.txt",
            "--no-persist",
            "--",
            "sh",
            "-c",
            "echo partial > partial.txt; exit 3",
        ])
        .assert()
        .code(3);

    assert_eq!(
        std::fs::read_to_string(artifacts.join("partial.txt")).unwrap(),
        "partial\n"
    );
}

#[test]
fn test_strict_artifacts_fails_on_zero_matches() {
    let temp_dir = TempDir::new().unwrap();

    runstage()
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .arg("--artifacts-dir")
        .arg(temp_dir.path().join("artifacts"))
        .args([
            "--strict-artifacts",
            "--artifacts",
            "*.nope",
            "--no-persist",
            "--",
            "true",
        ])
        .assert()
        .code(1);
}

#[test]
fn test_timeout_exits_with_124() {
    let temp_dir = TempDir::new().unwrap();

    runstage()
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .args(["--timeout", "1", "--no-persist", "--", "sleep", "30"])
        .assert()
        .code(124);
}

#[test]
fn test_timeout_is_not_extended_by_background_children() {
    let temp_dir = TempDir::new().unwrap();

    // The backgrounded sleep inherits the output pipes; the run must
    // still end at the timeout, not when the sleep exits
    let started = std::time::Instant::now();
    runstage()
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .args([
            "--timeout",
            "1",
            "--no-persist",
            "--",
            "sh",
            "-c",
            "sleep 15 & wait",
        ])
        .assert()
        .code(124);
    assert!(started.elapsed() < std::time::Duration::from_secs(8));
}

#[test]
fn test_exit_is_not_delayed_by_background_children() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");

    let started = std::time::Instant::now();
    runstage()
        .arg("--log-dir")
        .arg(&log_dir)
        .args(["--no-persist", "--", "sh", "-c", "echo done; sleep 12 & exit 0"])
        .assert()
        .success();
    assert!(started.elapsed() < std::time::Duration::from_secs(8));

    let stdout_log = find_run_file(&log_dir, ".stdout.log");
    assert_eq!(std::fs::read(&stdout_log).unwrap(), b"done\n");
}

#[test]
fn test_missing_command_exits_with_127() {
    let temp_dir = TempDir::new().unwrap();

    runstage()
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .args(["--no-persist", "--", "definitely-not-a-command-xyzzy"])
        .assert()
        .code(127)
        .stderr(predicate::str::contains("definitely-not-a-command-xyzzy"));
}

#[test]
fn test_run_summary_reports_the_run() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let log_dir = temp_dir.path().join("logs");

    runstage()
        .arg("--log-dir")
        .arg(&log_dir)
        .arg("--artifacts-dir")
        .arg(temp_dir.path().join("artifacts"))
        .args([
            "--artifacts",
            "out.txt",
            "--no-persist",
            "--",
            "sh",
            "-c",
            "echo summary > out.txt",
        ])
        .assert()
        .success();

    let summary_path = find_run_file(&log_dir, ".json");
    let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?;

    assert_eq!(summary["status"], "succeeded");
    assert_eq!(summary["exit_code"], 0);
    assert_eq!(summary["workspace_persisted"], false);
    assert_eq!(summary["artifacts"][0]["source"], "out.txt");
    assert_eq!(summary["artifacts"][0]["mode"], "copy");
    assert_eq!(
        summary["artifacts"][0]["sha256"].as_str().map(str::len),
        Some(64)
    );

    Ok(())
}

#[test]
fn test_config_file_defaults_apply() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let log_dir = temp_dir.path().join("from-config");
    let config_path = temp_dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        "log_dir: \"${RUNSTAGE_TEST_LOG_DIR}\"\npersist_workspace: false\n",
    )?;

    runstage()
        .env("RUNSTAGE_TEST_LOG_DIR", &log_dir)
        .arg("--config")
        .arg(&config_path)
        .args(["--", "echo", "configured"])
        .assert()
        .success();

    let stdout_log = find_run_file(&log_dir, ".stdout.log");
    assert_eq!(std::fs::read(&stdout_log)?, b"configured\n");
    assert!(find_workspace_dir(&log_dir).is_none());

    Ok(())
}

#[test]
fn test_config_path_env_vars_are_expanded() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let log_dir = temp_dir.path().join("logs");
    std::fs::write(
        temp_dir.path().join("config.yaml"),
        "persist_workspace: false\n",
    )?;

    runstage()
        .env("RUNSTAGE_TEST_CONF_DIR", temp_dir.path())
        .env("RUNSTAGE_CONFIG", "${RUNSTAGE_TEST_CONF_DIR}/config.yaml")
        .arg("--log-dir")
        .arg(&log_dir)
        .args(["--", "echo", "expanded"])
        .assert()
        .success();

    let stdout_log = find_run_file(&log_dir, ".stdout.log");
    assert_eq!(std::fs::read(&stdout_log)?, b"expanded\n");
    // persist_workspace=false proves the file was found and read
    assert!(find_workspace_dir(&log_dir).is_none());

    Ok(())
}

#[test]
fn test_invalid_artifact_pattern_is_rejected_up_front() {
    let temp_dir = TempDir::new().unwrap();

    runstage()
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .args(["--artifacts", "../escape", "--no-persist", "--", "true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must not leave the workspace"));
}
