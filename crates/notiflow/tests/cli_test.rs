//! Integration tests for the `notiflow` CLI binary.
//!
//! These exercise argument parsing, config management and replay of
//! recorded callbacks, without touching the user's real configuration.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `notiflow` binary with env isolation.
///
/// Clears all `NOTIFLOW_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn notiflow_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("notiflow");
    cmd.env("HOME", "/tmp/notiflow-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/notiflow-cli-test-nonexistent")
        .env_remove("NOTIFLOW_CONFIG")
        .env_remove("NOTIFLOW_OUTPUT")
        .env_remove("NOTIFLOW_POLICY__EMIT_WITHOUT_KEYWORD_MATCH")
        .env_remove("NOTIFLOW_POLICY__EMIT_GROUP_SUMMARIES")
        .env_remove("NOTIFLOW_PIPELINE__BUS_CAPACITY")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const SESSION: &str = r#"
# recorded listener session
{"type":"connected"}
{"type":"posted","package_name":"com.eg.android.AlipayGphone","key":"0|pay|1","post_time":1700000000000,"extras":{"title":"支付宝","text":"你已成功收款 25.00 元"}}
{"type":"posted","package_name":"com.tencent.mm","key":"0|mm|2","extras":{"title":"微信支付","text":"收款到账"}}
{"type":"posted","package_name":"com.eg.android.AlipayGphone","key":"0|pay|3","flags":512,"extras":{"title":"支付宝","text":"2 条新消息"}}
{"type":"removed","key":"0|pay|1"}
{"type":"disconnected"}
"#;

fn replay_json(config: Option<&Path>, extra: &[&str]) -> serde_json::Value {
    let mut cmd = notiflow_cmd();
    if let Some(path) = config {
        cmd.arg("--config").arg(path);
    }
    let output = cmd
        .args(["replay", "-o", "json"])
        .args(extra)
        .write_stdin(SESSION)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = notiflow_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    notiflow_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("replay")
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    notiflow_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("notiflow"));
}

#[test]
fn test_completions_bash() {
    notiflow_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_invalid_output_format() {
    notiflow_cmd()
        .args(["replay", "-o", "xml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    notiflow_cmd()
        .args(["--config", "/tmp/somewhere/notiflow.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/somewhere/notiflow.toml"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    notiflow_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[policy]"), "unexpected file:\n{written}");
    assert!(written.contains("com.eg.android.AlipayGphone"));

    notiflow_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("--force"));

    notiflow_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_show_merges_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[reconnect]\nmax_attempts = 5\n").unwrap();

    let output = notiflow_cmd()
        .arg("--config")
        .arg(&path)
        .env("NOTIFLOW_POLICY__EMIT_GROUP_SUMMARIES", "true")
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let cfg: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cfg["reconnect"]["max_attempts"], 5);
    assert_eq!(cfg["reconnect"]["delay_secs"], 15);
    assert_eq!(cfg["policy"]["emit_group_summaries"], true);
}

#[test]
fn test_invalid_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[pipeline]\nbus_capacity = 0\n").unwrap();

    notiflow_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("bus_capacity"));
}

// ── Replay ──────────────────────────────────────────────────────────

#[test]
fn test_replay_reports_events_and_diagnostics() {
    let report = replay_json(None, &[]);

    assert_eq!(report["records"], 6);
    let events = report["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_key"], "0|pay|1");
    assert_eq!(events[0]["body"], "你已成功收款 25.00 元");

    let diag = &report["diagnostics"];
    assert_eq!(diag["total_emitted"], 1);
    assert_eq!(diag["emitted_by_keyword"], 1);
    assert_eq!(diag["skipped_unsupported_package"], 1);
    assert_eq!(diag["skipped_group_summary"], 1);
    assert_eq!(diag["notifications_removed"], 1);
    assert_eq!(diag["connect_count"], 1);
    assert_eq!(diag["disconnect_count"], 1);
    assert_eq!(diag["connection"], "disconnected");
    assert_eq!(report["access_granted"], true);
}

#[test]
fn test_replay_uses_policy_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[policy]\nemit_group_summaries = true\n").unwrap();

    let report = replay_json(Some(&path), &[]);
    assert_eq!(report["events"].as_array().unwrap().len(), 2);
    assert_eq!(report["diagnostics"]["skipped_group_summary"], 0);
}

#[test]
fn test_replay_with_access_denied() {
    let report = replay_json(None, &["--access-denied"]);
    assert_eq!(report["access_granted"], false);
    assert_eq!(report["reconnect_requests"], 0);
}

#[test]
fn test_replay_table_output() {
    notiflow_cmd()
        .args(["replay", "--color", "never"])
        .write_stdin(SESSION)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Accepted events (1)")
                .and(predicate::str::contains("0|pay|1"))
                .and(predicate::str::contains("Diagnostics")),
        );
}

#[test]
fn test_replay_invalid_record() {
    notiflow_cmd()
        .arg("replay")
        .write_stdin("{\"type\":\"connected\"}\nnot json\n")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_replay_missing_file() {
    notiflow_cmd()
        .args(["replay", "/tmp/notiflow-cli-test-nonexistent/session.jsonl"])
        .assert()
        .code(1);
}
