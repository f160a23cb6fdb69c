/// CLI integration tests for medremind.
///
/// Each test spawns the compiled binary via the `assert_cmd::cargo_bin_cmd!`
/// macro and sets `MEDREMIND_HOME` to a fresh `TempDir` so tests are fully
/// isolated from the developer's real `~/.medremind` data.
use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

// ── helpers ──────────────────────────────────────────────────────────────────

const BEFORE: &str = "2024-01-10T07:00:00+01:00";
const DOSE_TIME: &str = "2024-01-10T08:00:00+01:00";
const LATER: &str = "2024-01-10T08:05:00+01:00";

/// Returns a `Command` with `MEDREMIND_HOME` pointing at `dir`.
fn cmd_in(dir: &TempDir) -> assert_cmd::Command {
    let mut c = cargo_bin_cmd!("medremind");
    c.env("MEDREMIND_HOME", dir.path());
    c.env_remove("MEDREMIND_LOG");
    c
}

/// Parse stdout JSON and return the root `Value`.
fn parse_json(output: &assert_cmd::assert::Assert) -> Value {
    let bytes = output.get_output().stdout.clone();
    serde_json::from_slice(&bytes).expect("stdout is not valid JSON")
}

/// Parse stderr JSON and return the root `Value`.
fn parse_stderr_json(output: &assert_cmd::assert::Assert) -> Value {
    let bytes = output.get_output().stderr.clone();
    serde_json::from_slice(&bytes).expect("stderr is not valid JSON")
}

/// Add a daily 08:00 medication starting 2024-01-10; returns its id.
fn add_aspirin(dir: &TempDir) -> String {
    let assert = cmd_in(dir)
        .args([
            "med", "add", "Aspirin", "--times", "08:00", "--start", "2024-01-10", "--at", BEFORE,
        ])
        .assert()
        .success();
    let json = parse_json(&assert);
    json["data"]["medication"]["id"].as_str().unwrap().to_string()
}

fn scheduled_count(dir: &TempDir) -> u64 {
    let assert = cmd_in(dir).args(["scheduled"]).assert().success();
    parse_json(&assert)["data"]["count"].as_u64().unwrap()
}

// ── med ──────────────────────────────────────────────────────────────────────

#[test]
fn test_med_add_json_output() {
    let dir = TempDir::new().unwrap();
    let assert = cmd_in(&dir)
        .args([
            "med", "add", "Metformin", "--times", "20:00,08:00", "--at", BEFORE,
        ])
        .assert()
        .success();

    let json = parse_json(&assert);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["command"], "med_add");
    assert_eq!(json["data"]["medication"]["name"], "Metformin");
    assert_eq!(json["data"]["medication"]["times"][0], "08:00");
    assert_eq!(json["data"]["medication"]["startDate"], "2024-01-10");
    assert_eq!(scheduled_count(&dir), 2);
}

#[test]
fn test_med_add_interval() {
    let dir = TempDir::new().unwrap();
    let assert = cmd_in(&dir)
        .args(["med", "add", "Amoxicillin", "--every", "8", "--first", "06:00"])
        .assert()
        .success();
    let json = parse_json(&assert);
    assert_eq!(
        json["data"]["medication"]["times"],
        serde_json::json!(["06:00", "14:00", "22:00"])
    );
}

#[test]
fn test_med_add_invalid_time_is_json_error() {
    let dir = TempDir::new().unwrap();
    let assert = cmd_in(&dir)
        .args(["med", "add", "Bad", "--times", "24:00"])
        .assert()
        .failure();
    let json = parse_stderr_json(&assert);
    assert_eq!(json["status"], "error");
    assert_eq!(json["command"], "med_add");
    assert_eq!(json["error"]["code"], "invalid_time");
}

#[test]
fn test_med_list_human() {
    let dir = TempDir::new().unwrap();
    add_aspirin(&dir);
    cmd_in(&dir)
        .args(["med", "list", "--human"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Aspirin"))
        .stdout(predicate::str::contains("08:00"));
}

#[test]
fn test_med_remove_unknown() {
    let dir = TempDir::new().unwrap();
    let assert = cmd_in(&dir)
        .args(["med", "remove", "ghost"])
        .assert()
        .failure();
    let json = parse_stderr_json(&assert);
    assert_eq!(json["error"]["code"], "medication_not_found");
}

#[test]
fn test_med_remove_cancels_reminders() {
    let dir = TempDir::new().unwrap();
    add_aspirin(&dir);
    assert_eq!(scheduled_count(&dir), 1);
    cmd_in(&dir)
        .args(["med", "remove", "aspirin"])
        .assert()
        .success();
    assert_eq!(scheduled_count(&dir), 0);
}

#[test]
fn test_med_pause_and_unpause() {
    let dir = TempDir::new().unwrap();
    add_aspirin(&dir);

    let assert = cmd_in(&dir)
        .args(["med", "pause", "Aspirin", "--days", "3", "--at", BEFORE])
        .assert()
        .success();
    assert_eq!(
        parse_json(&assert)["data"]["medication"]["endDate"],
        "2024-01-13"
    );

    let assert = cmd_in(&dir)
        .args(["med", "unpause", "Aspirin", "--at", BEFORE])
        .assert()
        .success();
    assert!(parse_json(&assert)["data"]["medication"]["endDate"].is_null());
}

// ── escalation flow ──────────────────────────────────────────────────────────

#[test]
fn test_tick_press_take_flow() {
    let dir = TempDir::new().unwrap();
    let id = add_aspirin(&dir);

    // Nothing is due before 08:00.
    let assert = cmd_in(&dir).args(["tick", "--at", BEFORE]).assert().success();
    assert_eq!(parse_json(&assert)["data"]["fired"], serde_json::json!([]));

    let assert = cmd_in(&dir).args(["tick", "--at", DOSE_TIME]).assert().success();
    let json = parse_json(&assert);
    let fired = json["data"]["fired"].as_array().unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0]["dispatch"]["result"], "handled");
    assert_eq!(
        fired[0]["dispatch"]["outcome"]["outcome"],
        "escalation_started"
    );
    assert_eq!(scheduled_count(&dir), 4);

    let initial = format!("{id}__0800");
    let assert = cmd_in(&dir)
        .args(["press", &initial, "take", "--at", LATER])
        .assert()
        .success();
    let json = parse_json(&assert);
    assert_eq!(json["data"]["dispatch"]["outcome"]["outcome"], "taken");
    assert_eq!(json["data"]["dispatch"]["outcome"]["recorded"], true);
    assert_eq!(scheduled_count(&dir), 1);

    let assert = cmd_in(&dir)
        .args(["due", "--date", "2024-01-10"])
        .assert()
        .success();
    let json = parse_json(&assert);
    assert_eq!(json["data"]["due"][0]["slots"][0]["taken"], true);
    assert_eq!(json["data"]["events"].as_array().unwrap().len(), 1);
}

#[test]
fn test_press_snooze_replaces_chain() {
    let dir = TempDir::new().unwrap();
    let id = add_aspirin(&dir);
    cmd_in(&dir).args(["tick", "--at", DOSE_TIME]).assert().success();

    let initial = format!("{id}__0800");
    let assert = cmd_in(&dir)
        .args(["press", &initial, "snooze", "--at", LATER])
        .assert()
        .success();
    let json = parse_json(&assert);
    assert_eq!(json["data"]["dispatch"]["outcome"]["outcome"], "snoozed");
    // Daily initial plus the single snooze.
    assert_eq!(scheduled_count(&dir), 2);
}

#[test]
fn test_press_unknown_notification_fails() {
    let dir = TempDir::new().unwrap();
    cmd_in(&dir)
        .args(["press", "nope", "take"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not displayed"));
}

#[test]
fn test_med_take_on_rest_day_warns() {
    let dir = TempDir::new().unwrap();
    cmd_in(&dir)
        .args([
            "med", "add", "Cycle", "--times", "08:00", "--start", "2024-01-09", "--pause-days",
            "1", "--at", BEFORE,
        ])
        .assert()
        .success();

    let assert = cmd_in(&dir)
        .args(["med", "take", "Cycle", "08:00", "--at", LATER])
        .assert()
        .success();
    let json = parse_json(&assert);
    assert_eq!(json["data"]["outcome"]["outcome"], "not_due");
    assert!(
        json["data"]["warning"]
            .as_str()
            .unwrap()
            .contains("2024-01-11")
    );
}

#[test]
fn test_raw_event_without_payload_is_ignored() {
    let dir = TempDir::new().unwrap();
    let assert = cmd_in(&dir)
        .args(["event", "delivered", r#"{"notification": {"id": "x"}}"#])
        .assert()
        .success();
    let json = parse_json(&assert);
    assert_eq!(json["data"]["dispatch"]["outcome"]["outcome"], "ignored");
}

#[test]
fn test_test_notify_fires_after_five_seconds() {
    let dir = TempDir::new().unwrap();
    cmd_in(&dir)
        .args(["test-notify", "--at", BEFORE])
        .assert()
        .success();
    let assert = cmd_in(&dir)
        .args(["tick", "--at", "2024-01-10T07:00:05+01:00"])
        .assert()
        .success();
    let json = parse_json(&assert);
    assert_eq!(
        json["data"]["fired"][0]["dispatch"]["outcome"]["reason"],
        "test_notification"
    );
}

// ── reset / logs / config ────────────────────────────────────────────────────

#[test]
fn test_reset_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    add_aspirin(&dir);
    cmd_in(&dir).args(["reset"]).assert().failure();
    assert_eq!(scheduled_count(&dir), 1);

    cmd_in(&dir).args(["reset", "--yes"]).assert().success();
    assert_eq!(scheduled_count(&dir), 0);
    let assert = cmd_in(&dir).args(["med", "list"]).assert().success();
    assert_eq!(
        parse_json(&assert)["data"]["medications"],
        serde_json::json!([])
    );
}

#[test]
fn test_logs_record_activity_across_runs() {
    let dir = TempDir::new().unwrap();
    add_aspirin(&dir);

    let assert = cmd_in(&dir)
        .args(["logs", "--search", "medication added"])
        .assert()
        .success();
    let json = parse_json(&assert);
    assert!(!json["data"]["entries"].as_array().unwrap().is_empty());

    cmd_in(&dir).args(["logs", "--clear"]).assert().success();
    let assert = cmd_in(&dir)
        .args(["logs", "--search", "medication added"])
        .assert()
        .success();
    assert_eq!(parse_json(&assert)["data"]["entries"], serde_json::json!([]));
}

#[test]
fn test_config_set_changes_followup_count() {
    let dir = TempDir::new().unwrap();
    cmd_in(&dir)
        .args(["config", "set", "reminders.followup_count", "2"])
        .assert()
        .success();
    let assert = cmd_in(&dir).args(["config", "show"]).assert().success();
    assert_eq!(
        parse_json(&assert)["data"]["config"]["reminders"]["followup_count"],
        2
    );

    add_aspirin(&dir);
    cmd_in(&dir).args(["tick", "--at", DOSE_TIME]).assert().success();
    assert_eq!(scheduled_count(&dir), 3);
}

#[test]
fn test_config_set_unknown_key() {
    let dir = TempDir::new().unwrap();
    cmd_in(&dir)
        .args(["config", "set", "theme", "dark"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();
    cmd_in(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("medremind"));
}
