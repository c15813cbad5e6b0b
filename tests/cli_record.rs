use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Runs the binary from an empty directory with an explicit config file so
/// no local configuration leaks into the run.
fn soulrecorder(dir: &TempDir, config: &str) -> Command {
    let config_path = dir.path().join("config.yaml");
    std::fs::write(&config_path, config).unwrap();
    let bin = assert_cmd::cargo::cargo_bin!("soulrecorder");
    let mut cmd = Command::new(bin);
    cmd.current_dir(dir.path())
        .env_remove("SOUL_RECORDER_DEDUP_MS")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config_path)
        .args(["--log-level", "warn"]);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn record_checkout_script_emits_wire_actions() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("checkout.jsonl");
    let assert = soulrecorder(&dir, "{}\n")
        .args(["--output", "json", "record", "--script"])
        .arg(fixture("checkout.yaml"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    let report = stdout_json(assert.get_output());

    let actions = report["actions"].as_array().unwrap();
    let kinds: Vec<&str> = actions.iter().map(|a| a["type"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        vec![
            "page-marker",
            "input",
            "input",
            "select",
            "check",
            "input",
            "click",
            "input",
            "keypress",
            "assertion",
            "click",
        ]
    );

    assert_eq!(actions[0]["url"], "https://shop.example/checkout");
    assert_eq!(actions[1]["xpath"], r#"//input[@name="email"]"#);
    assert_eq!(actions[1]["value"], "ada@example.com");
    assert_eq!(actions[2]["value"], "********");
    assert_eq!(actions[3]["value"], "de");
    assert_eq!(actions[3]["label"], "Germany");
    assert_eq!(actions[4]["checked"], true);

    let promo = &actions[5];
    assert_eq!(promo["value"], "SPRING");
    assert_eq!(promo["shadow"].as_array().unwrap().len(), 1);
    assert_eq!(promo["shadow"][0]["mode"], "open");

    let card = &actions[7];
    assert_eq!(card["value"], "4242");
    assert_eq!(card["iframe"][0]["locator"], r#"//iframe[@name="pay"]"#);
    assert_eq!(card["frameIndex"], 0);
    assert_eq!(actions[8]["key"], "Enter");

    assert_eq!(actions[9]["assertionType"], "text");
    assert_eq!(actions[9]["expectedValue"], "Total: 42 EUR");
    assert_eq!(actions[10]["xpath"], r#"//button[@id="place-order"]"#);

    assert_eq!(report["assertions"].as_array().unwrap().len(), 1);
    let statuses = report["statuses"].as_array().unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0]["actionCount"], 9);
    assert_eq!(statuses[1]["actionCount"], 2);

    let lines = std::fs::read_to_string(&out).unwrap();
    assert_eq!(lines.lines().count(), actions.len());
    assert!(!lines.contains("hunter2"));
    for line in lines.lines() {
        let action: Value = serde_json::from_str(line).unwrap();
        assert!(action["fullXPath"].is_string());
    }
}

#[test]
fn dedup_window_comes_from_flag() {
    let dir = TempDir::new().unwrap();
    let count_clicks = |report: &Value| {
        report["actions"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|a| a["type"] == "click")
            .count()
    };

    let kept = soulrecorder(&dir, "{}\n")
        .args(["--output", "json", "record", "--script"])
        .arg(fixture("double_click.yaml"))
        .assert()
        .success();
    assert_eq!(count_clicks(&stdout_json(kept.get_output())), 2);

    let collapsed = soulrecorder(&dir, "{}\n")
        .args(["--output", "json", "record", "--dedup-ms", "1000", "--script"])
        .arg(fixture("double_click.yaml"))
        .assert()
        .success();
    assert_eq!(count_clicks(&stdout_json(collapsed.get_output())), 1);
}

#[test]
fn step_gap_from_config_file_feeds_dedup() {
    let dir = TempDir::new().unwrap();
    let assert = soulrecorder(&dir, "step_gap_ms: 100\nemit_page_marker: false\n")
        .args(["--output", "json", "record", "--script"])
        .arg(fixture("double_click.yaml"))
        .assert()
        .success();
    let report = stdout_json(assert.get_output());
    assert_eq!(report["actions"].as_array().unwrap().len(), 1);
}

#[test]
fn save_writes_into_output_dir() {
    let dir = TempDir::new().unwrap();
    let assert = soulrecorder(&dir, "output_dir: recordings\n")
        .args(["--output", "json", "record", "--save", "--script"])
        .arg(fixture("double_click.yaml"))
        .assert()
        .success();
    let report = stdout_json(assert.get_output());
    let id = report["recordingId"].as_str().unwrap();
    let saved = dir.path().join("recordings").join(format!("{id}.jsonl"));
    assert!(saved.exists(), "{}", saved.display());
}

#[test]
fn locate_reports_frame_context() {
    let dir = TempDir::new().unwrap();
    let assert = soulrecorder(&dir, "{}\n")
        .args(["--output", "json", "locate", "--script"])
        .arg(fixture("checkout.yaml"))
        .args(["--frame", r#"//iframe[@name="pay"]"#, "--target", "//input"])
        .assert()
        .success();
    let report = stdout_json(assert.get_output());
    assert_eq!(report["locator"]["primary"], r#"//input[@name="card"]"#);
    assert_eq!(report["locator"]["fullPath"], "/html[1]/body[1]/input[1]");
    assert_eq!(report["frames"].as_array().unwrap().len(), 1);
    assert_eq!(report["frames"][0]["crossOriginBlocked"], false);
    assert!(report["shadow"].as_array().unwrap().is_empty());
}

#[test]
fn locate_without_handshake_records_blocked_frame() {
    let dir = TempDir::new().unwrap();
    let assert = soulrecorder(&dir, "cross_origin_handshake: false\n")
        .args(["--output", "json", "locate", "--script"])
        .arg(fixture("checkout.yaml"))
        .args(["--frame", r#"//iframe[@name="pay"]"#, "--target", "//input"])
        .assert()
        .success();
    let report = stdout_json(assert.get_output());
    assert_eq!(report["frames"][0]["crossOriginBlocked"], true);
    assert!(report["frames"][0]["locator"].is_null());
}

#[test]
fn locate_inside_shadow_root_in_human_format() {
    let dir = TempDir::new().unwrap();
    let assert = soulrecorder(&dir, "{}\n")
        .args(["locate", "--script"])
        .arg(fixture("checkout.yaml"))
        .args(["--shadow", "//promo-box", "--target", ".//button"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("primary:   .//button"), "{stdout}");
    assert!(stdout.contains("shadow:"), "{stdout}");
}

#[test]
fn env_override_wins_over_config_file() {
    let dir = TempDir::new().unwrap();
    let assert = soulrecorder(&dir, "dedup_window_ms: 120\n")
        .env("SOUL_RECORDER_DEDUP_MS", "75")
        .args(["--output", "json", "info"])
        .assert()
        .success();
    let info = stdout_json(assert.get_output());
    assert_eq!(info["config"]["dedup_window_ms"], 75);
    assert!(info["version"].is_string());
}

#[test]
fn invalid_script_fails() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("broken.yaml");
    std::fs::write(&script, "page: {url: 'https://a.example/', html: '<p></p>'}\nsteps:\n  - do: hover\n").unwrap();
    let assert = soulrecorder(&dir, "{}\n")
        .args(["record", "--script"])
        .arg(&script)
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("Invalid script"), "{stderr}");
}

#[test]
fn ambiguous_target_fails() {
    let dir = TempDir::new().unwrap();
    let assert = soulrecorder(&dir, "{}\n")
        .args(["locate", "--script"])
        .arg(fixture("checkout.yaml"))
        .args(["--target", "//input"])
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("expected exactly one"), "{stderr}");
}
