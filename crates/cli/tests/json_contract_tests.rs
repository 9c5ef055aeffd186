// Integration tests enforcing the JSON stdout contract.
//
// These tests guarantee that stdout from JSON output is:
//   1. Valid JSON
//   2. Exactly one JSON value (no banners, no summary lines)
//   3. The documented shape, with amounts in minor units
//
// Run with: cargo test -p spp-cli --test json_contract_tests -- --nocapture

use std::path::PathBuf;
use std::process::Command;

fn spp() -> Command {
    let home = std::env::temp_dir().join("spp-json-contract-home");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_spp"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env("HOME", &home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd.env_remove("SPP_SHEET_URL");
    cmd.env_remove("SPP_CONFIG");
    cmd
}

fn config() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../recon/tests/fixtures/spp.toml")
        .to_string_lossy()
        .into_owned()
}

/// Assert stdout is a single, parseable JSON value.
fn assert_single_json(stdout: &str) -> serde_json::Value {
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!("stdout must be valid JSON.\nParse error: {}\nstdout:\n{}", e, trimmed)
    })
}

// ===========================================================================
// spp report --format json
// ===========================================================================

#[test]
fn report_json_shape() {
    let output = spp()
        .args(["report", "--config", &config(), "-m", "3", "-y", "2024", "-f", "json"])
        .output()
        .expect("spp report --format json");

    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let val = assert_single_json(&String::from_utf8_lossy(&output.stdout));

    let meta = &val["meta"];
    assert_eq!(meta["period"]["year"], 2024);
    assert_eq!(meta["period"]["month"], 3);
    assert!(meta.get("class").is_none(), "all classes: no class key");
    assert_eq!(meta["monthly_fee_minor"], 100_000_000);
    assert_eq!(meta["on_time_day"], 10);
    assert_eq!(meta["grouping"], "student");
    assert!(meta["engine_version"].is_string());
    assert!(meta["run_at"].is_string());

    let summary = &val["summary"];
    assert_eq!(summary["students"], 6);
    assert_eq!(summary["paid"], 3);
    assert_eq!(summary["unpaid"], 3);
    assert_eq!(summary["total_paid_minor"], 250_000_000);
    assert_eq!(summary["total_shortfall_minor"], 350_000_000);

    let rows = val["rows"].as_array().expect("rows array");
    assert_eq!(rows.len(), 6);
    let first = &rows[0];
    assert_eq!(first["student_name"], "Ani");
    assert_eq!(first["class_name"], "7A");
    assert_eq!(first["status"], "paid");
    assert_eq!(first["total_paid_minor"], 100_000_000);
    assert_eq!(first["shortfall_minor"], 0);
    assert_eq!(first["last_payment"]["date"], "2024-03-09");
    assert_eq!(first["last_payment"]["amount_minor"], 100_000_000);

    let dedi = rows.iter().find(|r| r["student_name"] == "Dedi").unwrap();
    assert!(dedi.get("last_payment").is_none());

    // The summary line goes to stderr, never stdout.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Rekap Bulan Maret 2024"), "stderr: {stderr}");
}

#[test]
fn report_json_with_class_filter() {
    let output = spp()
        .args([
            "report", "--config", &config(), "-m", "3", "-y", "2024",
            "--class", "7B", "-f", "json", "-q",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let val = assert_single_json(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(val["meta"]["class"], "7B");
    assert_eq!(val["rows"].as_array().unwrap().len(), 1);
    assert_eq!(val["rows"][0]["status"], "unpaid");
    assert_eq!(val["rows"][0]["total_paid_minor"], 100_000_000);
}

// ===========================================================================
// spp periods --json
// ===========================================================================

#[test]
fn periods_json_shape() {
    let output = spp()
        .args(["periods", "--config", &config(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let val = assert_single_json(&String::from_utf8_lossy(&output.stdout));
    let periods = val["periods"].as_array().unwrap();
    assert_eq!(periods.len(), 3);
    assert_eq!(periods[0]["year"], 2024);
    assert_eq!(periods[0]["month"], 2);
    assert_eq!(periods[0]["label"], "Februari 2024");
    assert_eq!(val["classes"], serde_json::json!(["7A", "7B", "8A"]));
    assert_eq!(val["records"], 9);
    assert_eq!(val["undated"], 1);
}
