// Integration tests for `spp report`, `spp periods`, `spp watch`, `spp config`.
// Run with: cargo test -p spp-cli --test report_tests

use std::path::PathBuf;
use std::process::{Command, Output};

use httpmock::prelude::*;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

fn fixture(name: &str) -> String {
    fixtures().join(name).to_string_lossy().into_owned()
}

/// `spp` with a private HOME so no real config or env leaks into tests.
fn spp(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_spp"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env("HOME", home.path());
    cmd.env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd.env_remove("SPP_SHEET_URL");
    cmd.env_remove("SPP_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    let home = tempfile::tempdir().unwrap();
    spp(&home).args(args).output().expect("failed to run spp")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {}, got {:?}\nstdout: {}\nstderr: {}",
        code,
        output.status.code(),
        stdout(output),
        stderr(output),
    );
}

// ===========================================================================
// spp report
// ===========================================================================

#[test]
fn report_table_for_march() {
    let config = fixture("spp.toml");
    let output = run(&["report", "--config", &config, "--month", "3", "--year", "2024"]);
    assert_exit(&output, 0);

    let out = stdout(&output);
    assert!(out.starts_with("Rekap Bulan Maret 2024 (Kelas: Semua)\n"), "{out}");
    let ani = out.lines().find(|l| l.starts_with("Ani ")).unwrap();
    assert!(ani.contains("2024-03-09"));
    assert!(ani.contains("Lunas"));
    let dedi = out.lines().find(|l| l.starts_with("Dedi ")).unwrap();
    assert!(dedi.contains("Belum Lunas"));
    assert!(out.contains("6 siswa: 3 lunas, 3 belum lunas"));
    assert!(out.contains("Total terkumpul:  Rp 2.500.000"));
    assert!(out.contains("Total kekurangan: Rp 3.500.000"));
}

#[test]
fn report_csv_for_one_class() {
    let config = fixture("spp.toml");
    let output = run(&[
        "report", "--config", &config,
        "-m", "3", "-y", "2024",
        "--class", "7A",
        "--format", "csv",
        "--quiet",
    ]);
    assert_exit(&output, 0);
    assert_eq!(
        stdout(&output),
        "Nama Siswa,Kelas,Tanggal Bayar,Jumlah Bayar,Status,Total Bayar Bulan Ini,Kekurangan\n\
         Ani,7A,2024-03-09,1000000,Lunas,1000000,0\n\
         Citra,7A,2024-03-05,500000,Lunas,500000,500000\n"
    );
    assert!(stderr(&output).is_empty(), "stderr: {}", stderr(&output));
}

#[test]
fn report_csv_to_file() {
    let config = fixture("spp.toml");
    let out = tempfile::NamedTempFile::new().unwrap();
    let path = out.path().to_string_lossy().into_owned();
    let output = run(&[
        "report", "--config", &config, "-m", "4", "-y", "2024", "-f", "csv", "-o", &path,
    ]);
    assert_exit(&output, 0);

    assert!(stdout(&output).is_empty());
    let err = stderr(&output);
    assert!(err.contains(&format!("wrote {path}")), "{err}");
    assert!(err.contains("Rekap Bulan April 2024: 6 student(s), 1 paid"), "{err}");

    let written = std::fs::read_to_string(out.path()).unwrap();
    assert_eq!(written.lines().count(), 7);
    assert!(written.contains("Citra,7A,2024-04-12,1000000,Belum Lunas,1000000,0"));
}

#[test]
fn fee_flag_overrides_config() {
    let config = fixture("spp.toml");
    let output = run(&[
        "report", "--config", &config, "-m", "3", "-y", "2024",
        "--class", "7A", "--fee", "500000", "-f", "csv", "-q",
    ]);
    assert_exit(&output, 0);
    assert!(stdout(&output).contains("Citra,7A,2024-03-05,500000,Lunas,500000,0"));
}

#[test]
fn on_time_day_flag_changes_status() {
    let config = fixture("spp.toml");
    let output = run(&[
        "report", "--config", &config, "-m", "3", "-y", "2024",
        "--class", "7B", "--on-time-day", "20", "-f", "csv", "-q",
    ]);
    assert_exit(&output, 0);
    assert!(stdout(&output).contains("Budi,7B,2024-03-20,600000,Lunas,1000000,0"));
}

#[test]
fn manual_ledger_via_flags() {
    let output = run(&[
        "report",
        "--file", &fixture("rekap-manual.csv"),
        "--skip-rows", "2",
        "--delimiter", ";",
        "-m", "3", "-y", "2024",
        "-f", "csv", "-q",
    ]);
    assert_exit(&output, 0);
    let out = stdout(&output);
    assert!(out.contains("Gita,9A,2024-03-02,1000000,Lunas,1000000,0"), "{out}");
    assert!(out.contains("Hadi,9A,2024-03-11,1000000,Belum Lunas,1000000,0"), "{out}");
}

#[test]
fn report_over_http() {
    let server = MockServer::start();
    let body = std::fs::read_to_string(fixtures().join("google-form-export.csv")).unwrap();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/spreadsheets/export");
        then.status(200).header("content-type", "text/csv").body(body);
    });

    let home = tempfile::tempdir().unwrap();
    let output = spp(&home)
        .env("SPP_SHEET_URL", server.url("/spreadsheets/export"))
        .args(["report", "-m", "3", "-y", "2024", "--class", "8A", "-f", "csv", "-q"])
        .output()
        .unwrap();
    assert_exit(&output, 0);
    mock.assert();

    let out = stdout(&output);
    assert!(out.contains("Dedi,8A,,,Belum Lunas,0,1000000"), "{out}");
    assert!(out.contains("Fajar,8A,2024-03-03,0,Lunas,0,1000000"), "{out}");
}

// ===========================================================================
// Failures and exit codes
// ===========================================================================

#[test]
fn no_source_exits_12() {
    let output = run(&["report", "-m", "3"]);
    assert_exit(&output, 12);
    let err = stderr(&output);
    assert!(err.contains("error: no payment sheet configured"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn missing_file_exits_10() {
    let output = run(&["report", "--file", "/nonexistent/spp.csv"]);
    assert_exit(&output, 10);
    assert!(stderr(&output).contains("error: payment data unavailable"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn unrecognizable_columns_exit_11() {
    let output = run(&["report", "--file", &fixture("two-columns.csv")]);
    assert_exit(&output, 11);
    let err = stderr(&output);
    assert!(err.contains("error: payment data malformed"), "{err}");
    assert!(err.contains("--skip-rows"), "{err}");
}

#[test]
fn upstream_failure_exits_10() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/export");
        then.status(404);
    });
    let output = run(&["report", "--url", &server.url("/export")]);
    assert_exit(&output, 10);
    assert!(stderr(&output).contains("HTTP 404"));
}

#[test]
fn missing_config_exits_22() {
    let output = run(&["report", "--config", "/nonexistent/spp.toml"]);
    assert_exit(&output, 22);
}

#[test]
fn invalid_config_exits_21() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "on_time_day = 0\n").unwrap();
    let output = run(&["report", "--config", &path.to_string_lossy()]);
    assert_exit(&output, 21);
    assert!(stderr(&output).contains("between 1 and 31"));
}

#[test]
fn unparsable_config_exits_20() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "monthly_fee = [\n").unwrap();
    let output = run(&["config", "validate", "--config", &path.to_string_lossy()]);
    assert_exit(&output, 20);
}

#[test]
fn month_out_of_range_is_usage_error() {
    let output = run(&["report", "--file", &fixture("google-form-export.csv"), "--month", "13"]);
    assert_exit(&output, 2);
}

#[test]
fn bad_fee_is_usage_error() {
    let output = run(&[
        "report", "--file", &fixture("google-form-export.csv"), "--fee", "sejuta",
    ]);
    assert_exit(&output, 2);
    assert!(stderr(&output).contains("cannot parse --fee"));
}

// ===========================================================================
// spp periods
// ===========================================================================

#[test]
fn periods_lists_months_and_classes() {
    let output = run(&["periods", "--config", &fixture("spp.toml")]);
    assert_exit(&output, 0);
    let out = stdout(&output);
    assert!(out.contains("2024-02  Februari 2024"));
    assert!(out.contains("2024-03  Maret 2024"));
    assert!(out.contains("2024-04  April 2024"));
    assert!(out.contains("Kelas:\n  Semua\n  7A\n  7B\n  8A\n"), "{out}");
}

// ===========================================================================
// spp watch
// ===========================================================================

#[test]
fn watch_reuses_cached_sheet() {
    let output = run(&[
        "watch", "--config", &fixture("spp.toml"),
        "-m", "3", "-y", "2024",
        "--interval", "0", "--iterations", "3",
        "-vv",
    ]);
    assert_exit(&output, 0);

    let out = stdout(&output);
    assert_eq!(out.matches("Rekap Bulan Maret 2024").count(), 3);
    assert!(!out.contains('\u{1b}'), "no terminal escapes when piped");

    let err = stderr(&output);
    assert_eq!(err.matches("dataset cache miss").count(), 1, "{err}");
    assert_eq!(err.matches("dataset cache hit").count(), 2, "{err}");
}

#[test]
fn watch_reports_last_failure() {
    let output = run(&[
        "watch", "--file", "/nonexistent/spp.csv", "--interval", "0", "--iterations", "2",
    ]);
    assert_exit(&output, 10);
    // Printed once while watching, once as the final error.
    assert_eq!(stderr(&output).matches("error: payment data unavailable").count(), 2);
}

// ===========================================================================
// spp config
// ===========================================================================

#[test]
fn config_validate_ok() {
    let output = run(&["config", "validate", "--config", &fixture("rekap-manual.toml")]);
    assert_exit(&output, 0);
    let out = stdout(&output);
    assert!(out.starts_with("ok: "));
    assert!(out.contains("monthly fee:  1000000"));
    assert!(out.contains("rekap-manual.csv"));
}

#[test]
fn config_validate_without_file_exits_22() {
    let output = run(&["config", "validate"]);
    assert_exit(&output, 22);
    assert!(stderr(&output).contains("no config file at"));
}

#[test]
fn config_show_defaults() {
    let output = run(&["config", "show"]);
    assert_exit(&output, 0);
    let out = stdout(&output);
    assert!(out.starts_with("# defaults"));
    assert!(out.contains("monthly_fee = \"1000000\""));
    assert!(out.contains("cache_ttl_secs = 600"));
}

#[test]
#[cfg(target_os = "linux")]
fn config_from_default_location() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join(".config").join("spp-report");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::copy(fixtures().join("google-form-export.csv"), dir.join("spp.csv")).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "monthly_fee = 500000\n[source]\nfile = \"spp.csv\"\n",
    )
    .unwrap();

    let output = spp(&home)
        .args(["report", "-m", "3", "-y", "2024", "--class", "7A", "-f", "csv", "-q"])
        .output()
        .unwrap();
    assert_exit(&output, 0);
    assert!(stdout(&output).contains("Citra,7A,2024-03-05,500000,Lunas,500000,0"));
}
