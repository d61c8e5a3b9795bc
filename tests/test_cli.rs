//! Command-line integration tests: exit status and user-facing output

use blz_import::infra::ImportLock;
use std::path::Path;
use std::process::{Command, Output};

// ──────────────────────── Helpers ────────────────────────

const HEADER: &str = "Bankleitzahl;Merkmal;Bezeichnung;PLZ;Ort;Kurzbezeichnung;PAN;BIC;Prüfzifferberechnungsmethode;Datensatznummer;Änderungskennzeichen;Bankleitzahllöschung;Nachfolge-Bankleitzahl";

fn line(code: &str, name: &str) -> String {
    format!(
        "\"{code}\";\"1\";\"{name}\";\"10591\";\"Berlin\";\"{name}\";\"\";\"\";\"09\";\"000001\";\"U\";\"0\";\"00000000\""
    )
}

/// Run the binary inside `dir` so no stray `.env` is picked up.
fn blz(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blz-import"))
        .args(args)
        .current_dir(dir)
        .env("BLZ_DB_PATH", dir.join("banks.db"))
        .env("BLZ_LOG", "off")
        .env_remove("RUST_LOG")
        .env_remove("BLZ_SOURCE_PATH")
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// ══════════════════════════════════════════════════════════
//  import
// ══════════════════════════════════════════════════════════

#[test]
fn record_errors_still_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("blz.csv");
    let text = format!("{}\n{}\n{}\n", HEADER, line("10000000", "Good"), line("123", "Short"));
    std::fs::write(&source, text).unwrap();

    let out = blz(dir.path(), &["import", source.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let printed = stdout(&out);
    assert!(printed.contains("Imported 1 banks (1 errors)"), "stdout: {}", printed);
    assert!(printed.contains("Registry: 1 banks"), "stdout: {}", printed);
}

#[test]
fn missing_source_exits_nonzero_with_io_error_once() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");

    let out = blz(dir.path(), &["import", missing.to_str().unwrap()]);
    assert!(!out.status.success());
    let printed = stderr(&out);
    assert_eq!(printed.matches("IO_ERROR").count(), 1, "stderr: {}", printed);
}

#[test]
fn held_lock_exits_nonzero_with_import_locked() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("blz.csv");
    std::fs::write(&source, format!("{}\n{}\n", HEADER, line("10000000", "Good"))).unwrap();
    let _held = ImportLock::acquire(&ImportLock::path_for(&dir.path().join("banks.db"))).unwrap();

    let out = blz(dir.path(), &["import", source.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("IMPORT_LOCKED"), "stderr: {}", stderr(&out));
}

#[test]
fn json_error_goes_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");

    let out = blz(dir.path(), &["--json", "import", missing.to_str().unwrap()]);
    assert!(!out.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["code"], "IO_ERROR");
}

// ══════════════════════════════════════════════════════════
//  lookup
// ══════════════════════════════════════════════════════════

#[test]
fn lookup_unknown_code_is_not_found() {
    let dir = tempfile::tempdir().unwrap();

    let out = blz(dir.path(), &["lookup", "99999999"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("NOT_FOUND"), "stderr: {}", stderr(&out));
}
