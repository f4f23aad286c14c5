//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_edudesk"))
        .env("EDUDESK_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.code().unwrap_or(-1), stdout, stderr)
}

fn import_roster(dir: &TempDir) -> Vec<serde_json::Value> {
    let roster = dir.path().join("roster.csv");
    std::fs::write(
        &roster,
        "Vano,Register Number,Name,Department,Year,Batch\n\
         V1,REG002,Bala,CSE,II,2023-2027\n\
         V2,REG001,Anu,CSE,II,2023-2027\n\
         V3,REG003,Chitra,ECE,II,2023-2027\n",
    )
    .unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["student", "import", roster.to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Imported 3 student(s)"));

    let (code, stdout, _) = run_cli(dir.path(), &["student", "list", "--dept", "CSE", "--json"]);
    assert_eq!(code, 0);
    serde_json::from_str::<Vec<serde_json::Value>>(&stdout).unwrap()
}

#[test]
fn test_config_set_then_get() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["config", "set", "sync.debounce_ms", "500"]);
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "sync.debounce_ms"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "500");
}

#[test]
fn test_config_set_rejects_bad_value() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "sync.debounce_ms", "soon"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_master_add_persists_between_runs() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["master", "add", "dept", "AIDS"]);
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(dir.path(), &["master", "list", "dept", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let departments = parsed.as_object().unwrap().values().next().unwrap().as_array().unwrap();
    assert!(departments.iter().any(|d| d == "AIDS"));
    assert!(departments.iter().any(|d| d == "CSE"));
}

#[test]
fn test_master_rename_cascades_to_students() {
    let dir = TempDir::new().unwrap();
    import_roster(&dir);

    let (code, stdout, _) = run_cli(dir.path(), &["master", "rename", "dept", "CSE", "CSD"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("2 students"));

    let (_, stdout, _) = run_cli(dir.path(), &["student", "list", "--dept", "CSD", "--json"]);
    let students: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(students.len(), 2);
}

#[test]
fn test_holiday_add_and_list() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["holiday", "add", "2024-03-08", "Festival"]);
    assert_eq!(code, 0);

    let (code, _, stderr) = run_cli(dir.path(), &["holiday", "add", "2024-03-08", "Again"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already a holiday"));

    let (code, stdout, _) = run_cli(dir.path(), &["holiday", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("2024-03-08"));
    assert!(stdout.contains("Festival"));
}

#[test]
fn test_mark_and_export_month() {
    let dir = TempDir::new().unwrap();
    let students = import_roster(&dir);
    assert_eq!(students.len(), 2);
    let anu = students.iter().find(|s| s["name"] == "Anu").unwrap();
    let anu_id = anu["id"].as_str().unwrap();

    let (code, stdout, _) = run_cli(
        dir.path(),
        &["attendance", "mark", anu_id, "P", "--date", "2024-03-04", "--hour", "2"],
    );
    assert_eq!(code, 0, "{stdout}");

    let (code, stdout, _) = run_cli(
        dir.path(),
        &[
            "report", "export", "--month", "2024-03", "--dept", "CSE", "--year", "II", "--section", "A", "--hour",
            "2", "--stdout",
        ],
    );
    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("Register No,Name,Hour,1,2,3,4,"));
    assert!(lines[0].ends_with("31,Total Present,Total Absent,Total Late"));
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("REG001,Anu,2,-,-,-,P,"));
    assert!(lines[1].ends_with(",1,0,0"));
    assert!(lines[2].starts_with("REG002,Bala,2,"));
}

#[test]
fn test_mark_on_holiday_is_rejected() {
    let dir = TempDir::new().unwrap();
    let students = import_roster(&dir);
    let id = students[0]["id"].as_str().unwrap().to_string();

    run_cli(dir.path(), &["holiday", "add", "2024-03-08", "Festival"]);
    let (code, _, stderr) = run_cli(dir.path(), &["attendance", "mark", &id, "present", "--date", "2024-03-08"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("holiday"));
}

#[test]
fn test_bad_date_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["report", "daily", "--date", "08/03/2024"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid date"));
}

#[test]
fn test_daily_report_json() {
    let dir = TempDir::new().unwrap();
    import_roster(&dir);
    let (code, stdout, _) = run_cli(dir.path(), &["report", "daily", "--date", "2024-03-04", "--json"]);
    assert_eq!(code, 0);
    let stats: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(stats["total_students"], 3);
    assert_eq!(stats["total_marked"], 0);
}

#[test]
fn test_timetable_set_and_export() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(
        dir.path(),
        &[
            "timetable", "set", "CSE-III-A", "--day", "I", "--hour", "2", "--subject", "Compilers", "--staff", "1",
            "--as", "admin@edu.com", "--password", "admin",
        ],
    );
    assert_eq!(code, 0, "{stderr}");

    let (code, stdout, _) = run_cli(dir.path(), &["timetable", "export", "CSE-III-A"]);
    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "Day Order,Hour,Class,Section,Subject,Staff");
    assert_eq!(lines[1], "I,2,CSE-III-A,A,Compilers,Admin User");
}
