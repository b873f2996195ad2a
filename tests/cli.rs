//! CLI integration tests: run the `qsift` binary against temp files.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn qsift() -> Command {
    Command::cargo_bin("qsift").expect("binary builds")
}

fn write_input(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

const SAMPLE_CSV: &str = "\
QueryText,State
What is the best fertilizer for wheat?,Punjab
what is the best fertilizer for wheat?,Haryana
How much water does corn need?,Bihar
";

#[test]
fn init_creates_a_config_file() {
    let tmp = TempDir::new().unwrap();

    qsift()
        .current_dir(tmp.path())
        .args(["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("qsift.toml"));

    let config_path = tmp.path().join("qsift.toml");
    assert!(config_path.exists());
    let contents = std::fs::read_to_string(config_path).unwrap();
    assert!(contents.contains("question_column"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let tmp = TempDir::new().unwrap();

    qsift().current_dir(tmp.path()).args(["init"]).assert().success();

    qsift()
        .current_dir(tmp.path())
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    qsift()
        .current_dir(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn run_writes_a_deduplicated_csv() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "questions.csv", SAMPLE_CSV);
    let output = tmp.path().join("out.csv");

    qsift()
        .current_dir(tmp.path())
        .args(["run", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("DEDUPLICATION REPORT"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("QueryText,State"));
    assert!(written.contains("Punjab"));
    assert!(!written.contains("Haryana"), "exact duplicate row must be dropped");
    assert!(written.contains("Bihar"));
}

#[test]
fn run_defaults_output_beside_input() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "questions.csv", SAMPLE_CSV);

    qsift()
        .current_dir(tmp.path())
        .args(["run", "--quiet", "--input"])
        .arg(&input)
        .assert()
        .success();

    assert!(tmp.path().join("questions_deduplicated.csv").exists());
}

#[test]
fn run_report_flag_writes_a_report_file() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "questions.csv", SAMPLE_CSV);
    let output = tmp.path().join("out.csv");

    qsift()
        .current_dir(tmp.path())
        .args(["run", "--report", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let report = std::fs::read_to_string(tmp.path().join("out.report.txt")).unwrap();
    assert!(report.contains("Exact duplicates removed:    1"));
}

#[test]
fn dry_run_prints_the_plan_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "questions.csv", SAMPLE_CSV);
    let output = tmp.path().join("out.csv");

    qsift()
        .current_dir(tmp.path())
        .args(["run", "--dry-run", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Would deduplicate 3 rows"));

    assert!(!output.exists());
}

#[test]
fn missing_column_fails_with_available_columns_listed() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "other.csv", "Question,State\nhello there world?,Punjab\n");

    qsift()
        .current_dir(tmp.path())
        .args(["run", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("QueryText").and(predicate::str::contains("Question")));
}

#[test]
fn column_flag_overrides_the_configured_column() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        &tmp,
        "other.csv",
        "Question,State\nHow much water does corn need?,Punjab\nhow much water does corn need?,Bihar\n",
    );
    let output = tmp.path().join("out.csv");

    qsift()
        .current_dir(tmp.path())
        .args(["run", "--quiet", "--column", "Question", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("Punjab"));
    assert!(!written.contains("Bihar"));
}

#[test]
fn missing_input_file_fails_cleanly() {
    let tmp = TempDir::new().unwrap();

    qsift()
        .current_dir(tmp.path())
        .args(["run", "--input", "no_such_file.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn explicit_config_file_is_honored() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "other.csv", "Question,State\nHow much water does corn need?,Punjab\n");
    let config = write_input(
        &tmp,
        "custom.toml",
        "[input]\nquestion_column = \"Question\"\n",
    );
    let output = tmp.path().join("out.csv");

    qsift()
        .current_dir(tmp.path())
        .args(["run", "--quiet", "--input"])
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    assert!(output.exists());
}
