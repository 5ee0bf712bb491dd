use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DISPLAY_TEXT: &str = "対象ゲーム数 120\n打込 5\n2穴 10\nリプレイ 3\nリプ→V 2\n";

const VISION_RESPONSE: &str = r#"{
    "textAnnotations": [
        {"description": "対象ゲーム数 120\n7\nスタート"},
        {"description": "対象ゲーム数", "boundingPoly": {"vertices": [{"x": 5, "y": 2}, {"x": 60, "y": 2}, {"x": 60, "y": 12}, {"x": 5, "y": 12}]}},
        {"description": "120", "boundingPoly": {"vertices": [{"x": 65, "y": 2}, {"x": 90, "y": 2}, {"x": 90, "y": 12}, {"x": 65, "y": 12}]}},
        {"description": "7", "boundingPoly": {"vertices": [{"x": 45, "y": 115}, {"x": 55, "y": 115}, {"x": 55, "y": 125}, {"x": 45, "y": 125}]}},
        {"description": "スタート", "boundingPoly": {"vertices": [{"x": 120, "y": 400}, {"x": 160, "y": 400}, {"x": 160, "y": 420}, {"x": 120, "y": 420}]}}
    ],
    "fullTextAnnotation": {"text": "対象ゲーム数 120\n7\nスタート\n"}
}"#;

/// Command with the user config directory pointed into `home`.
fn pachi(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pachi").unwrap();
    cmd.env("XDG_CONFIG_HOME", home).env("HOME", home);
    cmd
}

#[test]
fn test_extract_text_file_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("display.txt");
    fs::write(&input, DISPLAY_TEXT).unwrap();

    pachi(dir.path())
        .arg("extract")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"extracted_values\""))
        .stdout(predicate::str::contains("\"X\": 120"))
        .stdout(predicate::str::contains("\"A\": 5"));
}

#[test]
fn test_extract_csv_to_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("display.txt");
    let output = dir.path().join("out.csv");
    fs::write(&input, DISPLAY_TEXT).unwrap();

    pachi(dir.path())
        .args(["extract", "--format", "csv", "-o"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let csv = fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with("field,value,source\n"));
    assert!(csv.contains("B,10,keyword"));
}

#[test]
fn test_extract_vision_response_by_grid() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("vision.json");
    fs::write(&input, VISION_RESPONSE).unwrap();

    pachi(dir.path())
        .args(["extract", "--strategy", "grid", "--values-only"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"B\": 7"))
        .stdout(predicate::str::contains("\"X\": 120"));
}

#[test]
fn test_extract_missing_file() {
    let dir = TempDir::new().unwrap();

    pachi(dir.path())
        .args(["extract", "no-such-file.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_extract_rejects_unknown_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.json");
    fs::write(&input, r#"{"foo": 1}"#).unwrap();

    pachi(dir.path())
        .arg("extract")
        .arg(&input)
        .assert()
        .failure();
}

#[test]
fn test_aggregate_pair() {
    let dir = TempDir::new().unwrap();
    let starts = dir.path().join("starts.txt");
    let wins = dir.path().join("wins.txt");
    fs::write(&starts, "スタート回数\n本日 300\n1日前 200\n").unwrap();
    fs::write(&wins, "大当り回数\n本日 2\n1日前 3\n").unwrap();

    pachi(dir.path())
        .args(["aggregate", "--format", "text"])
        .arg(&starts)
        .arg(&wins)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wins: 5"))
        .stdout(predicate::str::contains("Starts: 500"))
        .stdout(predicate::str::contains("Odds: 1/100.0"));
}

#[test]
fn test_batch_with_summary() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("in");
    let outputs = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("one.txt"), DISPLAY_TEXT).unwrap();
    fs::write(inputs.join("two.txt"), "対象ゲーム数 80\n").unwrap();
    fs::write(inputs.join("empty.txt"), "   \n").unwrap();

    pachi(dir.path())
        .arg("batch")
        .arg(format!("{}/*.txt", inputs.display()))
        .arg("--output-dir")
        .arg(&outputs)
        .args(["--summary", "--continue-on-error"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful, 1 failed"));

    assert!(outputs.join("one.json").exists());
    let summary = fs::read_to_string(outputs.join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,status,X,A,"));
    assert!(summary.contains("two.txt,success,80,"));
    assert!(summary.contains("empty.txt,error,"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("pachi.json");

    pachi(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    pachi(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "grid.rows"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("5"));

    pachi(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "extraction.strategy", "grid"])
        .assert()
        .success();

    pachi(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "extraction.strategy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"grid\""));
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("pachi.json");

    pachi(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "grid.rows", "0"])
        .assert()
        .failure();
}
