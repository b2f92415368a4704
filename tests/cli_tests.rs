//! Integration tests for the CLI application
//!
//! These tests run the compiled binary against temporary CSV files.

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

/// Helper to create a risk-factor style CSV file
fn risk_factor_csv(n: usize, extra_rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".csv").expect("Failed to create temp file");
    writeln!(
        file,
        "Age,STDs: Number of diagnosis,Dx:Cancer,Dx:CIN,Dx:HPV,Dx,Hinselmann,Schiller,Citology,Biopsy"
    )
    .expect("Failed to write");
    for i in 0..n {
        let biopsy = u8::from(i % 4 == 0);
        writeln!(
            file,
            "{},{},{},0,{},0,{},{},{},{}",
            15 + i,
            i % 3 / 2,
            u8::from(i % 13 == 0),
            u8::from(i % 13 == 0),
            u8::from(biopsy == 1 && i % 8 == 0),
            biopsy,
            u8::from(i % 11 == 0),
            biopsy
        )
        .expect("Failed to write");
    }
    for row in extra_rows {
        writeln!(file, "{row}").expect("Failed to write");
    }
    file.flush().expect("Failed to flush");
    file
}

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_biopsy-svm"))
        .args(args)
        .output()
        .expect("Failed to run CLI")
}

#[test]
fn test_cli_run_command() {
    let data = risk_factor_csv(60, &[]);

    let output = run_cli(&[
        "run",
        "--data",
        data.path().to_str().unwrap(),
        "--kernels",
        "linear,rbf",
        "--cv-folds",
        "3",
    ]);

    assert!(
        output.status.success(),
        "Run command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Best Kernel: "));
    assert!(stdout.contains("AUC Score: "));
    assert!(stdout.contains("F1 Score: "));
    assert!(stdout.contains("Precision: "));
    assert!(stdout.contains("Recall: "));
    assert!(stdout.contains("Balanced Accuracy: "));
    assert!(stdout.contains("Classification Report:"));
    assert!(stdout.contains("weighted avg"));
}

#[test]
fn test_cli_run_json_output() {
    let data = risk_factor_csv(60, &[]);

    let output = run_cli(&[
        "run",
        "--data",
        data.path().to_str().unwrap(),
        "--kernels",
        "linear",
        "--cv-folds",
        "3",
        "--seed",
        "7",
        "--json",
    ]);

    assert!(
        output.status.success(),
        "Run command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["best_kernel"], "linear");
    assert_eq!(report["train_size"], 42);
    assert_eq!(report["test_size"], 18);
    assert!(report["auc"].as_f64().is_some());
}

#[test]
fn test_cli_run_with_config_file() {
    let data = risk_factor_csv(60, &[]);
    let mut config = NamedTempFile::with_suffix(".json").expect("Failed to create temp file");
    writeln!(config, r#"{{"kernels": ["linear"], "cv_folds": 3, "test_size": 0.25}}"#)
        .expect("Failed to write");
    config.flush().expect("Failed to flush");

    let output = run_cli(&[
        "run",
        "--data",
        data.path().to_str().unwrap(),
        "--config",
        config.path().to_str().unwrap(),
        "--json",
    ]);

    assert!(
        output.status.success(),
        "Run command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["test_size"], 15);
    assert_eq!(report["cv_scores"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_cli_clean_command() {
    let data = risk_factor_csv(
        10,
        &["40,?,0,0,0,0,0,0,0,0", "15,0,1,0,1,0,1,1,1,1"],
    );

    let output = run_cli(&["clean", "--data", data.path().to_str().unwrap()]);

    assert!(
        output.status.success(),
        "Clean command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Rows loaded:             12"));
    assert!(stdout.contains("stds:_number_of_diagnosis: 1"));
    assert!(stdout.contains("Incomplete rows dropped: 1"));
    assert!(stdout.contains("Duplicate rows dropped:  1"));
    assert!(stdout.contains("Rows remaining:          10"));
}

#[test]
fn test_cli_error_handling() {
    // Nonexistent data file
    let output = run_cli(&["run", "--data", "nonexistent.csv"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));

    // Invalid kernel name
    let data = risk_factor_csv(20, &[]);
    let output = run_cli(&[
        "run",
        "--data",
        data.path().to_str().unwrap(),
        "--kernels",
        "laplacian",
    ]);
    assert!(!output.status.success());

    // Out-of-range test size
    let output = run_cli(&[
        "run",
        "--data",
        data.path().to_str().unwrap(),
        "--test-size",
        "1.5",
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run"));
    assert!(stdout.contains("clean"));
}
