//! Integration tests for the CLI application
//!
//! These tests verify that the CLI commands work correctly with real data files.

use std::io::Write;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

/// Helper to create test data files
struct TestDataFiles {
    pub libsvm_file: NamedTempFile,
    pub csv_file: NamedTempFile,
    pub test_libsvm_file: NamedTempFile,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        let mut libsvm_file = NamedTempFile::with_suffix(".libsvm")?;
        writeln!(libsvm_file, "+1 1:2.0 2:1.0")?;
        writeln!(libsvm_file, "-1 1:-2.0 2:-1.0")?;
        writeln!(libsvm_file, "+1 1:1.5 2:0.8")?;
        writeln!(libsvm_file, "-1 1:-1.5 2:-0.8")?;
        writeln!(libsvm_file, "+1 1:1.8 2:0.9")?;
        writeln!(libsvm_file, "-1 1:-1.8 2:-0.9")?;
        libsvm_file.flush()?;

        let mut csv_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(csv_file, "feature1,feature2,label")?;
        writeln!(csv_file, "1.0,2.0,1")?;
        writeln!(csv_file, "3.0,4.0,-1")?;
        csv_file.flush()?;

        let mut test_libsvm_file = NamedTempFile::with_suffix(".libsvm")?;
        writeln!(test_libsvm_file, "+1 1:1.6 2:0.7")?;
        writeln!(test_libsvm_file, "-1 1:-1.6 2:-0.7")?;
        test_libsvm_file.flush()?;

        Ok(TestDataFiles {
            libsvm_file,
            csv_file,
            test_libsvm_file,
        })
    }
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svm-registry"))
        .args(args)
        .output()
        .expect("Failed to run CLI binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_version_command() {
    let output = run(&["version"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("svm-registry"));
    assert!(text.contains("libsvm 336"));
}

#[test]
fn test_inspect_command() {
    let files = TestDataFiles::new().unwrap();
    let path = files.csv_file.path().to_str().unwrap();

    let output = run(&["inspect", "--data", path]);
    assert!(output.status.success());

    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["0\t1\t2", "1\t1\t2", "-1\t3\t4"]);
}

#[test]
fn test_train_prints_summary() {
    let files = TestDataFiles::new().unwrap();
    let path = files.csv_file.path().to_str().unwrap();

    let output = run(&["train", "--data", path]);
    assert!(output.status.success(), "{:?}", output);

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "svm_type\tkernel_type\tnr_class\tnr_sv");
    assert_eq!(lines[1], "0\t2\t2\t2");
}

#[test]
fn test_train_predict_info_workflow() {
    let files = TestDataFiles::new().unwrap();
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.json");
    let predictions_path = dir.path().join("predictions.txt");

    let output = run(&[
        "train",
        "--data",
        files.libsvm_file.path().to_str().unwrap(),
        "-t",
        "linear",
        "-c",
        "10",
        "--output",
        model_path.to_str().unwrap(),
        "--support-vectors",
    ]);
    assert!(output.status.success(), "{:?}", output);
    assert!(model_path.exists());
    assert!(stdout(&output).contains("alpha"));

    let output = run(&[
        "predict",
        "--model",
        model_path.to_str().unwrap(),
        "--data",
        files.test_libsvm_file.path().to_str().unwrap(),
        "--output",
        predictions_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{:?}", output);

    let written = std::fs::read_to_string(&predictions_path).unwrap();
    let predictions: Vec<&str> = written.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(predictions, vec!["0 1", "1 -1"]);

    let output = run(&["info", model_path.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("SVM Model Summary"));
    assert!(text.contains("Classes: 2"));
}

#[test]
fn test_predict_to_stdout() {
    let files = TestDataFiles::new().unwrap();
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.json");

    let status = run(&[
        "train",
        "--data",
        files.libsvm_file.path().to_str().unwrap(),
        "-o",
        model_path.to_str().unwrap(),
    ])
    .status;
    assert!(status.success());

    let output = run(&[
        "predict",
        "-m",
        model_path.to_str().unwrap(),
        "--data",
        files.test_libsvm_file.path().to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("# Predictions for 2 samples"));
}

#[test]
fn test_train_with_extreme_cache_sizes() {
    let files = TestDataFiles::new().unwrap();
    let path = files.csv_file.path().to_str().unwrap();

    for cache_size in ["0.000001", "1000000000"] {
        let output = run(&["train", "--data", path, "-m", cache_size]);
        assert!(output.status.success(), "{:?}", output);

        let text = stdout(&output);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "0\t2\t2\t2");
    }
}

#[test]
fn test_validation_failure_exits_nonzero() {
    let files = TestDataFiles::new().unwrap();

    let output = run(&[
        "train",
        "--data",
        files.libsvm_file.path().to_str().unwrap(),
        "-s",
        "nu-svc",
        "-n",
        "0",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("model_create: nu <= 0 or nu > 1"));
}

#[test]
fn test_missing_file() {
    let output = run(&["train", "--data", "/non/existent/data.csv"]);
    assert!(!output.status.success());

    let output = run(&["info", "/non/existent/model.json"]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_arguments() {
    let files = TestDataFiles::new().unwrap();
    let path = files.libsvm_file.path().to_str().unwrap();

    let output = run(&["train", "--data", path, "-t", "hellinger"]);
    assert!(!output.status.success());

    let output = run(&["train", "--data", path, "--format", "xml"]);
    assert!(!output.status.success());
}
