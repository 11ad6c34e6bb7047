//! End-to-end tests for cellbook CLI commands.
//!
//! These tests run real notebook files. Most use `--in-process` so they do
//! not depend on a built worker binary.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a temporary directory with a test notebook.
struct TestNotebook {
    _temp_dir: TempDir,
    notebook_path: PathBuf,
}

impl TestNotebook {
    fn new(source: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let notebook_path = temp_dir.path().join("notebook.cb");
        fs::write(&notebook_path, source).expect("Failed to write notebook");

        Self {
            _temp_dir: temp_dir,
            notebook_path,
        }
    }

    fn path(&self) -> &str {
        self.notebook_path.to_str().unwrap()
    }
}

fn cellbook() -> Command {
    Command::cargo_bin("cellbook").expect("Failed to find cellbook binary")
}

fn analysis_notebook() -> &'static str {
    r#"%% load
data = [2, 4, 4, 4, 5, 5, 7, 9]
seq = "ATGCGCAT"

%% summary
Stats.describe(data)

%% gc
gc = Seq.gc_content(seq)
display(gc)

%% rc
rc = Seq.reverse_complement(seq)
display(rc, "sequence")
"#
}

/// JSON result lines from stdout.
fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is not JSON"))
        .collect()
}

// =============================================================================
// cellbook run Tests
// =============================================================================

#[test]
fn test_run_nonexistent_notebook() {
    cellbook()
        .args(["run", "/nonexistent/notebook.cb", "--in-process"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Notebook not found"));
}

#[test]
fn test_run_analysis_notebook() {
    let notebook = TestNotebook::new(analysis_notebook());
    cellbook()
        .args(["run", notebook.path(), "--in-process"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed"))
        .stdout(predicate::str::contains("4 cells"))
        .stdout(predicate::str::contains("count: 8"))
        .stdout(predicate::str::contains("0.5"));
}

#[test]
fn test_run_json_results_in_order() {
    let notebook = TestNotebook::new(analysis_notebook());
    let output = cellbook()
        .args(["run", notebook.path(), "--in-process", "--json"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = json_lines(&output.stdout);
    let ids: Vec<_> = lines.iter().map(|l| l["cell_id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["load", "summary", "gc", "rc"]);

    assert_eq!(lines[0]["output"]["data"], "ATGCGCAT");
    assert_eq!(lines[1]["output"]["type"], "table");
    assert_eq!(lines[2]["output"]["data"], "0.5");
    assert_eq!(lines[3]["output"]["type"], "sequence");
    assert_eq!(lines[3]["output"]["data"], "ATGCGCAT");
}

#[test]
fn test_run_reports_failing_cell() {
    let notebook = TestNotebook::new("%% ok\nx = 1\n%% bad\nFoo.bar()\n%% after\ndisplay(x)\n");
    let output = cellbook()
        .args(["run", notebook.path(), "--in-process", "--json"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("1 of 3 cells failed"));

    let lines = json_lines(&output.stdout);
    assert_eq!(lines[1]["output"]["type"], "error");
    assert_eq!(lines[1]["output"]["data"], "Unknown namespace: Foo");
    assert_eq!(lines[2]["output"]["data"], "1");
}

#[test]
fn test_run_empty_notebook() {
    let notebook = TestNotebook::new("\n\n");
    cellbook()
        .args(["run", notebook.path(), "--in-process"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cells found"));
}

#[test]
fn test_run_rejects_bad_timeout() {
    let notebook = TestNotebook::new("x = 1");
    cellbook()
        .args(["run", notebook.path(), "--in-process", "--timeout", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--timeout"));
}

#[test]
fn test_in_process_help_warns_about_hung_cells() {
    cellbook()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hung cells are not isolated"))
        .stdout(predicate::str::contains("abandoned"));
}

#[test]
#[ignore = "Requires cellbook-worker binary"]
fn test_run_with_worker_process() {
    let notebook = TestNotebook::new(analysis_notebook());
    cellbook()
        .args(["run", notebook.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed"));
}
