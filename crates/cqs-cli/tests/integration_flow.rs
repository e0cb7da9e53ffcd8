//! Integration tests for the cqs CLI.
//!
//! These tests exercise the complete flow from index to search/status
//! against a fixture git repository.
//!
//! # Test Strategy
//!
//! - Each test creates a fresh temporary repository
//! - Commands are run via `assert_cmd` against the actual `cqs` binary
//! - `CQS_MOCK_LLM=1` selects the deterministic in-process backends, so no
//!   network access or API key is needed
//! - Tests validate exit codes, stdout, and filesystem artifacts

mod common;

use predicates::prelude::*;
use tempfile::TempDir;

use common::{commit_all, cqs_cmd, init_fixture_repo, write_file};

#[test]
fn test_index_creates_state_and_index() {
    let temp = TempDir::new().expect("create temp dir");
    init_fixture_repo(temp.path());

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed"));

    assert!(temp.path().join(".cqs/state.json").exists());
    assert!(temp.path().join(".cqs/index/vectors.jsonl").exists());
    assert!(temp.path().join(".cqs/index/index.meta.json").exists());
}

#[test]
fn test_index_twice_is_noop() {
    let temp = TempDir::new().expect("create temp dir");
    init_fixture_repo(temp.path());

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success();

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to index"));
}

#[test]
fn test_incremental_index_after_commit() {
    let temp = TempDir::new().expect("create temp dir");
    let repo = init_fixture_repo(temp.path());

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success();

    write_file(
        temp.path(),
        "src/net.rs",
        "pub fn retry() {\n    // http retry with exponential backoff\n}\n",
    );
    commit_all(&repo, "add net module");

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from 1 files"));
}

#[test]
fn test_search_returns_relevant_chunk() {
    let temp = TempDir::new().expect("create temp dir");
    init_fixture_repo(temp.path());

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success();

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["search", "database connection pool", "-k", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Results for: database connection pool"))
        .stdout(predicate::str::contains("src/db.rs"));
}

#[test]
fn test_search_json_output() {
    let temp = TempDir::new().expect("create temp dir");
    init_fixture_repo(temp.path());

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success();

    let output = cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["search", "database connection pool", "-k", "2", "--json"])
        .output()
        .expect("run search --json");

    assert!(output.status.success());
    let chunks: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    let chunks = chunks.as_array().expect("JSON array");
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0]["path"].is_string());
    assert!(chunks[0]["score"].is_number());
}

#[test]
fn test_search_before_index_fails() {
    let temp = TempDir::new().expect("create temp dir");
    init_fixture_repo(temp.path());

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["search", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not indexed"));
}

#[test]
fn test_status_before_and_after_index() {
    let temp = TempDir::new().expect("create temp dir");
    init_fixture_repo(temp.path());

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("no"))
        .stdout(predicate::str::contains("cqs index"));

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success();

    let output = cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["status", "--json"])
        .output()
        .expect("run status --json");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["indexed"], true);
    assert_eq!(report["totalFiles"], 3);
    assert!(report["totalChunks"].as_u64().unwrap() >= 3);
    assert!(report["lastCommit"].is_string());
}

#[test]
fn test_mmr_search_flag() {
    let temp = TempDir::new().expect("create temp dir");
    init_fixture_repo(temp.path());

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["index", "--no-sync"])
        .assert()
        .success();

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args([
            "search",
            "progress bar",
            "-k",
            "2",
            "--mmr",
            "--fetch-k",
            "3",
            "--lambda",
            "0.5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/ui.rs"));
}

#[test]
fn test_repo_flag_points_elsewhere() {
    let temp = TempDir::new().expect("create temp dir");
    let repo_dir = temp.path().join("project");
    std::fs::create_dir_all(&repo_dir).unwrap();
    init_fixture_repo(&repo_dir);

    cqs_cmd(temp.path())
        .current_dir(temp.path())
        .args(["--repo", repo_dir.to_str().unwrap(), "index", "--no-sync"])
        .assert()
        .success();

    assert!(repo_dir.join(".cqs/state.json").exists());
}
