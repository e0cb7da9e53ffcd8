//! Shared test utilities for cqs-cli integration tests.

use std::fs;
use std::path::Path;

use assert_cmd::Command;

/// Dimension used by the mock embedding backend in tests.
pub const TEST_DIM: &str = "32";

/// Get a Command for the cqs binary, isolated from the host environment.
///
/// - `CQS_MOCK_LLM=1` selects the deterministic in-process backends so tests
///   run without network access or API keys.
/// - `HOME` points into the fixture dir so no user config file leaks in.
/// - `CQS_VECTOR_DIMENSION` is shrunk to keep index files small.
///
/// # Panics
///
/// Panics if the cqs binary cannot be found. This should not happen in a
/// properly configured test environment.
pub fn cqs_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cqs").expect("cqs binary should exist");
    cmd.env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("HOME", home)
        .env("CQS_MOCK_LLM", "1")
        .env("CQS_VECTOR_DIMENSION", TEST_DIM)
        .env("NO_COLOR", "1");
    cmd
}

/// Initialize a git repository with a few source files and one commit.
pub fn init_fixture_repo(root: &Path) -> git2::Repository {
    let repo = git2::Repository::init(root).expect("init repo");

    write_file(
        root,
        "src/db.rs",
        "pub fn connect() {\n    // database connection pool setup\n}\n",
    );
    write_file(
        root,
        "src/ui.rs",
        "pub fn render() {\n    // terminal progress bar rendering\n}\n",
    );
    write_file(root, "README.md", "# fixture\n\nA fixture project.\n");

    commit_all(&repo, "initial");
    repo
}

/// Write a file, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).expect("create parent dirs");
    fs::write(path, content).expect("write file");
}

/// Stage everything and commit.
pub fn commit_all(repo: &git2::Repository, message: &str) -> String {
    let mut index = repo.index().expect("repo index");
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .expect("stage files");
    index.write().expect("write index");
    let tree_id = index.write_tree().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let sig = git2::Signature::now("cqs-test", "cqs@example.com").expect("signature");
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .expect("commit")
        .to_string()
}
