//! Repository watcher built on git2.
//!
//! Responsibilities:
//!
//! - Open the target repository, cloning it from the configured URL when it
//!   does not exist locally.
//! - Best-effort remote sync (fetch + fast-forward) before indexing.
//! - Compute the file set changed between the last indexed commit and HEAD,
//!   or the full tracked file set on first run.

use std::path::{Path, PathBuf};

use git2::{BranchType, Delta, Oid, Repository};
use tracing::{debug, info, warn};

use crate::constants::path_is_ignored;
use crate::errors::CqsError;

// ============================================================================
// ChangedFiles
// ============================================================================

/// The file set to (re)index, relative to the repository root.
#[derive(Debug, Clone, Default)]
pub struct ChangedFiles {
    /// Files added or modified since the base commit.
    pub changed: Vec<PathBuf>,

    /// Files deleted since the base commit; their chunks must be removed.
    pub deleted: Vec<PathBuf>,

    /// Whether this is the full tracked file set (first run or `--all`).
    pub full: bool,
}

impl ChangedFiles {
    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }
}

// ============================================================================
// RepoWatcher
// ============================================================================

/// Wrapper around a git2 [`Repository`] for change detection.
pub struct RepoWatcher {
    repo: Repository,
}

impl std::fmt::Debug for RepoWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoWatcher")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl RepoWatcher {
    /// Open the repository at `path`, cloning from `url` first when the path
    /// does not exist.
    ///
    /// # Errors
    ///
    /// - [`CqsError::RepoMissing`] when the path does not exist and no URL
    ///   is configured.
    /// - [`CqsError::RepoClone`] / [`CqsError::RepoOpen`] on git failures.
    pub fn open_or_clone(url: Option<&str>, path: &Path) -> Result<Self, CqsError> {
        let repo = if path.exists() {
            Repository::open(path).map_err(|e| CqsError::RepoOpen {
                path: path.to_path_buf(),
                reason: e.message().to_string(),
            })?
        } else {
            let url = url.ok_or_else(|| CqsError::RepoMissing {
                path: path.to_path_buf(),
            })?;
            info!("Cloning {} into {}", url, path.display());
            Repository::clone(url, path).map_err(|e| CqsError::RepoClone {
                url: url.to_string(),
                reason: e.message().to_string(),
            })?
        };

        Ok(Self { repo })
    }

    /// Resolve the branch to operate on: `main`, then `master`, then the
    /// current HEAD branch.
    ///
    /// # Errors
    ///
    /// Returns [`CqsError::BranchDetectionFailed`] for an empty repository
    /// or a detached HEAD with no named fallback branch.
    pub fn default_branch(&self) -> Result<String, CqsError> {
        for candidate in ["main", "master"] {
            if self.repo.find_branch(candidate, BranchType::Local).is_ok() {
                return Ok(candidate.to_string());
            }
        }

        let head = self
            .repo
            .head()
            .map_err(|e| CqsError::BranchDetectionFailed(e.message().to_string()))?;
        head.shorthand()
            .filter(|s| *s != "HEAD")
            .map(String::from)
            .ok_or_else(|| {
                CqsError::BranchDetectionFailed(
                    "HEAD is detached and neither `main` nor `master` exists".to_string(),
                )
            })
    }

    /// The commit id HEAD currently points at.
    pub fn head_commit(&self) -> Result<String, CqsError> {
        let commit = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| CqsError::BranchDetectionFailed(e.message().to_string()))?;
        Ok(commit.id().to_string())
    }

    /// Best-effort remote sync: fetch `origin` and fast-forward the branch.
    ///
    /// Failures here must never abort indexing; callers log the error and
    /// proceed against the local state.
    pub fn sync(&self, branch: &str) -> Result<(), CqsError> {
        let mut remote = match self.repo.find_remote("origin") {
            Ok(remote) => remote,
            Err(_) => {
                debug!("No `origin` remote, skipping sync");
                return Ok(());
            }
        };

        remote.fetch(&[branch], None, None)?;

        let fetch_head = self.repo.find_reference("FETCH_HEAD")?;
        let fetch_commit = self.repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = self.repo.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            debug!("Branch {} is up to date", branch);
        } else if analysis.is_fast_forward() {
            info!("Fast-forwarding {} to {}", branch, fetch_commit.id());
            let refname = format!("refs/heads/{}", branch);
            let mut reference = self.repo.find_reference(&refname)?;
            reference.set_target(fetch_commit.id(), "cqs: fast-forward")?;
            self.repo.set_head(&refname)?;
            self.repo
                .checkout_head(Some(git2::build::CheckoutBuilder::default().force()))?;
        } else {
            warn!(
                "Branch {} has diverged from origin; indexing local state",
                branch
            );
        }

        Ok(())
    }

    /// Compute the file set changed since `since`, or the full tracked file
    /// set when `since` is `None`.
    ///
    /// A `since` commit that no longer exists (history rewrite) degrades to
    /// the full file set with a warning.
    pub fn changed_files(&self, since: Option<&str>) -> Result<ChangedFiles, CqsError> {
        let Some(since) = since else {
            return self.all_tracked_files();
        };

        let base_commit = match Oid::from_str(since).and_then(|oid| self.repo.find_commit(oid)) {
            Ok(commit) => commit,
            Err(e) => {
                warn!(
                    "Last indexed commit {} no longer exists ({}); reindexing everything",
                    since,
                    e.message()
                );
                return self.all_tracked_files();
            }
        };

        let head_commit = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| CqsError::BranchDetectionFailed(e.message().to_string()))?;

        if base_commit.id() == head_commit.id() {
            debug!("HEAD unchanged since last index");
            return Ok(ChangedFiles::default());
        }

        let base_tree = base_commit.tree().map_err(|e| CqsError::RepoDiff {
            from: since.to_string(),
            reason: e.message().to_string(),
        })?;
        let head_tree = head_commit.tree().map_err(|e| CqsError::RepoDiff {
            from: since.to_string(),
            reason: e.message().to_string(),
        })?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), None)
            .map_err(|e| CqsError::RepoDiff {
                from: since.to_string(),
                reason: e.message().to_string(),
            })?;

        let mut changed = Vec::new();
        let mut deleted = Vec::new();

        for delta in diff.deltas() {
            match delta.status() {
                Delta::Added | Delta::Modified | Delta::Copied | Delta::Typechange => {
                    if let Some(path) = delta.new_file().path() {
                        push_candidate(&mut changed, path);
                    }
                }
                Delta::Renamed => {
                    if let Some(path) = delta.old_file().path() {
                        push_candidate(&mut deleted, path);
                    }
                    if let Some(path) = delta.new_file().path() {
                        push_candidate(&mut changed, path);
                    }
                }
                Delta::Deleted => {
                    if let Some(path) = delta.old_file().path() {
                        push_candidate(&mut deleted, path);
                    }
                }
                _ => {}
            }
        }

        debug!(
            "Diff {}..HEAD: {} changed, {} deleted",
            &since[..since.len().min(8)],
            changed.len(),
            deleted.len()
        );

        Ok(ChangedFiles {
            changed,
            deleted,
            full: false,
        })
    }

    /// Every tracked file in the repository index.
    fn all_tracked_files(&self) -> Result<ChangedFiles, CqsError> {
        let index = self.repo.index()?;
        let mut changed = Vec::new();

        for entry in index.iter() {
            let path = PathBuf::from(String::from_utf8_lossy(&entry.path).to_string());
            push_candidate(&mut changed, &path);
        }

        debug!("Full file set: {} tracked files", changed.len());

        Ok(ChangedFiles {
            changed,
            deleted: Vec::new(),
            full: true,
        })
    }
}

/// Add a path to the list unless it sits in an always-ignored directory.
fn push_candidate(list: &mut Vec<PathBuf>, path: &Path) {
    if path_is_ignored(path) {
        return;
    }
    list.push(path.to_path_buf());
}

// ============================================================================
// Tests
// ============================================================================
