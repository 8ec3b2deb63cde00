//! Committing (path, content) pairs onto a branch through object-level
//! plumbing.
//!
//! The caller's checked-out branch, real index, and working tree are never
//! touched: the tip tree is read into a private index file inside a
//! process-scoped temp directory (selected via `GIT_INDEX_FILE` on the child
//! only), new blobs are overlaid, and the resulting commit fast-forwards the
//! branch ref with a compare-and-swap. Commit messages travel through
//! `-F <file>`, blob contents through `--stdin`; no argument ever passes
//! through a shell.
//!
//! TempDir RAII removes the index and message file on every exit path,
//! including failure.

use std::fs;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::io::git::Git;

/// One file to commit: a path relative to the branch root plus its content.
#[derive(Debug, Clone)]
pub struct MirrorFile {
    pub path: String,
    pub content: String,
}

impl MirrorFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Commit `files` onto `branch`, creating the branch as an orphan if needed.
///
/// Returns the new tip's short sha. Any failure (git missing, uninitialized
/// repository, lost ref race) is an error the caller treats as a durability
/// degradation; nothing observable is left behind.
#[instrument(skip_all, fields(branch, files = files.len()))]
pub fn commit_files(git: &Git, branch: &str, files: &[MirrorFile], message: &str) -> Result<String> {
    let refname = format!("refs/heads/{branch}");
    let staging = tempfile::Builder::new()
        .prefix("ballast-mirror-")
        .tempdir()
        .context("create mirror staging dir")?;
    let index_path = staging.path().join("index");
    let message_path = staging.path().join("COMMIT_MSG");

    let tip = match git.rev_parse(&refname)? {
        Some(tip) => tip,
        None => create_orphan_root(git, &refname)?,
    };

    // Base the private index on the current tip tree.
    git.run_checked_with(&["read-tree", &tip], Some(&index_path), None)?;

    for file in files {
        let blob = git
            .run_checked_with(&["hash-object", "-w", "--stdin"], None, Some(file.content.as_bytes()))?
            .stdout_text()
            .trim()
            .to_string();
        let cacheinfo = format!("100644,{blob},{}", file.path);
        git.run_checked_with(
            &["update-index", "--add", "--cacheinfo", &cacheinfo],
            Some(&index_path),
            None,
        )?;
    }

    let tree = git
        .run_checked_with(&["write-tree"], Some(&index_path), None)?
        .stdout_text()
        .trim()
        .to_string();

    fs::write(&message_path, message)
        .with_context(|| format!("write commit message {}", message_path.display()))?;
    let message_arg = message_path.to_string_lossy().to_string();
    let commit = git
        .run_checked(&["commit-tree", &tree, "-p", &tip, "-F", &message_arg])?
        .stdout_text()
        .trim()
        .to_string();

    // Compare-and-swap: a concurrent committer loses the race as a clean
    // failure, never as ref corruption.
    git.run_checked(&["update-ref", &refname, &commit, &tip])?;

    let short = git.short_sha(&commit)?;
    debug!(commit = %short, "mirror commit written");
    Ok(short)
}

/// Create `refname` pointing at an orphan empty-tree commit and return that
/// commit's sha.
fn create_orphan_root(git: &Git, refname: &str) -> Result<String> {
    let empty_tree = git
        .run_checked_with(&["mktree"], None, Some(b""))?
        .stdout_text()
        .trim()
        .to_string();

    let staging = tempfile::Builder::new()
        .prefix("ballast-mirror-root-")
        .tempdir()
        .context("create orphan staging dir")?;
    let message_path = staging.path().join("COMMIT_MSG");
    fs::write(&message_path, "ctx: initialize log branch\n")
        .with_context(|| format!("write commit message {}", message_path.display()))?;
    let message_arg = message_path.to_string_lossy().to_string();

    let commit = git
        .run_checked(&["commit-tree", &empty_tree, "-F", &message_arg])?
        .stdout_text()
        .trim()
        .to_string();
    // Empty old-value: the ref must not exist yet, so a creation race fails
    // cleanly instead of overwriting.
    git.run_checked(&["update-ref", refname, &commit, ""])?;
    debug!(refname, "log branch bootstrapped");
    Ok(commit)
}
