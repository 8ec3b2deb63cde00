//! Argument-vector git adapter.
//!
//! Every invocation is a `Command` with an explicit argv — no shell is ever
//! involved, so user-supplied text (decision reasons, commit messages, file
//! contents) can never break out of an argument. Every call is bounded by
//! the configured timeout via [`crate::io::process`].
//!
//! Read helpers degrade to empty results where the caller can carry on;
//! write helpers fail with [`GitCommandError`] carrying the literal command
//! line and captured stderr.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::errors::{GitCommandError, PreconditionError};
use crate::core::types::CommitLine;
use crate::io::process::{CommandOutput, run_with_timeout};

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or `??` for untracked.
    pub code: String,
    pub path: String,
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True if `workdir` is inside a git repository.
    pub fn is_repo(&self) -> bool {
        matches!(self.run(&["rev-parse", "--git-dir"], None, None), Ok(out) if out.success())
    }

    /// Current branch name; `HEAD` on detached head.
    pub fn current_branch(&self) -> Result<String> {
        self.capture(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Short sha of the current HEAD.
    pub fn head_short(&self) -> Result<String> {
        self.capture(&["rev-parse", "--short", "HEAD"])
    }

    /// Short sha of an arbitrary commit.
    pub fn short_sha(&self, commit: &str) -> Result<String> {
        self.capture(&["rev-parse", "--short", commit])
    }

    /// Resolve a ref to a full sha, or `None` if it does not exist.
    pub fn rev_parse(&self, refname: &str) -> Result<Option<String>> {
        let out = self.run(&["rev-parse", "--verify", "--quiet", refname], None, None)?;
        if out.success() {
            Ok(Some(out.stdout_text().trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Status entries (including untracked) in porcelain v1 format.
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let out = self.capture(&["status", "--porcelain=v1", "-uall"])?;
        let mut entries = Vec::new();
        for line in out.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_status_line(line)?);
        }
        Ok(entries)
    }

    /// Fail with a precondition error unless the worktree is fully clean
    /// (including untracked files).
    pub fn ensure_clean(&self) -> Result<()> {
        let entries = self.status_porcelain()?;
        if entries.is_empty() {
            debug!("worktree is clean");
            return Ok(());
        }
        let mut listing = String::new();
        for entry in &entries {
            listing.push_str(&format!("\n  {} {}", entry.code, entry.path));
        }
        Err(PreconditionError::new(format!(
            "working tree not clean ({} change(s)):{listing}",
            entries.len()
        ))
        .into())
    }

    /// The `n` most recent `hash message` pairs on HEAD.
    pub fn recent_commits(&self, n: usize) -> Result<Vec<CommitLine>> {
        let arg = format!("-{n}");
        let out = self.capture(&["log", "--oneline", "--no-decorate", &arg])?;
        Ok(parse_oneline(&out))
    }

    /// Read a file from a committed tree (`rev:path`) without touching the
    /// worktree. `None` when the rev or path does not exist.
    pub fn show_file(&self, rev: &str, path: &str) -> Result<Option<String>> {
        let pathspec = format!("{rev}:{path}");
        let out = self.run(&["show", &pathspec], None, None)?;
        if out.success() {
            Ok(Some(out.stdout_text()))
        } else {
            debug!(pathspec = %pathspec, "show found nothing");
            Ok(None)
        }
    }

    /// File names under `prefix` in a committed tree; empty when the ref is
    /// missing.
    pub fn ls_tree_names(&self, rev: &str, prefix: &str) -> Result<Vec<String>> {
        let out = self.run(&["ls-tree", "--name-only", rev, prefix], None, None)?;
        if !out.success() {
            return Ok(Vec::new());
        }
        Ok(out
            .stdout_text()
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// Commit subjects on `rev` matching `keyword` (case-insensitive).
    /// Empty on any failure; search is a read path.
    pub fn log_grep(&self, rev: &str, keyword: &str, limit: usize) -> Vec<String> {
        let grep = format!("--grep={keyword}");
        let max = format!("-{limit}");
        match self.run(
            &["log", "--oneline", "--no-decorate", "-i", &grep, &max, rev],
            None,
            None,
        ) {
            Ok(out) if out.success() => out
                .stdout_text()
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `hash message` lines on `rev`; empty on any failure.
    pub fn log_oneline(&self, rev: &str, limit: usize) -> Vec<CommitLine> {
        let max = format!("-{limit}");
        match self.run(&["log", "--oneline", "--no-decorate", &max, rev], None, None) {
            Ok(out) if out.success() => parse_oneline(&out.stdout_text()),
            _ => Vec::new(),
        }
    }

    /// Create or move a tag (idempotent re-tagging).
    pub fn tag_force(&self, name: &str) -> Result<()> {
        self.run_checked(&["tag", "--force", name])?;
        Ok(())
    }

    /// Create a tag; fails if it already exists.
    pub fn tag(&self, name: &str) -> Result<()> {
        self.run_checked(&["tag", name])?;
        Ok(())
    }

    /// Delete a tag.
    pub fn delete_tag(&self, name: &str) -> Result<()> {
        self.run_checked(&["tag", "-d", name])?;
        Ok(())
    }

    /// Tags matching a glob pattern, e.g. `attempt-123-*`.
    pub fn list_tags(&self, pattern: &str) -> Result<Vec<String>> {
        let out = self.capture(&["tag", "-l", pattern])?;
        Ok(out
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// Hard-reset worktree and index to `target`.
    pub fn reset_hard(&self, target: &str) -> Result<()> {
        self.run_checked(&["reset", "--hard", target])?;
        Ok(())
    }

    /// Remove untracked files and directories (ignored files are kept).
    pub fn clean_untracked(&self) -> Result<()> {
        self.run_checked(&["clean", "-fd"])?;
        Ok(())
    }

    /// Run a raw git invocation; tolerant of non-zero exit (callers check).
    pub(crate) fn run(
        &self,
        args: &[&str],
        index_file: Option<&Path>,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Some(index) = index_file {
            cmd.env("GIT_INDEX_FILE", index);
        }
        run_with_timeout(cmd, stdin, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("spawn {}", command_line(args)))
    }

    /// Run a git invocation that must succeed; surfaces the literal command
    /// line and captured stderr on failure.
    pub(crate) fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        self.run_checked_with(args, None, None)
    }

    pub(crate) fn run_checked_with(
        &self,
        args: &[&str],
        index_file: Option<&Path>,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput> {
        let out = self.run(args, index_file, stdin)?;
        if !out.success() {
            return Err(GitCommandError {
                command: command_line(args),
                stderr: out.stderr_text(),
                timed_out: out.timed_out,
            }
            .into());
        }
        Ok(out)
    }

    fn capture(&self, args: &[&str]) -> Result<String> {
        let out = self.run_checked(args)?;
        Ok(out.stdout_text().trim().to_string())
    }
}

fn command_line(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

fn parse_status_line(line: &str) -> Result<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 {
        return Err(anyhow::anyhow!("unexpected porcelain line: '{line}'"));
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry { code, path })
}

fn parse_oneline(raw: &str) -> Vec<CommitLine> {
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| match line.split_once(' ') {
            Some((hash, message)) => CommitLine {
                hash: hash.to_string(),
                message: message.trim().to_string(),
            },
            None => CommitLine {
                hash: line.trim().to_string(),
                message: String::new(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_untracked_line() {
        let e = parse_status_line("?? foo.txt").expect("parse");
        assert_eq!(e.code, "??");
        assert_eq!(e.path, "foo.txt");
    }

    #[test]
    fn parses_modified_line() {
        let e = parse_status_line(" M src/main.rs").expect("parse");
        assert_eq!(e.code, " M");
        assert_eq!(e.path, "src/main.rs");
    }

    #[test]
    fn parses_rename_line_uses_new_path() {
        let e = parse_status_line("R  old.txt -> new.txt").expect("parse");
        assert_eq!(e.path, "new.txt");
    }

    #[test]
    fn parses_oneline_log() {
        let lines = parse_oneline("abc1234 fix the thing\ndef5678 add feature\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].hash, "abc1234");
        assert_eq!(lines[0].message, "fix the thing");
    }
}
