//! Test-only helpers: a disposable git repository with one initial commit.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};

/// A temporary git repository for driving the subsystem end-to-end.
///
/// The directory is removed on drop. Identity and signing are configured
/// locally so commits work in bare CI environments.
pub struct TestRepo {
    temp: tempfile::TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let repo = Self { temp };
        repo.git(&["init"])?;
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"])?;
        repo.git(&["config", "user.email", "harness@example.com"])?;
        repo.git(&["config", "user.name", "Harness"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        repo.write_file("README.md", "# fixture\n")?;
        repo.git(&["add", "-A"])?;
        repo.git(&["commit", "-m", "initial commit"])?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn write_file(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    pub fn head_sha(&self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn current_branch(&self) -> Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Run a git command in the repo, asserting success.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        let out = Command::new("git")
            .args(args)
            .current_dir(self.temp.path())
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !out.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&out.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    /// Run a git command expected to fail, returning its stderr.
    pub fn git_expect_failure(&self, args: &[&str]) -> Result<String> {
        let out = Command::new("git")
            .args(args)
            .current_dir(self.temp.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if out.status.success() {
            return Err(anyhow!("git {} unexpectedly succeeded", args.join(" ")));
        }
        Ok(String::from_utf8_lossy(&out.stderr).trim().to_string())
    }
}
