//! Ballast configuration stored under `.ballast/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Subsystem configuration (TOML).
///
/// Edited by humans; missing file and missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BallastConfig {
    /// Isolated branch mirroring the context log.
    pub log_branch: String,

    /// Per-call timeout for every git subprocess, in seconds.
    pub git_timeout_secs: u64,

    /// Recent primary-branch commits captured into each snapshot.
    pub recent_commits: usize,

    /// Default entry count for `ctx timeline`.
    pub timeline_default: u32,

    /// Default retention for `ctx prune`, in days.
    pub prune_keep_days: u64,

    /// Truncate captured subprocess output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for BallastConfig {
    fn default() -> Self {
        Self {
            log_branch: "ctx/log".to_string(),
            git_timeout_secs: 30,
            recent_commits: 10,
            timeline_default: 10,
            prune_keep_days: 30,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl BallastConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_branch.trim().is_empty() {
            return Err(anyhow!("log_branch must be non-empty"));
        }
        if self.log_branch.starts_with('-') || self.log_branch.contains("..") {
            return Err(anyhow!("log_branch '{}' is not a safe ref name", self.log_branch));
        }
        if self.git_timeout_secs == 0 {
            return Err(anyhow!("git_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn git_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.git_timeout_secs)
    }
}

/// Load config from a TOML file; missing file returns defaults.
pub fn load_config(path: &Path) -> Result<BallastConfig> {
    if !path.exists() {
        let cfg = BallastConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BallastConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BallastConfig) -> Result<()> {
    cfg.validate()?;
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, BallastConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = BallastConfig {
            log_branch: "ctx/alt".to_string(),
            ..BallastConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn rejects_unsafe_branch_names() {
        let cfg = BallastConfig {
            log_branch: "--upload-pack=evil".to_string(),
            ..BallastConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
