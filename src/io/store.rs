//! Disk persistence for context documents: atomic JSON writes, tolerant
//! reads, session listing, and age-based pruning.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Serialize `value` as pretty JSON and atomically replace `path`
/// (temp file + rename), so a crash mid-write leaves either the old or the
/// new document, never a truncated one.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<String> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &buf).with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(buf)
}

/// Read and parse a JSON document. Missing file is `None`; an unreadable or
/// unparseable file is an error the caller decides how to degrade.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(value))
}

/// Sorted stems (file names without `.json`) in a document directory.
/// Session ids sort chronologically because they are fixed-width timestamps.
pub fn list_stems(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut stems = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read dir entry in {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(stem) = name.strip_suffix(".json") {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

/// Delete documents older than `keep_days` (by mtime) from `dirs`.
///
/// Disk hygiene only: the isolated branch retains full history and is never
/// rewritten. Returns the number of files removed.
pub fn prune_older_than(dirs: &[&Path], keep_days: u64, now: SystemTime) -> Result<usize> {
    let cutoff = now
        .checked_sub(Duration::from_secs(keep_days * 24 * 60 * 60))
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0usize;
    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
            let entry = entry.with_context(|| format!("read dir entry in {}", dir.display()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .with_context(|| format!("stat {}", path.display()))?;
            if modified < cutoff {
                fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
                debug!(path = %path.display(), "pruned");
                removed += 1;
            }
        }
    }
    Ok(removed)
}
