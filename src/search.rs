//! Keyword search and timeline over the context log.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::errors::InvalidArgumentError;
use crate::core::types::{CommitLine, Snapshot};
use crate::io::config::load_config;
use crate::io::git::Git;
use crate::io::paths::StatePaths;
use crate::io::store::{list_stems, read_json};

const MAX_LINES_PER_HIT: usize = 3;
const MAX_COMMIT_HITS: usize = 10;

/// One matching file with up to three matching lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHit {
    /// `sessions/<id>.json` or `decisions/<file>.json`.
    pub file: String,
    pub lines: Vec<String>,
}

/// Everything a search found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    pub file_hits: Vec<FileHit>,
    pub commit_hits: Vec<String>,
}

impl SearchReport {
    pub fn total(&self) -> usize {
        self.file_hits.len() + self.commit_hits.len()
    }
}

/// Case-insensitive substring scan across session/decision files plus commit
/// subjects on the isolated and primary branches. Git misses are tolerated;
/// search is a read path.
pub fn search_log(root: &Path, keyword: &str) -> Result<SearchReport> {
    if keyword.trim().is_empty() {
        return Err(InvalidArgumentError::new("search keyword must be non-empty").into());
    }
    let paths = StatePaths::new(root);
    let config = load_config(&paths.config_path)?;
    let git = Git::new(root, config.git_timeout());
    let needle = keyword.to_lowercase();

    let mut report = SearchReport::default();
    for (label, dir) in [
        ("sessions", &paths.sessions_dir),
        ("decisions", &paths.decisions_dir),
    ] {
        scan_dir(label, dir, &needle, &mut report.file_hits)?;
    }

    for rev in [config.log_branch.as_str(), "HEAD"] {
        for line in git.log_grep(rev, keyword, MAX_COMMIT_HITS) {
            if line.contains("ctx:") && !report.commit_hits.contains(&line) {
                report.commit_hits.push(line);
            }
        }
    }

    debug!(keyword, hits = report.total(), "search finished");
    Ok(report)
}

fn scan_dir(label: &str, dir: &Path, needle: &str, hits: &mut Vec<FileHit>) -> Result<()> {
    for stem in list_stems(dir)? {
        let path = dir.join(format!("{stem}.json"));
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        if !contents.to_lowercase().contains(needle) {
            continue;
        }
        let lines = contents
            .lines()
            .filter(|l| l.to_lowercase().contains(needle))
            .take(MAX_LINES_PER_HIT)
            .map(|l| l.trim().to_string())
            .collect();
        hits.push(FileHit {
            file: format!("{label}/{stem}.json"),
            lines,
        });
    }
    Ok(())
}

/// One timeline row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub id: String,
    pub workflow: String,
    pub phase: String,
}

/// Where the timeline came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeline {
    /// Newest-last summaries read from disk session files.
    Disk(Vec<TimelineEntry>),
    /// Disk empty; isolated-branch commit subjects instead.
    Branch(Vec<CommitLine>),
    Empty,
}

/// The `n` most recent session summaries, disk first, branch log fallback.
pub fn timeline(root: &Path, n: Option<u32>) -> Result<Timeline> {
    let paths = StatePaths::new(root);
    let config = load_config(&paths.config_path)?;
    let n = n.unwrap_or(config.timeline_default) as usize;

    let stems = list_stems(&paths.sessions_dir)?;
    if !stems.is_empty() {
        let mut entries = Vec::new();
        for id in stems.iter().rev().take(n).rev() {
            let snapshot = read_json::<Snapshot>(&paths.session_file(id))
                .unwrap_or_default()
                .unwrap_or_default();
            let field = |key: &str| -> String {
                snapshot
                    .workflow_state
                    .get(key)
                    .and_then(|v| v.as_str())
                    .unwrap_or("-")
                    .to_string()
            };
            entries.push(TimelineEntry {
                id: id.clone(),
                workflow: field("workflow"),
                phase: field("phase"),
            });
        }
        return Ok(Timeline::Disk(entries));
    }

    let git = Git::new(root, config.git_timeout());
    let lines = git.log_oneline(&config.log_branch, n);
    if lines.is_empty() {
        Ok(Timeline::Empty)
    } else {
        Ok(Timeline::Branch(lines))
    }
}
