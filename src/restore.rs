//! Layered restore/recover resolution.
//!
//! The order is a contract: disk Head first (fast), the isolated branch as
//! the durability backstop, the newest disk session file, and the primary
//! branch only as a legacy last resort. Later layers may be staler and must
//! never override a fresher earlier layer; a corrupt earlier layer logs a
//! recovery warning and falls through.

use std::fmt;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, instrument, warn};

use crate::core::types::{Head, Snapshot};
use crate::io::config::load_config;
use crate::io::git::Git;
use crate::io::paths::StatePaths;
use crate::io::store::{list_stems, read_json, write_json_atomic};

/// Which layer produced the restored context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    DiskHead,
    LogBranch,
    SessionFile,
    PrimaryHistory,
}

impl fmt::Display for RestoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DiskHead => "disk head",
            Self::LogBranch => "log branch",
            Self::SessionFile => "session file",
            Self::PrimaryHistory => "primary history (legacy)",
        };
        f.write_str(name)
    }
}

/// Outcome of `ctx restore`.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    Restored { source: RestoreSource, head: Head },
    /// No context history anywhere — a normal fresh start, not an error.
    Fresh,
}

/// Outcome of `ctx recover`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoverOutcome {
    Recovered {
        id: String,
        source: RestoreSource,
        snapshot: Snapshot,
    },
    NotFound { id: String },
}

/// Resolve the most recent known context, first hit wins.
#[instrument(skip_all)]
pub fn restore_head(root: &Path) -> Result<RestoreOutcome> {
    let paths = StatePaths::new(root);
    let config = load_config(&paths.config_path)?;
    let git = Git::new(root, config.git_timeout());

    // Layer 1: disk Head, authoritative when present and valid.
    match read_json::<Head>(&paths.head_path) {
        Ok(Some(head)) => {
            debug!("restored from disk head");
            return Ok(RestoreOutcome::Restored {
                source: RestoreSource::DiskHead,
                head,
            });
        }
        Ok(None) => {}
        Err(err) => warn!(err = %err, "disk head unreadable, falling back"),
    }

    // Layer 2: Head at the isolated branch tip, read without checkout.
    if let Some(head) = head_from_ref(&git, &config.log_branch, "HEAD.json") {
        // Heal the fast path for the next caller; best-effort.
        if let Err(err) = write_json_atomic(&paths.head_path, &head) {
            warn!(err = %err, "could not heal disk head");
        }
        debug!("restored from log branch");
        return Ok(RestoreOutcome::Restored {
            source: RestoreSource::LogBranch,
            head,
        });
    }

    // Layer 3: newest disk session file.
    match newest_disk_session(&paths) {
        Ok(Some((_, snapshot))) => {
            debug!("restored from session file");
            return Ok(RestoreOutcome::Restored {
                source: RestoreSource::SessionFile,
                head: Head {
                    snapshot: Some(snapshot),
                    ..Head::default()
                },
            });
        }
        Ok(None) => {}
        Err(err) => warn!(err = %err, "session files unreadable, falling back"),
    }

    // Layer 4: legacy — Head committed on the primary branch.
    if let Some(head) = head_from_ref(&git, "HEAD", &paths.head_repo_relative()) {
        debug!("restored from primary history");
        return Ok(RestoreOutcome::Restored {
            source: RestoreSource::PrimaryHistory,
            head,
        });
    }

    Ok(RestoreOutcome::Fresh)
}

/// Resolve a named (or the most recent) snapshot: disk first, branch second.
pub fn recover_session(root: &Path, selector: &str) -> Result<RecoverOutcome> {
    let paths = StatePaths::new(root);
    let config = load_config(&paths.config_path)?;
    let git = Git::new(root, config.git_timeout());

    let id = if selector == "latest" {
        match latest_session_id(&paths, &git, &config.log_branch)? {
            Some(id) => id,
            None => {
                return Ok(RecoverOutcome::NotFound {
                    id: selector.to_string(),
                });
            }
        }
    } else {
        selector.to_string()
    };

    match read_json::<Snapshot>(&paths.session_file(&id)) {
        Ok(Some(snapshot)) => {
            return Ok(RecoverOutcome::Recovered {
                id,
                source: RestoreSource::SessionFile,
                snapshot,
            });
        }
        Ok(None) => {}
        Err(err) => warn!(err = %err, "disk session unreadable, trying branch"),
    }

    let branch_path = format!("sessions/{id}.json");
    if let Ok(Some(raw)) = git.show_file(&config.log_branch, &branch_path)
        && let Ok(snapshot) = serde_json::from_str::<Snapshot>(&raw)
    {
        return Ok(RecoverOutcome::Recovered {
            id,
            source: RestoreSource::LogBranch,
            snapshot,
        });
    }

    Ok(RecoverOutcome::NotFound { id })
}

/// Parse a Head out of `rev:path`; `None` on any miss or parse failure
/// (logged — this is a fallback chain, not an error path).
fn head_from_ref(git: &Git, rev: &str, path: &str) -> Option<Head> {
    let raw = match git.show_file(rev, path) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            debug!(rev, err = %err, "branch read unavailable");
            return None;
        }
    };
    match serde_json::from_str::<Head>(&raw) {
        Ok(head) => Some(head),
        Err(err) => {
            warn!(rev, err = %err, "committed head unparseable, falling back");
            None
        }
    }
}

fn newest_disk_session(paths: &StatePaths) -> Result<Option<(String, Snapshot)>> {
    let stems = list_stems(&paths.sessions_dir)?;
    let Some(id) = stems.last() else {
        return Ok(None);
    };
    let snapshot = read_json::<Snapshot>(&paths.session_file(id))?;
    Ok(snapshot.map(|s| (id.clone(), s)))
}

/// Most recent session id: disk listing first, branch tree listing second.
fn latest_session_id(paths: &StatePaths, git: &Git, log_branch: &str) -> Result<Option<String>> {
    let stems = list_stems(&paths.sessions_dir)?;
    if let Some(id) = stems.last() {
        return Ok(Some(id.clone()));
    }
    let mut names = git.ls_tree_names(log_branch, "sessions/")?;
    names.sort();
    Ok(names
        .last()
        .and_then(|n| n.strip_prefix("sessions/"))
        .and_then(|n| n.strip_suffix(".json"))
        .map(|n| n.to_string()))
}
