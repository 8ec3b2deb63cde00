//! Orchestration for `ctx snapshot` and `ctx decide`.
//!
//! Both follow the same durability ladder: atomic disk write first (fast
//! path), then a mirror commit onto the isolated branch (durable path).
//! A failed mirror degrades durability only — it is logged and the call
//! still succeeds with the disk copy.

use std::path::Path;

use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::core::errors::InvalidArgumentError;
use crate::core::session_id::{session_timestamp, unique_id};
use crate::core::slug::decision_slug;
use crate::core::types::{DecisionRecord, Head, Snapshot};
use crate::io::config::load_config;
use crate::io::git::Git;
use crate::io::init::ensure_dirs;
use crate::io::object_writer::{MirrorFile, commit_files};
use crate::io::orchestrator::{
    next_session_hint, pending_items, read_collab_state, recorded_decisions, workflow_state,
};
use crate::io::paths::StatePaths;
use crate::io::store::{list_stems, write_json_atomic};
use crate::io::{orchestrator, store};

/// Result of `ctx snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub session_id: String,
    /// Short sha of the mirror commit, or `None` when the mirror degraded
    /// to disk-only.
    pub mirrored: Option<String>,
}

/// Result of `ctx decide`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecideOutcome {
    pub file_stem: String,
    pub mirrored: Option<String>,
}

/// Capture the current orchestration state into a new immutable snapshot.
///
/// Git reads are tolerant (`unknown`/empty on failure): a snapshot must
/// succeed even in a degraded repository. Only the disk write can fail the
/// call.
pub fn take_snapshot(root: &Path) -> Result<SnapshotOutcome> {
    let paths = StatePaths::new(root);
    let config = load_config(&paths.config_path)?;
    ensure_dirs(&paths)?;
    let git = Git::new(root, config.git_timeout());

    let branch = git.current_branch().unwrap_or_else(|_| "unknown".to_string());
    let commit = git.head_short().unwrap_or_else(|_| "unknown".to_string());
    let recent_commits = git.recent_commits(config.recent_commits).unwrap_or_default();

    let collab = read_collab_state(&paths.collab_state_path);
    let now = OffsetDateTime::now_utc();
    let existing = list_stems(&paths.sessions_dir)?;
    let base = session_timestamp(now)?;
    let session_id = unique_id(&base, &existing)?;

    let snapshot = Snapshot {
        session_id: session_id.clone(),
        timestamp: now.format(&Rfc3339).context("format timestamp")?,
        branch,
        commit,
        workflow_state: workflow_state(collab.as_ref()),
        pending_items: pending_items(collab.as_ref()),
        decisions: recorded_decisions(collab.as_ref()),
        recent_commits,
        next_session_hint: next_session_hint(&paths.next_session_path),
        ..Snapshot::default()
    };

    let session_path = paths.session_file(&session_id);
    let session_json = write_json_atomic(&session_path, &snapshot)?;
    let head = Head {
        snapshot: Some(snapshot),
        last_decision: None,
        ..Head::default()
    };
    let head_json = write_json_atomic(&paths.head_path, &head)?;

    let files = vec![
        MirrorFile::new(
            paths
                .mirror_path(&session_path)
                .context("session path outside context dir")?,
            session_json,
        ),
        MirrorFile::new(
            paths
                .mirror_path(&paths.head_path)
                .context("head path outside context dir")?,
            head_json,
        ),
    ];
    let message = format!("ctx: snapshot {session_id}");
    let mirrored = mirror_or_degrade(&git, &config.log_branch, &files, &message);

    info!(session_id = %session_id, mirrored = mirrored.is_some(), "snapshot written");
    Ok(SnapshotOutcome {
        session_id,
        mirrored,
    })
}

/// Record a design decision: decision file, Head merge, mirror, and a
/// best-effort append into the collaborator state.
pub fn record_decision(
    root: &Path,
    context: &str,
    choice: &str,
    reason: Option<&str>,
) -> Result<DecideOutcome> {
    if context.trim().is_empty() {
        return Err(InvalidArgumentError::new("decision context must be non-empty").into());
    }
    if choice.trim().is_empty() {
        return Err(InvalidArgumentError::new("decision choice must be non-empty").into());
    }

    let paths = StatePaths::new(root);
    let config = load_config(&paths.config_path)?;
    ensure_dirs(&paths)?;
    let git = Git::new(root, config.git_timeout());

    let now = OffsetDateTime::now_utc();
    let record = DecisionRecord {
        timestamp: now.format(&Rfc3339).context("format timestamp")?,
        commit: git.head_short().unwrap_or_else(|_| "unknown".to_string()),
        branch: git.current_branch().unwrap_or_else(|_| "unknown".to_string()),
        context: context.to_string(),
        choice: choice.to_string(),
        reason: reason.unwrap_or("not specified").to_string(),
        ..DecisionRecord::default()
    };

    let existing = list_stems(&paths.decisions_dir)?;
    let base = format!("{}_{}", session_timestamp(now)?, decision_slug(context));
    let file_stem = unique_id(&base, &existing)?;
    let decision_path = paths.decision_file(&file_stem);
    let decision_json = write_json_atomic(&decision_path, &record)?;

    // Merge into Head; a corrupt Head is recovered by starting fresh.
    let mut head = match store::read_json::<Head>(&paths.head_path) {
        Ok(Some(head)) => head,
        Ok(None) => Head::default(),
        Err(err) => {
            warn!(err = %err, "head unreadable, rebuilding from this decision");
            Head::default()
        }
    };
    head.last_decision = Some(record.clone());
    let head_json = write_json_atomic(&paths.head_path, &head)?;

    let files = vec![
        MirrorFile::new(
            paths
                .mirror_path(&decision_path)
                .context("decision path outside context dir")?,
            decision_json,
        ),
        MirrorFile::new(
            paths
                .mirror_path(&paths.head_path)
                .context("head path outside context dir")?,
            head_json,
        ),
    ];
    let message = format!("ctx: decide {} -> {}", record.context, record.choice);
    let mirrored = mirror_or_degrade(&git, &config.log_branch, &files, &message);

    if let Err(err) = orchestrator::append_decision(&paths.collab_state_path, &record) {
        warn!(err = %err, "could not append decision to collaborator state");
    }

    info!(stem = %file_stem, mirrored = mirrored.is_some(), "decision recorded");
    Ok(DecideOutcome {
        file_stem,
        mirrored,
    })
}

/// Mirror files onto the isolated branch; on failure, log the durability
/// degradation and carry on with the disk copy.
fn mirror_or_degrade(
    git: &Git,
    branch: &str,
    files: &[MirrorFile],
    message: &str,
) -> Option<String> {
    match commit_files(git, branch, files, message) {
        Ok(short) => Some(short),
        Err(err) => {
            warn!(branch, err = %err, "mirror failed, disk copy only");
            None
        }
    }
}
