//! The checkpoint/rollback/circuit-breaker state machine over a working
//! tree.
//!
//! `init` fails fast (missing repo, dirty tree, existing lock) before any
//! mutation; every state-changing git invocation surfaces the literal
//! failing command and captured stderr; informational paths (tag cleanup)
//! tolerate failure. Nothing here retries — retry policy is the caller's
//! loop, bounded by `max_retries`.

use std::path::Path;

use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

use crate::core::errors::PreconditionError;
use crate::core::types::{AttemptRecord, LoopState, VerifyResult};
use crate::io::config::load_config;
use crate::io::git::Git;
use crate::io::init::ensure_dirs;
use crate::io::lock::{load_loop_state, lock_exists, remove_lock, save_loop_state};
use crate::io::paths::StatePaths;
use crate::io::store::read_json;

/// Result of `loop init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub id: String,
    pub start_tag: String,
    pub max_retries: u32,
}

/// Result of `loop verify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Pass,
    Fail { error: Option<String> },
}

/// Result of `loop next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Advanced to the given attempt.
    Continue { attempt: u32, max_retries: u32 },
    /// Circuit breaker tripped: attempt exceeded `max_retries`. Lock and
    /// tags are deliberately left behind for inspection.
    Exhausted { attempt: u32, max_retries: u32 },
}

/// Result of `loop success` / `loop abort`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Cleaned { tags_deleted: usize },
    NoActiveLoop,
}

/// Start a new loop: clean-slate checks, lock, and the rollback anchor tag.
pub fn init_loop(root: &Path, max_retries: u32, max_cost: f64) -> Result<InitOutcome> {
    let paths = StatePaths::new(root);
    let config = load_config(&paths.config_path)?;
    let git = Git::new(root, config.git_timeout());

    if !git.is_repo() {
        return Err(PreconditionError::new(
            "not a git repository (the harness requires version control)",
        )
        .into());
    }
    git.ensure_clean()
        .context("the harness requires a clean slate; commit or stash first")?;
    if lock_exists(&paths.lock_path) {
        let detail = match load_loop_state(&paths.lock_path) {
            Ok(Some(state)) => format!("previous loop {} did not finish", state.id),
            _ => "previous loop left an unreadable lock".to_string(),
        };
        return Err(PreconditionError::new(format!(
            "{detail}; run `ballast loop abort` to release it"
        ))
        .into());
    }

    // Scaffold the self-ignored state dir before the lock lands in it, so
    // the lock never shows up in status and `clean -fd` leaves it alone.
    ensure_dirs(&paths)?;

    let now = OffsetDateTime::now_utc();
    let state = LoopState {
        id: now.unix_timestamp().to_string(),
        attempt: 1,
        max_retries,
        max_cost,
        started_at: now.format(&Rfc3339).context("format start time")?,
        history: Vec::new(),
        ..LoopState::default()
    };
    save_loop_state(&paths.lock_path, &state)?;

    let start_tag = state.start_tag();
    if let Err(err) = git.tag(&start_tag) {
        // Do not leave a half-initialized loop behind.
        if let Err(cleanup) = remove_lock(&paths.lock_path) {
            warn!(err = %cleanup, "could not remove lock after failed tag");
        }
        return Err(err).with_context(|| format!("tag {start_tag}"));
    }

    info!(id = %state.id, max_retries, "loop initialized");
    Ok(InitOutcome {
        id: state.id.clone(),
        start_tag,
        max_retries,
    })
}

/// Tag the current commit as the start of the current attempt. Idempotent:
/// re-running a checkpoint moves the same tag.
pub fn checkpoint(root: &Path) -> Result<String> {
    let (paths, git) = open(root)?;
    let state = require_state(&paths)?;
    let tag = state.attempt_tag(state.attempt);
    git.tag_force(&tag).with_context(|| format!("tag {tag}"))?;
    info!(tag = %tag, "checkpoint created");
    Ok(tag)
}

/// Read the external runner's verification verdict. Never runs tests.
pub fn verify(root: &Path) -> Result<VerifyOutcome> {
    let (paths, _) = open(root)?;
    require_state(&paths)?;
    let result = read_json::<VerifyResult>(&paths.verify_result_path)
        .with_context(|| {
            format!(
                "verification result unreadable {}",
                paths.verify_result_path.display()
            )
        })?
        .ok_or_else(|| {
            PreconditionError::new(format!(
                "verification result missing {}",
                paths.verify_result_path.display()
            ))
        })?;
    if result.success {
        Ok(VerifyOutcome::Pass)
    } else {
        Ok(VerifyOutcome::Fail {
            error: result.error,
        })
    }
}

/// Hard-reset tree and index to the loop-start tag and remove untracked
/// files. Unconditional: incremental recovery of arbitrary agent-generated
/// changes is not decidable.
pub fn rollback(root: &Path) -> Result<String> {
    let (paths, git) = open(root)?;
    let state = require_state(&paths)?;
    let target = state.start_tag();
    git.reset_hard(&target)
        .with_context(|| format!("reset to {target}"))?;
    git.clean_untracked().context("remove untracked files")?;
    info!(target = %target, "rolled back to clean slate");
    Ok(target)
}

/// Record the last verification result and advance the attempt counter;
/// trips the circuit breaker past `max_retries`.
pub fn next_attempt(root: &Path) -> Result<AdvanceOutcome> {
    let (paths, _) = open(root)?;
    let mut state = require_state(&paths)?;

    match read_json::<VerifyResult>(&paths.verify_result_path) {
        Ok(Some(result)) => state.history.push(AttemptRecord {
            attempt: state.attempt,
            success: result.success,
            error: result.error,
        }),
        Ok(None) => debug!("no verification result to record"),
        Err(err) => warn!(err = %err, "verification result unreadable, not recorded"),
    }

    state.attempt += 1;
    save_loop_state(&paths.lock_path, &state)?;

    if state.attempt > state.max_retries {
        warn!(
            attempt = state.attempt,
            max_retries = state.max_retries,
            "max retries exceeded, loop failed"
        );
        Ok(AdvanceOutcome::Exhausted {
            attempt: state.attempt,
            max_retries: state.max_retries,
        })
    } else {
        info!(attempt = state.attempt, "advancing");
        Ok(AdvanceOutcome::Continue {
            attempt: state.attempt,
            max_retries: state.max_retries,
        })
    }
}

/// Delete every tag this loop created and release the lock.
pub fn succeed(root: &Path) -> Result<CleanupOutcome> {
    let (paths, git) = open(root)?;
    let Some(state) = load_loop_state(&paths.lock_path)? else {
        return Ok(CleanupOutcome::NoActiveLoop);
    };

    let mut tags = Vec::new();
    for pattern in [state.start_tag(), format!("attempt-{}-*", state.id)] {
        match git.list_tags(&pattern) {
            Ok(found) => tags.extend(found),
            Err(err) => warn!(pattern = %pattern, err = %err, "could not list tags"),
        }
    }
    let mut deleted = 0usize;
    for tag in &tags {
        match git.delete_tag(tag) {
            Ok(()) => deleted += 1,
            Err(err) => warn!(tag = %tag, err = %err, "could not delete tag"),
        }
    }

    remove_lock(&paths.lock_path)?;
    info!(deleted, "loop succeeded, harness released");
    Ok(CleanupOutcome::Cleaned {
        tags_deleted: deleted,
    })
}

/// Emergency stop: release only the lock. Tags and tree are left untouched
/// because the caller's intent is ambiguous.
pub fn abort_loop(root: &Path) -> Result<CleanupOutcome> {
    let paths = StatePaths::new(root);
    if !lock_exists(&paths.lock_path) {
        return Ok(CleanupOutcome::NoActiveLoop);
    }
    remove_lock(&paths.lock_path)?;
    info!("loop aborted, lock removed");
    Ok(CleanupOutcome::Cleaned { tags_deleted: 0 })
}

fn open(root: &Path) -> Result<(StatePaths, Git)> {
    let paths = StatePaths::new(root);
    let config = load_config(&paths.config_path)?;
    let git = Git::new(root, config.git_timeout());
    Ok((paths, git))
}

fn require_state(paths: &StatePaths) -> Result<LoopState> {
    load_loop_state(&paths.lock_path)?
        .ok_or_else(|| PreconditionError::new("no active loop (run `ballast loop init`)").into())
}
