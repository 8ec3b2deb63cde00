//! The loop lock/state file.
//!
//! Presence of `.ballast/loop.lock` is the advisory lock: at most one loop
//! per working tree, and callers must serialize harness operations. The file
//! body is the persisted [`LoopState`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::LoopState;
use crate::io::store::{read_json, write_json_atomic};

/// True if a lock file exists, readable or not. An unparseable lock still
/// blocks `loop init`: it marks a prior unfinished loop needing inspection.
pub fn lock_exists(path: &Path) -> bool {
    path.exists()
}

/// Load the active loop state; `None` when no loop is active.
/// A corrupt lock is an error, not an absent loop.
pub fn load_loop_state(path: &Path) -> Result<Option<LoopState>> {
    read_json(path)
}

/// Atomically persist the loop state.
pub fn save_loop_state(path: &Path, state: &LoopState) -> Result<()> {
    write_json_atomic(path, state)?;
    debug!(id = %state.id, attempt = state.attempt, "loop state saved");
    Ok(())
}

/// Remove the lock, releasing the harness.
pub fn remove_lock(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("remove lock {}", path.display()))?;
    debug!(path = %path.display(), "lock removed");
    Ok(())
}
