//! `ctx init` scaffolding for `.ballast/`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::io::config::{BallastConfig, write_config};
use crate::io::paths::StatePaths;

/// Everything inside `.ballast/` is invisible to the primary repository:
/// status stays clean, `clean -fd` leaves it alone, and only the object
/// writer ever moves context files into history.
const SELF_IGNORE: &str = "*\n";

/// Create the `.ballast/` layout.
///
/// Creates anything missing; with `force`, rewrites the gitignore and config
/// back to defaults. Existing sessions, decisions, and head are never
/// touched.
pub fn init_store(root: &Path, force: bool) -> Result<StatePaths> {
    let paths = StatePaths::new(root);
    ensure_dirs(&paths)?;

    if force || !paths.gitignore_path.exists() {
        fs::write(&paths.gitignore_path, SELF_IGNORE)
            .with_context(|| format!("write {}", paths.gitignore_path.display()))?;
    }
    if force || !paths.config_path.exists() {
        write_config(&paths.config_path, &BallastConfig::default())?;
    }

    debug!(dir = %paths.state_dir.display(), "store initialized");
    Ok(paths)
}

/// Create the state/context directories (idempotent). Called by every write
/// path so commands work without an explicit `ctx init`.
pub fn ensure_dirs(paths: &StatePaths) -> Result<()> {
    for dir in [
        &paths.state_dir,
        &paths.context_dir,
        &paths.sessions_dir,
        &paths.decisions_dir,
    ] {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    if !paths.gitignore_path.exists() {
        fs::write(&paths.gitignore_path, SELF_IGNORE)
            .with_context(|| format!("write {}", paths.gitignore_path.display()))?;
    }
    Ok(())
}
