//! Canonical paths within `.ballast/` for a project root.

use std::path::{Path, PathBuf};

/// All subsystem state lives under `.ballast/`, which is self-gitignored so
/// the primary branch, index, and status never see it.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
    pub context_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub decisions_dir: PathBuf,
    pub head_path: PathBuf,
    /// Orchestration collaborator state (read for snapshots, appended for
    /// decisions); owned by the external orchestrator, not by us.
    pub collab_state_path: PathBuf,
    pub next_session_path: PathBuf,
    pub verify_result_path: PathBuf,
    pub lock_path: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(".ballast");
        let context_dir = state_dir.join("context");
        Self {
            root,
            gitignore_path: state_dir.join(".gitignore"),
            config_path: state_dir.join("config.toml"),
            sessions_dir: context_dir.join("sessions"),
            decisions_dir: context_dir.join("decisions"),
            head_path: context_dir.join("HEAD.json"),
            collab_state_path: state_dir.join("state.json"),
            next_session_path: state_dir.join("NEXT_SESSION.md"),
            verify_result_path: state_dir.join("verify_result.json"),
            lock_path: state_dir.join("loop.lock"),
            context_dir,
            state_dir,
        }
    }

    /// Path of a file relative to the context dir, as mirrored onto the
    /// isolated branch (`HEAD.json`, `sessions/<id>.json`, …).
    pub fn mirror_path(&self, file: &Path) -> Option<String> {
        let rel = file.strip_prefix(&self.context_dir).ok()?;
        Some(rel.to_string_lossy().replace('\\', "/"))
    }

    /// The head's path inside the primary repository, used only by the
    /// legacy last-resort restore layer.
    pub fn head_repo_relative(&self) -> String {
        ".ballast/context/HEAD.json".to_string()
    }

    pub fn session_file(&self, id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{id}.json"))
    }

    pub fn decision_file(&self, stem: &str) -> PathBuf {
        self.decisions_dir.join(format!("{stem}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_path_is_context_relative() {
        let paths = StatePaths::new("/work/repo");
        let mirror = paths
            .mirror_path(&paths.session_file("20260807T142305"))
            .expect("mirror path");
        assert_eq!(mirror, "sessions/20260807T142305.json");
        assert_eq!(paths.mirror_path(&paths.head_path).expect("head"), "HEAD.json");
    }

    #[test]
    fn files_outside_context_do_not_mirror() {
        let paths = StatePaths::new("/work/repo");
        assert!(paths.mirror_path(&paths.lock_path).is_none());
    }
}
