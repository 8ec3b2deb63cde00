//! Persisted document types shared across the subsystem.
//!
//! Every document carries a `schema_version` tag and deserializes with
//! `#[serde(default)]`: unknown fields are ignored and missing fields take
//! defaults, so older or partially written documents degrade instead of
//! erroring. Readers that need stricter guarantees check fields explicitly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version written into every new document.
pub const SCHEMA_VERSION: u32 = 1;

/// One `hash message` line from `git log --oneline`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitLine {
    pub hash: String,
    pub message: String,
}

/// Point-in-time capture of orchestration state. Immutable once written;
/// superseded by a newer Head, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub schema_version: u32,
    /// Collision-avoided second-precision id, e.g. `20260807T142305`.
    pub session_id: String,
    /// RFC 3339 capture time.
    pub timestamp: String,
    /// Primary branch at capture time (`unknown` when unreadable).
    pub branch: String,
    /// Primary HEAD short sha at capture time (`unknown` when unreadable).
    pub commit: String,
    /// Arbitrary workflow/phase object read from the orchestration
    /// collaborator; shape is owned by the collaborator, not by us.
    pub workflow_state: Value,
    pub pending_items: Vec<Value>,
    pub decisions: Vec<Value>,
    pub recent_commits: Vec<CommitLine>,
    pub next_session_hint: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            session_id: String::new(),
            timestamp: String::new(),
            branch: "unknown".to_string(),
            commit: "unknown".to_string(),
            workflow_state: Value::Null,
            pending_items: Vec::new(),
            decisions: Vec::new(),
            recent_commits: Vec::new(),
            next_session_hint: None,
        }
    }
}

/// Append-only design-decision record, one file per decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionRecord {
    pub schema_version: u32,
    pub timestamp: String,
    pub commit: String,
    pub branch: String,
    pub context: String,
    pub choice: String,
    pub reason: String,
}

impl Default for DecisionRecord {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            timestamp: String::new(),
            commit: "unknown".to_string(),
            branch: "unknown".to_string(),
            context: String::new(),
            choice: String::new(),
            reason: String::new(),
        }
    }
}

/// Most recent known state, duplicated on disk and at the tip of the
/// isolated branch. Replaced wholesale by `snapshot`, merged into by
/// `decide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Head {
    pub schema_version: u32,
    pub snapshot: Option<Snapshot>,
    pub last_decision: Option<DecisionRecord>,
}

impl Default for Head {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            snapshot: None,
            last_decision: None,
        }
    }
}

/// Outcome of one harness attempt, recorded by `loop next`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub success: bool,
    pub error: Option<String>,
}

/// Harness bookkeeping persisted in the lock file. Presence of the file is
/// the advisory lock; at most one loop per working tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopState {
    pub schema_version: u32,
    /// Loop id (UTC unix seconds at init).
    pub id: String,
    /// Current attempt, 1-indexed, monotonically increasing.
    pub attempt: u32,
    pub max_retries: u32,
    pub max_cost: f64,
    /// RFC 3339 init time.
    pub started_at: String,
    pub history: Vec<AttemptRecord>,
}

impl Default for LoopState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: String::new(),
            attempt: 1,
            max_retries: 3,
            max_cost: 2.0,
            started_at: String::new(),
            history: Vec::new(),
        }
    }
}

impl LoopState {
    /// Tag marking the commit the whole loop rolls back to.
    pub fn start_tag(&self) -> String {
        format!("loop-start-{}", self.id)
    }

    /// Tag marking the start of attempt `n`.
    pub fn attempt_tag(&self, n: u32) -> String {
        format!("attempt-{}-{}", self.id, n)
    }
}

/// Verification verdict produced by the external test/build runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyResult {
    pub success: bool,
    pub error: Option<String>,
}
