//! Reading and (best-effort) appending to the external orchestrator's state.
//!
//! The collaborator owns `.ballast/state.json` — arbitrary JSON describing
//! workflow, phase, pending tasks, and accumulated decisions. Snapshots read
//! it tolerantly; `decide` appends to `design_decisions` without ever
//! failing the caller.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde_json::{Value, json};
use tracing::debug;

use crate::core::types::DecisionRecord;
use crate::io::store::write_json_atomic;

/// Read the collaborator state. Missing or corrupt files are `None`: the
/// snapshot must proceed with whatever is observable.
pub fn read_collab_state(path: &Path) -> Option<Value> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(path = %path.display(), err = %err, "collaborator state unavailable");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(path = %path.display(), err = %err, "collaborator state unparseable");
            None
        }
    }
}

/// Condense the collaborator state into the snapshot's `workflow_state`
/// object: workflow/phase/project identity plus progress counters.
pub fn workflow_state(state: Option<&Value>) -> Value {
    let Some(state) = state else {
        return json!({ "note": "no active session" });
    };
    let current = state.get("current");
    let field = |obj: Option<&Value>, key: &str| -> Value {
        obj.and_then(|o| o.get(key)).cloned().unwrap_or(Value::Null)
    };
    json!({
        "workflow": field(current, "workflow"),
        "phase": field(current, "phase"),
        "project": field(current, "project"),
        "autonomy_level": state.get("autonomy_level").cloned().unwrap_or(json!(2)),
        "workflows_executed": field(state.get("metrics"), "workflows_executed"),
        "tasks_completed": field(state.get("metrics"), "tasks_completed"),
    })
}

/// Pending tasks from the collaborator, excluding completed ones.
pub fn pending_items(state: Option<&Value>) -> Vec<Value> {
    state
        .and_then(|s| s.get("pending_tasks"))
        .and_then(|v| v.as_array())
        .map(|tasks| {
            tasks
                .iter()
                .filter(|t| t.get("status").and_then(|s| s.as_str()) != Some("done"))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Decisions the collaborator has accumulated so far.
pub fn recorded_decisions(state: Option<&Value>) -> Vec<Value> {
    state
        .and_then(|s| s.get("design_decisions"))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// The free-form hint for the next session, if the orchestrator left one.
pub fn next_session_hint(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Append a decision to the collaborator's `design_decisions` and bump
/// `updated_at`. Best-effort: the caller logs failure and moves on.
pub fn append_decision(path: &Path, record: &DecisionRecord) -> Result<()> {
    let Some(mut state) = read_collab_state(path) else {
        // No collaborator state to annotate; nothing to do.
        return Ok(());
    };
    if !state.is_object() {
        return Ok(());
    }
    let entry = json!({
        "context": record.context,
        "decision": record.choice,
        "reason": record.reason,
        "timestamp": record.timestamp,
        "git_commit": record.commit,
    });
    if let Some(obj) = state.as_object_mut() {
        match obj.get_mut("design_decisions") {
            Some(Value::Array(list)) => list.push(entry),
            _ => {
                obj.insert("design_decisions".to_string(), Value::Array(vec![entry]));
            }
        }
        obj.insert("updated_at".to_string(), json!(record.timestamp));
    }
    write_json_atomic(path, &state)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> Value {
        json!({
            "current": { "workflow": "evolve", "phase": "verify", "project": "demo" },
            "autonomy_level": 3,
            "metrics": { "workflows_executed": 12, "tasks_completed": 4 },
            "pending_tasks": [
                { "task": "wire codec", "status": "open" },
                { "task": "ship", "status": "done" }
            ],
            "design_decisions": [ { "context": "db", "decision": "sqlite" } ]
        })
    }

    #[test]
    fn workflow_state_condenses_current_and_metrics() {
        let state = sample_state();
        let ws = workflow_state(Some(&state));
        assert_eq!(ws["workflow"], "evolve");
        assert_eq!(ws["phase"], "verify");
        assert_eq!(ws["tasks_completed"], 4);
    }

    #[test]
    fn workflow_state_without_collaborator_notes_absence() {
        let ws = workflow_state(None);
        assert_eq!(ws["note"], "no active session");
    }

    #[test]
    fn pending_items_excludes_done() {
        let state = sample_state();
        let items = pending_items(Some(&state));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["task"], "wire codec");
    }

    #[test]
    fn append_decision_grows_list_and_stamps_updated_at() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        write_json_atomic(&path, &sample_state()).expect("seed");

        let record = DecisionRecord {
            context: "cache".to_string(),
            choice: "lru".to_string(),
            reason: "bounded memory".to_string(),
            timestamp: "2026-08-07T14:23:05Z".to_string(),
            ..DecisionRecord::default()
        };
        append_decision(&path, &record).expect("append");

        let state = read_collab_state(&path).expect("state");
        let decisions = state["design_decisions"].as_array().expect("list");
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[1]["decision"], "lru");
        assert_eq!(state["updated_at"], "2026-08-07T14:23:05Z");
    }

    #[test]
    fn append_without_collaborator_state_is_a_noop() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        append_decision(&path, &DecisionRecord::default()).expect("append");
        assert!(!path.exists());
    }
}
