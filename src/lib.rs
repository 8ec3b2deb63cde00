//! Git-backed persistent state for an autonomous coding-agent harness.
//!
//! Two command families share one durable-write primitive (the `git` binary):
//!
//! - The **context log** (`ctx …`) records orchestration snapshots and design
//!   decisions to disk and mirrors them onto an isolated, append-only branch
//!   that never touches the caller's checked-out branch, index, or worktree.
//! - The **loop harness** (`loop …`) brackets generate→verify attempt cycles
//!   with checkpoint tags, hard-reset rollback, and a retry circuit breaker.
//!
//! The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (types, ids, slugs, errors).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, git subprocesses).
//!
//! Orchestration modules ([`snapshot`], [`restore`], [`search`], [`harness`])
//! coordinate core logic with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod harness;
pub mod io;
pub mod logging;
pub mod restore;
pub mod search;
pub mod snapshot;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
