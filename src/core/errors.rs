//! Typed errors carried through `anyhow` chains and downcast at the CLI
//! boundary.
//!
//! The taxonomy is deliberately small: precondition failures and invalid
//! arguments are fatal with no mutation; a failed git invocation on a
//! state-changing path surfaces the literal command line and captured stderr.
//! Durability degradation and corruption recovery are log events, not errors.

use std::error::Error;
use std::fmt;

/// A command's preconditions did not hold (dirty tree, existing lock,
/// missing repository). Nothing was mutated.
#[derive(Debug, Clone)]
pub struct PreconditionError {
    pub reason: String,
}

impl PreconditionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "precondition failed: {}", self.reason)
    }
}

impl Error for PreconditionError {}

/// A required argument was missing or empty. No side effects occurred.
#[derive(Debug, Clone)]
pub struct InvalidArgumentError {
    pub reason: String,
}

impl InvalidArgumentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid argument: {}", self.reason)
    }
}

impl Error for InvalidArgumentError {}

/// A git subprocess failed or timed out.
///
/// `command` is the literal argument vector as invoked; `stderr` is whatever
/// the child wrote before exiting (bounded). State-changing callers abort on
/// this; read paths catch it and degrade to empty results.
#[derive(Debug, Clone)]
pub struct GitCommandError {
    pub command: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl fmt::Display for GitCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.timed_out {
            write!(f, "timed out: {}", self.command)
        } else if self.stderr.is_empty() {
            write!(f, "failed: {}", self.command)
        } else {
            write!(f, "failed: {}: {}", self.command, self.stderr)
        }
    }
}

impl Error for GitCommandError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_error_includes_command_and_stderr() {
        let err = GitCommandError {
            command: "git tag loop-start-1".to_string(),
            stderr: "fatal: tag already exists".to_string(),
            timed_out: false,
        };
        let msg = err.to_string();
        assert!(msg.contains("git tag loop-start-1"));
        assert!(msg.contains("fatal: tag already exists"));
    }

    #[test]
    fn git_error_reports_timeout() {
        let err = GitCommandError {
            command: "git status --porcelain".to_string(),
            stderr: String::new(),
            timed_out: true,
        };
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn precondition_error_downcasts_through_anyhow() {
        let err: anyhow::Error = PreconditionError::new("dirty working tree").into();
        let pre = err.downcast_ref::<PreconditionError>().expect("downcast");
        assert_eq!(pre.reason, "dirty working tree");
    }
}
