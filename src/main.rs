//! Git-backed context log and retry harness for autonomous coding agents.
//!
//! `ctx` commands persist orchestration snapshots and design decisions to
//! disk and to an isolated history branch; `loop` commands bracket each
//! generate→verify attempt with checkpoint tags, rollback, and a retry
//! circuit breaker.

use std::env;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};

use ballast::exit_codes;
use ballast::harness::{self, AdvanceOutcome, CleanupOutcome, VerifyOutcome};
use ballast::io::config::load_config;
use ballast::io::init::init_store;
use ballast::io::paths::StatePaths;
use ballast::io::store::prune_older_than;
use ballast::logging;
use ballast::restore::{RecoverOutcome, RestoreOutcome, recover_session, restore_head};
use ballast::search::{Timeline, search_log, timeline};
use ballast::snapshot::{record_decision, take_snapshot};

#[derive(Parser)]
#[command(
    name = "ballast",
    version,
    about = "Git-backed context log and checkpoint/rollback harness for autonomous coding agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Context log: durable orchestration snapshots and design decisions.
    #[command(subcommand)]
    Ctx(CtxCommand),
    /// Loop harness: checkpoint/rollback attempt cycles with a circuit
    /// breaker.
    #[command(subcommand, name = "loop")]
    Loop(LoopCommand),
}

#[derive(Subcommand)]
enum CtxCommand {
    /// Create the `.ballast/` layout and default config.
    Init {
        /// Rewrite gitignore and config back to defaults.
        #[arg(short, long)]
        force: bool,
    },
    /// Capture the current orchestration state as an immutable snapshot.
    Snapshot,
    /// Record a design decision.
    Decide {
        context: String,
        choice: String,
        reason: Option<String>,
    },
    /// Print the most recent known context (disk → log branch → session
    /// file → primary history).
    Restore,
    /// Print a named or the most recent snapshot.
    Recover {
        /// Session id, or `latest`.
        id: Option<String>,
    },
    /// Case-insensitive search across sessions, decisions, and commit
    /// subjects.
    Search { keyword: String },
    /// List the most recent session summaries.
    Timeline { n: Option<u32> },
    /// Delete aged session/decision files from disk (branch history is
    /// kept).
    Prune { days: Option<u64> },
}

#[derive(Subcommand)]
enum LoopCommand {
    /// Start a loop: requires a clean tree, writes the lock, tags the
    /// rollback anchor.
    Init {
        #[arg(default_value_t = 3)]
        max_retries: u32,
        #[arg(default_value_t = 2.0)]
        max_cost: f64,
    },
    /// Tag the current commit for this attempt (idempotent).
    Checkpoint,
    /// Read the external runner's verification verdict; exit 0/1.
    Verify,
    /// Hard-reset to the loop-start tag and remove untracked files.
    Rollback,
    /// Record the attempt outcome and advance; trips the circuit breaker
    /// past max retries.
    Next,
    /// Delete this loop's tags and release the lock.
    Success,
    /// Release only the lock; tags and tree are left for inspection.
    Abort,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILURE);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cwd = env::current_dir()?;
    match cli.command {
        Command::Ctx(cmd) => run_ctx(&cwd, cmd),
        Command::Loop(cmd) => run_loop(&cwd, cmd),
    }
}

fn run_ctx(root: &Path, cmd: CtxCommand) -> Result<i32> {
    match cmd {
        CtxCommand::Init { force } => {
            let paths = init_store(root, force)?;
            println!("initialized {}", paths.state_dir.display());
            Ok(exit_codes::OK)
        }
        CtxCommand::Snapshot => {
            let outcome = take_snapshot(root)?;
            println!("snapshot {} written", outcome.session_id);
            match outcome.mirrored {
                Some(commit) => println!("mirrored to log branch ({commit})"),
                None => println!("mirror unavailable, disk copy only"),
            }
            Ok(exit_codes::OK)
        }
        CtxCommand::Decide {
            context,
            choice,
            reason,
        } => {
            let outcome = record_decision(root, &context, &choice, reason.as_deref())?;
            println!("decision recorded: {}", outcome.file_stem);
            match outcome.mirrored {
                Some(commit) => println!("mirrored to log branch ({commit})"),
                None => println!("mirror unavailable, disk copy only"),
            }
            Ok(exit_codes::OK)
        }
        CtxCommand::Restore => match restore_head(root)? {
            RestoreOutcome::Restored { source, head } => {
                println!("context restored from {source}");
                println!("{}", serde_json::to_string_pretty(&head)?);
                Ok(exit_codes::OK)
            }
            RestoreOutcome::Fresh => {
                println!("no context history found, fresh start");
                Ok(exit_codes::OK)
            }
        },
        CtxCommand::Recover { id } => {
            let selector = id.as_deref().unwrap_or("latest");
            match recover_session(root, selector)? {
                RecoverOutcome::Recovered {
                    id,
                    source,
                    snapshot,
                } => {
                    println!("session {id} recovered from {source}");
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                    Ok(exit_codes::OK)
                }
                RecoverOutcome::NotFound { id } => {
                    eprintln!("session not found: {id}");
                    Ok(exit_codes::FAILURE)
                }
            }
        }
        CtxCommand::Search { keyword } => {
            let report = search_log(root, &keyword)?;
            for hit in &report.file_hits {
                println!("{}", hit.file);
                for line in &hit.lines {
                    println!("  {line}");
                }
            }
            if !report.commit_hits.is_empty() {
                println!("context commits:");
                for line in &report.commit_hits {
                    println!("  {line}");
                }
            }
            println!("{} result(s)", report.total());
            Ok(exit_codes::OK)
        }
        CtxCommand::Timeline { n } => {
            match timeline(root, n)? {
                Timeline::Disk(entries) => {
                    for entry in entries {
                        println!("{}  workflow={}  phase={}", entry.id, entry.workflow, entry.phase);
                    }
                }
                Timeline::Branch(lines) => {
                    println!("(from log branch)");
                    for line in lines {
                        println!("{} {}", line.hash, line.message);
                    }
                }
                Timeline::Empty => println!("no history found"),
            }
            Ok(exit_codes::OK)
        }
        CtxCommand::Prune { days } => {
            let paths = StatePaths::new(root);
            let config = load_config(&paths.config_path)?;
            let keep_days = days.unwrap_or(config.prune_keep_days);
            let removed = prune_older_than(
                &[&paths.sessions_dir, &paths.decisions_dir],
                keep_days,
                std::time::SystemTime::now(),
            )?;
            if removed > 0 {
                println!("pruned {removed} entries older than {keep_days}d (branch history kept)");
            } else {
                println!("nothing to prune");
            }
            Ok(exit_codes::OK)
        }
    }
}

fn run_loop(root: &Path, cmd: LoopCommand) -> Result<i32> {
    match cmd {
        LoopCommand::Init {
            max_retries,
            max_cost,
        } => {
            let outcome = harness::init_loop(root, max_retries, max_cost)?;
            println!(
                "loop {} initialized (max retries {}), tagged {}",
                outcome.id, outcome.max_retries, outcome.start_tag
            );
            Ok(exit_codes::OK)
        }
        LoopCommand::Checkpoint => {
            let tag = harness::checkpoint(root)?;
            println!("checkpoint created: {tag}");
            Ok(exit_codes::OK)
        }
        LoopCommand::Verify => match harness::verify(root)? {
            VerifyOutcome::Pass => {
                println!("verification passed");
                Ok(exit_codes::OK)
            }
            VerifyOutcome::Fail { error } => {
                eprintln!(
                    "verification failed: {}",
                    error.as_deref().unwrap_or("unknown")
                );
                Ok(exit_codes::FAILURE)
            }
        },
        LoopCommand::Rollback => {
            let target = harness::rollback(root)?;
            println!("rolled back to {target}");
            Ok(exit_codes::OK)
        }
        LoopCommand::Next => match harness::next_attempt(root)? {
            AdvanceOutcome::Continue {
                attempt,
                max_retries,
            } => {
                println!("advancing to attempt {attempt}/{max_retries}");
                Ok(exit_codes::OK)
            }
            AdvanceOutcome::Exhausted {
                attempt,
                max_retries,
            } => {
                eprintln!(
                    "max retries exceeded ({attempt} > {max_retries}); lock and tags kept for inspection"
                );
                Ok(exit_codes::FAILURE)
            }
        },
        LoopCommand::Success => match harness::succeed(root)? {
            CleanupOutcome::Cleaned { tags_deleted } => {
                println!("loop succeeded, removed {tags_deleted} tag(s), harness released");
                Ok(exit_codes::OK)
            }
            CleanupOutcome::NoActiveLoop => {
                println!("no active loop to clean");
                Ok(exit_codes::OK)
            }
        },
        LoopCommand::Abort => match harness::abort_loop(root)? {
            CleanupOutcome::Cleaned { .. } => {
                println!("loop aborted, lock removed (tags and tree untouched)");
                Ok(exit_codes::OK)
            }
            CleanupOutcome::NoActiveLoop => {
                println!("no active loop found");
                Ok(exit_codes::OK)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ctx_decide() {
        let cli = Cli::parse_from(["ballast", "ctx", "decide", "db", "sqlite", "simple"]);
        match cli.command {
            Command::Ctx(CtxCommand::Decide {
                context,
                choice,
                reason,
            }) => {
                assert_eq!(context, "db");
                assert_eq!(choice, "sqlite");
                assert_eq!(reason.as_deref(), Some("simple"));
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn parse_loop_init_defaults() {
        let cli = Cli::parse_from(["ballast", "loop", "init"]);
        match cli.command {
            Command::Loop(LoopCommand::Init {
                max_retries,
                max_cost,
            }) => {
                assert_eq!(max_retries, 3);
                assert_eq!(max_cost, 2.0);
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn parse_loop_init_overrides() {
        let cli = Cli::parse_from(["ballast", "loop", "init", "5", "1.5"]);
        match cli.command {
            Command::Loop(LoopCommand::Init {
                max_retries,
                max_cost,
            }) => {
                assert_eq!(max_retries, 5);
                assert_eq!(max_cost, 1.5);
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn parse_ctx_recover_default_is_latest() {
        let cli = Cli::parse_from(["ballast", "ctx", "recover"]);
        match cli.command {
            Command::Ctx(CtxCommand::Recover { id }) => assert_eq!(id, None),
            _ => panic!("unexpected command"),
        }
    }
}
