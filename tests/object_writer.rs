//! Object-writer contract tests: hostile content round-trips, caller-state
//! isolation, orphan bootstrap, linear history, and ref compare-and-swap.

use std::time::Duration;

use ballast::io::git::Git;
use ballast::io::object_writer::{MirrorFile, commit_files};
use ballast::test_support::TestRepo;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Text designed to break shell-interpolated pipelines. The writer never
/// touches a shell, so it must survive byte-for-byte.
const HOSTILE: &str = "it's a 'quoted' value\n`backticks` and $(subshell)\nnewline\ttab and \"double quotes\"\n$HOME ; rm -rf --\n";

#[test]
fn creates_orphan_branch_and_round_trips_content() {
    let repo = TestRepo::new().expect("repo");
    let git = Git::new(repo.root(), TIMEOUT);

    let files = vec![MirrorFile::new("sessions/a.json", "{\"n\": 1}\n")];
    let short = commit_files(&git, "ctx/log", &files, "ctx: snapshot a").expect("commit");
    assert!(!short.is_empty());

    let shown = repo.git(&["show", "ctx/log:sessions/a.json"]).expect("show");
    assert_eq!(shown, "{\"n\": 1}");

    // Orphan: the log branch shares no ancestry with the primary branch.
    let merge_base = repo.git_expect_failure(&["merge-base", "main", "ctx/log"]);
    assert!(merge_base.is_ok());
}

#[test]
fn hostile_messages_and_contents_round_trip_exactly() {
    let repo = TestRepo::new().expect("repo");
    let git = Git::new(repo.root(), TIMEOUT);

    let files = vec![MirrorFile::new("decisions/hostile.json", HOSTILE)];
    let message = format!("ctx: decide {}", HOSTILE.trim_end());
    commit_files(&git, "ctx/log", &files, &message).expect("commit");

    // Content: byte-identical (read without trimming via cat-file).
    let raw = repo.git(&["cat-file", "blob", "ctx/log:decisions/hostile.json"]);
    assert_eq!(raw.expect("cat-file"), HOSTILE.trim_end());

    // Message: the full body survives, including quotes and subshell text.
    let body = repo.git(&["log", "-1", "--pretty=%B", "ctx/log"]).expect("log");
    assert!(body.contains("`backticks` and $(subshell)"));
    assert!(body.contains("it's a 'quoted' value"));
}

#[test]
fn caller_branch_index_and_worktree_stay_untouched() {
    let repo = TestRepo::new().expect("repo");
    let git = Git::new(repo.root(), TIMEOUT);
    let head_before = repo.head_sha().expect("sha");

    // Uncommitted caller work that must survive the mirror untouched.
    repo.write_file("wip.txt", "precious uncommitted work").expect("write");

    commit_files(
        &git,
        "ctx/log",
        &[MirrorFile::new("HEAD.json", "{}\n")],
        "ctx: snapshot",
    )
    .expect("commit");

    assert_eq!(repo.head_sha().expect("sha"), head_before);
    assert_eq!(repo.current_branch().expect("branch"), "main");
    let status = repo.git(&["status", "--porcelain"]).expect("status");
    assert_eq!(status, "?? wip.txt");
    assert_eq!(
        std::fs::read_to_string(repo.root().join("wip.txt")).expect("read"),
        "precious uncommitted work"
    );
}

#[test]
fn successive_commits_form_a_linear_first_parent_chain() {
    let repo = TestRepo::new().expect("repo");
    let git = Git::new(repo.root(), TIMEOUT);

    for n in 1..=3 {
        let files = vec![MirrorFile::new(
            format!("sessions/{n}.json"),
            format!("{{\"n\": {n}}}\n"),
        )];
        commit_files(&git, "ctx/log", &files, &format!("ctx: snapshot {n}")).expect("commit");
    }

    // 3 mirror commits on top of the orphan root, no merges.
    let count = repo.git(&["rev-list", "--count", "ctx/log"]).expect("count");
    assert_eq!(count, "4");
    let merges = repo.git(&["rev-list", "--merges", "--count", "ctx/log"]).expect("merges");
    assert_eq!(merges, "0");

    // Earlier files persist under later tips (append-only overlay).
    repo.git(&["show", "ctx/log:sessions/1.json"]).expect("still present");
    repo.git(&["show", "ctx/log:sessions/3.json"]).expect("present");
}

#[test]
fn updating_an_existing_path_replaces_content() {
    let repo = TestRepo::new().expect("repo");
    let git = Git::new(repo.root(), TIMEOUT);

    commit_files(
        &git,
        "ctx/log",
        &[MirrorFile::new("HEAD.json", "{\"rev\": 1}\n")],
        "ctx: snapshot one",
    )
    .expect("first");
    commit_files(
        &git,
        "ctx/log",
        &[MirrorFile::new("HEAD.json", "{\"rev\": 2}\n")],
        "ctx: snapshot two",
    )
    .expect("second");

    let shown = repo.git(&["show", "ctx/log:HEAD.json"]).expect("show");
    assert_eq!(shown, "{\"rev\": 2}");
}

#[test]
fn commit_outside_a_repository_fails_cleanly() {
    let temp = tempfile::tempdir().expect("tempdir");
    let git = Git::new(temp.path(), TIMEOUT);
    let result = commit_files(
        &git,
        "ctx/log",
        &[MirrorFile::new("HEAD.json", "{}\n")],
        "ctx: snapshot",
    );
    assert!(result.is_err(), "caller degrades to disk-only on this error");
}
