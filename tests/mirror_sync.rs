//! Mirror behavior against a real local git repository
//!
//! Exercises the clean-mirror property: after a sync on an existing working
//! copy, no file survives that is not tracked at the branch tip. Skipped when
//! no `git` binary is available.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tempfile::tempdir;

use dockpatrol::process::SystemRunner;
use dockpatrol::{GitMirror, Settings};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.email=test@example.com",
            "-c",
            "user.name=test",
        ])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("spawn git");
    assert!(status.success(), "git {args:?} failed");
}

fn current_branch(dir: &Path) -> String {
    let out = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(dir)
        .output()
        .expect("spawn git");
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Create an origin repository with one committed stacks tree.
fn seed_origin(origin: &Path) -> String {
    git(origin, &["init"]);
    let app = origin.join("stacks/app");
    fs::create_dir_all(&app).unwrap();
    fs::write(app.join("docker-compose.yml"), "services:\n  web: {}\n").unwrap();
    git(origin, &["add", "."]);
    git(origin, &["commit", "-m", "add app stack"]);
    current_branch(origin)
}

fn settings(origin: &Path, mirror: &Path, branch: String) -> Settings {
    Settings {
        github_token: String::new(),
        github_owner: String::new(),
        github_repo: String::new(),
        branch,
        stacks_dir: "stacks".into(),
        local_repo_path: mirror.to_path_buf(),
        interval: Duration::ZERO,
        age_key_file: "/app/key.txt".into(),
        remote_override: Some(origin.to_string_lossy().into_owned()),
    }
}

#[test]
fn sync_clones_fresh_mirror() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let temp = tempdir().unwrap();
    let origin = temp.path().join("origin");
    fs::create_dir_all(&origin).unwrap();
    let branch = seed_origin(&origin);
    let mirror = temp.path().join("mirror");

    let runner = SystemRunner;
    let settings = settings(&origin, &mirror, branch);
    GitMirror::new(&settings, &runner).sync().unwrap();

    assert!(mirror.join("stacks/app/docker-compose.yml").exists());
}

#[test]
fn sync_removes_untracked_files_from_existing_mirror() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let temp = tempdir().unwrap();
    let origin = temp.path().join("origin");
    fs::create_dir_all(&origin).unwrap();
    let branch = seed_origin(&origin);
    let mirror = temp.path().join("mirror");

    let runner = SystemRunner;
    let settings = settings(&origin, &mirror, branch);
    let git_mirror = GitMirror::new(&settings, &runner);
    git_mirror.sync().unwrap();

    // Drift the working copy: an untracked leftover and a local edit.
    let untracked = mirror.join("stacks/app/.env");
    fs::write(&untracked, "LEFTOVER=1\n").unwrap();
    let tracked = mirror.join("stacks/app/docker-compose.yml");
    fs::write(&tracked, "services:\n  tampered: {}\n").unwrap();

    git_mirror.sync().unwrap();

    assert!(!untracked.exists(), "untracked file must be cleaned");
    let content = fs::read_to_string(&tracked).unwrap();
    assert!(content.contains("web"), "local edits must be reset");
}

#[test]
fn sync_replaces_corrupt_mirror_with_fresh_clone() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let temp = tempdir().unwrap();
    let origin = temp.path().join("origin");
    fs::create_dir_all(&origin).unwrap();
    let branch = seed_origin(&origin);

    // A directory that is not a working copy sits where the mirror belongs.
    let mirror = temp.path().join("mirror");
    fs::create_dir_all(&mirror).unwrap();
    fs::write(mirror.join("not-a-repo.txt"), "corrupt").unwrap();

    let runner = SystemRunner;
    let settings = settings(&origin, &mirror, branch);
    GitMirror::new(&settings, &runner).sync().unwrap();

    assert!(!mirror.join("not-a-repo.txt").exists());
    assert!(mirror.join("stacks/app/docker-compose.yml").exists());
}
