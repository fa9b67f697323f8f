use std::path::{Path, PathBuf};
use std::process::Command;

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn git(args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=gitmover",
            "-c",
            "user.email=gitmover@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("git runs");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn path(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

/// A bare repository with two commits, a `feature` branch and a `v1.0` tag.
pub fn source_repo(root: &Path) -> PathBuf {
    let work = root.join("source-work");
    git(&["init", "-q", path(&work)]);
    git(&["-C", path(&work), "commit", "-q", "--allow-empty", "-m", "first"]);
    git(&["-C", path(&work), "branch", "feature"]);
    git(&["-C", path(&work), "tag", "v1.0"]);
    git(&["-C", path(&work), "commit", "-q", "--allow-empty", "-m", "second"]);

    let bare = root.join("source.git");
    git(&["clone", "-q", "--bare", path(&work), path(&bare)]);
    bare
}

/// A bare repository whose history has nothing in common with `source_repo`.
pub fn unrelated_repo(root: &Path) -> PathBuf {
    let work = root.join("other-work");
    git(&["init", "-q", path(&work)]);
    git(&["-C", path(&work), "commit", "-q", "--allow-empty", "-m", "unrelated"]);
    git(&["-C", path(&work), "branch", "stale"]);
    git(&["-C", path(&work), "branch", "feature"]);

    let bare = root.join("destination.git");
    git(&["clone", "-q", "--bare", path(&work), path(&bare)]);
    bare
}

/// `<sha> <ref>` for every branch and tag, sorted.
pub fn refs(repo: &Path) -> Vec<String> {
    let out = git(&[
        "-C",
        path(repo),
        "for-each-ref",
        "--format=%(objectname) %(refname)",
        "refs/heads",
        "refs/tags",
    ]);
    let mut refs: Vec<String> = out.lines().map(str::to_string).collect();
    refs.sort();
    refs
}

pub fn ref_names(repo: &Path) -> Vec<String> {
    refs(repo)
        .into_iter()
        .filter_map(|line| line.split(' ').nth(1).map(str::to_string))
        .collect()
}
