//! Git command wrappers using [`tokio::process::Command`]. Interactive
//! prompts are always disabled.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn git {op}: {source}")]
    Spawn {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("git {op} failed ({status}): {stderr}")]
    Failed {
        op: &'static str,
        status: ExitStatus,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, GitError>;

// ---------------------------------------------------------------------------
// Remote operations
// ---------------------------------------------------------------------------

/// Run `git clone --mirror <url> <dest>`.
#[instrument(skip(url, env_vars), fields(dest = %dest.display()))]
pub async fn clone_mirror(url: &str, dest: &Path, env_vars: &[(String, String)]) -> Result<()> {
    let mut cmd = git(env_vars);
    cmd.arg("clone").arg("--mirror").arg(url).arg(dest);

    run("clone --mirror", cmd).await?;
    debug!("git clone --mirror succeeded");
    Ok(())
}

/// Run `git push --mirror <url>` from a mirror repository.
///
/// Destination refs are force-updated and refs absent from the mirror are
/// deleted, so the remote ends up identical to the mirror.
#[instrument(skip(url, env_vars), fields(repo = %repo.display()))]
pub async fn push_mirror(repo: &Path, url: &str, env_vars: &[(String, String)]) -> Result<()> {
    let mut cmd = git(env_vars);
    cmd.arg("-C").arg(repo).arg("push").arg("--mirror").arg(url);

    run("push --mirror", cmd).await?;
    debug!("git push --mirror succeeded");
    Ok(())
}

/// Run `git push <url> <refspec>...` from `repo`.
#[instrument(skip(url, env_vars), fields(repo = %repo.display()))]
pub async fn push_refspecs(
    repo: &Path,
    url: &str,
    refspecs: &[String],
    env_vars: &[(String, String)],
) -> Result<()> {
    let mut cmd = git(env_vars);
    cmd.arg("-C").arg(repo).arg("push").arg(url).args(refspecs);

    run("push", cmd).await?;
    debug!(count = refspecs.len(), "git push succeeded");
    Ok(())
}

/// Delete `refs` at the remote with `git push <url> :<ref>...`.
#[instrument(skip(url, env_vars, refs), fields(repo = %repo.display(), count = refs.len()))]
pub async fn delete_remote_refs(
    repo: &Path,
    url: &str,
    refs: &[String],
    env_vars: &[(String, String)],
) -> Result<()> {
    if refs.is_empty() {
        return Ok(());
    }

    let mut cmd = git(env_vars);
    cmd.arg("-C").arg(repo).arg("push").arg(url);
    for name in refs {
        cmd.arg(format!(":{}", name));
    }

    run("push --delete", cmd).await?;
    Ok(())
}

/// Run `git ls-remote <url>` and return the advertised ref names.
#[instrument(skip_all)]
pub async fn ls_remote(url: &str, env_vars: &[(String, String)]) -> Result<Vec<String>> {
    let mut cmd = git(env_vars);
    cmd.arg("ls-remote").arg(url);

    let stdout = run("ls-remote", cmd).await?;
    Ok(parse_ls_remote(&stdout))
}

// ---------------------------------------------------------------------------
// Local operations
// ---------------------------------------------------------------------------

/// Run `git init --bare <path>`.
#[instrument(fields(path = %path.display()))]
pub async fn init_bare(path: &Path) -> Result<()> {
    let mut cmd = git(&[]);
    cmd.arg("init").arg("--bare").arg(path);

    run("init --bare", cmd).await?;
    Ok(())
}

/// List ref names in `repo` under the given prefixes (e.g. `refs/heads`).
#[instrument(fields(repo = %repo.display()))]
pub async fn list_refs(repo: &Path, prefixes: &[&str]) -> Result<Vec<String>> {
    let mut cmd = git(&[]);
    cmd.arg("-C")
        .arg(repo)
        .arg("for-each-ref")
        .arg("--format=%(refname)")
        .args(prefixes);

    let stdout = run("for-each-ref", cmd).await?;
    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

// ---------------------------------------------------------------------------
// Plumbing
// ---------------------------------------------------------------------------

fn git(env_vars: &[(String, String)]) -> Command {
    let mut cmd = Command::new("git");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    for (k, v) in env_vars {
        cmd.env(k, v);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    cmd
}

/// Run `cmd` to completion and return its stdout.
async fn run(op: &'static str, mut cmd: Command) -> Result<String> {
    let output = cmd
        .output()
        .await
        .map_err(|source| GitError::Spawn { op, source })?;

    if !output.status.success() {
        return Err(GitError::Failed {
            op,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Pull the ref names out of `git ls-remote` output (`<sha>\t<ref>` lines).
fn parse_ls_remote(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .map(|name| name.trim().to_string())
        .collect()
}
