//! One attempt at moving one repository.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::auth::{AuthResolver, ResolvedEndpoint, Role};
use crate::error::{MigrationError, Result};
use crate::git;
use crate::model::MigrationSpec;

const BRANCHES: &str = "refs/heads";
const TAGS: &str = "refs/tags";
const MAX_PREFIX_NAME: usize = 64;

#[async_trait]
pub trait Transfer: Send + Sync {
    /// Run attempt number `attempt` (1-based) of `spec`.
    async fn transfer(&self, spec: &MigrationSpec, attempt: u32) -> Result<TransferReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Cloning,
    CreatingDestination,
    Pushing,
    PruningSource,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Cloning => "cloning",
            Phase::CreatingDestination => "creating-destination",
            Phase::Pushing => "pushing",
            Phase::PruningSource => "pruning-source",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferReport {
    /// Branches and tags present in the mirror when it was pushed.
    pub refs: usize,
    pub pruned: PruneStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PruneStatus {
    #[default]
    Skipped,
    Pruned(usize),
    /// The destination holds the history; only the source cleanup failed.
    Failed(String),
}

pub struct MirrorTransfer {
    resolver: AuthResolver,
    work_root: PathBuf,
}

impl MirrorTransfer {
    pub fn new(resolver: AuthResolver, work_root: impl Into<PathBuf>) -> Self {
        MirrorTransfer {
            resolver,
            work_root: work_root.into(),
        }
    }

    /// Check each destination with `git ls-remote`. Unreachable ones are only
    /// warned about; the transfer itself reports the real failure.
    pub async fn check_destinations(&self, specs: &[MigrationSpec]) {
        for spec in specs {
            let destination = match self.resolver.resolve(&spec.destination, Role::Destination) {
                Ok(destination) => destination,
                Err(err) => {
                    warn!(migration = %spec.name, error = %err, "cannot resolve destination credentials");
                    continue;
                }
            };

            match git::ls_remote(destination.remote_url(), destination.env()).await {
                Ok(_) => debug!(migration = %spec.name, url = %destination.display_url(), "destination reachable"),
                Err(err) => warn!(
                    migration = %spec.name,
                    url = %destination.display_url(),
                    error = %destination.redact(&err.to_string()),
                    "could not validate access to destination"
                ),
            }
        }
    }

    fn working_area(&self, name: &str, attempt: u32) -> Result<TempDir> {
        std::fs::create_dir_all(&self.work_root).map_err(MigrationError::Workspace)?;
        tempfile::Builder::new()
            .prefix(&format!("gitmover-{}-a{}-", sanitize(name), attempt))
            .tempdir_in(&self.work_root)
            .map_err(MigrationError::Workspace)
    }

    async fn prepare_destination(&self, spec: &MigrationSpec, destination: &ResolvedEndpoint) {
        if git::ls_remote(destination.remote_url(), destination.env())
            .await
            .is_ok()
        {
            debug!(migration = %spec.name, "destination exists");
            return;
        }

        match local_path(&spec.destination.url) {
            Some(path) => match git::init_bare(&path).await {
                Ok(()) => info!(migration = %spec.name, path = %path.display(), "created destination repository"),
                Err(err) => warn!(migration = %spec.name, error = %err, "could not create destination"),
            },
            None => debug!(
                migration = %spec.name,
                url = %destination.display_url(),
                "destination not reachable, leaving creation to the host"
            ),
        }
    }

    async fn push(
        &self,
        spec: &MigrationSpec,
        mirror: &Path,
        destination: &ResolvedEndpoint,
        migrated: &[String],
    ) -> std::result::Result<(), git::GitError> {
        if spec.options.mirror {
            return git::push_mirror(mirror, destination.remote_url(), destination.env()).await;
        }

        let refspecs = subset_refspecs(spec, migrated);
        git::push_refspecs(mirror, destination.remote_url(), &refspecs, destination.env()).await
    }

    async fn prune_source(
        &self,
        spec: &MigrationSpec,
        mirror: &Path,
        source: &ResolvedEndpoint,
        migrated: &[String],
    ) -> PruneStatus {
        let refs: Vec<String> = if spec.options.mirror {
            migrated.to_vec()
        } else {
            subset_refs(spec, migrated)
        };

        match git::delete_remote_refs(mirror, source.remote_url(), &refs, source.env()).await {
            Ok(()) => {
                info!(migration = %spec.name, count = refs.len(), "deleted migrated refs at source");
                PruneStatus::Pruned(refs.len())
            }
            Err(err) => {
                let err = MigrationError::Prune {
                    url: source.display_url().to_string(),
                    stderr: source.redact(&err.to_string()),
                };
                warn!(migration = %spec.name, error = %err, "source cleanup failed");
                PruneStatus::Failed(err.to_string())
            }
        }
    }
}

#[async_trait]
impl Transfer for MirrorTransfer {
    async fn transfer(&self, spec: &MigrationSpec, attempt: u32) -> Result<TransferReport> {
        let name = spec.name.as_str();
        debug!(migration = name, attempt, phase = %Phase::Init, "starting transfer");

        let source = self.resolver.resolve(&spec.source, Role::Source)?;
        let destination = self.resolver.resolve(&spec.destination, Role::Destination)?;

        if !spec.options.preserve_history {
            warn!(migration = name, "preserve_history is off, but mirror transfers always carry full history");
        }

        let area = self.working_area(name, attempt)?;
        let mirror = area.path().join("repo.git");

        info!(migration = name, attempt, phase = %Phase::Cloning, url = %source.display_url(), "clone started");
        git::clone_mirror(source.remote_url(), &mirror, source.env())
            .await
            .map_err(|err| MigrationError::Clone {
                url: source.display_url().to_string(),
                stderr: source.redact(&err.to_string()),
            })?;
        info!(migration = name, attempt, phase = %Phase::Cloning, "clone finished");

        if spec.destination.create_if_missing {
            debug!(migration = name, phase = %Phase::CreatingDestination, "checking destination");
            self.prepare_destination(spec, &destination).await;
        }

        let migrated = git::list_refs(&mirror, &[BRANCHES, TAGS])
            .await
            .map_err(|err| MigrationError::Clone {
                url: source.display_url().to_string(),
                stderr: err.to_string(),
            })?;

        info!(migration = name, attempt, phase = %Phase::Pushing, url = %destination.display_url(), refs = migrated.len(), "push started");
        self.push(spec, &mirror, &destination, &migrated)
            .await
            .map_err(|err| MigrationError::Push {
                url: destination.display_url().to_string(),
                stderr: destination.redact(&err.to_string()),
            })?;
        info!(migration = name, attempt, phase = %Phase::Pushing, "push finished");

        let pruned = if spec.options.delete_source_refs {
            debug!(migration = name, phase = %Phase::PruningSource, "deleting migrated refs at source");
            self.prune_source(spec, &mirror, &source, &migrated).await
        } else {
            PruneStatus::Skipped
        };

        if let Err(err) = area.close() {
            warn!(migration = name, error = %err, "could not remove working area");
        }
        debug!(migration = name, attempt, phase = %Phase::Done, "transfer complete");

        Ok(TransferReport {
            refs: migrated.len(),
            pruned,
        })
    }
}

/// Refspecs for a non-mirror push: the configured branch (or every branch)
/// plus every tag, always forced.
fn subset_refspecs(spec: &MigrationSpec, migrated: &[String]) -> Vec<String> {
    let mut refspecs = match &spec.source.branch {
        Some(branch) => {
            let target = spec.destination.branch.as_deref().unwrap_or(branch);
            vec![format!("+{}/{}:{}/{}", BRANCHES, branch, BRANCHES, target)]
        }
        None => vec![format!("+{}/*:{}/*", BRANCHES, BRANCHES)],
    };
    if migrated.iter().any(|name| name.starts_with(TAGS)) {
        refspecs.push(format!("+{}/*:{}/*", TAGS, TAGS));
    }
    refspecs
}

/// The refs a non-mirror push actually carried.
fn subset_refs(spec: &MigrationSpec, migrated: &[String]) -> Vec<String> {
    let branch = spec
        .source
        .branch
        .as_ref()
        .map(|branch| format!("{}/{}", BRANCHES, branch));

    migrated
        .iter()
        .filter(|name| match &branch {
            Some(branch) => *name == branch || name.starts_with(TAGS),
            None => true,
        })
        .cloned()
        .collect()
}

/// A local filesystem destination, if `url` names one.
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if url.contains("://") || is_scp_like(url) {
        return None;
    }
    Some(PathBuf::from(url))
}

// `user@host:path` or `host:path`, as long as no slash precedes the colon.
fn is_scp_like(url: &str) -> bool {
    match url.find(':') {
        Some(colon) => !url[..colon].contains('/') && colon > 1,
        None => false,
    }
}

/// Directory-safe form of a migration name, capped so the working area's
/// file name stays well under the usual 255-byte limit.
fn sanitize(name: &str) -> String {
    name.chars()
        .take(MAX_PREFIX_NAME)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
