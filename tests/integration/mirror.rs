use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use gitmover::auth::AuthResolver;
use gitmover::fixtures::spec::{batch, migration_between};
use gitmover::mocks::reporter::RecordingReporter;
use gitmover::transfer::{MirrorTransfer, PruneStatus, Transfer};
use gitmover::{AuthSpec, BatchScheduler, MigrationError};

use crate::mocks::git::{git_available, path, ref_names, refs, source_repo, unrelated_repo};

macro_rules! require_git {
    () => {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
    };
}

fn engine(work: &std::path::Path) -> MirrorTransfer {
    MirrorTransfer::new(AuthResolver::with_lookup(|_| None), work)
}

#[tokio::test]
async fn mirrors_every_branch_and_tag_into_a_new_repository() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let work = root.path().join("work");
    let source = source_repo(root.path());
    let destination = root.path().join("created.git");
    let spec = migration_between("app", path(&source), path(&destination));

    let report = engine(&work).transfer(&spec, 1).await.unwrap();

    assert_eq!(refs(&destination), refs(&source));
    assert_eq!(report.refs, refs(&source).len());
    assert_eq!(report.pruned, PruneStatus::Skipped);
    assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
}

#[tokio::test]
async fn mirror_push_overwrites_diverged_destination() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let source = source_repo(root.path());
    let destination = unrelated_repo(root.path());
    assert_ne!(refs(&destination), refs(&source));
    let spec = migration_between("app", path(&source), path(&destination));

    engine(&root.path().join("work")).transfer(&spec, 1).await.unwrap();

    assert_eq!(refs(&destination), refs(&source));
    assert!(!ref_names(&destination).contains(&"refs/heads/stale".to_string()));
}

#[tokio::test]
async fn rerunning_a_migration_is_clean() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let work = root.path().join("work");
    let source = source_repo(root.path());
    let destination = root.path().join("again.git");
    let spec = migration_between("app", path(&source), path(&destination));
    let scheduler = BatchScheduler::new(Arc::new(engine(&work)), batch(1, 0));

    for _ in 0..2 {
        let report = scheduler.run(vec![spec.clone()], RecordingReporter::new()).await;
        assert!(report.is_success(), "{:?}", report.summary);
        assert_eq!(refs(&destination), refs(&source));
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }
}

#[tokio::test]
async fn subset_push_renames_the_configured_branch() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let source = source_repo(root.path());
    let destination = root.path().join("subset.git");
    let mut spec = migration_between("app", path(&source), path(&destination));
    spec.options.mirror = false;
    spec.source.branch = Some("feature".to_string());
    spec.destination.branch = Some("imported".to_string());

    engine(&root.path().join("work")).transfer(&spec, 1).await.unwrap();

    assert_eq!(
        ref_names(&destination),
        vec!["refs/heads/imported".to_string(), "refs/tags/v1.0".to_string()]
    );
}

#[tokio::test]
async fn source_refs_are_pruned_after_push() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let source = source_repo(root.path());
    let before = refs(&source);
    let destination = root.path().join("pruned.git");
    let mut spec = migration_between("app", path(&source), path(&destination));
    spec.options.delete_source_refs = true;

    let report = engine(&root.path().join("work")).transfer(&spec, 1).await.unwrap();

    assert_eq!(report.pruned, PruneStatus::Pruned(before.len()));
    assert_eq!(refs(&destination), before);
    assert!(refs(&source).is_empty());
}

#[tokio::test]
async fn rejected_source_cleanup_keeps_the_migration() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let source = source_repo(root.path());
    std::fs::create_dir_all(source.join("hooks")).unwrap();
    let hook = source.join("hooks").join("pre-receive");
    std::fs::write(&hook, "#!/bin/sh\nexit 1\n").unwrap();
    std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
    let before = refs(&source);
    let destination = root.path().join("kept.git");
    let mut spec = migration_between("app", path(&source), path(&destination));
    spec.options.delete_source_refs = true;

    let report = engine(&root.path().join("work")).transfer(&spec, 1).await.unwrap();

    assert!(matches!(report.pruned, PruneStatus::Failed(_)), "{:?}", report.pruned);
    assert_eq!(refs(&source), before);
    assert_eq!(refs(&destination), before);
}

#[tokio::test]
async fn destination_check_only_warns() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let source = source_repo(root.path());
    let unreachable = root.path().join("nowhere.git");
    let unresolved = root.path().join("unresolved.git");
    let mut locked = migration_between("locked", path(&source), path(&unresolved));
    locked.destination.auth = Some(AuthSpec::Token {
        token: "${GITMOVER_UNSET}".to_string(),
    });
    let specs = vec![
        migration_between("gone", path(&source), path(&unreachable)),
        locked,
        migration_between("self", path(&unreachable), path(&source)),
    ];

    engine(&root.path().join("work")).check_destinations(&specs).await;

    assert!(!unreachable.exists());
    assert!(!unresolved.exists());
    assert!(!root.path().join("work").exists());
}

#[tokio::test]
async fn unreadable_source_is_a_clone_error() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("missing.git");
    let destination = root.path().join("never.git");
    let spec = migration_between("app", path(&missing), path(&destination));

    let err = engine(&root.path().join("work")).transfer(&spec, 1).await.unwrap_err();

    assert!(matches!(err, MigrationError::Clone { .. }));
    assert!(!destination.exists());
}

#[tokio::test]
async fn absent_destination_without_creation_is_a_push_error() {
    require_git!();
    let root = tempfile::tempdir().unwrap();
    let source = source_repo(root.path());
    let destination = root.path().join("absent.git");
    let mut spec = migration_between("app", path(&source), path(&destination));
    spec.destination.create_if_missing = false;

    let err = engine(&root.path().join("work")).transfer(&spec, 1).await.unwrap_err();

    assert!(matches!(err, MigrationError::Push { .. }));
}
