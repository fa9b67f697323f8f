use std::path::PathBuf;
use std::sync::Arc;

use gitmover::auth::{AuthResolver, Role};
use gitmover::fixtures::spec::{batch, migration};
use gitmover::mocks::reporter::RecordingReporter;
use gitmover::mocks::transfer::{Script, ScriptedTransfer};
use gitmover::transfer::MirrorTransfer;
use gitmover::{AuthSpec, BatchScheduler, Endpoint, MigrationError};

fn unset_env() -> AuthResolver {
    AuthResolver::with_lookup(|_| None)
}

#[tokio::test]
async fn one_failing_one_succeeding_with_single_worker() {
    let transfer = Arc::new(ScriptedTransfer::new().with("legacy", Script::Fail));
    let scheduler = BatchScheduler::new(transfer, batch(1, 0));
    let reporter = RecordingReporter::new();

    let report = scheduler
        .run(vec![migration("legacy"), migration("service")], reporter.clone())
        .await;

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.failed, 1);
    let failed: Vec<_> = report.summary.failures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["legacy"]);

    let lines = reporter.lines();
    assert!(lines.contains(&"✗ legacy".to_string()));
    assert!(lines.contains(&"✓ service".to_string()));
}

#[tokio::test]
async fn always_failing_task_uses_every_attempt() {
    for max_retries in [0u32, 1, 3] {
        let transfer = Arc::new(ScriptedTransfer::new().with("app", Script::Fail));
        let scheduler = BatchScheduler::new(transfer.clone(), batch(2, max_retries));

        let report = scheduler.run(vec![migration("app")], RecordingReporter::new()).await;

        let outcome = &report.outcomes["app"];
        assert_eq!(outcome.attempts, max_retries + 1);
        assert_eq!(transfer.attempts("app"), max_retries + 1);
        let root = outcome.error().unwrap().root().to_string();
        assert!(root.ends_with(&format!("attempt {}", max_retries + 1)));
    }
}

#[tokio::test]
async fn summary_always_adds_up() {
    for (count, cap) in [(1usize, 1usize), (5, 2), (9, 3), (12, 12)] {
        let mut transfer = ScriptedTransfer::new();
        let specs: Vec<_> = (0..count).map(|i| migration(&format!("repo-{}", i))).collect();
        for spec in specs.iter().step_by(3) {
            transfer = transfer.with(&spec.name, Script::Fail);
        }
        let scheduler = BatchScheduler::new(Arc::new(transfer), batch(cap, 1));

        let report = scheduler.run(specs, RecordingReporter::new()).await;

        assert_eq!(report.summary.total, count);
        assert_eq!(report.summary.succeeded + report.summary.failed, count);
        assert_eq!(report.summary.failures.len(), report.summary.failed);
        assert_eq!(report.outcomes.len(), count);
    }
}

#[tokio::test]
async fn missing_env_var_fails_every_attempt() {
    let work = tempfile::tempdir().unwrap();
    let engine = Arc::new(MirrorTransfer::new(unset_env(), work.path()));
    let mut spec = migration("app");
    spec.source.auth = Some(AuthSpec::Token {
        token: "${GITMOVER_NEVER_SET}".to_string(),
    });

    let report = BatchScheduler::new(engine.clone(), batch(1, 2))
        .run(vec![spec.clone()], RecordingReporter::new())
        .await;

    let outcome = &report.outcomes["app"];
    assert_eq!(outcome.attempts, 3);
    assert!(matches!(
        outcome.error(),
        Some(MigrationError::RetryExhausted { attempts: 3, .. })
    ));
    assert!(matches!(
        outcome.error().unwrap().root(),
        MigrationError::MissingEnvVar { name } if name == "GITMOVER_NEVER_SET"
    ));

    let mut no_retry = batch(1, 2);
    no_retry.retry_on_failure = false;
    let report = BatchScheduler::new(engine, no_retry)
        .run(vec![spec], RecordingReporter::new())
        .await;

    let outcome = &report.outcomes["app"];
    assert_eq!(outcome.attempts, 1);
    assert!(matches!(outcome.error(), Some(MigrationError::MissingEnvVar { .. })));
}

#[tokio::test]
async fn missing_ssh_key_never_creates_a_working_area() {
    let work = tempfile::tempdir().unwrap();
    let engine = Arc::new(MirrorTransfer::new(unset_env(), work.path()));
    let mut spec = migration("app");
    spec.destination = Endpoint {
        auth: Some(AuthSpec::Ssh {
            ssh_key: PathBuf::from("/nonexistent/keys/id_ed25519"),
        }),
        ..Endpoint::new("git@new.example:team/app.git")
    };

    let report = BatchScheduler::new(engine, batch(1, 1))
        .run(vec![spec], RecordingReporter::new())
        .await;

    let outcome = &report.outcomes["app"];
    assert!(matches!(
        outcome.error().unwrap().root(),
        MigrationError::Auth { role: Role::Destination, message } if message.contains("ssh key not found")
    ));
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}
