use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use gitmover::auth::AuthResolver;
use gitmover::cli;
use gitmover::logging;
use gitmover::report::ConsoleReporter;
use gitmover::scheduler::BatchScheduler;
use gitmover::transfer::MirrorTransfer;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every migration succeeded.
async fn run() -> Result<bool> {
    let settings = cli::run()?;
    logging::init(&settings.logging)?;

    info!(migrations = settings.migrations.len(), "=== starting git migration ===");

    let engine = Arc::new(MirrorTransfer::new(
        AuthResolver::from_env(),
        settings.batch.work_root(),
    ));

    info!("validating access to destinations");
    engine.check_destinations(&settings.migrations).await;

    let scheduler = BatchScheduler::new(engine, settings.batch);
    let report = scheduler
        .run(settings.migrations, ConsoleReporter::default())
        .await;

    println!();
    println!("{}", report.summary);

    if report.is_success() {
        info!(succeeded = report.summary.succeeded, "migration complete");
    } else {
        error!(
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            "migration finished with failures"
        );
    }

    Ok(report.is_success())
}
