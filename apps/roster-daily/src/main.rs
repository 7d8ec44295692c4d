//! Roster Daily
//!
//! Runs one membership reconciliation in the configured mode and exits.
//! Exit codes: 0 success, 1 general or store fault, 2 configuration fault,
//! 3 directory unreachable in a strict run, 4 directory integrity fault,
//! 5 platform API fault.

mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use roster_connector_github::GithubClient;
use roster_connector_ldap::LdapDirectory;
use roster_connector_quay::QuayClient;
use roster_sync::{Flow, ReconciliationService, RosterConfig, RunMode, SyncResult};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = RosterConfig::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(e.exit_code());
    });

    logging::init_logging(&config.logging);

    info!(
        organization = %config.organization,
        mode = ?config.mode,
        dry_run = config.options.dry_run,
        "Starting roster run"
    );

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "Roster run failed");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(config: RosterConfig) -> SyncResult<()> {
    let platform = Arc::new(GithubClient::new(config.github.clone())?);
    let directory = Arc::new(LdapDirectory::new(config.directory.clone())?);

    let quay = if config.quay.enabled {
        Some(Arc::new(QuayClient::new(config.quay.clone())?))
    } else {
        None
    };

    let mode = config.mode;
    let mut service = ReconciliationService::new(Arc::new(config), platform, directory);
    if let Some(quay) = quay {
        service = service.with_secondary_checker(quay);
    }

    match mode {
        RunMode::Sync => {
            let report = service.run(Flow::Sync).await?;
            info!(
                added = report.added.len(),
                marked = report.marked.len(),
                unresolved = report.unresolved.len(),
                "Sync finished"
            );
        }
        RunMode::RaiseIssues => {
            let report = service.run(Flow::RaiseIssues).await?;
            info!(
                removed = report.removed.len(),
                issue = ?report.posted_issue,
                "Issue run finished"
            );
        }
        RunMode::ReviewPullRequest => {
            let outcome = service.review_pull_request().await?;
            info!(
                event = outcome.event.as_str(),
                unknown = outcome.unknown.len(),
                posted = outcome.posted,
                "Review finished"
            );
        }
    }
    Ok(())
}
