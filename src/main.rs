//! Webcheck runner
//!
//! Loads configuration and fixtures, then runs every login fixture as a
//! concurrent scenario against a real chromium. The report flushes when the
//! last scenario finishes; the process exits non-zero if any scenario failed.

use anyhow::Context;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use webcheck::engine::cdp::CdpLauncher;
use webcheck::report::{JsonReportSink, Reporter, ReportSink};
use webcheck::testdata::TestData;
use webcheck::{Config, Harness};

const LOGIN_GROUP: &str = "login";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Webcheck {} starting", webcheck::VERSION);

    match run().await {
        Ok(()) => {
            info!("All scenarios passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Arc::new(Config::load().context("loading configuration")?);
    let users = TestData::new(&config.paths.test_data)
        .users()
        .context("loading login fixtures")?;
    info!("Loaded {} login fixtures", users.len());

    let reports_dir = PathBuf::from(&config.paths.reports);
    let reporter = Arc::new(Reporter::new(Box::new(move || {
        Ok(Arc::new(JsonReportSink::new(&reports_dir)) as Arc<dyn ReportSink>)
    })));

    let launcher = Arc::new(CdpLauncher::new());
    let harness = Arc::new(Harness::new(launcher, Arc::clone(&config), reporter));

    harness
        .register(LOGIN_GROUP, users.len())
        .context("registering login scenarios")?;

    let mut handles = Vec::with_capacity(users.len());
    for user in users {
        let harness = Arc::clone(&harness);
        handles.push(tokio::spawn(async move {
            let description = user.description.clone();
            let result = harness.run_login_scenario(LOGIN_GROUP, &user).await;
            (description, result)
        }));
    }

    let mut failures = 0usize;
    for handle in handles {
        match handle.await {
            Ok((description, Ok(()))) => info!("PASS {}", description),
            Ok((description, Err(e))) => {
                error!("FAIL {}: {}", description, e);
                failures += 1;
            }
            Err(e) => {
                error!("Scenario task panicked: {}", e);
                failures += 1;
                // A panicked task never reached complete(); make sure partial
                // results still land on disk.
                if let Err(e) = harness.coordinator().flush_now() {
                    warn!("Forced report flush failed: {}", e);
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} scenario(s) failed", failures);
    }
    Ok(())
}
