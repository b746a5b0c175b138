//! Scenario orchestration
//!
//! Every scenario follows the same protocol: register with the completion
//! coordinator, open a session, create a report entry, run the body, capture a
//! screenshot on failure, then always close the session and mark the scenario
//! complete. Reporting problems are logged and swallowed so they can never
//! change a scenario's outcome; the session close on the error path never
//! masks the error that got us there.

use chrono::Local;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{Config, ErrorMessageSettings};
use crate::engine::traits::EngineLauncher;
use crate::page::{LoginPage, PageDriver, ProductsPage};
use crate::report::{CompletionCoordinator, EntryId, Reporter, StepLevel};
use crate::session::{Session, SessionOptions};
use crate::testdata::{ExpectedError, ExpectedResult, UserRecord};
use crate::Error;

/// Configured banner text for a fixture's expected error
fn expected_banner(messages: &ErrorMessageSettings, kind: ExpectedError) -> &str {
    match kind {
        ExpectedError::LockedOut => &messages.locked_out,
        ExpectedError::InvalidCredentials => &messages.invalid_credentials,
        ExpectedError::EmptyUsername => &messages.empty_username,
        ExpectedError::EmptyPassword => &messages.empty_password,
    }
}

/// Per-scenario reporting handle
///
/// All methods swallow reporting failures.
#[derive(Debug, Clone)]
pub struct ScenarioReporter {
    reporter: Arc<Reporter>,
    entry: EntryId,
}

impl ScenarioReporter {
    pub fn info(&self, message: &str) {
        self.reporter.try_log_step(self.entry, StepLevel::Info, message);
    }

    pub fn pass(&self, message: &str) {
        self.reporter.try_log_step(self.entry, StepLevel::Pass, message);
    }

    pub fn fail(&self, message: &str) {
        self.reporter.try_log_step(self.entry, StepLevel::Fail, message);
    }
}

/// Runs scenarios against one launcher with shared reporting
#[derive(Debug)]
pub struct Harness {
    launcher: Arc<dyn EngineLauncher>,
    config: Arc<Config>,
    reporter: Arc<Reporter>,
    coordinator: Arc<CompletionCoordinator>,
}

impl Harness {
    pub fn new(
        launcher: Arc<dyn EngineLauncher>,
        config: Arc<Config>,
        reporter: Arc<Reporter>,
    ) -> Self {
        let coordinator = Arc::new(CompletionCoordinator::new(Arc::clone(&reporter)));
        Self {
            launcher,
            config,
            reporter,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<CompletionCoordinator> {
        &self.coordinator
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Announce scenarios for a group before spawning them
    pub fn register(&self, group: &str, count: usize) -> Result<(), Error> {
        self.coordinator.register(group, count)
    }

    /// Run one scenario through the standard protocol
    ///
    /// The body receives an initialized session and a reporting handle. The
    /// session is always closed and the group completion always recorded, on
    /// success and failure alike.
    pub async fn run_scenario<F>(
        &self,
        group: &str,
        name: &str,
        description: &str,
        body: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(Arc<Session>, ScenarioReporter) -> BoxFuture<'static, Result<(), Error>>,
    {
        info!("Scenario {:?} starting (group {:?})", name, group);

        let entry = match self.reporter.sink() {
            Ok(sink) => sink
                .create_entry(name, description)
                .unwrap_or_else(|e| {
                    warn!("Failed to create report entry for {:?}: {}", name, e);
                    EntryId(u64::MAX)
                }),
            Err(e) => {
                warn!("Report sink unavailable for {:?}: {}", name, e);
                EntryId(u64::MAX)
            }
        };
        let scenario_reporter = ScenarioReporter {
            reporter: Arc::clone(&self.reporter),
            entry,
        };

        let options = SessionOptions::from_config(&self.config)?;
        let session = Arc::new(Session::new(Arc::clone(&self.launcher), options));

        let result = match session.initialize().await {
            Ok(()) => {
                scenario_reporter.info("session initialized");
                body(Arc::clone(&session), scenario_reporter.clone()).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => {
                scenario_reporter.pass("scenario passed");
                info!("Scenario {:?} passed", name);
            }
            Err(e) => {
                scenario_reporter.fail(&format!("scenario failed: {}", e));
                error!("Scenario {:?} failed: {}", name, e);
                self.capture_failure_screenshot(&session, name, entry).await;
            }
        }

        session.close().await;
        if let Err(e) = self.coordinator.complete(group) {
            warn!("Completion tracking for group {:?} failed: {}", group, e);
        }

        result
    }

    /// Best-effort screenshot on the failure path
    async fn capture_failure_screenshot(&self, session: &Session, name: &str, entry: EntryId) {
        let page = match session.page().await {
            Ok(page) => page,
            Err(_) => return,
        };

        let path = self.failure_screenshot_path(name);
        match page.screenshot(&path).await {
            Ok(()) => {
                self.reporter
                    .try_attach_screenshot(entry, &path, "page state at failure")
            }
            Err(e) => warn!("Failed to capture failure screenshot: {}", e),
        }
    }

    fn failure_screenshot_path(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let stamp = Local::now().format("%Y%m%d_%H%M%S%3f");
        PathBuf::from(&self.config.paths.screenshots).join(format!("{}_{}.png", safe, stamp))
    }

    /// Data-driven login scenario
    ///
    /// Opens the login form, submits the fixture's credentials, and validates
    /// either the inventory screen or the expected error banner.
    pub async fn run_login_scenario(&self, group: &str, user: &UserRecord) -> Result<(), Error> {
        let config = Arc::clone(&self.config);
        let user = user.clone();
        let name = format!("login: {}", user.description);

        self.run_scenario(group, &name, &user.username.clone(), move |session, report| {
            Box::pin(async move {
                let timeout = Duration::from_millis(config.timeouts.element_wait_ms);
                let driver = PageDriver::new(session.page().await?, timeout);

                let login = LoginPage::new(driver.clone());
                login.open(&config.urls.base).await?;
                report.info("login page loaded");

                let password = user.password_or(&config.users.default_password);
                login.login(&user.username, password).await?;
                report.info(&format!("submitted credentials for {}", user.username));

                match user.expected_result {
                    ExpectedResult::Success => {
                        let products = ProductsPage::new(driver.clone());
                        products.wait_until_loaded().await?;
                        if !products.is_loaded().await {
                            return Err(Error::internal(
                                "inventory page incomplete after login",
                            ));
                        }
                        let header = products.header_title().await?;
                        if header != "Products" {
                            return Err(Error::internal(format!(
                                "unexpected inventory header: {:?}",
                                header
                            )));
                        }
                        let title = driver.title().await?;
                        if title != "Swag Labs" {
                            return Err(Error::internal(format!(
                                "unexpected page title: {:?}",
                                title
                            )));
                        }
                        report.pass("inventory visible after login");
                    }
                    ExpectedResult::Failure => {
                        // Banner probing treats absence as an answer, so it
                        // gets the short wait rather than the element wait.
                        let probe = Duration::from_millis(config.timeouts.short_wait_ms);
                        login.wait_for_error(probe).await?;
                        let message = login.error_message().await?;
                        let kind = user
                            .expected_error
                            .unwrap_or(ExpectedError::InvalidCredentials);
                        let expected = expected_banner(&config.error_messages, kind);
                        if message != expected {
                            return Err(Error::internal(format!(
                                "error banner mismatch: expected {:?}, got {:?}",
                                expected, message
                            )));
                        }
                        if driver.is_visible_now(".inventory_container").await {
                            return Err(Error::internal(
                                "inventory reachable after a rejected login",
                            ));
                        }
                        report.pass("expected error banner shown");
                    }
                }
                Ok(())
            })
        })
        .await
    }
}
