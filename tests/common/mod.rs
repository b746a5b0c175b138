//! Shared helpers for integration tests

use std::path::Path;
use std::sync::Arc;

use webcheck::engine::mock::MockLauncher;
use webcheck::report::{JsonReportSink, Reporter, ReportSink};
use webcheck::testdata::{ExpectedError, ExpectedResult, UserRecord};
use webcheck::{Config, Harness};

/// Config pointing all artifacts into a temp directory with short waits
#[allow(dead_code)]
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.timeouts.element_wait_ms = 300;
    config.timeouts.short_wait_ms = 300;
    config.paths.screenshots = dir.join("screenshots").display().to_string();
    config.paths.reports = dir.join("reports").display().to_string();
    config.paths.test_data = dir.join("testdata").display().to_string();
    config
}

/// Reporter writing a JSON report under `dir`
#[allow(dead_code)]
pub fn test_reporter(dir: &Path) -> Arc<Reporter> {
    let path = dir.join("reports").join("report.json");
    Arc::new(Reporter::new(Box::new(move || {
        Ok(Arc::new(JsonReportSink::at_path(path.clone())) as Arc<dyn ReportSink>)
    })))
}

/// Harness over a mock engine, returning the launcher for assertions
#[allow(dead_code)]
pub fn mock_harness(dir: &Path) -> (Arc<MockLauncher>, Arc<Harness>) {
    mock_harness_with_config(dir, test_config(dir))
}

/// Same as [`mock_harness`] but with a caller-supplied config
#[allow(dead_code)]
pub fn mock_harness_with_config(
    dir: &Path,
    config: Config,
) -> (Arc<MockLauncher>, Arc<Harness>) {
    let launcher = Arc::new(MockLauncher::new());
    let harness = Harness::new(
        Arc::clone(&launcher) as Arc<dyn webcheck::engine::EngineLauncher>,
        Arc::new(config),
        test_reporter(dir),
    );
    (launcher, Arc::new(harness))
}

#[allow(dead_code)]
pub fn user_fixture(
    username: &str,
    password: Option<&str>,
    expected: ExpectedResult,
    error: Option<ExpectedError>,
) -> UserRecord {
    UserRecord {
        username: username.to_string(),
        password: password.map(str::to_string),
        description: format!("{} fixture", username),
        expected_result: expected,
        expected_error: error,
    }
}
