//! End-to-end scenario tests over the mock engine
//!
//! Exercise the full protocol from fixture to flushed report: session launch,
//! page-object flow, failure screenshots, cleanup, and completion tracking.

mod common;

use common::{mock_harness, mock_harness_with_config, test_config, user_fixture};
use futures_util::future::join_all;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use webcheck::report::GroupPhase;
use webcheck::testdata::{ExpectedError, ExpectedResult};
use webcheck::Error;

#[tokio::test]
async fn concurrent_login_scenarios_flush_report_once() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, harness) = mock_harness(dir.path());

    let users = vec![
        user_fixture("standard_user", None, ExpectedResult::Success, None),
        user_fixture(
            "locked_out_user",
            None,
            ExpectedResult::Failure,
            Some(ExpectedError::LockedOut),
        ),
        user_fixture(
            "standard_user",
            Some("wrong_password"),
            ExpectedResult::Failure,
            Some(ExpectedError::InvalidCredentials),
        ),
        user_fixture("problem_user", None, ExpectedResult::Success, None),
    ];

    harness.register("login", users.len()).unwrap();

    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move { harness.run_login_scenario("login", &user).await })
        })
        .collect();
    for outcome in join_all(handles).await {
        outcome.unwrap().unwrap();
    }

    assert_eq!(harness.coordinator().phase("login"), GroupPhase::Flushed);

    // Every session fully released, one engine per scenario.
    assert_eq!(launcher.stats.launches.load(Ordering::SeqCst), 4);
    assert_eq!(launcher.stats.engines_closed.load(Ordering::SeqCst), 4);
    assert_eq!(launcher.stats.contexts_closed.load(Ordering::SeqCst), 4);
    assert_eq!(launcher.stats.pages_closed.load(Ordering::SeqCst), 4);

    // The flushed artifact holds one entry per scenario.
    let report = std::fs::read_to_string(dir.path().join("reports/report.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(doc["entries"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn failing_scenario_reports_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, harness) = mock_harness(dir.path());

    harness.register("login", 1).unwrap();
    let err = harness
        .run_login_scenario(
            "login",
            &user_fixture("standard_user", Some("bad"), ExpectedResult::Success, None),
        )
        .await
        .unwrap_err();
    assert!(err.is_element_timeout());

    // Cleanup ran and the failure was captured before teardown.
    assert_eq!(launcher.stats.engines_closed.load(Ordering::SeqCst), 1);
    assert_eq!(launcher.stats.screenshots.load(Ordering::SeqCst), 1);

    let report = std::fs::read_to_string(dir.path().join("reports/report.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&report).unwrap();
    let steps = doc["entries"][0]["steps"].as_array().unwrap();
    assert!(steps
        .iter()
        .any(|s| s["level"] == "fail" && s["message"].as_str().unwrap().contains("failed")));
    assert_eq!(
        doc["entries"][0]["screenshots"].as_array().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn error_banner_mismatch_fails_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    // The configured banner is authoritative; an application showing anything
    // else must fail the scenario.
    config.error_messages.locked_out = "some other banner text".to_string();
    let (_launcher, harness) = mock_harness_with_config(dir.path(), config);

    harness.register("login", 1).unwrap();
    let err = harness
        .run_login_scenario(
            "login",
            &user_fixture(
                "locked_out_user",
                None,
                ExpectedResult::Failure,
                Some(ExpectedError::LockedOut),
            ),
        )
        .await
        .unwrap_err();

    match err {
        Error::Internal(message) => assert!(message.contains("error banner mismatch")),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn launch_failure_still_completes_group() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, harness) = mock_harness(dir.path());
    launcher.fail_launch();

    harness.register("login", 1).unwrap();
    let err = harness
        .run_login_scenario(
            "login",
            &user_fixture("standard_user", None, ExpectedResult::Success, None),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EngineLaunch(_)));
    assert_eq!(harness.coordinator().phase("login"), GroupPhase::Flushed);
}
