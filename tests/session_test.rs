//! Session lifecycle and fixture loading

mod common;

use common::test_config;
use std::sync::atomic::Ordering;
use tokio_test::assert_ok;
use std::sync::Arc;
use webcheck::engine::mock::MockLauncher;
use webcheck::engine::EngineLauncher;
use webcheck::testdata::TestData;
use webcheck::{Error, Session, SessionOptions};

fn session_over(launcher: &Arc<MockLauncher>) -> Session {
    Session::new(
        Arc::clone(launcher) as Arc<dyn EngineLauncher>,
        SessionOptions::default(),
    )
}

#[tokio::test]
async fn lifecycle_roundtrip_releases_everything() {
    let launcher = Arc::new(MockLauncher::new());
    let session = session_over(&launcher);

    tokio_test::assert_ok!(session.initialize().await);
    let page = session.page().await.unwrap();
    tokio_test::assert_ok!(page.goto("https://www.saucedemo.com/").await);
    assert!(page.is_present(".login_logo").await.unwrap());

    session.close().await;
    assert!(!session.is_initialized().await);
    assert_eq!(launcher.stats.pages_closed.load(Ordering::SeqCst), 1);
    assert_eq!(launcher.stats.contexts_closed.load(Ordering::SeqCst), 1);
    assert_eq!(launcher.stats.engines_closed.load(Ordering::SeqCst), 1);

    // Accessors reject use after close.
    assert!(matches!(
        session.page().await.unwrap_err(),
        Error::NotInitialized(_)
    ));
    assert!(matches!(
        session.new_page().await.unwrap_err(),
        Error::NotInitialized(_)
    ));
}

#[tokio::test]
async fn partial_initialization_never_leaks() {
    let launcher = Arc::new(MockLauncher::new());
    launcher.fail_page();
    let session = session_over(&launcher);

    assert!(session.initialize().await.is_err());
    assert!(!session.is_initialized().await);
    assert_eq!(launcher.stats.contexts_closed.load(Ordering::SeqCst), 1);
    assert_eq!(launcher.stats.engines_closed.load(Ordering::SeqCst), 1);

    // Close after a failed initialize is a harmless no-op.
    session.close().await;
    assert_eq!(launcher.stats.engines_closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn options_derive_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let options = SessionOptions::from_config(&config).unwrap();
    assert!(options.launch.headless);
    assert_eq!(options.viewport.width, 1920);

    let mut bad = config;
    bad.browser.variant = "netscape".to_string();
    assert!(matches!(
        SessionOptions::from_config(&bad).unwrap_err(),
        Error::EngineLaunch(_)
    ));
}

#[test]
fn shipped_fixtures_parse() {
    let data = TestData::new("testdata");
    let users = data.users().unwrap();
    assert!(users.len() >= 4);
    assert!(users.iter().any(|u| u.username == "locked_out_user"));

    let products = data.products().unwrap();
    assert_eq!(products.len(), 6);
}

#[test]
fn missing_fixture_dir_is_hard_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TestData::new(dir.path().join("nope")).users().unwrap_err();
    assert!(matches!(err, Error::DataLoad(_)));
}
