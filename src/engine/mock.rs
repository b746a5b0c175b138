//! In-process mock engine
//!
//! Simulates a small login-plus-inventory web application behind the engine
//! traits so session, page, and harness logic can be tested without a browser.
//! State transitions mirror the real application: navigating to the base URL
//! lands on the login form, valid credentials move the page to the inventory,
//! and bad credentials surface an error banner.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::traits::{
    Context, Engine, EngineLauncher, LaunchOptions, PageHandle, Viewport,
};
use crate::Error;

const LOCKED_OUT_MESSAGE: &str =
    "Epic sadface: Sorry, this user has been locked out.";
const INVALID_CREDENTIALS_MESSAGE: &str =
    "Epic sadface: Username and password do not match any user in this service";
const EMPTY_USERNAME_MESSAGE: &str = "Epic sadface: Username is required";
const EMPTY_PASSWORD_MESSAGE: &str = "Epic sadface: Password is required";

/// Shared call counters for assertions
#[derive(Debug, Default)]
pub struct MockStats {
    pub launches: AtomicUsize,
    pub contexts_created: AtomicUsize,
    pub pages_created: AtomicUsize,
    pub engines_closed: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub screenshots: AtomicUsize,
}

/// Launcher producing mock engines
#[derive(Debug, Default)]
pub struct MockLauncher {
    pub stats: Arc<MockStats>,
    fail_launch: AtomicBool,
    fail_context: AtomicBool,
    fail_page: AtomicBool,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `launch` call fail
    pub fn fail_launch(&self) {
        self.fail_launch.store(true, Ordering::SeqCst);
    }

    /// Make context creation on launched engines fail
    pub fn fail_context(&self) {
        self.fail_context.store(true, Ordering::SeqCst);
    }

    /// Make page creation on launched engines fail
    pub fn fail_page(&self) {
        self.fail_page.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngineLauncher for MockLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Arc<dyn Engine>, Error> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(Error::engine_launch("mock launch failure"));
        }

        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockEngine {
            stats: Arc::clone(&self.stats),
            fail_context: self.fail_context.load(Ordering::SeqCst),
            fail_page: self.fail_page.load(Ordering::SeqCst),
            is_active: AtomicBool::new(true),
        }))
    }
}

/// Mock engine instance
#[derive(Debug)]
pub struct MockEngine {
    stats: Arc<MockStats>,
    fail_context: bool,
    fail_page: bool,
    is_active: AtomicBool,
}

#[async_trait]
impl Engine for MockEngine {
    async fn new_context(&self, _viewport: Viewport) -> Result<Arc<dyn Context>, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::engine("engine is closed"));
        }
        if self.fail_context {
            return Err(Error::engine("mock context creation failure"));
        }

        self.stats.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockContext {
            stats: Arc::clone(&self.stats),
            fail_page: self.fail_page,
            is_active: AtomicBool::new(true),
        }))
    }

    async fn close(&self) -> Result<(), Error> {
        if self.is_active.swap(false, Ordering::SeqCst) {
            self.stats.engines_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

/// Mock browsing context
#[derive(Debug)]
pub struct MockContext {
    stats: Arc<MockStats>,
    fail_page: bool,
    is_active: AtomicBool,
}

#[async_trait]
impl Context for MockContext {
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::engine("context is closed"));
        }
        if self.fail_page {
            return Err(Error::engine("mock page creation failure"));
        }

        self.stats.pages_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPage {
            stats: Arc::clone(&self.stats),
            state: Mutex::new(AppState::default()),
            is_active: AtomicBool::new(true),
        }))
    }

    async fn close(&self) -> Result<(), Error> {
        if self.is_active.swap(false, Ordering::SeqCst) {
            self.stats.contexts_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Which screen the simulated application is showing
#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Blank,
    Login,
    Inventory,
}

#[derive(Debug)]
struct AppState {
    screen: Screen,
    url: String,
    fields: HashMap<String, String>,
    error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            screen: Screen::Blank,
            url: "about:blank".to_string(),
            fields: HashMap::new(),
            error: None,
        }
    }
}

impl AppState {
    fn attempt_login(&mut self) {
        let username = self
            .fields
            .get("[data-test='username']")
            .cloned()
            .unwrap_or_default();
        let password = self
            .fields
            .get("[data-test='password']")
            .cloned()
            .unwrap_or_default();

        self.error = if username.is_empty() {
            Some(EMPTY_USERNAME_MESSAGE.to_string())
        } else if password.is_empty() {
            Some(EMPTY_PASSWORD_MESSAGE.to_string())
        } else if username == "locked_out_user" {
            Some(LOCKED_OUT_MESSAGE.to_string())
        } else if password == "secret_sauce"
            && matches!(
                username.as_str(),
                "standard_user" | "problem_user" | "performance_glitch_user"
            )
        {
            self.screen = Screen::Inventory;
            self.url = format!("{}inventory.html", self.url);
            None
        } else {
            Some(INVALID_CREDENTIALS_MESSAGE.to_string())
        };
    }

    fn selector_present(&self, selector: &str) -> bool {
        match self.screen {
            Screen::Blank => false,
            Screen::Login => {
                let mut login_selectors = vec![
                    ".login_logo",
                    "#login_button_container",
                    "[data-test='username']",
                    "[data-test='password']",
                    "[data-test='login-button']",
                ];
                if self.error.is_some() {
                    login_selectors.push("[data-test='error']");
                }
                login_selectors.contains(&selector)
            }
            Screen::Inventory => [
                ".title",
                ".inventory_container",
                ".inventory_item",
                ".shopping_cart_link",
                "#react-burger-menu-btn",
                ".app_logo",
            ]
            .contains(&selector),
        }
    }

    fn text_of(&self, selector: &str) -> Option<String> {
        match (selector, &self.screen) {
            ("[data-test='error']", Screen::Login) => self.error.clone(),
            (".title", Screen::Inventory) => Some("Products".to_string()),
            (".app_logo", Screen::Inventory) => Some("Swag Labs".to_string()),
            (".login_logo", Screen::Login) => Some("Swag Labs".to_string()),
            _ => None,
        }
    }
}

/// Mock page simulating the login and inventory screens
#[derive(Debug)]
pub struct MockPage {
    stats: Arc<MockStats>,
    state: Mutex<AppState>,
    is_active: AtomicBool,
}

impl MockPage {
    fn ensure_active(&self) -> Result<(), Error> {
        if self.is_active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::engine("page is closed"))
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PageHandle for MockPage {
    async fn goto(&self, url: &str) -> Result<(), Error> {
        self.ensure_active()?;
        let mut state = self.state();
        state.url = url.to_string();
        state.fields.clear();
        state.error = None;
        state.screen = if url.contains("inventory") {
            Screen::Inventory
        } else {
            Screen::Login
        };
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), Error> {
        self.ensure_active()?;
        let mut state = self.state();
        if !state.selector_present(selector) {
            return Err(Error::engine(format!("element not found: {}", selector)));
        }
        if selector == "[data-test='login-button']" {
            state.attempt_login();
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), Error> {
        self.ensure_active()?;
        let mut state = self.state();
        if !state.selector_present(selector) {
            return Err(Error::engine(format!("element not found: {}", selector)));
        }
        state.fields.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, Error> {
        self.ensure_active()?;
        Ok(self.state().text_of(selector))
    }

    async fn is_present(&self, selector: &str) -> Result<bool, Error> {
        self.ensure_active()?;
        Ok(self.state().selector_present(selector))
    }

    async fn query_count(&self, selector: &str) -> Result<usize, Error> {
        self.ensure_active()?;
        let state = self.state();
        match (selector, &state.screen) {
            (".inventory_item", Screen::Inventory) => Ok(6),
            _ => Ok(if state.selector_present(selector) { 1 } else { 0 }),
        }
    }

    async fn screenshot(&self, path: &Path) -> Result<(), Error> {
        self.ensure_active()?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Minimal valid PNG header so consumers can sanity-check the file.
        tokio::fs::write(path, b"\x89PNG\r\n\x1a\n").await?;
        self.stats.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn title(&self) -> Result<String, Error> {
        self.ensure_active()?;
        Ok(match self.state().screen {
            Screen::Blank => String::new(),
            _ => "Swag Labs".to_string(),
        })
    }

    async fn url(&self) -> Result<String, Error> {
        self.ensure_active()?;
        Ok(self.state().url.clone())
    }

    async fn close(&self) -> Result<(), Error> {
        if self.is_active.swap(false, Ordering::SeqCst) {
            self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fresh_page(launcher: &MockLauncher) -> Arc<dyn PageHandle> {
        let engine = launcher.launch(&LaunchOptions::default()).await.unwrap();
        let context = engine.new_context(Viewport::default()).await.unwrap();
        context.new_page().await.unwrap()
    }

    #[tokio::test]
    async fn test_valid_login_reaches_inventory() {
        let launcher = MockLauncher::new();
        let page = fresh_page(&launcher).await;

        page.goto("https://www.saucedemo.com/").await.unwrap();
        page.fill("[data-test='username']", "standard_user").await.unwrap();
        page.fill("[data-test='password']", "secret_sauce").await.unwrap();
        page.click("[data-test='login-button']").await.unwrap();

        assert!(page.is_present(".inventory_container").await.unwrap());
        assert_eq!(
            page.text_content(".title").await.unwrap().as_deref(),
            Some("Products")
        );
        assert_eq!(page.query_count(".inventory_item").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_locked_out_user_sees_error() {
        let launcher = MockLauncher::new();
        let page = fresh_page(&launcher).await;

        page.goto("https://www.saucedemo.com/").await.unwrap();
        page.fill("[data-test='username']", "locked_out_user").await.unwrap();
        page.fill("[data-test='password']", "secret_sauce").await.unwrap();
        page.click("[data-test='login-button']").await.unwrap();

        assert!(page.is_present("[data-test='error']").await.unwrap());
        assert_eq!(
            page.text_content("[data-test='error']").await.unwrap().as_deref(),
            Some(LOCKED_OUT_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_empty_username_rejected() {
        let launcher = MockLauncher::new();
        let page = fresh_page(&launcher).await;

        page.goto("https://www.saucedemo.com/").await.unwrap();
        page.click("[data-test='login-button']").await.unwrap();

        assert_eq!(
            page.text_content("[data-test='error']").await.unwrap().as_deref(),
            Some(EMPTY_USERNAME_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_counted() {
        let launcher = MockLauncher::new();
        let page = fresh_page(&launcher).await;

        page.close().await.unwrap();
        page.close().await.unwrap();
        assert_eq!(launcher.stats.pages_closed.load(Ordering::SeqCst), 1);
        assert!(page.goto("https://example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_context_failure_injection() {
        let launcher = MockLauncher::new();
        launcher.fail_context();
        let engine = launcher.launch(&LaunchOptions::default()).await.unwrap();
        assert!(engine.new_context(Viewport::default()).await.is_err());
    }
}
