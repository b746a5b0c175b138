//! Login page object

use std::time::Duration;
use tracing::{debug, info};

use super::base::PageDriver;
use crate::Error;

const USERNAME_INPUT: &str = "[data-test='username']";
const PASSWORD_INPUT: &str = "[data-test='password']";
const LOGIN_BUTTON: &str = "[data-test='login-button']";
const ERROR_BANNER: &str = "[data-test='error']";
const LOGIN_LOGO: &str = ".login_logo";
const LOGIN_CONTAINER: &str = "#login_button_container";

/// The login form
#[derive(Debug, Clone)]
pub struct LoginPage {
    driver: PageDriver,
}

impl LoginPage {
    pub fn new(driver: PageDriver) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &PageDriver {
        &self.driver
    }

    /// Navigate to the login screen and wait for the form to render
    pub async fn open(&self, base_url: &str) -> Result<(), Error> {
        info!("Opening login page at {}", base_url);
        self.driver.navigate(base_url).await?;
        self.driver
            .wait_for_visible(LOGIN_CONTAINER, self.driver.default_timeout())
            .await
    }

    /// Fill credentials and submit the form
    pub async fn login(&self, username: &str, password: &str) -> Result<(), Error> {
        debug!("Logging in as {:?}", username);
        self.driver.fill(USERNAME_INPUT, username).await?;
        self.driver.fill(PASSWORD_INPUT, password).await?;
        self.driver.click(LOGIN_BUTTON).await
    }

    /// Whether every element of the login form is visible
    ///
    /// All checks run even after one fails, so the log names every missing
    /// element rather than just the first.
    pub async fn is_loaded(&self) -> bool {
        let mut loaded = true;
        for selector in [
            LOGIN_LOGO,
            LOGIN_CONTAINER,
            USERNAME_INPUT,
            PASSWORD_INPUT,
            LOGIN_BUTTON,
        ] {
            if !self.driver.is_visible_now(selector).await {
                debug!("Login page element not visible: {}", selector);
                loaded = false;
            }
        }
        loaded
    }

    /// Whether the error banner is currently shown
    pub async fn is_error_visible(&self) -> bool {
        self.driver.is_visible_now(ERROR_BANNER).await
    }

    /// Wait for the error banner to appear within `timeout`
    pub async fn wait_for_error(&self, timeout: Duration) -> Result<(), Error> {
        self.driver.wait_for_visible(ERROR_BANNER, timeout).await
    }

    /// Text of the error banner, empty when no error is shown
    pub async fn error_message(&self) -> Result<String, Error> {
        self.driver.read_text(ERROR_BANNER).await
    }
}
