//! Configuration management for Webcheck
//!
//! Resolution order: an optional per-environment TOML file, then `WEBCHECK_*`
//! environment variables, then hard defaults. Core components only read the
//! resolved values; nothing mutates configuration after load.

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Browser settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Browser variant ("chromium", "firefox", "webkit")
    pub variant: String,
    /// Run without a visible window
    pub headless: bool,
    /// Default operation timeout in milliseconds
    pub timeout_ms: u64,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Browser executable path override
    pub executable_path: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            variant: "chromium".to_string(),
            headless: true,
            timeout_ms: 30_000,
            viewport_width: 1920,
            viewport_height: 1080,
            executable_path: None,
        }
    }
}

/// Application URLs under test
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UrlSettings {
    /// Login page
    pub base: String,
    /// Product listing page
    pub inventory: String,
}

impl Default for UrlSettings {
    fn default() -> Self {
        Self {
            base: "https://www.saucedemo.com".to_string(),
            inventory: "https://www.saucedemo.com/inventory.html".to_string(),
        }
    }
}

/// Credential settings shared by the fixture records
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Password applied to fixture records that do not carry their own
    pub default_password: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_password: "secret_sauce".to_string(),
        }
    }
}

/// Expected error-banner messages
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ErrorMessageSettings {
    pub locked_out: String,
    pub invalid_credentials: String,
    pub empty_username: String,
    pub empty_password: String,
}

impl Default for ErrorMessageSettings {
    fn default() -> Self {
        Self {
            locked_out: "Epic sadface: Sorry, this user has been locked out.".to_string(),
            invalid_credentials:
                "Epic sadface: Username and password do not match any user in this service"
                    .to_string(),
            empty_username: "Epic sadface: Username is required".to_string(),
            empty_password: "Epic sadface: Password is required".to_string(),
        }
    }
}

/// Wait durations in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Probes that treat absence as an answer (error banners)
    pub short_wait_ms: u64,
    /// Waits that must see the element appear (page readiness)
    pub element_wait_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            short_wait_ms: 5_000,
            element_wait_ms: 15_000,
        }
    }
}

/// Artifact and fixture directories
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub screenshots: String,
    pub test_data: String,
    pub reports: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            screenshots: "screenshots".to_string(),
            test_data: "testdata".to_string(),
            reports: "reports".to_string(),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSettings,
    pub urls: UrlSettings,
    pub users: UserSettings,
    pub error_messages: ErrorMessageSettings,
    pub timeouts: TimeoutSettings,
    pub paths: PathSettings,
}

impl Config {
    /// Load configuration for the environment named by `WEBCHECK_ENV`.
    ///
    /// Reads `config/webcheck.toml` and then `config/webcheck.<env>.toml` when
    /// present, and applies environment-variable overrides on top. A missing
    /// file is fine; a malformed one is a hard error.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if Path::new("config/webcheck.toml").exists() {
            config = Self::from_file("config/webcheck.toml")?;
        }

        if let Ok(environment) = env::var("WEBCHECK_ENV") {
            let path = format!("config/webcheck.{}.toml", environment.to_lowercase());
            if Path::new(&path).exists() {
                config = Self::from_file(&path)?;
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file {}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config {}: {}", path, e)))?;

        Ok(config)
    }

    /// Apply `WEBCHECK_*` environment-variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(variant) = env::var("WEBCHECK_BROWSER") {
            self.browser.variant = variant;
        }

        if let Ok(headless) = env::var("WEBCHECK_HEADLESS") {
            self.browser.headless = headless
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBCHECK_HEADLESS"))?;
        }

        if let Ok(timeout) = env::var("WEBCHECK_TIMEOUT_MS") {
            self.browser.timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBCHECK_TIMEOUT_MS"))?;
        }

        if let Ok(path) = env::var("WEBCHECK_BROWSER_PATH") {
            self.browser.executable_path = Some(path);
        }

        if let Ok(base) = env::var("WEBCHECK_BASE_URL") {
            self.urls.base = base;
        }

        if let Ok(inventory) = env::var("WEBCHECK_INVENTORY_URL") {
            self.urls.inventory = inventory;
        }

        if let Ok(reports) = env::var("WEBCHECK_REPORTS_DIR") {
            self.paths.reports = reports;
        }

        if let Ok(screenshots) = env::var("WEBCHECK_SCREENSHOTS_DIR") {
            self.paths.screenshots = screenshots;
        }

        if let Ok(test_data) = env::var("WEBCHECK_TESTDATA_DIR") {
            self.paths.test_data = test_data;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.browser.variant, "chromium");
        assert!(config.browser.headless);
        assert_eq!(config.browser.viewport_width, 1920);
        assert_eq!(config.browser.viewport_height, 1080);
        assert_eq!(config.users.default_password, "secret_sauce");
        assert_eq!(config.timeouts.short_wait_ms, 5_000);
        assert!(config.error_messages.locked_out.contains("locked out"));
        assert!(config.urls.inventory.contains("inventory.html"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [browser]
            variant = "firefox"
            headless = false

            [urls]
            base = "http://localhost:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.browser.variant, "firefox");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.timeout_ms, 30_000);
        assert_eq!(config.urls.base, "http://localhost:8080");
        assert!(config.urls.inventory.contains("saucedemo"));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("browser = 12");
        assert!(result.is_err());
    }
}
