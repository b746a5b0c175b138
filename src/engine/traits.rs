//! Engine layer traits
//!
//! Abstract interfaces for the browser-automation collaborator: launching an
//! engine, creating isolated browsing contexts, and driving page primitives.

use async_trait::async_trait;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::Error;

/// Supported browser variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserVariant {
    Chromium,
    Firefox,
    Webkit,
}

impl FromStr for BrowserVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserVariant::Chromium),
            "firefox" => Ok(BrowserVariant::Firefox),
            "webkit" => Ok(BrowserVariant::Webkit),
            other => Err(Error::engine_launch(format!(
                "unsupported browser variant: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BrowserVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserVariant::Chromium => write!(f, "chromium"),
            BrowserVariant::Firefox => write!(f, "firefox"),
            BrowserVariant::Webkit => write!(f, "webkit"),
        }
    }
}

/// Viewport dimensions for a browsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Options for launching an engine
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Browser variant to launch
    pub variant: BrowserVariant,
    /// Run without a visible window
    pub headless: bool,
    /// Launch and default operation timeout
    pub timeout: Duration,
    /// Executable path override
    pub executable_path: Option<String>,
    /// Additional process arguments
    pub args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            variant: BrowserVariant::Chromium,
            headless: true,
            timeout: Duration::from_secs(30),
            executable_path: None,
            args: vec![],
        }
    }
}

/// Launches engine processes
///
/// The seam between the session layer and a concrete automation backend.
#[async_trait]
pub trait EngineLauncher: Send + Sync + std::fmt::Debug {
    /// Launch a new engine instance
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn Engine>, Error>;
}

/// A running browser engine
#[async_trait]
pub trait Engine: Send + Sync + std::fmt::Debug {
    /// Create an isolated browsing context with the given viewport
    async fn new_context(&self, viewport: Viewport) -> Result<Arc<dyn Context>, Error>;

    /// Shut the engine down
    async fn close(&self) -> Result<(), Error>;

    /// Whether the engine is still usable
    fn is_active(&self) -> bool;
}

/// An isolated browsing context inside an engine
#[async_trait]
pub trait Context: Send + Sync + std::fmt::Debug {
    /// Open a new page in this context
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>, Error>;

    /// Close the context and everything it owns
    async fn close(&self) -> Result<(), Error>;
}

/// Primitive operations on a single page
#[async_trait]
pub trait PageHandle: Send + Sync + std::fmt::Debug {
    /// Navigate to a URL and wait for the document to load
    async fn goto(&self, url: &str) -> Result<(), Error>;

    /// Click the first element matching the selector
    async fn click(&self, selector: &str) -> Result<(), Error>;

    /// Replace the value of the first element matching the selector
    async fn fill(&self, selector: &str, text: &str) -> Result<(), Error>;

    /// Text content of the first matching element, `None` if absent
    async fn text_content(&self, selector: &str) -> Result<Option<String>, Error>;

    /// Whether a matching element exists and is rendered visible
    async fn is_present(&self, selector: &str) -> Result<bool, Error>;

    /// Number of elements matching the selector
    async fn query_count(&self, selector: &str) -> Result<usize, Error>;

    /// Capture a PNG screenshot of the viewport to `path`
    async fn screenshot(&self, path: &Path) -> Result<(), Error>;

    /// Document title
    async fn title(&self) -> Result<String, Error>;

    /// Current URL
    async fn url(&self) -> Result<String, Error>;

    /// Close the page
    async fn close(&self) -> Result<(), Error>;
}
