//! Shared page driver
//!
//! Wraps the raw page handle with the waiting and probing behavior every page
//! object needs. Visibility checks come in three strengths: a hard wait that
//! errors on timeout, a boolean probe that never errors, and a tri-state probe
//! that distinguishes "not there" from "gave up waiting".

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::engine::traits::PageHandle;
use crate::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of a visibility probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Element was found and rendered visible
    Visible,
    /// Element checked and determined not visible
    NotVisible,
    /// Wait deadline elapsed before the element appeared
    TimedOut,
}

impl Visibility {
    /// Collapse to a plain visible/not-visible answer
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

/// Page-level operations shared by all page objects
#[derive(Debug, Clone)]
pub struct PageDriver {
    handle: Arc<dyn PageHandle>,
    default_timeout: Duration,
}

impl PageDriver {
    pub fn new(handle: Arc<dyn PageHandle>, default_timeout: Duration) -> Self {
        Self {
            handle,
            default_timeout,
        }
    }

    pub fn handle(&self) -> &Arc<dyn PageHandle> {
        &self.handle
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.handle.goto(url).await
    }

    pub async fn click(&self, selector: &str) -> Result<(), Error> {
        self.handle.click(selector).await
    }

    pub async fn fill(&self, selector: &str, text: &str) -> Result<(), Error> {
        self.handle.fill(selector, text).await
    }

    /// Text content of the first match, empty string when absent
    pub async fn read_text(&self, selector: &str) -> Result<String, Error> {
        Ok(self
            .handle
            .text_content(selector)
            .await?
            .unwrap_or_default())
    }

    pub async fn query_count(&self, selector: &str) -> Result<usize, Error> {
        self.handle.query_count(selector).await
    }

    /// Wait until the selector is visible, erroring with `ElementTimeout`
    /// when the deadline passes first
    pub async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<(), Error> {
        match self.probe_visible(selector, timeout).await {
            Visibility::Visible => Ok(()),
            Visibility::NotVisible | Visibility::TimedOut => Err(Error::element_timeout(
                selector.to_string(),
                timeout.as_millis() as u64,
            )),
        }
    }

    /// Poll for visibility until the deadline; never errors
    pub async fn probe_visible(&self, selector: &str, timeout: Duration) -> Visibility {
        let start = Instant::now();
        loop {
            match self.handle.is_present(selector).await {
                Ok(true) => return Visibility::Visible,
                Ok(false) => {}
                Err(e) => debug!("Visibility probe for {} failed: {}", selector, e),
            }
            if start.elapsed() >= timeout {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        // One final check so a slow first poll does not report a timeout for
        // an element that is already there. An element attached to the DOM but
        // hidden reports NotVisible; one that never attached reports TimedOut.
        match self.handle.is_present(selector).await {
            Ok(true) => Visibility::Visible,
            Ok(false) => match self.handle.query_count(selector).await {
                Ok(n) if n > 0 => Visibility::NotVisible,
                _ => Visibility::TimedOut,
            },
            Err(_) => Visibility::TimedOut,
        }
    }

    /// Whether the selector is visible using the default timeout; never errors
    pub async fn is_visible(&self, selector: &str) -> bool {
        self.probe_visible(selector, self.default_timeout)
            .await
            .is_visible()
    }

    /// Single visibility check with no waiting; never errors
    pub async fn is_visible_now(&self, selector: &str) -> bool {
        self.handle.is_present(selector).await.unwrap_or(false)
    }

    pub async fn screenshot(&self, path: &Path) -> Result<(), Error> {
        self.handle.screenshot(path).await
    }

    pub async fn title(&self) -> Result<String, Error> {
        self.handle.title().await
    }

    pub async fn url(&self) -> Result<String, Error> {
        self.handle.url().await
    }
}
