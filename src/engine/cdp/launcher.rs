//! Chromium process launch and endpoint discovery
//!
//! Spawns a chromium with a DevTools port, polls the HTTP `/json/version`
//! endpoint until the browser is ready, and hands the browser WebSocket
//! endpoint to the engine. Only the chromium variant is supported; firefox and
//! webkit fail at launch with an `EngineLaunch` error.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::engine::CdpEngine;
use crate::engine::traits::{BrowserVariant, Engine, EngineLauncher, LaunchOptions};
use crate::Error;

const DEFAULT_EXECUTABLES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

/// Launches chromium processes with a DevTools endpoint
///
/// Each launch gets its own port counted up from the base, so concurrent
/// sessions never fight over one DevTools socket.
#[derive(Debug)]
pub struct CdpLauncher {
    base_port: u16,
    next_offset: AtomicU16,
}

impl Default for CdpLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl CdpLauncher {
    pub fn new() -> Self {
        Self::with_base_port(9222)
    }

    pub fn with_base_port(base_port: u16) -> Self {
        Self {
            base_port,
            next_offset: AtomicU16::new(0),
        }
    }

    fn next_port(&self) -> u16 {
        self.base_port + self.next_offset.fetch_add(1, Ordering::SeqCst)
    }

    fn resolve_executable(options: &LaunchOptions) -> Result<String, Error> {
        if let Some(path) = &options.executable_path {
            return Ok(path.clone());
        }

        for candidate in DEFAULT_EXECUTABLES {
            if which(candidate) {
                return Ok((*candidate).to_string());
            }
        }

        Err(Error::engine_launch(
            "no chromium executable found; set browser.executable_path",
        ))
    }

    async fn spawn(
        &self,
        executable: &str,
        port: u16,
        options: &LaunchOptions,
    ) -> Result<Child, Error> {
        let mut command = Command::new(executable);
        command
            .arg(format!("--remote-debugging-port={}", port))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if options.headless {
            command.arg("--headless=new");
        }

        for arg in &options.args {
            command.arg(arg);
        }

        command
            .spawn()
            .map_err(|e| Error::engine_launch(format!("failed to spawn {}: {}", executable, e)))
    }

    /// Poll `/json/version` until the browser reports its WebSocket endpoint
    async fn discover_ws_endpoint(&self, port: u16, deadline: Duration) -> Result<String, Error> {
        let url = format!("http://127.0.0.1:{}/json/version", port);
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        let start = Instant::now();
        while start.elapsed() < deadline {
            match client.get(&url).send().await {
                Ok(response) => {
                    let version: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| Error::engine_launch(format!("invalid version payload: {}", e)))?;

                    if let Some(endpoint) = version
                        .get("webSocketDebuggerUrl")
                        .and_then(|v| v.as_str())
                    {
                        debug!("Browser WebSocket endpoint: {}", endpoint);
                        return Ok(endpoint.to_string());
                    }
                }
                Err(e) => {
                    debug!("DevTools endpoint not ready yet: {}", e);
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(Error::engine_launch(format!(
            "browser did not expose DevTools endpoint within {:?}",
            deadline
        )))
    }
}

#[async_trait]
impl EngineLauncher for CdpLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn Engine>, Error> {
        match options.variant {
            BrowserVariant::Chromium => {}
            other => {
                return Err(Error::engine_launch(format!(
                    "unsupported browser variant: {} (only chromium is available over CDP)",
                    other
                )));
            }
        }

        let executable = Self::resolve_executable(options)?;
        let port = self.next_port();
        info!(
            "Launching {} (headless: {}, port: {})",
            executable, options.headless, port
        );

        let child = self.spawn(&executable, port, options).await?;

        let ws_endpoint = match self.discover_ws_endpoint(port, options.timeout).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                // The child is killed on drop; surface the original launch error.
                drop(child);
                return Err(e);
            }
        };

        let engine = CdpEngine::connect(child, &ws_endpoint, options.timeout).await?;
        info!("Browser launched and connected");
        Ok(engine)
    }
}

/// Minimal PATH lookup for an executable name
fn which(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}
