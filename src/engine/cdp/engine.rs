//! CDP-backed engine, context, and page implementations
//!
//! Maps the engine traits onto DevTools commands: contexts are
//! `Target.createBrowserContext` isolates, pages are targets with their own
//! WebSocket connection, and DOM primitives run through `Runtime.evaluate`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::connection::CdpConnection;
use super::types::EvaluateResponse;
use crate::engine::traits::{Context, Engine, PageHandle, Viewport};
use crate::Error;

/// Escape a string for embedding inside a single-quoted JavaScript literal
fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', r#"\""#)
}

/// Evaluate an expression on a connection and return the remote object value
async fn evaluate(
    conn: &CdpConnection,
    expression: &str,
) -> Result<Option<serde_json::Value>, Error> {
    let result = conn
        .send_command(
            "Runtime.evaluate",
            serde_json::json!({
                "expression": expression,
                "returnByValue": true,
            }),
        )
        .await?;

    let response: EvaluateResponse = serde_json::from_value(result)?;
    if let Some(exception) = response.exception_details {
        return Err(Error::script(
            exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .unwrap_or("unknown script exception")
                .to_string(),
        ));
    }

    Ok(response.result.value)
}

/// A launched chromium reachable over its browser-level connection
#[derive(Debug)]
pub struct CdpEngine {
    /// Browser process; killed on drop as the finalizer backstop
    child: Mutex<Option<Child>>,
    conn: Arc<CdpConnection>,
    /// WebSocket base (scheme + authority) for per-target connections
    ws_base: String,
    command_timeout: Duration,
    is_active: AtomicBool,
}

/// Scheme and authority of a browser endpoint, for per-target URLs
fn ws_base_of(ws_endpoint: &str) -> Result<String, Error> {
    match ws_endpoint.split_once("/devtools/") {
        Some((base, _)) if !base.is_empty() => Ok(base.to_string()),
        _ => Err(Error::engine_launch(format!(
            "malformed endpoint: {}",
            ws_endpoint
        ))),
    }
}

impl CdpEngine {
    /// Attach to a freshly spawned browser through its WebSocket endpoint
    pub async fn connect(
        child: Child,
        ws_endpoint: &str,
        command_timeout: Duration,
    ) -> Result<Arc<Self>, Error> {
        let ws_base = ws_base_of(ws_endpoint)?;

        let conn = CdpConnection::connect(ws_endpoint, command_timeout).await?;

        Ok(Arc::new(Self {
            child: Mutex::new(Some(child)),
            conn,
            ws_base,
            command_timeout,
            is_active: AtomicBool::new(true),
        }))
    }
}

#[async_trait]
impl Engine for CdpEngine {
    async fn new_context(&self, viewport: Viewport) -> Result<Arc<dyn Context>, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::engine("engine is closed"));
        }

        let result = self
            .conn
            .send_command("Target.createBrowserContext", serde_json::json!({}))
            .await?;

        let context_id = result
            .get("browserContextId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::engine("no browserContextId in response"))?
            .to_string();

        debug!("Created browser context {}", context_id);

        Ok(Arc::new(CdpContext {
            browser_conn: Arc::clone(&self.conn),
            ws_base: self.ws_base.clone(),
            context_id,
            viewport,
            command_timeout: self.command_timeout,
            is_active: AtomicBool::new(true),
        }))
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Closing browser engine");

        if let Err(e) = self.conn.send_command("Browser.close", serde_json::json!({})).await {
            warn!("Browser.close failed: {}", e);
        }
        if let Err(e) = self.conn.close().await {
            debug!("Browser connection close: {}", e);
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.start_kill() {
                debug!("Browser process already exited: {}", e);
            }
            let _ = child.wait().await;
        }

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

/// An isolated browsing context (cookies, storage, cache)
#[derive(Debug)]
pub struct CdpContext {
    browser_conn: Arc<CdpConnection>,
    ws_base: String,
    context_id: String,
    viewport: Viewport,
    command_timeout: Duration,
    is_active: AtomicBool,
}

#[async_trait]
impl Context for CdpContext {
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::engine("context is closed"));
        }

        let result = self
            .browser_conn
            .send_command(
                "Target.createTarget",
                serde_json::json!({
                    "url": "about:blank",
                    "browserContextId": self.context_id,
                }),
            )
            .await?;

        let target_id = result
            .get("targetId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::engine("no targetId in response"))?
            .to_string();

        let ws_url = format!("{}/devtools/page/{}", self.ws_base, target_id);
        let conn = CdpConnection::connect(&ws_url, self.command_timeout).await?;

        conn.send_command("Page.enable", serde_json::json!({})).await?;
        conn.send_command("Runtime.enable", serde_json::json!({})).await?;
        conn.send_command(
            "Emulation.setDeviceMetricsOverride",
            serde_json::json!({
                "width": self.viewport.width,
                "height": self.viewport.height,
                "deviceScaleFactor": 1.0,
                "mobile": false,
            }),
        )
        .await?;

        debug!("Created page target {}", target_id);

        Ok(Arc::new(CdpPage {
            conn,
            target_id,
            is_active: AtomicBool::new(true),
        }))
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.browser_conn
            .send_command(
                "Target.disposeBrowserContext",
                serde_json::json!({ "browserContextId": self.context_id }),
            )
            .await?;

        Ok(())
    }
}

/// One page target with its own CDP connection
#[derive(Debug)]
pub struct CdpPage {
    conn: Arc<CdpConnection>,
    target_id: String,
    is_active: AtomicBool,
}

impl CdpPage {
    fn ensure_active(&self) -> Result<(), Error> {
        if self.is_active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::engine(format!("page {} is closed", self.target_id)))
        }
    }
}

#[async_trait]
impl PageHandle for CdpPage {
    async fn goto(&self, url: &str) -> Result<(), Error> {
        self.ensure_active()?;
        debug!("Navigating to {}", url);

        self.conn
            .send_command("Page.navigate", serde_json::json!({ "url": url }))
            .await
            .map_err(|e| Error::navigation(format!("{}: {}", url, e)))?;

        // Poll readyState instead of relying on load events; avoids races on
        // fast navigations.
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            match evaluate(&self.conn, "document.readyState").await {
                Ok(Some(state)) if state.as_str() == Some("complete") => return Ok(()),
                Ok(_) => {}
                Err(e) => debug!("readyState probe failed: {}", e),
            }
        }

        warn!("Navigation to {} did not reach readyState=complete", url);
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), Error> {
        self.ensure_active()?;

        let script = format!(
            "(() => {{ const el = document.querySelector('{}'); if (!el) return false; el.click(); return true; }})()",
            escape_js(selector)
        );

        match evaluate(&self.conn, &script).await? {
            Some(v) if v.as_bool() == Some(true) => Ok(()),
            _ => Err(Error::engine(format!("element not found: {}", selector))),
        }
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), Error> {
        self.ensure_active()?;

        let script = format!(
            "(() => {{ \
                const el = document.querySelector('{}'); \
                if (!el) return false; \
                el.focus(); \
                el.value = '{}'; \
                el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                return true; \
            }})()",
            escape_js(selector),
            escape_js(text)
        );

        match evaluate(&self.conn, &script).await? {
            Some(v) if v.as_bool() == Some(true) => Ok(()),
            _ => Err(Error::engine(format!("element not found: {}", selector))),
        }
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, Error> {
        self.ensure_active()?;

        let script = format!(
            "(() => {{ const el = document.querySelector('{}'); return el ? el.textContent : null; }})()",
            escape_js(selector)
        );

        Ok(evaluate(&self.conn, &script)
            .await?
            .and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    async fn is_present(&self, selector: &str) -> Result<bool, Error> {
        self.ensure_active()?;

        let script = format!(
            "(() => {{ \
                const el = document.querySelector('{}'); \
                if (!el) return false; \
                const rect = el.getBoundingClientRect(); \
                const style = window.getComputedStyle(el); \
                return rect.width > 0 && rect.height > 0 && \
                    style.visibility !== 'hidden' && style.display !== 'none'; \
            }})()",
            escape_js(selector)
        );

        Ok(evaluate(&self.conn, &script)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn query_count(&self, selector: &str) -> Result<usize, Error> {
        self.ensure_active()?;

        let script = format!(
            "document.querySelectorAll('{}').length",
            escape_js(selector)
        );

        Ok(evaluate(&self.conn, &script)
            .await?
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize)
    }

    async fn screenshot(&self, path: &Path) -> Result<(), Error> {
        self.ensure_active()?;

        let result = self
            .conn
            .send_command(
                "Page.captureScreenshot",
                serde_json::json!({ "format": "png" }),
            )
            .await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::engine("no data in screenshot result"))?;

        let bytes = BASE64
            .decode(data)
            .map_err(|e| Error::engine(format!("failed to decode screenshot: {}", e)))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;

        Ok(())
    }

    async fn title(&self) -> Result<String, Error> {
        self.ensure_active()?;
        Ok(evaluate(&self.conn, "document.title")
            .await?
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_default())
    }

    async fn url(&self) -> Result<String, Error> {
        self.ensure_active()?;
        Ok(evaluate(&self.conn, "window.location.href")
            .await?
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(e) = self
            .conn
            .send_command("Page.close", serde_json::json!({}))
            .await
        {
            warn!("Page.close failed for {}: {}", self.target_id, e);
        }
        if let Err(e) = self.conn.close().await {
            debug!("Page connection close: {}", e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_base_extraction() {
        assert_eq!(
            ws_base_of("ws://127.0.0.1:9222/devtools/browser/abc-123").unwrap(),
            "ws://127.0.0.1:9222"
        );

        let err = ws_base_of("ws://127.0.0.1:9222/no-marker-here").unwrap_err();
        assert!(matches!(err, Error::EngineLaunch(_)));
        assert!(ws_base_of("/devtools/browser/abc").is_err());
    }

    #[test]
    fn test_escape_js() {
        assert_eq!(escape_js("button.submit"), "button.submit");
        assert_eq!(escape_js("it's"), "it\\'s");
        assert_eq!(escape_js(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_js(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_selector_script_shape() {
        let selector = "[data-test='username']";
        let script = format!(
            "(() => {{ const el = document.querySelector('{}'); return el ? el.textContent : null; }})()",
            escape_js(selector)
        );
        assert!(script.contains(r"[data-test=\'username\']"));
        assert!(script.contains("querySelector"));
    }
}
