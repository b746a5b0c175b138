//! Browser session lifecycle
//!
//! A [`Session`] owns one engine, one browsing context, and one page, and
//! guarantees teardown happens in reverse acquisition order. Initialization is
//! idempotent, partial failures unwind whatever was acquired, and `close` never
//! fails so it is always safe in cleanup paths.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::traits::{
    BrowserVariant, Context, Engine, EngineLauncher, LaunchOptions, PageHandle, Viewport,
};
use crate::Error;

/// Settings for opening a session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub launch: LaunchOptions,
    pub viewport: Viewport,
}

impl SessionOptions {
    /// Derive session options from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let variant: BrowserVariant = config.browser.variant.parse()?;
        Ok(Self {
            launch: LaunchOptions {
                variant,
                headless: config.browser.headless,
                timeout: Duration::from_millis(config.browser.timeout_ms),
                executable_path: config.browser.executable_path.clone(),
                args: vec![],
            },
            viewport: Viewport {
                width: config.browser.viewport_width,
                height: config.browser.viewport_height,
            },
        })
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    engine: Option<Arc<dyn Engine>>,
    context: Option<Arc<dyn Context>>,
    page: Option<Arc<dyn PageHandle>>,
}

impl SessionInner {
    fn is_initialized(&self) -> bool {
        self.engine.is_some() && self.context.is_some() && self.page.is_some()
    }
}

/// One engine, one context, one page, torn down in reverse order
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    launcher: Arc<dyn EngineLauncher>,
    options: SessionOptions,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(launcher: Arc<dyn EngineLauncher>, options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            launcher,
            options,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// Unique id for correlating this session in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Launch the engine, create a context, and open the initial page
    ///
    /// Calling this on an already initialized session is a no-op. If any step
    /// fails, everything acquired so far is released before the error is
    /// returned, so the session is left fully closed rather than half open.
    pub async fn initialize(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        if inner.is_initialized() {
            debug!("Session already initialized");
            return Ok(());
        }

        info!(
            "Initializing session {} ({}, headless: {})",
            self.id, self.options.launch.variant, self.options.launch.headless
        );

        let engine = self.launcher.launch(&self.options.launch).await?;

        let context = match engine.new_context(self.options.viewport).await {
            Ok(context) => context,
            Err(e) => {
                Self::release(None, None, Some(&engine)).await;
                return Err(e);
            }
        };

        let page = match context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                Self::release(None, Some(&context), Some(&engine)).await;
                return Err(e);
            }
        };

        inner.engine = Some(engine);
        inner.context = Some(context);
        inner.page = Some(page);
        info!("Session initialized");
        Ok(())
    }

    /// The session's page
    pub async fn page(&self) -> Result<Arc<dyn PageHandle>, Error> {
        let inner = self.inner.lock().await;
        inner
            .page
            .clone()
            .ok_or_else(|| Error::not_initialized("session has no page; call initialize first"))
    }

    /// Open an additional page in the session's context
    pub async fn new_page(&self) -> Result<Arc<dyn PageHandle>, Error> {
        let context = {
            let inner = self.inner.lock().await;
            inner.context.clone().ok_or_else(|| {
                Error::not_initialized("session has no context; call initialize first")
            })?
        };
        context.new_page().await
    }

    /// Whether the session has a usable engine, context, and page
    pub async fn is_initialized(&self) -> bool {
        self.inner.lock().await.is_initialized()
    }

    /// Release everything the session holds, page first, engine last
    ///
    /// Never fails; teardown errors are logged and swallowed so cleanup paths
    /// cannot mask the error that sent them here. Idempotent.
    pub async fn close(&self) {
        let (page, context, engine) = {
            let mut inner = self.inner.lock().await;
            (inner.page.take(), inner.context.take(), inner.engine.take())
        };

        if page.is_none() && context.is_none() && engine.is_none() {
            return;
        }

        debug!("Closing session {}", self.id);
        Self::release(page.as_ref(), context.as_ref(), engine.as_ref()).await;
        info!("Session {} closed", self.id);
    }

    async fn release(
        page: Option<&Arc<dyn PageHandle>>,
        context: Option<&Arc<dyn Context>>,
        engine: Option<&Arc<dyn Engine>>,
    ) {
        if let Some(page) = page {
            if let Err(e) = page.close().await {
                warn!("Failed to close page: {}", e);
            }
        }
        if let Some(context) = context {
            if let Err(e) = context.close().await {
                warn!("Failed to close context: {}", e);
            }
        }
        if let Some(engine) = engine {
            if let Err(e) = engine.close().await {
                warn!("Failed to close engine: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockLauncher;
    use std::sync::atomic::Ordering;

    fn mock_session() -> (Arc<MockLauncher>, Session) {
        let launcher = Arc::new(MockLauncher::new());
        let session = Session::new(
            Arc::clone(&launcher) as Arc<dyn EngineLauncher>,
            SessionOptions::default(),
        );
        (launcher, session)
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (launcher, session) = mock_session();

        session.initialize().await.unwrap();
        session.initialize().await.unwrap();

        assert_eq!(launcher.stats.launches.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.stats.pages_created.load(Ordering::SeqCst), 1);
        assert!(session.is_initialized().await);
    }

    #[tokio::test]
    async fn test_page_before_initialize_fails() {
        let (_launcher, session) = mock_session();
        let err = session.page().await.unwrap_err();
        assert!(matches!(err, Error::NotInitialized(_)));
    }

    #[tokio::test]
    async fn test_partial_failure_unwinds_engine() {
        let launcher = Arc::new(MockLauncher::new());
        launcher.fail_context();
        let session = Session::new(
            Arc::clone(&launcher) as Arc<dyn EngineLauncher>,
            SessionOptions::default(),
        );

        assert!(session.initialize().await.is_err());
        assert!(!session.is_initialized().await);
        // The launched engine must not leak.
        assert_eq!(launcher.stats.engines_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_page_failure_unwinds_context_and_engine() {
        let launcher = Arc::new(MockLauncher::new());
        launcher.fail_page();
        let session = Session::new(
            Arc::clone(&launcher) as Arc<dyn EngineLauncher>,
            SessionOptions::default(),
        );

        assert!(session.initialize().await.is_err());
        assert_eq!(launcher.stats.contexts_closed.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.stats.engines_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_releases_in_order() {
        let (launcher, session) = mock_session();
        session.initialize().await.unwrap();

        session.close().await;
        session.close().await;

        assert_eq!(launcher.stats.pages_closed.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.stats.contexts_closed.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.stats.engines_closed.load(Ordering::SeqCst), 1);
        assert!(!session.is_initialized().await);
    }

    #[tokio::test]
    async fn test_reinitialize_after_close() {
        let (launcher, session) = mock_session();
        session.initialize().await.unwrap();
        session.close().await;
        session.initialize().await.unwrap();

        assert_eq!(launcher.stats.launches.load(Ordering::SeqCst), 2);
        assert!(session.is_initialized().await);
    }
}
