//! Browser engine layer
//!
//! Trait seams for launching engines and driving pages, a CDP-backed chromium
//! implementation, and an in-process mock for tests.

pub mod cdp;
pub mod mock;
pub mod traits;

pub use traits::{
    BrowserVariant, Context, Engine, EngineLauncher, LaunchOptions, PageHandle, Viewport,
};
