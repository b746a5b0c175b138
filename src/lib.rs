//! Webcheck: browser-based functional verification
//!
//! Drives a real chromium over the DevTools protocol (or an in-process mock)
//! through session, page-object, and reporting layers, and orchestrates
//! data-driven scenarios that run concurrently and flush one report when the
//! last of them finishes.

pub mod config;
pub mod engine;
pub mod error;
pub mod harness;
pub mod page;
pub mod report;
pub mod session;
pub mod testdata;

pub use config::Config;
pub use error::{Error, Result};
pub use harness::Harness;
pub use session::{Session, SessionOptions};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
