//! Chromium automation over the Chrome DevTools Protocol

pub mod connection;
pub mod engine;
pub mod launcher;
pub mod types;

pub use connection::CdpConnection;
pub use engine::{CdpContext, CdpEngine, CdpPage};
pub use launcher::CdpLauncher;
