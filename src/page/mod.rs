//! Page objects
//!
//! Each screen of the application under test gets one object wrapping the
//! shared [`PageDriver`]; selectors live with the page that owns them.

pub mod base;
pub mod login;
pub mod products;

pub use base::{PageDriver, Visibility};
pub use login::LoginPage;
pub use products::ProductsPage;
