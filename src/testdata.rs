//! Data-driven fixtures
//!
//! JSON files describing the users, products, and scenarios the checks run
//! against. Missing or malformed fixtures are hard errors; a data-driven run
//! with no data has nothing meaningful to do.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Error;

/// Expected outcome of a login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedResult {
    Success,
    Failure,
}

/// Which configured error banner a rejected login should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedError {
    LockedOut,
    InvalidCredentials,
    EmptyUsername,
    EmptyPassword,
}

/// One credential fixture
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    /// Absent means the configured default password
    #[serde(default)]
    pub password: Option<String>,
    /// Human-readable label used in report entries
    pub description: String,
    pub expected_result: ExpectedResult,
    /// Banner expected on failure; absent defaults to invalid credentials
    #[serde(default)]
    pub expected_error: Option<ExpectedError>,
}

impl UserRecord {
    /// The password to submit, falling back to `default` when the fixture
    /// carries none
    pub fn password_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.password.as_deref().unwrap_or(default)
    }
}

/// One catalog product fixture
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    pub price: String,
}

/// Loads fixtures from a directory of JSON files
#[derive(Debug, Clone)]
pub struct TestData {
    dir: PathBuf,
}

impl TestData {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Credential fixtures from `users.json`
    pub fn users(&self) -> Result<Vec<UserRecord>, Error> {
        self.load("users.json")
    }

    /// Product fixtures from `products.json`
    pub fn products(&self) -> Result<Vec<ProductRecord>, Error> {
        self.load("products.json")
    }

    fn load<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, Error> {
        let path = self.dir.join(file);
        debug!("Loading fixtures from {}", path.display());

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            Error::data_load(format!("cannot read {}: {}", path.display(), e))
        })?;

        let records: Vec<T> = serde_json::from_str(&raw).map_err(|e| {
            Error::data_load(format!("invalid fixture {}: {}", path.display(), e))
        })?;

        if records.is_empty() {
            return Err(Error::data_load(format!(
                "fixture {} contains no records",
                path.display()
            )));
        }
        Ok(records)
    }
}

/// Find a user fixture by username
pub fn find_user<'a>(users: &'a [UserRecord], username: &str) -> Result<&'a UserRecord, Error> {
    users
        .iter()
        .find(|u| u.username == username)
        .ok_or_else(|| Error::data_load(format!("no fixture for user {:?}", username)))
}
