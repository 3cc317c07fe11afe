//! Repository connection configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Configuration for a Fedora repository connection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base URL of the REST API (e.g. "http://127.0.0.1:8080/fedora/objects")
    pub url: String,
    /// Username for HTTP basic authentication
    pub username: String,
    /// Password for HTTP basic authentication
    pub password: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Ask the server to validate checksums on every profile fetch
    pub validate_checksum: bool,
    /// Compare new content against the current content when it is assigned
    /// instead of deferring the comparison until it is needed
    pub eager_load_datastream_content: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/fedora/objects".to_string(),
            username: "fedoraAdmin".to_string(),
            password: "fedoraAdmin".to_string(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 30000,
            validate_checksum: false,
            eager_load_datastream_content: false,
        }
    }
}

impl RepositoryConfig {
    /// Create a new config for the given base URL
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    /// Set timeouts
    pub fn with_timeouts(mut self, connect_ms: u64, read_ms: u64) -> Self {
        self.connect_timeout_ms = connect_ms;
        self.read_timeout_ms = read_ms;
        self
    }

    pub fn with_validate_checksum(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }

    pub fn with_eager_content(mut self, eager: bool) -> Self {
        self.eager_load_datastream_content = eager;
        self
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by `FEDORA_URL`, `FEDORA_USER`, `FEDORA_PASSWORD`
    /// and `FEDORA_VALIDATE_CHECKSUM`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("FEDORA_URL") {
            config.url = url;
        }
        if let Some(username) = lookup("FEDORA_USER") {
            config.username = username;
        }
        if let Some(password) = lookup("FEDORA_PASSWORD") {
            config.password = password;
        }
        if let Some(validate) = lookup("FEDORA_VALIDATE_CHECKSUM") {
            config.validate_checksum = matches!(validate.trim(), "true" | "1");
        }
        config
    }
}
