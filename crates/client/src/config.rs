use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The contents are not a valid session config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where and how a session connects.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Server URL, e.g. `tcp://localhost:7222`. Several URLs may be given
    /// separated by commas.
    pub server_url: String,

    /// The user to authenticate as.
    pub user_name: String,

    /// The user's password.
    #[serde(default)]
    pub password: String,

    /// Dump every sent and received message to the log.
    #[serde(default)]
    pub debug: bool,
}

impl SessionConfig {
    /// Creates a config with debugging off.
    pub fn new(
        server_url: impl Into<String>,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            user_name: user_name.into(),
            password: password.into(),
            debug: false,
        }
    }

    /// Turns message dumping on or off.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}
