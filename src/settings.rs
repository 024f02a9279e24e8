//! Persisted client settings
//!
//! Settings live in a JSON file and can be overridden from the environment:
//!
//! | Variable              | Field                  |
//! |-----------------------|------------------------|
//! | `TEXT2SQL_SETTINGS`   | path of the file       |
//! | `TEXT2SQL_BASE_URL`   | `base_url`             |
//! | `TEXT2SQL_DBMS`       | `query_defaults.dbms`  |
//! | `TEXT2SQL_APP_TITLE`  | `app_title`            |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::types::options::{
    ClientOptions, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_LINE_BYTES,
    DEFAULT_REQUEST_TIMEOUT, DecodePolicy,
};
use crate::types::request::QueryDefaults;

/// Environment variable naming the settings file
pub const ENV_SETTINGS_PATH: &str = "TEXT2SQL_SETTINGS";
/// Environment override for the service base URL
pub const ENV_BASE_URL: &str = "TEXT2SQL_BASE_URL";
/// Environment override for the database dialect
pub const ENV_DBMS: &str = "TEXT2SQL_DBMS";
/// Environment override for the application title
pub const ENV_APP_TITLE: &str = "TEXT2SQL_APP_TITLE";

/// Title shown when none is configured
pub const DEFAULT_APP_TITLE: &str = "Text2SQL";

/// User-facing client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application title
    pub app_title: String,
    /// Base URL of the agent service
    pub base_url: String,
    /// Defaults sent with every question
    pub query_defaults: QueryDefaults,
    /// Timeout for non-streaming requests, in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout, in seconds
    pub connect_timeout_secs: u64,
    /// Maximum length of one stream line
    pub max_line_bytes: usize,
    /// Fail streams on malformed lines instead of skipping them
    pub strict_decoding: bool,
    /// History page size
    pub history_page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_title: DEFAULT_APP_TITLE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            query_defaults: QueryDefaults::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            strict_decoding: false,
            history_page_size: crate::history::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns `AgentError::Settings` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AgentError::settings(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| AgentError::settings(format!("invalid {}: {e}", path.display())))
    }

    /// Load from `path`, or from `TEXT2SQL_SETTINGS` when `None`, then apply
    /// environment overrides
    ///
    /// With neither a path nor the variable, starts from the defaults.
    ///
    /// # Errors
    /// Returns `AgentError::Settings` if the file cannot be read or parsed
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_SETTINGS_PATH).map(PathBuf::from));
        let mut settings = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply overrides from a variable lookup
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(dbms) = get(ENV_DBMS) {
            self.query_defaults.dbms = Some(dbms);
        }
        if let Some(title) = get(ENV_APP_TITLE) {
            self.app_title = title;
        }
    }

    /// Write settings as pretty JSON, creating parent directories
    ///
    /// # Errors
    /// Returns `AgentError::Settings` if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AgentError::settings(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| AgentError::settings(format!("failed to write {}: {e}", path.display())))
    }

    /// Set the application title; a blank title restores the default
    pub fn set_app_title(&mut self, title: &str) {
        let title = title.trim();
        self.app_title = if title.is_empty() {
            DEFAULT_APP_TITLE.to_string()
        } else {
            title.to_string()
        };
    }

    /// Build client options from these settings
    ///
    /// # Errors
    /// Returns `AgentError::InvalidConfig` for an empty base URL or a zero
    /// line limit
    pub fn to_client_options(&self) -> Result<ClientOptions> {
        if self.base_url.trim().is_empty() {
            return Err(AgentError::invalid_config("base_url must not be empty"));
        }
        if self.max_line_bytes == 0 {
            return Err(AgentError::invalid_config("max_line_bytes must be positive"));
        }
        let policy = if self.strict_decoding {
            DecodePolicy::Strict
        } else {
            DecodePolicy::Lenient
        };
        Ok(ClientOptions::builder()
            .base_url(self.base_url.trim())
            .request_timeout(Duration::from_secs(self.request_timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .max_line_bytes(self.max_line_bytes)
            .decode_policy(policy)
            .query_defaults(self.query_defaults.clone())
            .build())
    }
}
