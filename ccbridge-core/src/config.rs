//! Configuration management for the bridge
//!
//! Precedence, lowest first: built-in defaults, compile-time overrides, the `[api]` section of
//! `config.ini`, then `CCBRIDGE_*` environment variables.

use crate::{transport::TransportSettings, Error, Result};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CCBRIDGE_";

/// Backend request configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestConfig {
    /// Backend endpoint; the query string is appended after `?`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Overall request timeout in seconds; 0 means no limit
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection establishment timeout in seconds; 0 means no limit
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Verify the backend's TLS certificate
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    /// PEM bundle of extra trusted CAs; empty means none
    #[serde(default)]
    pub ssl_cert_file: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            verify_ssl: true,
            ssl_cert_file: String::new(),
        }
    }
}

/// `config.ini` layout; only the `[api]` section is read
#[derive(Debug, Default, Deserialize)]
struct IniFile {
    #[serde(default)]
    api: Option<Overrides>,
}

/// One configuration layer, from the INI section or the environment.
/// Absent keys keep the value of the layer below.
#[derive(Debug, Default, Deserialize)]
struct Overrides {
    base_url: Option<String>,
    timeout: Option<u64>,
    connect_timeout: Option<u64>,
    verify_ssl: Option<bool>,
    ssl_cert_file: Option<String>,
}

impl RequestConfig {
    /// Configuration fixed at build time.
    ///
    /// `CCBRIDGE_DEFAULT_API_URL`, `CCBRIDGE_DEFAULT_TIMEOUT` and
    /// `CCBRIDGE_DEFAULT_CONNECT_TIMEOUT` set in the build environment replace the defaults.
    pub fn compiled() -> Self {
        let mut config = Self::default();
        if let Some(url) = option_env!("CCBRIDGE_DEFAULT_API_URL") {
            config.base_url = url.to_string();
        }
        if let Some(timeout) = option_env!("CCBRIDGE_DEFAULT_TIMEOUT").and_then(|s| s.parse().ok()) {
            config.timeout = timeout;
        }
        if let Some(timeout) =
            option_env!("CCBRIDGE_DEFAULT_CONNECT_TIMEOUT").and_then(|s| s.parse().ok())
        {
            config.connect_timeout = timeout;
        }
        config
    }

    /// Load the `[api]` section of an INI file on top of the compiled configuration.
    ///
    /// A missing file is not an error; the compiled configuration is returned unchanged.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::compiled();

        if !path.exists() {
            tracing::debug!("No configuration file at {}, using defaults", path.display());
            return Ok(config);
        }

        let file: IniFile = Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini))
            .build()?
            .try_deserialize()?;

        if let Some(section) = file.api {
            config.apply(section);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of the compiled configuration
    pub fn from_env() -> Result<Self> {
        let overrides: Overrides = envy::prefixed(ENV_PREFIX).from_env()?;
        let mut config = Self::compiled();
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Full layered load: compiled defaults, then `path`, then the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        let overrides: Overrides = envy::prefixed(ENV_PREFIX).from_env()?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an explicit list of variables, as [`RequestConfig::from_env`] would
    pub fn with_env_vars<I>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: Overrides = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        self.apply(overrides);
        self.validate()?;
        Ok(self)
    }

    fn apply(&mut self, section: Overrides) {
        if let Some(url) = section.base_url {
            self.base_url = url;
        }
        if let Some(timeout) = section.timeout {
            self.timeout = timeout;
        }
        if let Some(timeout) = section.connect_timeout {
            self.connect_timeout = timeout;
        }
        if let Some(verify) = section.verify_ssl {
            self.verify_ssl = verify;
        }
        if let Some(file) = section.ssl_cert_file {
            self.ssl_cert_file = file;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base_url '{}': {}", self.base_url, e)))?;
        Ok(())
    }

    /// Overall request timeout, `None` when unlimited
    pub fn timeout(&self) -> Option<Duration> {
        seconds(self.timeout)
    }

    /// Connection establishment timeout, `None` when unlimited
    pub fn connect_timeout(&self) -> Option<Duration> {
        seconds(self.connect_timeout)
    }

    /// Custom CA bundle, if one is configured
    pub fn ca_file(&self) -> Option<PathBuf> {
        let trimmed = self.ssl_cert_file.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// HTTP client settings derived from this configuration
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            timeout: self.timeout(),
            connect_timeout: self.connect_timeout(),
            verify_tls: self.verify_ssl,
            ca_file: self.ca_file(),
        }
    }
}

fn seconds(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

// Default value functions
fn default_base_url() -> String {
    "https://localhost/api/index.php".to_string()
}

fn default_timeout() -> u64 {
    4
}

fn default_connect_timeout() -> u64 {
    2
}

fn default_true() -> bool {
    true
}
