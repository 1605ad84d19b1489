//! Application configuration.
//!
//! [`Configuration`] carries the settings shared by every extension: the
//! listening port, the static file directory, CORS headers and the run mode.
//! It derives `serde` traits so it can be read from any serde source; missing
//! fields take their defaults.
//!
//! ```
//! use trellis_core::{Configuration, Mode};
//!
//! let config = Configuration::from_json(r#"{ "port": 8080, "mode": "worker" }"#).unwrap();
//! assert_eq!(config.port, 8080);
//! assert_eq!(config.mode, Mode::Worker);
//! assert_eq!(config.static_directory, "./public/");
//! ```

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use trellis_system::application::Application;
use trellis_system::extension::{Extension, ExtensionError};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The run mode is neither `web` nor `worker`.
    #[error("unknown application mode: {0}")]
    UnknownMode(String),

    /// The input is not valid configuration JSON.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Mode
// ─────────────────────────────────────────────────────────────────────────────

/// How the application runs between startup and shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Serve HTTP until a shutdown signal arrives.
    #[default]
    Web,
    /// Run background work only, waiting for a shutdown signal.
    Worker,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "worker" => Ok(Self::Worker),
            _ => Err(ConfigError::UnknownMode(s.to_owned())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Web => "web",
            Self::Worker => "worker",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// CORS response headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfiguration {
    /// `Access-Control-Allow-Origin`.
    pub allow_origin: String,
    /// `Access-Control-Allow-Methods`.
    pub allow_methods: String,
    /// `Access-Control-Allow-Headers`.
    pub allow_headers: String,
}

impl Default for HeaderConfiguration {
    fn default() -> Self {
        Self {
            allow_origin: "*".into(),
            allow_methods: "GET, POST, OPTIONS, PUT, PATCH, DELETE".into(),
            allow_headers: "Origin, Accept, Accept-Version, Content-Length, Content-MD5, \
                            Content-Type, Date, X-Api-Version, X-Response-Time, X-PINGOTHER, \
                            X-CSRF-Token, Authorization"
                .into(),
        }
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Listening port.
    pub port: u16,
    /// Directory served for unmatched paths.
    pub static_directory: String,
    /// CORS headers.
    pub headers: HeaderConfiguration,
    /// Run mode.
    pub mode: Mode,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_directory: "./public/".into(),
            headers: HeaderConfiguration::default(),
            mode: Mode::default(),
        }
    }
}

impl Configuration {
    /// Parses configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the input is not valid configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Picks the port from a primary and a fallback source.
    ///
    /// The fallback (often a platform-assigned `PORT`) wins only when the
    /// primary is unset or still at [`DEFAULT_PORT`].
    #[must_use]
    pub fn with_port_fallback(mut self, primary: Option<u16>, fallback: Option<u16>) -> Self {
        let primary = primary.unwrap_or(DEFAULT_PORT);
        self.port = match fallback {
            Some(port) if primary == DEFAULT_PORT => port,
            _ => primary,
        };
        self
    }

    /// Sets the run mode from an optional textual setting, such as an
    /// environment variable. An unset value keeps the current mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMode`] if the value is neither `web`
    /// nor `worker`.
    pub fn with_mode(mut self, mode: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(mode) = mode {
            self.mode = mode.parse()?;
        }
        Ok(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ConfigExtension
// ─────────────────────────────────────────────────────────────────────────────

/// Extension that publishes a [`Configuration`] resource.
///
/// Extensions that need configuration read the resource in their `init`;
/// taking a `Slot<ConfigExtension>` guarantees it is published first.
#[derive(Debug, Clone, Default)]
pub struct ConfigExtension {
    config: Configuration,
}

impl ConfigExtension {
    /// Publishes `config` instead of the defaults.
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    /// Returns the configuration this extension publishes.
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }
}

impl Extension for ConfigExtension {
    fn init(&self, app: &mut Application) -> Result<(), ExtensionError> {
        tracing::debug!(
            port = self.config.port,
            mode = %self.config.mode,
            "publishing configuration"
        );
        app.insert_resource(self.config.clone());
        Ok(())
    }
}
