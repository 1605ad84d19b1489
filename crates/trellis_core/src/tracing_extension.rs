//! Tracing and observability extension.
//!
//! [`TracingExtension`] installs the global `tracing` subscriber and publishes
//! the chosen settings as the [`TracingConfig`] resource.
//!
//! It takes a slot on [`AppInfoExtension`], so application metadata is
//! published before logging starts and the first log line can name the
//! application.
//!
//! # Example
//!
//! ```
//! use trellis_core::{AppInfoExtension, TracingConfig, TracingExtension, TracingFormat};
//! use trellis_system::application::Application;
//! use tracing::Level;
//!
//! let mut app = Application::new();
//! app.add_extensions(
//!     TracingExtension::default()
//!         .with_level(Level::DEBUG)
//!         .with_format(TracingFormat::Compact),
//! )
//! .add_extensions(AppInfoExtension::default());
//! app.finish().unwrap();
//!
//! assert_eq!(app.get_resource::<TracingConfig>().unwrap().level, Level::DEBUG);
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use trellis_system::application::Application;
use trellis_system::extension::{Extension, ExtensionError, Slot, Wants};

use crate::AppInfoExtension;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON lines for log aggregation.
    Json,
}

/// The tracing settings in effect, published as a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// Maximum log level.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingExtension
// ─────────────────────────────────────────────────────────────────────────────

/// Installs a `tracing-subscriber` registry with an [`EnvFilter`] and a
/// `fmt` layer.
///
/// If a global subscriber is already set (for example by a test harness),
/// installation is skipped and the existing one is kept.
///
/// # Resources Provided
///
/// | Resource | Description |
/// |----------|-------------|
/// | [`TracingConfig`] | Level and format in effect |
///
/// # Dependencies
///
/// - [`AppInfoExtension`]
#[derive(Debug)]
pub struct TracingExtension {
    level: Level,
    format: TracingFormat,
    /// Directive string such as `"trellis=debug,hyper=warn"`.
    env_filter: Option<String>,
    span_events: bool,
    app_info: Slot<AppInfoExtension>,
}

impl Default for TracingExtension {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
            app_info: Slot::empty(),
        }
    }
}

impl TracingExtension {
    /// Creates a `TracingExtension` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets per-target directives, `target=level,target=level,...`.
    ///
    /// Invalid directives fall back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in the output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the settings this extension will publish.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|filter| EnvFilter::try_new(filter).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }

    fn install(&self) {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(self.env_filter());

        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init(),
        };

        if installed.is_err() {
            tracing::debug!("global subscriber already set, keeping it");
        }
    }
}

impl Extension for TracingExtension {
    fn wants<'a>(&'a self, wants: &mut Wants<'a>) {
        wants.extension("app_info", &self.app_info);
    }

    fn init(&self, app: &mut Application) -> Result<(), ExtensionError> {
        let app_info = self.app_info.require(self.name(), "app_info")?;

        app.insert_resource(self.config());
        self.install();

        tracing::info!(
            app = %app_info.info().name,
            version = app_info.info().version,
            level = %self.level,
            format = ?self.format,
            "tracing initialized"
        );
        Ok(())
    }

    fn destroy(&self, _app: &mut Application) -> Result<(), ExtensionError> {
        tracing::info!("tracing shutting down");
        Ok(())
    }
}
