//! Infrastructure extensions for Trellis.
//!
//! - [`AppInfoExtension`] - application metadata
//! - [`ConfigExtension`] - shared [`Configuration`]
//! - [`TracingExtension`] - logging via the `tracing` crate
//! - [`DefaultExtensions`] - bundle of all of the above
//!
//! # Example
//!
//! ```no_run
//! use trellis_core::DefaultExtensions;
//! use trellis_system::application::Application;
//! use trellis_system::extension::ExtensionGroup;
//!
//! let mut app = Application::new();
//! app.add_extensions(DefaultExtensions.build());
//! app.finish().unwrap();
//! ```
//!
//! Add extensions individually for finer control:
//!
//! ```
//! use trellis_core::{AppInfoExtension, ConfigExtension, Configuration, TracingExtension};
//! use trellis_system::application::Application;
//! use tracing::Level;
//!
//! let mut app = Application::new();
//! app.add_extensions(AppInfoExtension::named("inventory"))
//!     .add_extensions(ConfigExtension::new(Configuration::default()))
//!     .add_extensions(TracingExtension::default().with_level(Level::DEBUG));
//! app.finish().unwrap();
//! ```

mod app_info;
mod config;
mod tracing_extension;

pub use app_info::{AppInfo, AppInfoExtension};
pub use config::{
    ConfigError, ConfigExtension, Configuration, DEFAULT_PORT, HeaderConfiguration, Mode,
};
pub use tracing_extension::{TracingConfig, TracingExtension, TracingFormat};

use trellis_system::extension::{ExtensionGroup, ExtensionGroupBuilder};

/// Default extensions for most applications.
///
/// Includes [`AppInfoExtension`], [`ConfigExtension`] and
/// [`TracingExtension`], all with default settings.
///
/// # Customization
///
/// ```ignore
/// app.add_extensions(
///     DefaultExtensions
///         .build()
///         .disable::<ConfigExtension>()
///         .add(ConfigExtension::new(my_config)),
/// );
/// ```
pub struct DefaultExtensions;

impl ExtensionGroup for DefaultExtensions {
    fn build(self) -> ExtensionGroupBuilder {
        ExtensionGroupBuilder::new()
            .add(AppInfoExtension::default())
            .add(ConfigExtension::default())
            .add(TracingExtension::default())
    }
}

/// Default extensions without tracing, for tests and embedding.
pub struct MinimalExtensions;

impl ExtensionGroup for MinimalExtensions {
    fn build(self) -> ExtensionGroupBuilder {
        ExtensionGroupBuilder::new()
            .add(AppInfoExtension::default())
            .add(ConfigExtension::default())
    }
}
