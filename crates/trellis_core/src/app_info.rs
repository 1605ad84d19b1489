//! Application metadata.

use trellis_system::application::Application;
use trellis_system::extension::{Extension, ExtensionError};

/// Application metadata, published as a resource by [`AppInfoExtension`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Application name, used in log lines.
    pub name: String,
    /// Framework version string.
    pub version: &'static str,
    /// Whether the application was compiled with debug assertions.
    pub debug: bool,
}

impl AppInfo {
    /// Creates metadata for an application called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION"),
            debug: cfg!(debug_assertions),
        }
    }
}

impl Default for AppInfo {
    fn default() -> Self {
        Self::new("trellis")
    }
}

/// Extension that publishes [`AppInfo`].
///
/// Foundational: other infrastructure extensions take a slot on it so they
/// are initialized after it.
///
/// # Example
///
/// ```
/// use trellis_core::{AppInfo, AppInfoExtension};
/// use trellis_system::application::Application;
///
/// let mut app = Application::new();
/// app.add_extensions(AppInfoExtension::named("billing"));
/// app.finish().unwrap();
///
/// assert_eq!(app.get_resource::<AppInfo>().unwrap().name, "billing");
/// ```
#[derive(Debug, Clone, Default)]
pub struct AppInfoExtension {
    info: AppInfo,
}

impl AppInfoExtension {
    /// Uses `name` as the application name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            info: AppInfo::new(name),
        }
    }

    /// Returns the metadata this extension publishes.
    #[must_use]
    pub fn info(&self) -> &AppInfo {
        &self.info
    }
}

impl Extension for AppInfoExtension {
    fn init(&self, app: &mut Application) -> Result<(), ExtensionError> {
        app.insert_resource(self.info.clone());
        Ok(())
    }
}
