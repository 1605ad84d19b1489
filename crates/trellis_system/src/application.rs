//! Application host.
//!
//! The [`Application`] collects extensions, autowires them and drives their
//! lifecycle. A bare application does nothing; all functionality comes from
//! extensions.
//!
//! # Lifecycle
//!
//! 1. **Autowire** - fill slots and order extensions so dependencies come first
//! 2. **Init** - call `init()` in dependency order
//! 3. **Post-init** - call `post_init()` in dependency order
//! 4. **Run** - whatever the extensions started keeps running
//! 5. **Shutdown** - call `destroy()` in reverse order
//!
//! ```
//! use trellis_system::application::Application;
//! use trellis_system::extension::{Extension, ExtensionError};
//!
//! struct Greeting(&'static str);
//!
//! struct GreeterExtension;
//!
//! impl Extension for GreeterExtension {
//!     fn init(&self, app: &mut Application) -> Result<(), ExtensionError> {
//!         app.insert_resource(Greeting("hello"));
//!         Ok(())
//!     }
//! }
//!
//! let mut app = Application::new();
//! app.add_extensions(GreeterExtension);
//! app.finish().unwrap();
//!
//! assert_eq!(app.get_resource::<Greeting>().unwrap().0, "hello");
//! app.shutdown().unwrap();
//! ```

use core::future::Future;
use std::sync::Arc;

use crate::autowire::{self, AutowireError, order};
use crate::extension::{Extension, ExtensionEntry, ExtensionError, ExtensionId, Extensions};
use crate::resource::{Resource, ResourceRef, ResourceRefMut, Resources};

// ─────────────────────────────────────────────────────────────────────────────
// ApplicationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while starting or stopping an [`Application`].
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// The extensions could not be autowired.
    #[error(transparent)]
    Autowire(#[from] AutowireError),

    /// An extension's `init` hook failed.
    #[error("failed to initialize '{extension}'")]
    Init {
        /// Name of the failing extension.
        extension: String,
        /// The hook's error.
        #[source]
        source: ExtensionError,
    },

    /// An extension's `post_init` hook failed.
    #[error("post-init of '{extension}' failed")]
    PostInit {
        /// Name of the failing extension.
        extension: String,
        /// The hook's error.
        #[source]
        source: ExtensionError,
    },

    /// An extension's `destroy` hook failed.
    #[error("failed to destroy '{extension}'")]
    Destroy {
        /// Name of the failing extension.
        extension: String,
        /// The hook's error.
        #[source]
        source: ExtensionError,
    },

    /// `finish()` was called more than once.
    #[error("application was already built")]
    AlreadyBuilt,

    /// `shutdown()` was called before `finish()`, or `run_until()` was called
    /// after a failed build or a shutdown.
    #[error("application has not been built")]
    NotBuilt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Application
// ─────────────────────────────────────────────────────────────────────────────

/// Build state of the application.
///
/// Progresses linearly: `NotStarted` → `Building` → `Built` (or `Failed`)
/// → `ShutDown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BuildState {
    #[default]
    NotStarted,
    /// `finish()` is running lifecycle hooks.
    Building,
    Built,
    /// `finish()` returned an error.
    Failed,
    ShutDown,
}

/// The host that autowires extensions and runs their lifecycle.
pub struct Application {
    resources: Resources,

    /// Extensions added before `finish()`, in registration order.
    pending: Vec<ExtensionEntry>,

    /// Autowired extensions in dependency order.
    extensions: Vec<ExtensionEntry>,

    /// `parents[i]` lists the positions `extensions[i]` depends on.
    parents: Vec<Vec<usize>>,

    /// Number of extensions, from the front of the order, whose `init`
    /// succeeded. Only these are destroyed at shutdown.
    initialized: usize,

    state: BuildState,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    /// Creates an application with no extensions and no resources.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: Resources::new(),
            pending: Vec::new(),
            extensions: Vec::new(),
            parents: Vec::new(),
            initialized: 0,
            state: BuildState::NotStarted,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Extension Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds one extension or an
    /// [`ExtensionGroupBuilder`](crate::extension::ExtensionGroupBuilder).
    ///
    /// Registration order decides the order of unrelated extensions and the
    /// candidate order for capability slots. Extensions added after
    /// [`finish()`](Self::finish) has started are ignored with a warning.
    pub fn add_extensions<E: Extensions>(&mut self, extensions: E) -> &mut Self {
        extensions.add_to_application(self);
        self
    }

    /// Adds an extension the caller keeps a handle to.
    pub fn add_shared<E: Extension>(&mut self, extension: Arc<E>) -> &mut Self {
        self.add_entry(ExtensionEntry::from_arc(extension));
        self
    }

    pub(crate) fn add_entry(&mut self, entry: ExtensionEntry) {
        if self.state != BuildState::NotStarted {
            tracing::warn!(
                extension = entry.name(),
                "application already started, extension ignored"
            );
            return;
        }
        self.pending.push(entry);
    }

    /// Returns true if an extension of type `E` has been added.
    #[must_use]
    pub fn has_extension<E: Extension>(&self) -> bool {
        let id = ExtensionId::of::<E>();
        self.entries().any(|entry| entry.id() == id)
    }

    /// Returns the extension of type `E`, if one has been added.
    #[must_use]
    pub fn extension<E: Extension>(&self) -> Option<Arc<E>> {
        self.entries().find_map(ExtensionEntry::downcast::<E>)
    }

    /// Returns extension names, in dependency order once built and in
    /// registration order before that.
    #[must_use]
    pub fn extension_names(&self) -> Vec<&str> {
        self.entries().map(ExtensionEntry::name).collect()
    }

    /// Returns true if `A` depends on `B`, directly or transitively.
    ///
    /// Always false before [`finish()`](Self::finish).
    #[must_use]
    pub fn depends_on<A: Extension, B: Extension>(&self) -> bool {
        let position = |id: ExtensionId| self.extensions.iter().position(|e| e.id() == id);
        match (
            position(ExtensionId::of::<A>()),
            position(ExtensionId::of::<B>()),
        ) {
            (Some(child), Some(ancestor)) => order::depends_on(&self.parents, child, ancestor),
            _ => false,
        }
    }

    fn entries(&self) -> impl Iterator<Item = &ExtensionEntry> {
        self.extensions.iter().chain(self.pending.iter())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resource Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a resource, returning the previous value of that type.
    pub fn insert_resource<R: Resource>(&mut self, resource: R) -> Option<R> {
        self.resources.insert(resource)
    }

    /// Returns true if a resource of type `R` exists.
    #[must_use]
    pub fn contains_resource<R: Resource>(&self) -> bool {
        self.resources.contains::<R>()
    }

    /// Gets shared access to a resource.
    ///
    /// Returns `None` if the resource doesn't exist or is mutably borrowed.
    #[must_use]
    pub fn get_resource<R: Resource>(&self) -> Option<ResourceRef<'_, R>> {
        self.resources.get::<R>().ok()
    }

    /// Gets exclusive access to a resource.
    ///
    /// Returns `None` if the resource doesn't exist or is already borrowed.
    #[must_use]
    pub fn get_resource_mut<R: Resource>(&self) -> Option<ResourceRefMut<'_, R>> {
        self.resources.get_mut::<R>().ok()
    }

    /// Removes a resource and returns it.
    pub fn remove_resource<R: Resource>(&mut self) -> Option<R> {
        self.resources.remove::<R>()
    }

    /// Returns the underlying resource container.
    #[must_use]
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Returns the underlying resource container mutably.
    #[must_use]
    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns true once [`finish()`](Self::finish) has succeeded and the
    /// application has not been shut down.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.state == BuildState::Built
    }

    /// Autowires the added extensions, then runs `init` and `post_init` on
    /// each in dependency order.
    ///
    /// If an `init` hook fails, the extensions initialized before it are
    /// still destroyed by a later [`shutdown()`](Self::shutdown).
    ///
    /// # Errors
    ///
    /// - [`ApplicationError::AlreadyBuilt`] if called more than once
    /// - [`ApplicationError::Autowire`] if autowiring fails; no hook has run
    ///   and the added extensions stay registered
    /// - [`ApplicationError::Init`] / [`ApplicationError::PostInit`] for the
    ///   first failing hook
    pub fn finish(&mut self) -> Result<(), ApplicationError> {
        if self.state != BuildState::NotStarted {
            return Err(ApplicationError::AlreadyBuilt);
        }
        self.state = BuildState::Building;

        // `pending` stays intact until resolution succeeds.
        let resolution = match autowire::resolve(self.pending.clone()) {
            Ok(resolution) => resolution,
            Err(err) => {
                self.state = BuildState::Failed;
                return Err(err.into());
            }
        };
        self.pending.clear();
        (self.extensions, self.parents) = resolution.into_parts();

        tracing::info!(count = self.extensions.len(), "initializing extensions");
        for i in 0..self.extensions.len() {
            // Hooks take `&mut self`; hold our own handle to the extension.
            let extension = Arc::clone(self.extensions[i].extension());
            tracing::debug!(extension = extension.name(), "init");
            if let Err(source) = extension.init(self) {
                self.state = BuildState::Failed;
                return Err(ApplicationError::Init {
                    extension: extension.name().to_owned(),
                    source,
                });
            }
            self.initialized = i + 1;
        }

        for i in 0..self.extensions.len() {
            let extension = Arc::clone(self.extensions[i].extension());
            tracing::debug!(extension = extension.name(), "post_init");
            if let Err(source) = extension.post_init(self) {
                self.state = BuildState::Failed;
                return Err(ApplicationError::PostInit {
                    extension: extension.name().to_owned(),
                    source,
                });
            }
        }

        self.state = BuildState::Built;
        tracing::info!("application ready");
        Ok(())
    }

    /// Destroys every initialized extension in reverse dependency order.
    ///
    /// A failing `destroy` does not stop the teardown. Calling this again
    /// after a shutdown is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ApplicationError::NotBuilt`] if `finish()` was never called
    /// - [`ApplicationError::Destroy`] for the last hook that failed
    pub fn shutdown(&mut self) -> Result<(), ApplicationError> {
        match self.state {
            BuildState::NotStarted | BuildState::Building => {
                return Err(ApplicationError::NotBuilt);
            }
            BuildState::ShutDown => return Ok(()),
            BuildState::Built | BuildState::Failed => {}
        }

        tracing::info!(count = self.initialized, "shutting down extensions");
        let mut result = Ok(());
        for i in (0..self.initialized).rev() {
            let extension = Arc::clone(self.extensions[i].extension());
            tracing::debug!(extension = extension.name(), "destroy");
            if let Err(source) = extension.destroy(self) {
                tracing::error!(
                    extension = extension.name(),
                    error = %source,
                    "failed to destroy extension"
                );
                result = Err(ApplicationError::Destroy {
                    extension: extension.name().to_owned(),
                    source,
                });
            }
        }

        self.initialized = 0;
        self.state = BuildState::ShutDown;
        result
    }

    /// Builds the application if needed, waits for `signal`, then shuts down.
    ///
    /// If building fails, the extensions that were initialized are destroyed
    /// before the build error is returned.
    ///
    /// # Example
    ///
    /// ```ignore
    /// app.run_until(tokio::signal::ctrl_c()).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// - The first error from [`finish()`](Self::finish)
    /// - [`ApplicationError::NotBuilt`] if an earlier `finish()` failed or the
    ///   application was already shut down; the signal is not awaited
    /// - Otherwise the result of [`shutdown()`](Self::shutdown)
    pub async fn run_until<F: Future>(&mut self, signal: F) -> Result<(), ApplicationError> {
        match self.state {
            BuildState::NotStarted => {
                if let Err(err) = self.finish() {
                    if let Err(teardown) = self.shutdown() {
                        tracing::error!(error = %teardown, "teardown after failed start");
                    }
                    return Err(err);
                }
            }
            BuildState::Built => {}
            BuildState::Building | BuildState::Failed | BuildState::ShutDown => {
                tracing::warn!(
                    state = ?self.state,
                    "run_until on an application that is not running"
                );
                return Err(ApplicationError::NotBuilt);
            }
        }

        let _signal = signal.await;
        tracing::info!("shutdown signal received");
        self.shutdown()
    }
}

impl core::fmt::Debug for Application {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Application")
            .field("extensions", &self.extension_names())
            .field("resources", &self.resources.len())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{Slot, Wants};

    struct Store;
    impl Extension for Store {}

    #[derive(Default)]
    struct Users {
        store: Slot<Store>,
    }

    impl Extension for Users {
        fn wants<'a>(&'a self, wants: &mut Wants<'a>) {
            wants.extension("store", &self.store);
        }
    }

    #[test]
    fn new_application_is_empty() {
        let app = Application::new();
        assert!(!app.is_built());
        assert!(app.extension_names().is_empty());
        assert!(app.resources().is_empty());
    }

    #[test]
    fn finish_orders_and_fills() {
        let mut app = Application::new();
        app.add_extensions(Users::default()).add_extensions(Store);
        app.finish().unwrap();

        assert!(app.is_built());
        assert!(app.depends_on::<Users, Store>());
        assert!(!app.depends_on::<Store, Users>());
        assert!(app.extension::<Users>().unwrap().store.is_set());
        assert!(app.extension_names()[0].contains("Store"));
    }

    #[test]
    fn finish_twice_fails() {
        let mut app = Application::new();
        app.finish().unwrap();
        assert!(matches!(app.finish(), Err(ApplicationError::AlreadyBuilt)));
    }

    #[test]
    fn shutdown_before_finish_fails() {
        let mut app = Application::new();
        assert!(matches!(app.shutdown(), Err(ApplicationError::NotBuilt)));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut app = Application::new();
        app.add_extensions(Store);
        app.finish().unwrap();
        app.shutdown().unwrap();
        assert!(!app.is_built());
        app.shutdown().unwrap();
    }

    #[test]
    fn late_extensions_are_ignored() {
        let mut app = Application::new();
        app.finish().unwrap();
        app.add_extensions(Store);
        assert!(!app.has_extension::<Store>());
    }

    #[test]
    fn autowire_error_is_surfaced() {
        let mut app = Application::new();
        app.add_extensions(Users::default());
        let err = app.finish().unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Autowire(AutowireError::Unresolved { slot: "store", .. })
        ));
        assert!(!app.is_built());
    }

    #[test]
    fn failed_autowire_keeps_extensions_listed() {
        let mut app = Application::new();
        app.add_extensions(Users::default());
        assert!(app.finish().is_err());

        assert!(app.has_extension::<Users>());
        assert_eq!(app.extension_names().len(), 1);
        assert!(app.extension::<Users>().is_some());
        assert!(matches!(app.finish(), Err(ApplicationError::AlreadyBuilt)));
    }

    #[test]
    fn add_shared_keeps_handle() {
        let store = Arc::new(Store);
        let mut app = Application::new();
        app.add_shared(Arc::clone(&store));
        assert!(Arc::ptr_eq(&app.extension::<Store>().unwrap(), &store));
    }
}
