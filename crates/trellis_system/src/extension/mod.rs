//! Extension contract.
//!
//! Extensions are the unit of composition in Trellis. Each one wraps a single
//! concern (a database handle, a mail sender, a session store) and takes part
//! in the staged startup driven by the [`Application`].
//!
//! An extension tells the application three things:
//!
//! - which other extensions it needs, through [`Slot`]s listed in
//!   [`Extension::wants`]
//! - which capability sets it satisfies, through [`Extension::provides`]
//! - what to do at each lifecycle stage (`init`, `post_init`, `destroy`)
//!
//! The application autowires the slots and runs the stages in dependency
//! order, so a slot is always filled and initialized before the extension
//! holding it is initialized.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_system::application::Application;
//! use trellis_system::extension::{Extension, ExtensionError, Slot, Wants};
//!
//! #[derive(Default)]
//! struct Database;
//! impl Extension for Database {}
//!
//! #[derive(Default)]
//! struct Users {
//!     db: Slot<Database>,
//! }
//!
//! impl Extension for Users {
//!     fn wants<'a>(&'a self, wants: &mut Wants<'a>) {
//!         wants.extension("db", &self.db);
//!     }
//!
//!     fn init(&self, _app: &mut Application) -> Result<(), ExtensionError> {
//!         let _db: Arc<Database> = self.db.require(self.name(), "db")?;
//!         Ok(())
//!     }
//! }
//!
//! let mut app = Application::new();
//! app.add_extensions(Users::default()).add_extensions(Database);
//! app.finish().unwrap();
//! ```

mod capability;
mod slot;

pub use capability::{CapabilityId, Provides};
pub use slot::{Slot, SlotTarget, Wants};

pub(crate) use capability::{BoxedArc, Capabilities};
pub(crate) use slot::ErasedSlot;

use core::any::TypeId;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};

use crate::application::Application;

// ─────────────────────────────────────────────────────────────────────────────
// ExtensionId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for an extension type.
///
/// Used as the registry key during autowiring and for duplicate detection.
/// Based on [`TypeId`], so each extension type has exactly one `ExtensionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ExtensionId {
    /// Creates an `ExtensionId` for the given extension type.
    #[must_use]
    pub fn of<E: Extension>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: core::any::type_name::<E>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExtensionError
// ─────────────────────────────────────────────────────────────────────────────

/// Error returned by an extension lifecycle hook.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// The extension could not complete a lifecycle stage.
    #[error("extension '{extension}' failed: {reason}")]
    Failed {
        /// Name of the failing extension.
        extension: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A slot the extension needs at this stage is empty.
    #[error("extension '{extension}' has no value in slot '{slot}'")]
    MissingDependency {
        /// Name of the extension holding the slot.
        extension: String,
        /// Slot name as declared in `wants`.
        slot: &'static str,
    },

    /// Any other error raised by the extension.
    #[error(transparent)]
    Other(#[from] Box<dyn core::error::Error + Send + Sync>),
}

impl ExtensionError {
    /// Shorthand for [`ExtensionError::Failed`].
    #[must_use]
    pub fn failed(extension: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            extension: extension.into(),
            reason: reason.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extension Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A pluggable unit of application functionality.
///
/// Extensions follow a strict lifecycle managed by the [`Application`]:
///
/// 1. **Autowire** - slots declared in [`wants()`](Self::wants) are filled
///    and the extensions are ordered so dependencies come first
/// 2. **Init** - [`init()`](Self::init) is called in dependency order
/// 3. **Post-init** - [`post_init()`](Self::post_init) is called in
///    dependency order, after every extension has been initialized
/// 4. **Destroy** - [`destroy()`](Self::destroy) is called in **reverse**
///    dependency order when the application shuts down
///
/// Hooks take `&self`; extensions that change state during startup use
/// interior mutability, the same way [`Slot`] does.
pub trait Extension: DowncastSync {
    /// Prepares the extension. Dependencies have already been initialized.
    ///
    /// # Errors
    ///
    /// Any error aborts application startup.
    fn init(&self, _app: &mut Application) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Called once every extension has been initialized.
    ///
    /// Use this for work that needs the whole application in place, such as
    /// publishing routes or starting background jobs.
    ///
    /// # Errors
    ///
    /// Any error aborts application startup.
    fn post_init(&self, _app: &mut Application) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Releases external resources at shutdown.
    ///
    /// Called in reverse dependency order, so dependents are destroyed before
    /// their dependencies.
    ///
    /// # Errors
    ///
    /// Errors are logged; teardown continues with the next extension.
    fn destroy(&self, _app: &mut Application) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Declares the slots the autowirer should fill.
    fn wants<'a>(&'a self, _wants: &mut Wants<'a>) {}

    /// Declares the capability sets this extension satisfies.
    ///
    /// Called once, when the extension is registered.
    fn provides(_provides: &mut Provides<Self>)
    where
        Self: Sized,
    {
    }

    /// Returns the extension's name for logs and error messages.
    ///
    /// Default implementation returns the type name.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}

impl_downcast!(sync Extension);

// ─────────────────────────────────────────────────────────────────────────────
// ExtensionEntry
// ─────────────────────────────────────────────────────────────────────────────

/// A shared extension together with its identity and capability table.
///
/// Both are captured while the concrete type is still known, before the
/// extension is erased to `Arc<dyn Extension>`. Cloning shares the extension.
#[derive(Clone)]
pub struct ExtensionEntry {
    id: ExtensionId,
    extension: Arc<dyn Extension>,
    capabilities: Capabilities,
}

impl ExtensionEntry {
    /// Wraps an owned extension.
    #[must_use]
    pub fn new<E: Extension>(extension: E) -> Self {
        Self::from_arc(Arc::new(extension))
    }

    /// Wraps an extension the caller keeps a handle to.
    #[must_use]
    pub fn from_arc<E: Extension>(extension: Arc<E>) -> Self {
        let mut provides = Provides::<E>::new();
        E::provides(&mut provides);
        Self {
            id: ExtensionId::of::<E>(),
            extension,
            capabilities: provides.finish(),
        }
    }

    /// Returns the extension's type identity.
    #[must_use]
    pub fn id(&self) -> ExtensionId {
        self.id
    }

    /// Returns the extension's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.extension.name()
    }

    /// Returns the type-erased extension.
    #[must_use]
    pub fn extension(&self) -> &Arc<dyn Extension> {
        &self.extension
    }

    /// Returns the extension as its concrete type, if it is an `E`.
    #[must_use]
    pub fn downcast<E: Extension>(&self) -> Option<Arc<E>> {
        Arc::clone(&self.extension).downcast_arc::<E>().ok()
    }

    /// Returns true if the extension satisfies `capability`.
    #[must_use]
    pub fn provides(&self, capability: CapabilityId) -> bool {
        self.capabilities.contains(capability)
    }

    pub(crate) fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

impl core::fmt::Debug for ExtensionEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExtensionEntry")
            .field("id", &self.id.type_name())
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extensions Trait (for add_extensions polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be added to an [`Application`].
///
/// Implemented for single extensions and for [`ExtensionGroupBuilder`].
/// Users typically don't implement this trait directly.
pub trait Extensions {
    /// Adds these extensions to the application.
    fn add_to_application(self, app: &mut Application);
}

impl<E: Extension> Extensions for E {
    fn add_to_application(self, app: &mut Application) {
        app.add_entry(ExtensionEntry::new(self));
    }
}

impl Extensions for ExtensionGroupBuilder {
    fn add_to_application(self, app: &mut Application) {
        for entry in self.entries {
            app.add_entry(entry);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExtensionGroup
// ─────────────────────────────────────────────────────────────────────────────

/// A bundle of extensions that can be added together.
///
/// # Example
///
/// ```ignore
/// pub struct StorageExtensions;
///
/// impl ExtensionGroup for StorageExtensions {
///     fn build(self) -> ExtensionGroupBuilder {
///         ExtensionGroupBuilder::new()
///             .add(SqlExtension::default())
///             .add(S3Extension::default())
///     }
/// }
///
/// Application::new()
///     .add_extensions(StorageExtensions.build().disable::<S3Extension>());
/// ```
pub trait ExtensionGroup {
    /// Returns the extensions in this group.
    fn build(self) -> ExtensionGroupBuilder;
}

/// Builder for customizing extension groups.
///
/// Registration order is kept; it only matters between extensions with no
/// dependency relationship, and as the candidate order for capability slots.
#[derive(Default)]
pub struct ExtensionGroupBuilder {
    entries: Vec<ExtensionEntry>,
}

impl ExtensionGroupBuilder {
    /// Creates a new empty group builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an extension to the end of the group.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add<E: Extension>(mut self, extension: E) -> Self {
        self.entries.push(ExtensionEntry::new(extension));
        self
    }

    /// Adds an extension before `Target`, or at the beginning if `Target`
    /// is not in the group.
    #[must_use]
    pub fn add_before<E: Extension, Target: Extension>(mut self, extension: E) -> Self {
        let position = self.position_of(ExtensionId::of::<Target>()).unwrap_or(0);
        self.entries.insert(position, ExtensionEntry::new(extension));
        self
    }

    /// Adds an extension after `Target`, or at the end if `Target` is not
    /// in the group.
    #[must_use]
    pub fn add_after<E: Extension, Target: Extension>(mut self, extension: E) -> Self {
        let position = self
            .position_of(ExtensionId::of::<Target>())
            .map_or(self.entries.len(), |i| i + 1);
        self.entries.insert(position, ExtensionEntry::new(extension));
        self
    }

    /// Removes an extension from the group by type. No-op if absent.
    #[must_use]
    pub fn disable<E: Extension>(mut self) -> Self {
        let id = ExtensionId::of::<E>();
        self.entries.retain(|entry| entry.id() != id);
        self
    }

    /// Returns true if the group contains an extension of type `E`.
    #[must_use]
    pub fn contains<E: Extension>(&self) -> bool {
        self.position_of(ExtensionId::of::<E>()).is_some()
    }

    /// Returns the number of extensions in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the group contains no extensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the builder, returning the entries in order.
    #[must_use]
    pub fn into_entries(self) -> Vec<ExtensionEntry> {
        self.entries
    }

    fn position_of(&self, id: ExtensionId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ExtA;
    impl Extension for ExtA {}

    struct ExtB;
    impl Extension for ExtB {}

    struct ExtC;
    impl Extension for ExtC {
        fn name(&self) -> &str {
            "custom-c"
        }
    }

    fn names(builder: &ExtensionGroupBuilder) -> Vec<ExtensionId> {
        builder.entries.iter().map(ExtensionEntry::id).collect()
    }

    #[test]
    fn extension_id_equality() {
        assert_eq!(ExtensionId::of::<ExtA>(), ExtensionId::of::<ExtA>());
        assert_ne!(ExtensionId::of::<ExtA>(), ExtensionId::of::<ExtB>());
        assert_eq!(ExtensionId::of::<ExtA>().type_id(), TypeId::of::<ExtA>());
    }

    #[test]
    fn extension_id_type_name() {
        assert!(ExtensionId::of::<ExtA>().type_name().contains("ExtA"));
    }

    #[test]
    fn extension_default_name_is_type_name() {
        assert!(ExtA.name().contains("ExtA"));
        assert_eq!(ExtC.name(), "custom-c");
    }

    #[test]
    fn extension_default_wants_nothing() {
        let mut wants = Wants::new();
        ExtA.wants(&mut wants);
        assert!(wants.is_empty());
    }

    #[test]
    fn extension_default_hooks_succeed() {
        let mut app = Application::new();
        assert!(ExtA.init(&mut app).is_ok());
        assert!(ExtA.post_init(&mut app).is_ok());
        assert!(ExtA.destroy(&mut app).is_ok());
    }

    #[test]
    fn cloned_entry_shares_extension() {
        let entry = ExtensionEntry::new(ExtC);
        let copy = entry.clone();
        assert!(Arc::ptr_eq(entry.extension(), copy.extension()));
        assert!(copy.provides(CapabilityId::of::<ExtC>()));
    }

    #[test]
    fn entry_captures_identity_and_self_capability() {
        let entry = ExtensionEntry::new(ExtC);
        assert_eq!(entry.id(), ExtensionId::of::<ExtC>());
        assert_eq!(entry.name(), "custom-c");
        assert!(entry.provides(CapabilityId::of::<ExtC>()));
        assert!(!entry.provides(CapabilityId::of::<ExtA>()));
    }

    #[test]
    fn entry_downcast() {
        let entry = ExtensionEntry::new(ExtA);
        assert!(entry.downcast::<ExtA>().is_some());
        assert!(entry.downcast::<ExtB>().is_none());
    }

    #[test]
    fn entry_from_arc_shares_instance() {
        let shared = Arc::new(ExtA);
        let entry = ExtensionEntry::from_arc(Arc::clone(&shared));
        assert!(Arc::ptr_eq(&entry.downcast::<ExtA>().unwrap(), &shared));
    }

    #[test]
    fn extension_error_messages() {
        let err = ExtensionError::failed("sql", "connection refused");
        assert_eq!(err.to_string(), "extension 'sql' failed: connection refused");

        let err = ExtensionError::MissingDependency {
            extension: "users".into(),
            slot: "db",
        };
        assert_eq!(err.to_string(), "extension 'users' has no value in slot 'db'");
    }

    #[test]
    fn group_builder_add() {
        let builder = ExtensionGroupBuilder::new().add(ExtA).add(ExtB);
        assert_eq!(builder.len(), 2);
        assert!(builder.contains::<ExtA>());
        assert!(!builder.contains::<ExtC>());
    }

    #[test]
    fn group_builder_disable() {
        let builder = ExtensionGroupBuilder::new()
            .add(ExtA)
            .add(ExtB)
            .disable::<ExtA>();
        assert_eq!(names(&builder), vec![ExtensionId::of::<ExtB>()]);
    }

    #[test]
    fn group_builder_add_before() {
        let builder = ExtensionGroupBuilder::new()
            .add(ExtA)
            .add(ExtB)
            .add_before::<_, ExtB>(ExtC);
        assert_eq!(
            names(&builder),
            vec![
                ExtensionId::of::<ExtA>(),
                ExtensionId::of::<ExtC>(),
                ExtensionId::of::<ExtB>(),
            ]
        );
    }

    #[test]
    fn group_builder_add_after() {
        let builder = ExtensionGroupBuilder::new()
            .add(ExtA)
            .add(ExtB)
            .add_after::<_, ExtA>(ExtC);
        assert_eq!(
            names(&builder),
            vec![
                ExtensionId::of::<ExtA>(),
                ExtensionId::of::<ExtC>(),
                ExtensionId::of::<ExtB>(),
            ]
        );
    }

    #[test]
    fn group_builder_add_before_not_found() {
        // Target missing: insert at the beginning
        let builder = ExtensionGroupBuilder::new()
            .add(ExtA)
            .add_before::<_, ExtB>(ExtC);
        assert_eq!(
            names(&builder),
            vec![ExtensionId::of::<ExtC>(), ExtensionId::of::<ExtA>()]
        );
    }

    #[test]
    fn group_builder_add_after_not_found() {
        // Target missing: append
        let builder = ExtensionGroupBuilder::new()
            .add(ExtA)
            .add_after::<_, ExtB>(ExtC);
        assert_eq!(
            names(&builder),
            vec![ExtensionId::of::<ExtA>(), ExtensionId::of::<ExtC>()]
        );
    }

    struct TestGroup;

    impl ExtensionGroup for TestGroup {
        fn build(self) -> ExtensionGroupBuilder {
            ExtensionGroupBuilder::new().add(ExtA).add(ExtB)
        }
    }

    #[test]
    fn group_build_and_disable_all() {
        let builder = TestGroup.build();
        assert_eq!(builder.len(), 2);

        let builder = builder.disable::<ExtA>().disable::<ExtB>();
        assert!(builder.is_empty());
    }
}
