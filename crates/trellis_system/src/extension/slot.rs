//! Dependency slots.
//!
//! A [`Slot<T>`] is a field on an extension that the autowirer may fill with
//! a shared reference to another extension. Extensions list their slots in
//! [`Extension::wants`](super::Extension::wants):
//!
//! ```
//! use std::sync::Arc;
//! use trellis_system::extension::{Extension, Slot, Wants};
//!
//! trait Mailer: Send + Sync {}
//!
//! #[derive(Default)]
//! struct Store;
//! impl Extension for Store {}
//!
//! #[derive(Default)]
//! struct Users {
//!     store: Slot<Store>,
//!     mailer: Slot<dyn Mailer>,
//! }
//!
//! impl Extension for Users {
//!     fn wants<'a>(&'a self, wants: &mut Wants<'a>) {
//!         wants
//!             .extension("store", &self.store)
//!             .capability("mailer", &self.mailer);
//!     }
//! }
//! ```

use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::capability::BoxedArc;
use super::{CapabilityId, Extension, ExtensionError, ExtensionId};

/// A shared, initially empty reference to another extension or capability.
///
/// Slots are filled at most once by the autowirer and only while empty.
/// A slot that already holds a value is left alone.
pub struct Slot<T: ?Sized> {
    value: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> Slot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    /// Creates a slot that is already wired to `value`.
    #[must_use]
    pub fn with(value: Arc<T>) -> Self {
        Self {
            value: RwLock::new(Some(value)),
        }
    }

    /// Returns the wired value, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.read().clone()
    }

    /// Returns the wired value or a [`ExtensionError::MissingDependency`]
    /// naming `extension` and `slot`.
    ///
    /// Intended for lifecycle hooks that cannot proceed without the slot.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::MissingDependency`] if the slot is empty.
    pub fn require(&self, extension: &str, slot: &'static str) -> Result<Arc<T>, ExtensionError> {
        self.get().ok_or_else(|| ExtensionError::MissingDependency {
            extension: extension.to_string(),
            slot,
        })
    }

    /// Returns true if the slot holds a value.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.read().is_some()
    }

    /// Wires the slot manually, replacing any previous value.
    pub fn set(&self, value: Arc<T>) {
        *self.value.write() = Some(value);
    }
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("target", &core::any::type_name::<T>())
            .field("set", &self.is_set())
            .finish()
    }
}

/// Object-safe view of a slot used by the autowirer.
pub(crate) trait ErasedSlot: Send + Sync {
    fn is_set(&self) -> bool;

    /// Address of the wired value, for identity comparison.
    fn bound_ptr(&self) -> Option<*const ()>;

    /// Stores a boxed `Arc<T>`. Returns false on a type mismatch.
    fn fill(&self, value: BoxedArc) -> bool;
}

impl<T: ?Sized + Send + Sync + 'static> ErasedSlot for Slot<T> {
    fn is_set(&self) -> bool {
        Slot::is_set(self)
    }

    fn bound_ptr(&self) -> Option<*const ()> {
        self.value
            .read()
            .as_ref()
            .map(|value| Arc::as_ptr(value).cast::<()>())
    }

    fn fill(&self, value: BoxedArc) -> bool {
        match value.downcast::<Arc<T>>() {
            Ok(value) => {
                *self.value.write() = Some(*value);
                true
            }
            Err(_) => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SlotTarget
// ─────────────────────────────────────────────────────────────────────────────

/// What a slot asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotTarget {
    /// Exactly one extension type, matched by identity.
    Extension(ExtensionId),
    /// Any other extension that declared this capability set.
    Capability(CapabilityId),
}

impl SlotTarget {
    /// Returns the target type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Extension(id) => id.type_name(),
            Self::Capability(id) => id.type_name(),
        }
    }

    /// Returns the capability a candidate must provide to fill this slot.
    #[must_use]
    pub fn capability(&self) -> CapabilityId {
        match self {
            Self::Extension(id) => (*id).into(),
            Self::Capability(id) => *id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wants
// ─────────────────────────────────────────────────────────────────────────────

/// One declared slot.
pub(crate) struct SlotRequest<'a> {
    pub(crate) name: &'static str,
    pub(crate) target: SlotTarget,
    pub(crate) slot: &'a dyn ErasedSlot,
}

/// Collects the slots of one extension, in declaration order.
///
/// Passed to [`Extension::wants`](super::Extension::wants).
#[derive(Default)]
pub struct Wants<'a> {
    requests: Vec<SlotRequest<'a>>,
}

impl<'a> Wants<'a> {
    /// Creates an empty slot list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
        }
    }

    /// Declares a slot for the extension type `E`.
    ///
    /// Resolution fails if no `E` is registered with the application.
    pub fn extension<E: Extension>(&mut self, name: &'static str, slot: &'a Slot<E>) -> &mut Self {
        self.requests.push(SlotRequest {
            name,
            target: SlotTarget::Extension(ExtensionId::of::<E>()),
            slot,
        });
        self
    }

    /// Declares a slot for any extension providing the capability set `C`.
    ///
    /// The first other extension, in registration order, that provides `C`
    /// is injected. Resolution fails if none does.
    pub fn capability<C: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        slot: &'a Slot<C>,
    ) -> &mut Self {
        self.requests.push(SlotRequest {
            name,
            target: SlotTarget::Capability(CapabilityId::of::<C>()),
            slot,
        });
        self
    }

    /// Iterates over the declared slot names and targets.
    pub fn targets(&self) -> impl Iterator<Item = (&'static str, SlotTarget)> + '_ {
        self.requests.iter().map(|request| (request.name, request.target))
    }

    /// Returns the number of declared slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns true if no slots were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(crate) fn into_requests(self) -> Vec<SlotRequest<'a>> {
        self.requests
    }
}
