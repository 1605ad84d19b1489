//! Capability declarations.
//!
//! Rust cannot ask a type-erased value "do you implement `dyn Mailer`?" at
//! runtime, so extensions declare the capability sets they satisfy up front.
//! Each declaration stores a caster that turns the type-erased extension back
//! into an `Arc` of the requested capability.
//!
//! ```
//! use std::sync::Arc;
//! use trellis_system::extension::{Extension, Provides};
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str, body: &str);
//! }
//!
//! struct ConsoleMailer;
//!
//! impl Mailer for ConsoleMailer {
//!     fn send(&self, _to: &str, _body: &str) {}
//! }
//!
//! impl Extension for ConsoleMailer {
//!     fn provides(provides: &mut Provides<Self>) {
//!         provides.capability::<dyn Mailer>(|this| this as Arc<dyn Mailer>);
//!     }
//! }
//! ```

use core::any::{Any, TypeId};
use core::marker::PhantomData;
use std::sync::Arc;

use hashbrown::HashMap;

use super::{Extension, ExtensionId};

/// A type-erased `Arc<T>` ready to be stored into a matching [`Slot<T>`](super::Slot).
pub(crate) type BoxedArc = Box<dyn Any + Send + Sync>;

/// Turns a type-erased extension into a boxed `Arc` of one capability.
type Caster = Arc<dyn Fn(&Arc<dyn Extension>) -> Option<BoxedArc> + Send + Sync>;

/// Identifier for a capability set (a concrete type or a `dyn Trait`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId {
    type_id: TypeId,
    type_name: &'static str,
}

impl CapabilityId {
    /// Creates a `CapabilityId` for the given type, sized or not.
    #[must_use]
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: core::any::type_name::<C>(),
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

impl From<ExtensionId> for CapabilityId {
    fn from(id: ExtensionId) -> Self {
        Self {
            type_id: id.type_id(),
            type_name: id.type_name(),
        }
    }
}

/// The capability table of one registered extension.
#[derive(Clone, Default)]
pub(crate) struct Capabilities {
    casters: HashMap<CapabilityId, Caster>,
}

impl Capabilities {
    /// Returns true if the extension satisfies `capability`.
    pub(crate) fn contains(&self, capability: CapabilityId) -> bool {
        self.casters.contains_key(&capability)
    }

    /// Casts `extension` to `capability`, boxed for slot injection.
    ///
    /// Returns `None` if the capability was not declared or `extension`
    /// is not the type this table was built for.
    pub(crate) fn cast(
        &self,
        capability: CapabilityId,
        extension: &Arc<dyn Extension>,
    ) -> Option<BoxedArc> {
        self.casters
            .get(&capability)
            .and_then(|caster| caster(extension))
    }

    pub(crate) fn len(&self) -> usize {
        self.casters.len()
    }
}

/// Builder handed to [`Extension::provides`] to declare capability sets.
///
/// Every extension provides its own concrete type without declaring it.
pub struct Provides<E: Extension> {
    capabilities: Capabilities,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Extension> Provides<E> {
    pub(crate) fn new() -> Self {
        let mut provides = Self {
            capabilities: Capabilities::default(),
            _marker: PhantomData,
        };
        provides.capability::<E>(|this| this);
        provides
    }

    /// Declares that `E` satisfies the capability set `C`.
    ///
    /// `cast` converts the concrete extension into the capability, usually
    /// by unsizing: `|this| this as Arc<dyn Mailer>`. Declaring the same
    /// capability twice keeps the last caster.
    pub fn capability<C: ?Sized + Send + Sync + 'static>(
        &mut self,
        cast: fn(Arc<E>) -> Arc<C>,
    ) -> &mut Self {
        let caster: Caster = Arc::new(move |extension: &Arc<dyn Extension>| {
            let concrete = Arc::clone(extension).downcast_arc::<E>().ok()?;
            Some(Box::new(cast(concrete)) as BoxedArc)
        });
        self.capabilities
            .casters
            .insert(CapabilityId::of::<C>(), caster);
        self
    }

    /// Returns true if `C` has been declared (or is `E` itself).
    #[must_use]
    pub fn has<C: ?Sized + 'static>(&self) -> bool {
        self.capabilities.contains(CapabilityId::of::<C>())
    }

    pub(crate) fn finish(self) -> Capabilities {
        self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    impl Extension for English {
        fn provides(provides: &mut Provides<Self>) {
            provides.capability::<dyn Greeter>(|this| this as Arc<dyn Greeter>);
        }
    }

    struct Silent;
    impl Extension for Silent {}

    fn table_for<E: Extension>() -> Capabilities {
        let mut provides = Provides::<E>::new();
        E::provides(&mut provides);
        provides.finish()
    }

    #[test]
    fn capability_id_distinguishes_types() {
        assert_eq!(CapabilityId::of::<English>(), CapabilityId::of::<English>());
        assert_ne!(CapabilityId::of::<English>(), CapabilityId::of::<dyn Greeter>());
        assert!(CapabilityId::of::<dyn Greeter>().type_name().contains("Greeter"));
    }

    #[test]
    fn capability_id_from_extension_id_matches() {
        let from_ext: CapabilityId = ExtensionId::of::<English>().into();
        assert_eq!(from_ext, CapabilityId::of::<English>());
    }

    #[test]
    fn every_extension_provides_itself() {
        let table = table_for::<Silent>();
        assert!(table.contains(CapabilityId::of::<Silent>()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn declared_capability_casts() {
        let table = table_for::<English>();
        assert_eq!(table.len(), 2);

        let erased: Arc<dyn Extension> = Arc::new(English);
        let boxed = table
            .cast(CapabilityId::of::<dyn Greeter>(), &erased)
            .unwrap();
        let greeter = boxed.downcast::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn cast_rejects_foreign_instance() {
        let table = table_for::<English>();
        let other: Arc<dyn Extension> = Arc::new(Silent);
        assert!(
            table
                .cast(CapabilityId::of::<dyn Greeter>(), &other)
                .is_none()
        );
    }

    #[test]
    fn undeclared_capability_is_absent() {
        let provides = Provides::<Silent>::new();
        assert!(provides.has::<Silent>());
        assert!(!provides.has::<dyn Greeter>());
    }
}
