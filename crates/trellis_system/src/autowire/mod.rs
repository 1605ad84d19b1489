//! Autowiring: slot injection and dependency ordering.
//!
//! [`autowire`] takes the registered extensions, fills every empty slot they
//! declare with a matching extension from the same set, and returns the set
//! ordered so that each extension comes after everything it depends on.
//!
//! # Matching
//!
//! - A slot for an extension type (`Slot<Database>`) is filled with the one
//!   registered extension of exactly that type.
//! - A slot for a capability set (`Slot<dyn Mailer>`) is filled with the
//!   first *other* extension, in registration order, that declared the
//!   capability in [`Extension::provides`](crate::extension::Extension::provides).
//! - A slot that already holds a value is not touched. If the value is one of
//!   the registered extensions it still counts as a dependency.
//!
//! Every bound slot contributes exactly one dependency edge.
//!
//! # Failure
//!
//! The pass is all or nothing. A missing dependency, a duplicated extension
//! type or a dependency cycle returns an [`AutowireError`] before any slot is
//! written.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_system::autowire::autowire;
//! use trellis_system::extension::{Extension, ExtensionEntry, Slot, Wants};
//!
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
//! }
//!
//! let users = Arc::new(Users::default());
//! let ordered = autowire(vec![
//!     ExtensionEntry::from_arc(Arc::clone(&users)),
//!     ExtensionEntry::new(Database),
//! ])
//! .unwrap();
//!
//! assert!(ordered[0].downcast::<Database>().is_some());
//! assert!(users.db.is_set());
//! ```

mod error;
pub mod order;
mod registry;

pub use error::AutowireError;
pub use registry::{DependencyRecord, Registry};

use std::sync::Arc;

use crate::extension::{
    BoxedArc, ErasedSlot, Extension, ExtensionEntry, ExtensionId, SlotTarget, Wants,
};

/// A slot write that is applied only once the whole pass has succeeded.
struct Injection<'a> {
    slot: &'a dyn ErasedSlot,
    value: BoxedArc,
}

/// The outcome of a successful autowiring pass.
///
/// Entries are in dependency order; the parent lists are indexed the same
/// way.
#[derive(Debug)]
pub struct Resolution {
    entries: Vec<ExtensionEntry>,
    parents: Vec<Vec<usize>>,
}

impl Resolution {
    /// Returns the entries in dependency order.
    #[must_use]
    pub fn entries(&self) -> &[ExtensionEntry] {
        &self.entries
    }

    /// Returns, for each entry, the positions of the entries it depends on.
    #[must_use]
    pub fn parents(&self) -> &[Vec<usize>] {
        &self.parents
    }

    /// Returns the position of an extension type in the order.
    #[must_use]
    pub fn position(&self, id: ExtensionId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    /// Returns true if `child` depends on `ancestor`, directly or
    /// transitively.
    #[must_use]
    pub fn depends_on(&self, child: ExtensionId, ancestor: ExtensionId) -> bool {
        match (self.position(child), self.position(ancestor)) {
            (Some(child), Some(ancestor)) => order::depends_on(&self.parents, child, ancestor),
            _ => false,
        }
    }

    /// Consumes the resolution, returning the ordered entries and parent
    /// lists.
    #[must_use]
    pub fn into_parts(self) -> (Vec<ExtensionEntry>, Vec<Vec<usize>>) {
        (self.entries, self.parents)
    }

    /// Consumes the resolution, returning the ordered entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<ExtensionEntry> {
        self.entries
    }
}

/// Fills empty slots and orders `entries` so dependencies come first.
///
/// The returned entries are the same instances that were passed in.
///
/// # Errors
///
/// See [`resolve`].
pub fn autowire(entries: Vec<ExtensionEntry>) -> Result<Vec<ExtensionEntry>, AutowireError> {
    resolve(entries).map(Resolution::into_entries)
}

/// Like [`autowire`], also returning the discovered dependency graph.
///
/// # Errors
///
/// - [`AutowireError::DuplicateExtension`] if two entries share a type
/// - [`AutowireError::Unresolved`] if an empty slot has no candidate
/// - [`AutowireError::CyclicDependency`] if the dependencies form a cycle
pub fn resolve(entries: Vec<ExtensionEntry>) -> Result<Resolution, AutowireError> {
    let mut registry = Registry::build(entries)?;

    // Own the handles locally so slot borrows don't pin the registry.
    let extensions: Vec<Arc<dyn Extension>> = registry
        .records()
        .iter()
        .map(|record| Arc::clone(record.entry().extension()))
        .collect();
    let addresses: Vec<*const ()> = extensions
        .iter()
        .map(|extension| Arc::as_ptr(extension).cast::<()>())
        .collect();

    let mut injections: Vec<Injection<'_>> = Vec::new();
    let mut edges: Vec<(usize, usize)> = Vec::new();

    for (owner, extension) in extensions.iter().enumerate() {
        let mut wants = Wants::new();
        extension.wants(&mut wants);
        let owner_name = registry.records()[owner].entry().id().type_name();

        for request in wants.into_requests() {
            if let Some(bound) = request.slot.bound_ptr() {
                if let Some(provider) = addresses.iter().position(|&address| address == bound) {
                    if provider != owner {
                        edges.push((owner, provider));
                    }
                }
                continue;
            }

            let unresolved = || AutowireError::Unresolved {
                slot: request.name,
                target: request.target.type_name(),
                extension: owner_name,
            };

            let provider = match request.target {
                SlotTarget::Extension(id) => registry.lookup(id).filter(|&i| i != owner),
                SlotTarget::Capability(capability) => registry
                    .records()
                    .iter()
                    .enumerate()
                    .find(|(i, record)| *i != owner && record.entry().provides(capability))
                    .map(|(i, _)| i),
            }
            .ok_or_else(unresolved)?;

            let provider_entry = registry.records()[provider].entry();
            let value = provider_entry
                .capabilities()
                .cast(request.target.capability(), &extensions[provider])
                .ok_or_else(unresolved)?;

            tracing::debug!(
                slot = request.name,
                target = request.target.type_name(),
                into = owner_name,
                provider = provider_entry.name(),
                "autowiring slot"
            );

            injections.push(Injection {
                slot: request.slot,
                value,
            });
            edges.push((owner, provider));
        }
    }

    for (child, parent) in edges {
        registry.add_parent(child, parent);
    }

    let parents = registry.parent_lists();
    let order = order::sort(&parents).map_err(|cycle| AutowireError::CyclicDependency {
        cycle: cycle
            .iter()
            .map(|&i| registry.records()[i].entry().id().type_name())
            .collect(),
    })?;

    for injection in injections {
        let filled = injection.slot.fill(injection.value);
        debug_assert!(filled, "capability caster produced a mismatched type");
    }

    let mut position = vec![0usize; order.len()];
    for (new, &old) in order.iter().enumerate() {
        position[old] = new;
    }

    let ordered_parents = order
        .iter()
        .map(|&old| parents[old].iter().map(|&p| position[p]).collect())
        .collect();

    let mut slots: Vec<Option<ExtensionEntry>> =
        registry.into_entries().into_iter().map(Some).collect();
    let entries: Vec<ExtensionEntry> = order.iter().filter_map(|&i| slots[i].take()).collect();

    tracing::debug!(count = entries.len(), "autowired extensions");

    Ok(Resolution {
        entries,
        parents: ordered_parents,
    })
}
