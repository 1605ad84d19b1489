//! Shared application state.
//!
//! Extensions publish state for each other (configuration, handles, routes)
//! as typed resources on the [`Application`](crate::application::Application).
//! Access goes through RAII guards backed by a per-resource `RwLock`.
//!
//! # Example
//!
//! ```
//! use trellis_system::resource::Resources;
//!
//! struct Counter { value: i32 }
//!
//! let mut resources = Resources::new();
//! resources.insert(Counter { value: 0 });
//!
//! resources.get_mut::<Counter>().unwrap().value += 1;
//! assert_eq!(resources.get::<Counter>().unwrap().value, 1);
//! ```

use core::any::{Any, TypeId};

use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A value that can be stored in [`Resources`].
///
/// Any type that is `Send + Sync + 'static` automatically implements
/// `Resource`.
pub trait Resource: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Resource for T {}

/// Unique identifier for a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(TypeId);

impl ResourceId {
    /// Creates a `ResourceId` for the given type.
    #[must_use]
    pub fn of<T: Resource>() -> Self {
        Self(TypeId::of::<T>())
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.0
    }
}

/// Errors that can occur during resource access.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The requested resource type was not found in the container.
    #[error("resource not found: {0}")]
    NotFound(&'static str),

    /// The resource is currently borrowed in a conflicting way.
    #[error("resource already borrowed: {0}")]
    BorrowConflict(&'static str),
}

type BoxedResource = Box<dyn Any + Send + Sync>;

/// Type-safe storage for resources.
#[derive(Default)]
pub struct Resources {
    storage: HashMap<ResourceId, RwLock<BoxedResource>>,
}

impl Resources {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: HashMap::new(),
        }
    }

    /// Inserts a resource, returning the previous value of that type.
    pub fn insert<T: Resource>(&mut self, resource: T) -> Option<T> {
        self.storage
            .insert(ResourceId::of::<T>(), RwLock::new(Box::new(resource)))
            .and_then(|old| old.into_inner().downcast::<T>().ok().map(|boxed| *boxed))
    }

    /// Returns `true` if a resource of type `T` exists.
    #[must_use]
    pub fn contains<T: Resource>(&self) -> bool {
        self.storage.contains_key(&ResourceId::of::<T>())
    }

    /// Gets shared access to a resource.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::NotFound`] if the resource type is not registered
    /// - [`ResourceError::BorrowConflict`] if the resource is mutably borrowed
    pub fn get<T: Resource>(&self) -> Result<ResourceRef<'_, T>, ResourceError> {
        let type_name = core::any::type_name::<T>();
        let entry = self
            .storage
            .get(&ResourceId::of::<T>())
            .ok_or(ResourceError::NotFound(type_name))?;
        let guard = entry
            .try_read()
            .ok_or(ResourceError::BorrowConflict(type_name))?;

        Ok(ResourceRef {
            guard,
            _marker: core::marker::PhantomData,
        })
    }

    /// Gets exclusive access to a resource.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::NotFound`] if the resource type is not registered
    /// - [`ResourceError::BorrowConflict`] if the resource is already borrowed
    pub fn get_mut<T: Resource>(&self) -> Result<ResourceRefMut<'_, T>, ResourceError> {
        let type_name = core::any::type_name::<T>();
        let entry = self
            .storage
            .get(&ResourceId::of::<T>())
            .ok_or(ResourceError::NotFound(type_name))?;
        let guard = entry
            .try_write()
            .ok_or(ResourceError::BorrowConflict(type_name))?;

        Ok(ResourceRefMut {
            guard,
            _marker: core::marker::PhantomData,
        })
    }

    /// Removes a resource and returns it.
    pub fn remove<T: Resource>(&mut self) -> Option<T> {
        self.storage
            .remove(&ResourceId::of::<T>())
            .and_then(|entry| entry.into_inner().downcast::<T>().ok().map(|boxed| *boxed))
    }

    /// Returns the number of resources stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if no resources are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

/// RAII guard for shared resource access.
pub struct ResourceRef<'a, T: Resource> {
    guard: RwLockReadGuard<'a, BoxedResource>,
    _marker: core::marker::PhantomData<&'a T>,
}

impl<T: Resource> core::ops::Deref for ResourceRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // Entries are keyed by ResourceId::of::<T>(), so the cast holds.
        self.guard
            .downcast_ref::<T>()
            .expect("resource type mismatch (this is a bug)")
    }
}

/// RAII guard for exclusive resource access.
pub struct ResourceRefMut<'a, T: Resource> {
    guard: RwLockWriteGuard<'a, BoxedResource>,
    _marker: core::marker::PhantomData<&'a mut T>,
}

impl<T: Resource> core::ops::Deref for ResourceRefMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.guard
            .downcast_ref::<T>()
            .expect("resource type mismatch (this is a bug)")
    }
}

impl<T: Resource> core::ops::DerefMut for ResourceRefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard
            .downcast_mut::<T>()
            .expect("resource type mismatch (this is a bug)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);

    #[test]
    fn insert_replaces_and_returns_old() {
        let mut resources = Resources::new();
        assert!(resources.insert(Port(80)).is_none());
        assert_eq!(resources.insert(Port(8080)), Some(Port(80)));
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn get_missing_resource() {
        let resources = Resources::new();
        assert!(matches!(
            resources.get::<Port>(),
            Err(ResourceError::NotFound(_))
        ));
    }

    #[test]
    fn get_mut_conflicts_with_reader() {
        let mut resources = Resources::new();
        resources.insert(Port(1));

        let reader = resources.get::<Port>().unwrap();
        assert!(matches!(
            resources.get_mut::<Port>(),
            Err(ResourceError::BorrowConflict(_))
        ));
        drop(reader);

        resources.get_mut::<Port>().unwrap().0 = 2;
        assert_eq!(*resources.get::<Port>().unwrap(), Port(2));
    }

    #[test]
    fn remove_returns_value() {
        let mut resources = Resources::new();
        resources.insert(Name("trellis"));
        assert!(resources.contains::<Name>());
        assert_eq!(resources.remove::<Name>(), Some(Name("trellis")));
        assert!(resources.is_empty());
    }
}
