//! In-memory user store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trellis_system::application::Application;
use trellis_system::extension::{Extension, ExtensionError};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Sequential identifier.
    pub id: u64,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub name: String,
}

/// Keeps users in memory, keyed by email.
#[derive(Debug, Default)]
pub struct MemoryStoreExtension {
    users: parking_lot::RwLock<BTreeMap<String, User>>,
}

impl MemoryStoreExtension {
    /// Inserts a user unless the email is taken. Returns the stored user.
    pub fn insert(&self, email: &str, name: &str) -> Option<User> {
        let mut users = self.users.write();
        if users.contains_key(email) {
            return None;
        }
        let user = User {
            id: users.len() as u64 + 1,
            email: email.to_owned(),
            name: name.to_owned(),
        };
        users.insert(email.to_owned(), user.clone());
        Some(user)
    }

    /// Looks a user up by email.
    #[must_use]
    pub fn find(&self, email: &str) -> Option<User> {
        self.users.read().get(email).cloned()
    }

    /// Returns the number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns true if no users are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Serializes every user as a JSON array, ordered by email.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        let users = self.users.read();
        serde_json::to_string(&users.values().collect::<Vec<_>>())
    }
}

impl Extension for MemoryStoreExtension {
    fn init(&self, _app: &mut Application) -> Result<(), ExtensionError> {
        tracing::info!("memory store ready");
        Ok(())
    }

    fn destroy(&self, _app: &mut Application) -> Result<(), ExtensionError> {
        let mut users = self.users.write();
        tracing::info!(count = users.len(), "dropping stored users");
        users.clear();
        Ok(())
    }
}
