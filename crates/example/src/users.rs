//! User registration.

use trellis_core::Configuration;
use trellis_system::application::Application;
use trellis_system::extension::{Extension, ExtensionError, Slot, Wants};

use crate::{Email, Mailer, MemoryStoreExtension, User};

/// Errors raised by [`UserExtension::register`].
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// The email address is already registered.
    #[error("user '{0}' already exists")]
    AlreadyExists(String),

    /// A dependency is not wired yet, or it failed.
    #[error(transparent)]
    Dependency(#[from] ExtensionError),
}

/// Registers users and sends them a welcome message.
#[derive(Default)]
pub struct UserExtension {
    store: Slot<MemoryStoreExtension>,
    mailer: Slot<dyn Mailer>,
    /// Site address for welcome mail, read from configuration at post-init.
    site: parking_lot::RwLock<String>,
}

impl UserExtension {
    /// Stores a new user and emails them.
    ///
    /// # Errors
    ///
    /// - [`UserError::AlreadyExists`] if the email is taken
    /// - [`UserError::Dependency`] if a slot is empty or the mailer fails
    pub fn register(&self, email: &str, name: &str) -> Result<User, UserError> {
        let store = self.store.require(self.name(), "store")?;
        let mailer = self.mailer.require(self.name(), "mailer")?;

        let user = store
            .insert(email, name)
            .ok_or_else(|| UserError::AlreadyExists(email.to_owned()))?;

        mailer.send(Email {
            to: user.email.clone(),
            subject: "Welcome".into(),
            body: format!("Hi {}, welcome to {}.", user.name, self.site.read()),
        })?;

        tracing::info!(id = user.id, email = %user.email, "user registered");
        Ok(user)
    }
}

impl Extension for UserExtension {
    fn wants<'a>(&'a self, wants: &mut Wants<'a>) {
        wants
            .extension("store", &self.store)
            .capability("mailer", &self.mailer);
    }

    fn post_init(&self, app: &mut Application) -> Result<(), ExtensionError> {
        let site = app.get_resource::<Configuration>().map_or_else(
            || "localhost".to_owned(),
            |config| format!("localhost:{}", config.port),
        );
        *self.site.write() = site;
        Ok(())
    }
}
