//! Outgoing mail.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_system::application::Application;
use trellis_system::extension::{Extension, ExtensionError, Provides};

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Anything that can deliver an [`Email`].
pub trait Mailer: Send + Sync {
    /// Delivers `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed off.
    fn send(&self, email: Email) -> Result<(), ExtensionError>;
}

/// Writes mail to the log instead of sending it. Keeps a copy of each message.
#[derive(Debug, Default)]
pub struct ConsoleMailer {
    sent: Mutex<Vec<Email>>,
}

impl ConsoleMailer {
    /// Returns every message delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().clone()
    }
}

impl Mailer for ConsoleMailer {
    fn send(&self, email: Email) -> Result<(), ExtensionError> {
        tracing::info!(to = %email.to, subject = %email.subject, "mail sent");
        self.sent.lock().push(email);
        Ok(())
    }
}

impl Extension for ConsoleMailer {
    fn provides(provides: &mut Provides<Self>) {
        provides.capability::<dyn Mailer>(|this| this as Arc<dyn Mailer>);
    }

    fn destroy(&self, _app: &mut Application) -> Result<(), ExtensionError> {
        tracing::info!(count = self.sent.lock().len(), "console mailer closed");
        Ok(())
    }
}
