//! Example application built with Trellis.
//!
//! Three extensions wired together by type and by capability:
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────┐
//! │ MemoryStoreExtension │◀─────│                  │
//! └──────────────────────┘ slot │  UserExtension   │
//! ┌──────────────────────┐      │                  │
//! │ ConsoleMailer        │◀─────│                  │
//! │  provides dyn Mailer │ slot └──────────────────┘
//! └──────────────────────┘
//! ```
//!
//! `UserExtension` names the store by type and asks for *any* mailer, so the
//! console mailer can be swapped for another `Mailer` without touching it.

mod mailer;
mod store;
mod users;

pub use mailer::{ConsoleMailer, Email, Mailer};
pub use store::{MemoryStoreExtension, User};
pub use users::{UserError, UserExtension};

use trellis_system::extension::{ExtensionGroup, ExtensionGroupBuilder};

/// The demo's domain extensions.
pub struct AccountExtensions;

impl ExtensionGroup for AccountExtensions {
    fn build(self) -> ExtensionGroupBuilder {
        ExtensionGroupBuilder::new()
            .add(UserExtension::default())
            .add(MemoryStoreExtension::default())
            .add(ConsoleMailer::default())
    }
}
