//! The extension host at the core of Trellis.
//!
//! `trellis_system` provides:
//!
//! - [`extension`] - the `Extension` trait, slots, capabilities and groups
//! - [`autowire`] - slot injection and dependency ordering
//! - [`application`] - the host that runs the extension lifecycle
//! - [`resource`] - typed shared state published by extensions
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_system::prelude::*;
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str) -> bool;
//! }
//!
//! struct ConsoleMailer;
//!
//! impl Mailer for ConsoleMailer {
//!     fn send(&self, _to: &str) -> bool {
//!         true
//!     }
//! }
//!
//! impl Extension for ConsoleMailer {
//!     fn provides(provides: &mut Provides<Self>) {
//!         provides.capability::<dyn Mailer>(|this| this as Arc<dyn Mailer>);
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Signup {
//!     mailer: Slot<dyn Mailer>,
//! }
//!
//! impl Extension for Signup {
//!     fn wants<'a>(&'a self, wants: &mut Wants<'a>) {
//!         wants.capability("mailer", &self.mailer);
//!     }
//! }
//!
//! let mut app = Application::new();
//! app.add_extensions(Signup::default()).add_extensions(ConsoleMailer);
//! app.finish().unwrap();
//!
//! let signup = app.extension::<Signup>().unwrap();
//! assert!(signup.mailer.get().unwrap().send("someone@example.com"));
//! ```

/// Application host and lifecycle.
pub mod application;

/// Slot injection and dependency ordering.
pub mod autowire;

/// Extension contract, slots and capabilities.
pub mod extension;

/// Typed resource container.
pub mod resource;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::application::*;
    pub use crate::autowire::{AutowireError, autowire};
    pub use crate::extension::*;
    pub use crate::resource::*;
}
