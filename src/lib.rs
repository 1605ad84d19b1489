//! An extension host for Rust applications.
//!
//! Extensions declare the slots they need and the capabilities they offer;
//! the [`Application`](prelude::Application) autowires them, orders them so
//! dependencies come first, and drives `init`, `post_init` and `destroy`.
//!
//! ```
//! use trellis::prelude::*;
//!
//! let mut app = Application::new();
//! app.add_extensions(MinimalExtensions.build());
//! app.finish().unwrap();
//!
//! assert!(app.contains_resource::<Configuration>());
//! ```

pub use trellis_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use trellis_internal::prelude::*;
}
