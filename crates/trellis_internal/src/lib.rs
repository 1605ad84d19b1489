//! # Trellis Internal Library
//!
//! Re-exports the core Trellis crates for convenience.

/// Extension contract, autowiring and application lifecycle.
pub use trellis_system;

/// Infrastructure extensions.
pub use trellis_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use trellis_core::{
        AppInfo, AppInfoExtension, ConfigExtension, Configuration, DefaultExtensions,
        MinimalExtensions, TracingExtension,
    };
    pub use trellis_system::prelude::*;
}
