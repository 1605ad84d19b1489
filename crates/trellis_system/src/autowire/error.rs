//! Autowiring errors.

/// Errors that abort an autowiring pass.
///
/// None of these are recoverable within the pass: no slot is written and no
/// order is produced when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutowireError {
    /// A slot asks for a type that no other registered extension provides.
    #[error("could not autowire '{target}' into '{extension}' (slot '{slot}')")]
    Unresolved {
        /// Slot name as declared in `wants`.
        slot: &'static str,
        /// Requested extension type or capability set.
        target: &'static str,
        /// Type of the extension holding the slot.
        extension: &'static str,
    },

    /// Two registered extensions share one type, so lookups by type are
    /// ambiguous.
    #[error("extension '{extension}' was registered more than once")]
    DuplicateExtension {
        /// The duplicated extension type.
        extension: &'static str,
    },

    /// The dependency graph contains a cycle.
    #[error("circular dependency between extensions: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Extension types on the cycle, each depending on the next; the
        /// first member is repeated at the end.
        cycle: Vec<&'static str>,
    },
}
