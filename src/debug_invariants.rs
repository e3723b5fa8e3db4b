//! Structural self-checks.
//!
//! [`DebugInvariants::validate_invariants`] is always compiled and reports
//! the first broken invariant as a [`MeshError`]. The assertion side only
//! exists in debug builds or with the `check-invariants` feature, so release
//! builds pay nothing for it.

use crate::mesh_error::MeshError;

/// Types that can check their own structural invariants.
pub trait DebugInvariants {
    /// Name used in assertion messages.
    const LABEL: &'static str;

    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshError>;

    /// Panic on a broken invariant when invariant checking is compiled in.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), Self::LABEL);
    }
}

/// Run a fallible check and panic with `context` on error, when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $context:expr) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(e) = $check {
            panic!("[invariants] {}: {}", $context, e);
        }
    };
}
