//! Strong identifier handles for nodes and elements.
//!
//! Nodes and elements are numbered with positive integers; 0 is reserved as
//! an invalid value. Element identifiers are only unique within one
//! dimension, so an element is addressed by an [`ElementKey`] pairing the
//! dimension with its [`ElementId`].

use crate::mesh_error::MeshError;
use std::{fmt, num::NonZeroU64};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Creates an identifier from a raw value.
            ///
            /// # Errors
            /// Returns [`MeshError::InvalidIdentifier`] if `raw == 0`.
            #[inline]
            pub fn new(raw: u64) -> Result<Self, MeshError> {
                NonZeroU64::new(raw)
                    .map($name)
                    .ok_or(MeshError::InvalidIdentifier)
            }

            /// Returns the raw identifier value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0.get()
            }

            /// The identifier following this one, if representable.
            #[inline]
            pub fn checked_next(self) -> Option<Self> {
                self.0.checked_add(1).map($name)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.get()).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.get())
            }
        }

        impl TryFrom<u64> for $name {
            type Error = MeshError;

            fn try_from(raw: u64) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }
    };
}

identifier!(
    /// Identifier of a node, unique within a region.
    NodeId
);

identifier!(
    /// Identifier of an element, unique within one dimension of a region.
    ElementId
);

/// Fully qualified element address: dimension plus identifier.
///
/// Orders by dimension first, then by identifier.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ElementKey {
    pub dimension: usize,
    pub id: ElementId,
}

impl ElementKey {
    #[inline]
    pub fn new(dimension: usize, id: ElementId) -> Self {
        Self { dimension, id }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}D", self.id, self.dimension)
    }
}
