//! MeshError: unified error type for fe-mesh-convert public APIs
//!
//! Every fallible operation in the crate (region mutation, field evaluation,
//! conversion, selection ranges) reports failure through this type rather
//! than panicking. The first four variants follow the conversion error
//! taxonomy; the remaining ones describe structural problems in the
//! in-memory region and the selection structures.

use crate::topology::id::{ElementKey, NodeId};
use thiserror::Error;

/// Unified error type for mesh conversion operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// Malformed input detected before any mutation took place.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A field could not be evaluated at a mesh location.
    #[error("cannot evaluate field `{field}` in element {element}: {message}")]
    EvaluationFailure {
        field: String,
        element: ElementKey,
        message: String,
    },
    /// An identifier or storage could not be obtained for a new node or element.
    #[error("allocation failure: {0}")]
    AllocationFailure(String),
    /// A new node or element could not be merged into the destination mesh.
    #[error("merge failure: {0}")]
    MergeFailure(String),
    /// A field name or handle is not known to the region.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// A node referenced by an element or template does not exist.
    #[error("node {0} does not exist")]
    MissingNode(NodeId),
    /// An element referenced by a query does not exist.
    #[error("element {0} does not exist")]
    MissingElement(ElementKey),
    /// A sample-point range lies outside `[0, limit)` or is reversed.
    #[error("invalid range [{start}, {stop}]: must satisfy 0 <= start <= stop < {limit}")]
    InvalidRange { start: i64, stop: i64, limit: i64 },
    /// Identifiers must be non-zero.
    #[error("identifier must be non-zero (0 is reserved as invalid)")]
    InvalidIdentifier,
    /// Non-finite or otherwise unusable coordinates.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl MeshError {
    /// Shorthand for [`MeshError::InvalidArgument`].
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        MeshError::InvalidArgument(message.into())
    }

    /// Shorthand for [`MeshError::MergeFailure`].
    pub(crate) fn merge_failure(message: impl Into<String>) -> Self {
        MeshError::MergeFailure(message.into())
    }
}
