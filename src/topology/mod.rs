//! Mesh topology: identifiers, nodes, elements and the [`region::Region`]
//! container that owns them.
//!
//! Most users will go through the [`mesh::MeshQuery`] and
//! [`mesh::MeshWriter`] traits; `Region` is the in-memory implementation.

pub mod cell_type;
pub mod element;
pub mod id;
pub mod mesh;
pub mod node;
pub mod region;

pub use id::{ElementId, ElementKey, NodeId};
pub use mesh::{ChangeCache, MeshQuery, MeshWriter};
pub use region::Region;
