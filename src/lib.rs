#![cfg_attr(docsrs, feature(doc_cfg))]
//! # fe-mesh-convert
//!
//! fe-mesh-convert rebuilds finite-element meshes with a different
//! interpolation. Any field that can be evaluated on a source mesh is
//! resampled onto a new set of elements in one of three modes:
//!
//! - Hermite bicubic: 2D elements, four value/derivative parameters per node,
//!   one node per sample point (no sharing);
//! - Trilinear: 3D elements, 8 nodes each, coincident nodes shared;
//! - Triquadratic: 3D elements, 27 nodes each, coincident nodes shared.
//!
//! Every source element is split into an `n1 × n2 × n3` block of
//! subelements. Shared nodes are found through an [`algs::spatial_index::Octree`]
//! keyed on the first (coordinate) field, so nodes from neighbouring source
//! elements that land within the tolerance are reused.
//!
//! The crate also provides [`algs::element_point_ranges`], a selection
//! structure naming sample points inside elements.
//!
//! ## Change notification
//!
//! All writes made by a conversion happen inside one
//! [`topology::mesh::ChangeCache`] bracket, so listeners on a
//! [`topology::region::Region`] see a single batch of changes.
//!
//! ## Usage
//!
//! ```ignore
//! use fe_mesh_convert::prelude::*;
//!
//! let mut source = Region::new("source");
//! let coordinates = generate_line_shaped_mesh(&mut source, &[2, 2, 2], &[0.0; 3], &[1.0; 3], "coordinates")?;
//! let evaluator = RegionFieldEvaluator::new(&source, coordinates)?;
//! let mut destination = Region::new("destination");
//! let report = convert(&source, &[&evaluator], &mut destination, &ConversionConfig::default())?;
//! assert_eq!(report.nodes_created, 27);
//! ```

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::conversion::{ConversionConfig, ConversionReport, convert};
    pub use crate::algs::element_point_ranges::{
        ElementPointRanges, ElementPointRangesIdentifier, ElementPointRangesList,
    };
    pub use crate::algs::field_eval::{
        FieldEvaluator, FnFieldEvaluator, MeshLocation, RegionFieldEvaluator,
    };
    pub use crate::algs::meshgen::generate_line_shaped_mesh;
    pub use crate::algs::multi_range::MultiRange;
    pub use crate::algs::refinement_tables::ConversionMode;
    pub use crate::data::basis::Basis;
    pub use crate::data::discretization::XiDiscretizationMode;
    pub use crate::data::field::{CoordinateSystem, FieldDefinition, FieldHandle, FieldKind};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::MeshError;
    pub use crate::topology::cell_type::ElementShape;
    pub use crate::topology::id::{ElementId, ElementKey, NodeId};
    pub use crate::topology::mesh::{ChangeCache, MeshQuery, MeshWriter};
    pub use crate::topology::region::Region;
}
