//! Re-export public algorithms.

pub mod conversion;
pub mod element_point_ranges;
pub mod field_eval;
pub mod id_allocator;
pub mod meshgen;
pub mod multi_range;
pub mod refinement_tables;
pub mod spatial_index;

pub use conversion::convert;
pub use field_eval::FieldEvaluator;
