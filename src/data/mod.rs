//! Data module: field definitions, interpolation bases and templates

pub mod basis;
pub mod discretization;
pub mod field;
pub mod template;

pub use basis::Basis;
pub use field::{FieldDefinition, FieldHandle};
pub use template::{ElementTemplate, NodeTemplate, NodeValueType};
