pub mod envelope;
pub mod feature;
pub mod geometry;

pub use envelope::Envelope;
pub use feature::{
    clone_table_structure, Column, ColumnType, FeatureId, FeatureRow, FeatureTable, MappingKind,
};
pub use geometry::{Geometry, Shape};
