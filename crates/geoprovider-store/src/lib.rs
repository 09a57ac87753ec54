//! GeoProvider Store - Concrete provider backends
//!
//! This crate provides the in-memory and GeoJSON file providers, both
//! built on a shared R-tree backed [`FeatureStore`](index::FeatureStore).

pub mod geojson;
pub mod index;
pub mod memory;

pub use self::geojson::GeoJsonProvider;
pub use index::FeatureStore;
pub use memory::MemoryProvider;
