//! GeoProvider Core - Provider lifecycle, CRS binding and query dispatch
//!
//! This crate contains the contract every spatial data backend implements
//! (the [`Provider`] trait and its shared [`ProviderCore`] state) together
//! with the value types queries exchange: envelopes, geometries and
//! feature tables.

pub mod config;
pub mod error;
pub mod factory;
pub mod models;
pub mod provider;

pub use error::{ProviderError, Result};
pub use factory::{
    global_factory_service, CachingFactoryService, GeometryFactory, GeometryFactoryService,
};
pub use models::{
    clone_table_structure, Column, ColumnType, Envelope, FeatureId, FeatureRow, FeatureTable,
    Geometry, MappingKind, Shape,
};
pub use provider::{ListenerId, Provider, ProviderCore, QueryInstrumentation};
