//! In-memory provider for development and testing.
//!
//! Opening and closing only flip the lifecycle flag; the rows stay in
//! memory for the provider's whole life.

use geoprovider_core::config::ProviderConfig;
use geoprovider_core::{
    Envelope, FeatureId, FeatureRow, FeatureTable, Geometry, Provider, ProviderCore,
    ProviderError, QueryInstrumentation, Result,
};

use crate::index::FeatureStore;

/// Provider backed by an in-memory [`FeatureStore`]
#[derive(Debug)]
pub struct MemoryProvider {
    core: ProviderCore,
    store: FeatureStore,
    instrumentation: Option<QueryInstrumentation>,
}

impl MemoryProvider {
    /// Create an empty provider whose rows follow `schema`
    pub fn new(connection_id: impl Into<String>, srid: i32, schema: &FeatureTable) -> Self {
        Self {
            core: ProviderCore::new(connection_id, srid),
            store: FeatureStore::new(schema),
            instrumentation: None,
        }
    }

    /// Create a provider holding the rows of `table`
    pub fn from_table(
        connection_id: impl Into<String>,
        srid: i32,
        table: FeatureTable,
    ) -> Result<Self> {
        Ok(Self {
            core: ProviderCore::new(connection_id, srid),
            store: FeatureStore::from_table(table)?,
            instrumentation: None,
        })
    }

    /// Create a provider holding `table`, with SRID and instrumentation from `config`
    pub fn from_config(config: &ProviderConfig, table: FeatureTable) -> Result<Self> {
        let provider = Self::from_table("", config.srid.value, table)?;
        if config.instrument_queries.value {
            Ok(provider.with_instrumentation())
        } else {
            Ok(provider)
        }
    }

    /// Replace the core, e.g. to inject a custom factory service
    pub fn with_core(mut self, core: ProviderCore) -> Self {
        self.core = core;
        self
    }

    pub fn with_instrumentation(mut self) -> Self {
        let label = if self.core.connection_id().is_empty() {
            "memory".to_string()
        } else {
            self.core.connection_id().to_string()
        };
        self.instrumentation = Some(QueryInstrumentation::new(label));
        self
    }

    pub fn instrumentation(&self) -> Option<&QueryInstrumentation> {
        self.instrumentation.as_ref()
    }

    /// Add or replace a row
    pub fn insert(&mut self, row: FeatureRow) -> Result<()> {
        self.core.ensure_usable()?;
        self.store.insert(row)
    }

    /// Remove a row, failing with `NotFound` when absent
    pub fn remove(&mut self, id: FeatureId) -> Result<FeatureRow> {
        self.core.ensure_usable()?;
        self.store.remove(id).ok_or_else(|| ProviderError::not_found(id))
    }
}

impl Provider for MemoryProvider {
    fn core(&self) -> &ProviderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProviderCore {
        &mut self.core
    }

    fn geometries_in_view(&self, bbox: &Envelope) -> Result<Vec<Geometry>> {
        self.core.ensure_open()?;
        let factory = self.core.geometry_factory()?;
        Ok(self.store.geometries_in(bbox, &factory))
    }

    fn object_ids_in_view(&self, bbox: &Envelope) -> Result<Vec<FeatureId>> {
        self.core.ensure_open()?;
        Ok(self.store.ids_in(bbox))
    }

    fn geometry_by_id(&self, id: FeatureId) -> Result<Geometry> {
        self.core.ensure_open()?;
        let factory = self.core.geometry_factory()?;
        self.store.geometry_by_id(id, &factory)
    }

    fn feature_count(&self) -> Result<usize> {
        self.core.ensure_open()?;
        Ok(self.store.len())
    }

    fn feature_by_id(&self, id: FeatureId) -> Result<FeatureRow> {
        self.core.ensure_open()?;
        let factory = self.core.geometry_factory()?;
        self.store.feature_by_id(id, &factory)
    }

    fn extents(&self) -> Result<Envelope> {
        self.core.ensure_open()?;
        self.store.extents().ok_or(ProviderError::EmptyDataset)
    }

    fn on_begin_execute_intersection_query(&self, geometry: &Geometry) -> Result<()> {
        if let Some(instrumentation) = &self.instrumentation {
            instrumentation.begin(geometry.shape().type_name());
        }
        Ok(())
    }

    fn on_execute_intersection_query(
        &self,
        geometry: &Geometry,
        result: &mut FeatureTable,
    ) -> Result<()> {
        self.core.ensure_open()?;
        let factory = self.core.geometry_factory()?;
        let appended = self.store.intersecting(geometry, &factory, result)?;
        tracing::debug!(appended, "memory intersection query");
        Ok(())
    }

    fn on_end_execute_intersection_query(&self) -> Result<()> {
        if let Some(instrumentation) = &self.instrumentation {
            instrumentation.end();
        }
        Ok(())
    }

    fn execute_intersection_query_envelope(
        &self,
        bbox: &Envelope,
        result: &mut FeatureTable,
    ) -> Result<()> {
        self.core.ensure_open()?;
        let factory = self.core.geometry_factory()?;
        self.store.intersecting_envelope(bbox, &factory, result)?;
        Ok(())
    }
}
