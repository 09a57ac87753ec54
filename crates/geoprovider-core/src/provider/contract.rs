use std::sync::Arc;

use super::{ListenerId, ProviderCore};
use crate::error::Result;
use crate::factory::GeometryFactory;
use crate::models::{self, Envelope, FeatureId, FeatureRow, FeatureTable, Geometry};

/// Contract for spatial data backends
///
/// Implementors own a [`ProviderCore`] and expose it through [`core`] and
/// [`core_mut`]; lifecycle and CRS handling come for free from the default
/// methods. Backends that hold real resources override [`open`] and
/// [`close`] and forward to the core for the state transition.
///
/// Every bundled provider rejects queries while closed or disposed with
/// `InvalidState`, via [`ProviderCore::ensure_open`].
///
/// [`core`]: Provider::core
/// [`core_mut`]: Provider::core_mut
/// [`open`]: Provider::open
/// [`close`]: Provider::close
pub trait Provider {
    fn core(&self) -> &ProviderCore;

    fn core_mut(&mut self) -> &mut ProviderCore;

    fn connection_id(&self) -> &str {
        self.core().connection_id()
    }

    fn srid(&self) -> i32 {
        self.core().srid()
    }

    /// Change the SRID; see [`ProviderCore::set_srid`]
    fn set_srid(&mut self, srid: i32) -> Result<()> {
        self.core_mut().set_srid(srid)
    }

    fn geometry_factory(&self) -> Result<Arc<GeometryFactory>> {
        self.core().geometry_factory()
    }

    fn on_srid_changed(&mut self, listener: Box<dyn FnMut() + Send>) -> ListenerId {
        self.core_mut().on_srid_changed(listener)
    }

    fn remove_srid_listener(&mut self, id: ListenerId) -> bool {
        self.core_mut().remove_listener(id)
    }

    fn is_open(&self) -> bool {
        self.core().is_open()
    }

    fn open(&mut self) -> Result<()> {
        self.core_mut().open()
    }

    fn close(&mut self) -> Result<()> {
        self.core_mut().close()
    }

    /// Close if open, then release the core; repeated calls are no-ops
    fn dispose(&mut self) -> Result<()> {
        if self.core().is_disposed() {
            return Ok(());
        }
        if self.is_open() {
            self.close()?;
        }
        self.core_mut().dispose();
        Ok(())
    }

    /// Geometries whose extent intersects `bbox`
    fn geometries_in_view(&self, bbox: &Envelope) -> Result<Vec<Geometry>>;

    /// Ids of features whose envelope intersects `bbox`
    ///
    /// Implementations should answer from envelopes or an index only.
    fn object_ids_in_view(&self, bbox: &Envelope) -> Result<Vec<FeatureId>>;

    /// Fails with `NotFound` when no feature has `id`
    fn geometry_by_id(&self, id: FeatureId) -> Result<Geometry>;

    fn feature_count(&self) -> Result<usize>;

    /// Fails with `NotFound` when no row has `id`
    fn feature_by_id(&self, id: FeatureId) -> Result<FeatureRow>;

    /// Bounding envelope of the whole dataset
    fn extents(&self) -> Result<Envelope>;

    /// Fill `result` with every feature intersecting `geometry`
    ///
    /// Runs the begin hook, the execute step, then the end hook. The end
    /// hook runs even when the execute step fails; the execute error is the
    /// one returned. A failing begin hook stops the query before anything
    /// else runs.
    fn execute_intersection_query(
        &self,
        geometry: &Geometry,
        result: &mut FeatureTable,
    ) -> Result<()> {
        self.core().ensure_usable()?;

        tracing::trace!(connection_id = %self.connection_id(), "begin intersection query");
        self.on_begin_execute_intersection_query(geometry)?;

        let outcome = self.on_execute_intersection_query(geometry, result);

        let end = self.on_end_execute_intersection_query();
        tracing::trace!(
            connection_id = %self.connection_id(),
            ok = outcome.is_ok(),
            "end intersection query"
        );

        outcome.and(end)
    }

    fn on_begin_execute_intersection_query(&self, _geometry: &Geometry) -> Result<()> {
        Ok(())
    }

    fn on_execute_intersection_query(
        &self,
        geometry: &Geometry,
        result: &mut FeatureTable,
    ) -> Result<()>;

    fn on_end_execute_intersection_query(&self) -> Result<()> {
        Ok(())
    }

    /// Fill `result` with every feature whose envelope intersects `bbox`
    fn execute_intersection_query_envelope(
        &self,
        bbox: &Envelope,
        result: &mut FeatureTable,
    ) -> Result<()>;

    /// Empty table with the same columns as `base`
    fn clone_table_structure(&self, base: &FeatureTable) -> FeatureTable {
        models::clone_table_structure(base)
    }
}
