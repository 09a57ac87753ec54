//! GeoJSON file provider
//!
//! The file is read and indexed on `open` and released on `close`, so the
//! provider holds no data while closed.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use geoprovider_core::config::{ProviderConfig, ValidityMode};
use geoprovider_core::{
    Column, ColumnType, Envelope, FeatureId, FeatureRow, FeatureTable, Geometry, GeometryFactory,
    Provider, ProviderCore, ProviderError, QueryInstrumentation, Result,
};

use crate::index::FeatureStore;

/// Provider reading a GeoJSON document from disk
#[derive(Debug)]
pub struct GeoJsonProvider {
    core: ProviderCore,
    path: PathBuf,
    validity: ValidityMode,
    store: Option<FeatureStore>,
    instrumentation: Option<QueryInstrumentation>,
}

impl GeoJsonProvider {
    /// Create a closed provider for `path`
    ///
    /// The connection id is the canonical path when it can be resolved.
    /// With `srid` 0 the SRID declared in the file, if any, is adopted on
    /// open.
    pub fn new(path: impl AsRef<Path>, srid: i32) -> Self {
        let path = path.as_ref().to_path_buf();
        let connection_id =
            fs::canonicalize(&path).unwrap_or_else(|_| path.clone()).display().to_string();

        Self {
            core: ProviderCore::new(connection_id, srid),
            path,
            validity: ValidityMode::default(),
            store: None,
            instrumentation: None,
        }
    }

    pub fn from_config(path: impl AsRef<Path>, config: &ProviderConfig) -> Self {
        let provider =
            Self::new(path, config.srid.value).with_validity(config.geometry_validity.value);
        if config.instrument_queries.value {
            provider.with_instrumentation()
        } else {
            provider
        }
    }

    pub fn with_validity(mut self, validity: ValidityMode) -> Self {
        self.validity = validity;
        self
    }

    pub fn with_instrumentation(mut self) -> Self {
        self.instrumentation = Some(QueryInstrumentation::new(self.core.connection_id()));
        self
    }

    pub fn instrumentation(&self) -> Option<&QueryInstrumentation> {
        self.instrumentation.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column structure of the loaded file
    pub fn schema(&self) -> Result<&FeatureTable> {
        Ok(self.store()?.schema())
    }

    fn store(&self) -> Result<&FeatureStore> {
        self.core.ensure_open()?;
        self.store
            .as_ref()
            .ok_or_else(|| ProviderError::invalid_state("GeoJSON data is not loaded"))
    }

    fn load(&self) -> Result<(FeatureStore, Option<i32>)> {
        let content = fs::read_to_string(&self.path)?;
        let document: ::geojson::GeoJson = content.parse().map_err(|e| {
            ProviderError::Serialization(format!(
                "Failed to parse GeoJSON {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let (features, declared_srid) = match document {
            ::geojson::GeoJson::FeatureCollection(fc) => {
                let srid = fc
                    .foreign_members
                    .as_ref()
                    .and_then(|fm| fm.get("crs"))
                    .and_then(extract_srid_from_crs);
                (fc.features, srid)
            }
            ::geojson::GeoJson::Feature(feature) => (vec![feature], None),
            ::geojson::GeoJson::Geometry(geometry) => {
                (vec![::geojson::Feature::from(geometry)], None)
            }
        };

        let table = self.build_table(&features)?;
        Ok((FeatureStore::from_table(table)?, declared_srid))
    }

    fn build_table(&self, features: &[::geojson::Feature]) -> Result<FeatureTable> {
        let factory = self.core.geometry_factory()?;
        let name = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("features")
            .to_string();

        let mut table = FeatureTable::new(name);
        for column in infer_columns(features) {
            table.add_column(column)?;
        }

        let mut seen = HashSet::new();
        for (feature, id) in features.iter().zip(assign_ids(features)) {
            let geometry = match geometry_of(feature, &factory) {
                Ok(geometry) => geometry,
                Err(reason) => match self.validity {
                    ValidityMode::Strict => {
                        return Err(ProviderError::InvalidGeometry {
                            feature_id: id.to_string(),
                            reason,
                        })
                    }
                    ValidityMode::Lenient => {
                        tracing::warn!(
                            feature_id = %id,
                            %reason,
                            "skipping feature with invalid geometry"
                        );
                        continue;
                    }
                },
            };

            let values = table
                .columns()
                .iter()
                .map(|column| {
                    feature
                        .properties
                        .as_ref()
                        .and_then(|props| props.get(&column.name))
                        .cloned()
                        .unwrap_or(serde_json::Value::Null)
                })
                .collect();

            if !seen.insert(id) {
                return Err(ProviderError::SchemaMismatch {
                    reason: format!("duplicate feature id {}", id),
                });
            }
            table.add_row(FeatureRow::new(id, geometry, values))?;
        }

        Ok(table)
    }
}

impl Provider for GeoJsonProvider {
    fn core(&self) -> &ProviderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProviderCore {
        &mut self.core
    }

    fn open(&mut self) -> Result<()> {
        self.core.ensure_usable()?;
        if self.core.is_open() {
            return Ok(());
        }

        let (store, declared_srid) = self.load()?;
        tracing::info!(
            path = %self.path.display(),
            features = store.len(),
            "loaded GeoJSON"
        );

        if let Some(declared) = declared_srid {
            if self.core.srid() == 0 {
                self.core.set_srid(declared)?;
            } else if declared != self.core.srid() {
                tracing::warn!(
                    declared,
                    srid = self.core.srid(),
                    "file CRS differs from provider SRID; coordinates are not reprojected"
                );
            }
        }

        self.store = Some(store);
        self.core.open()
    }

    fn close(&mut self) -> Result<()> {
        self.core.ensure_usable()?;
        self.store = None;
        self.core.close()
    }

    fn geometries_in_view(&self, bbox: &Envelope) -> Result<Vec<Geometry>> {
        let store = self.store()?;
        let factory = self.core.geometry_factory()?;
        Ok(store.geometries_in(bbox, &factory))
    }

    fn object_ids_in_view(&self, bbox: &Envelope) -> Result<Vec<FeatureId>> {
        Ok(self.store()?.ids_in(bbox))
    }

    fn geometry_by_id(&self, id: FeatureId) -> Result<Geometry> {
        let store = self.store()?;
        let factory = self.core.geometry_factory()?;
        store.geometry_by_id(id, &factory)
    }

    fn feature_count(&self) -> Result<usize> {
        Ok(self.store()?.len())
    }

    fn feature_by_id(&self, id: FeatureId) -> Result<FeatureRow> {
        let store = self.store()?;
        let factory = self.core.geometry_factory()?;
        store.feature_by_id(id, &factory)
    }

    fn extents(&self) -> Result<Envelope> {
        self.store()?.extents().ok_or(ProviderError::EmptyDataset)
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
        let store = self.store()?;
        let factory = self.core.geometry_factory()?;
        let appended = store.intersecting(geometry, &factory, result)?;
        tracing::debug!(appended, "GeoJSON intersection query");
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
        let store = self.store()?;
        let factory = self.core.geometry_factory()?;
        store.intersecting_envelope(bbox, &factory, result)?;
        Ok(())
    }
}

/// Numeric ids, and strings holding one, are kept
///
/// Every other feature gets the lowest id no explicit id claims, counting
/// up in document order. A file without ids is numbered by position.
fn assign_ids(features: &[::geojson::Feature]) -> Vec<FeatureId> {
    let explicit: Vec<Option<u64>> = features.iter().map(explicit_id).collect();
    let claimed: HashSet<u64> = explicit.iter().flatten().copied().collect();

    let mut next: u64 = 0;
    explicit
        .into_iter()
        .map(|id| match id {
            Some(id) => FeatureId(id),
            None => {
                while claimed.contains(&next) {
                    next += 1;
                }
                next += 1;
                FeatureId(next - 1)
            }
        })
        .collect()
}

fn explicit_id(feature: &::geojson::Feature) -> Option<u64> {
    match &feature.id {
        Some(::geojson::feature::Id::Number(n)) => n.as_u64(),
        Some(::geojson::feature::Id::String(s)) => s.parse().ok(),
        None => None,
    }
}

fn geometry_of(
    feature: &::geojson::Feature,
    factory: &GeometryFactory,
) -> std::result::Result<Option<Geometry>, String> {
    let Some(geometry) = &feature.geometry else {
        return Ok(None);
    };

    match factory.from_geojson_geometry(geometry) {
        Ok(geometry) => Ok(Some(geometry)),
        Err(ProviderError::InvalidGeometry { reason, .. }) => Err(reason),
        Err(e) => Err(e.to_string()),
    }
}

/// Derive columns from property values, in first-seen order
///
/// Mixed integer and float values widen to `Float`; any other conflict,
/// as well as nested objects and arrays, becomes `Text`.
fn infer_columns(features: &[::geojson::Feature]) -> Vec<Column> {
    let mut columns: Vec<(String, Option<ColumnType>)> = Vec::new();

    for props in features.iter().filter_map(|f| f.properties.as_ref()) {
        for (key, value) in props {
            let observed = value_type(value);
            match columns.iter_mut().find(|(name, _)| name == key) {
                Some((_, existing)) => *existing = merge_types(*existing, observed),
                None => columns.push((key.clone(), observed)),
            }
        }
    }

    columns
        .into_iter()
        .map(|(name, data_type)| Column::new(name, data_type.unwrap_or(ColumnType::Text)))
        .collect()
}

fn value_type(value: &serde_json::Value) -> Option<ColumnType> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(_) => Some(ColumnType::Boolean),
        serde_json::Value::Number(n) if n.is_f64() => Some(ColumnType::Float),
        serde_json::Value::Number(_) => Some(ColumnType::Integer),
        _ => Some(ColumnType::Text),
    }
}

fn merge_types(existing: Option<ColumnType>, observed: Option<ColumnType>) -> Option<ColumnType> {
    match (existing, observed) {
        (None, t) | (t, None) => t,
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(ColumnType::Integer), Some(ColumnType::Float))
        | (Some(ColumnType::Float), Some(ColumnType::Integer)) => Some(ColumnType::Float),
        _ => Some(ColumnType::Text),
    }
}

/// Extract an SRID from a legacy GeoJSON `crs` member
///
/// Accepts "EPSG:4326" and "urn:ogc:def:crs:EPSG::4326" style names.
/// The OGC CRS84 alias maps to 4326.
fn extract_srid_from_crs(crs: &serde_json::Value) -> Option<i32> {
    let name = crs.get("properties")?.get("name")?.as_str()?;
    if name.ends_with("CRS84") {
        return Some(4326);
    }
    name.rsplit(':').next()?.parse().ok()
}
