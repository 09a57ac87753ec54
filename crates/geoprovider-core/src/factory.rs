//! Geometry factories and the service that hands them out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{ProviderError, Result};
use crate::models::{Geometry, Shape};

/// Constructor for geometries bound to one SRID
///
/// Every geometry a factory builds carries the factory's SRID.
#[derive(Debug, PartialEq, Eq)]
pub struct GeometryFactory {
    srid: i32,
}

impl GeometryFactory {
    pub fn new(srid: i32) -> Self {
        Self { srid }
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn point(&self, x: f64, y: f64) -> Geometry {
        Geometry::new(self.srid, Shape::Point { coordinates: [x, y] })
    }

    pub fn line_string(&self, coordinates: Vec<[f64; 2]>) -> Geometry {
        Geometry::new(self.srid, Shape::LineString { coordinates })
    }

    pub fn polygon(&self, rings: Vec<Vec<[f64; 2]>>) -> Geometry {
        Geometry::new(self.srid, Shape::Polygon { coordinates: rings })
    }

    pub fn from_shape(&self, shape: Shape) -> Geometry {
        Geometry::new(self.srid, shape)
    }

    /// Rebuild a geometry under this factory's SRID
    ///
    /// Coordinates are kept as they are; no reprojection happens.
    pub fn restamp(&self, geometry: &Geometry) -> Geometry {
        Geometry::new(self.srid, geometry.shape().clone())
    }

    /// Build a geometry from a GeoJSON geometry object
    pub fn from_geojson(&self, value: &serde_json::Value) -> Result<Geometry> {
        let geometry: geojson::Geometry = serde_json::from_value(value.clone())
            .map_err(|e| ProviderError::Serialization(format!("Invalid GeoJSON geometry: {}", e)))?;
        self.from_geojson_geometry(&geometry)
    }

    /// Build a geometry from a parsed GeoJSON geometry
    ///
    /// Positions are read as x, y; a third ordinate is dropped.
    pub fn from_geojson_geometry(&self, geometry: &geojson::Geometry) -> Result<Geometry> {
        let geom = geo::Geometry::<f64>::try_from(geometry.value.clone())
            .map_err(|e| invalid_geometry(e.to_string()))?;
        self.from_geo(&geom)
    }

    /// Build a geometry from a `geo` geometry
    pub fn from_geo(&self, geom: &geo::Geometry<f64>) -> Result<Geometry> {
        Shape::from_geo(geom)
            .map(|shape| self.from_shape(shape))
            .ok_or_else(|| invalid_geometry("geometry collections are not supported"))
    }
}

fn invalid_geometry(reason: impl Into<String>) -> ProviderError {
    ProviderError::InvalidGeometry { feature_id: "-".to_string(), reason: reason.into() }
}

/// Source of geometry factories keyed by SRID
pub trait GeometryFactoryService: Send + Sync {
    fn create_geometry_factory(&self, srid: i32) -> Arc<GeometryFactory>;
}

/// Factory service that builds one factory per SRID and reuses it
#[derive(Debug, Default)]
pub struct CachingFactoryService {
    factories: Mutex<HashMap<i32, Arc<GeometryFactory>>>,
}

impl CachingFactoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct SRIDs served so far
    pub fn cached(&self) -> usize {
        match self.factories.lock() {
            Ok(factories) => factories.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl GeometryFactoryService for CachingFactoryService {
    fn create_geometry_factory(&self, srid: i32) -> Arc<GeometryFactory> {
        // A poisoned cache only means another thread panicked mid-insert; the
        // map itself is still a valid set of immutable factories.
        let mut factories = match self.factories.lock() {
            Ok(factories) => factories,
            Err(poisoned) => poisoned.into_inner(),
        };
        factories
            .entry(srid)
            .or_insert_with(|| {
                tracing::debug!(srid, "creating geometry factory");
                Arc::new(GeometryFactory::new(srid))
            })
            .clone()
    }
}

/// Process-wide factory service
pub fn global_factory_service() -> Arc<dyn GeometryFactoryService> {
    static SERVICE: OnceLock<Arc<CachingFactoryService>> = OnceLock::new();
    SERVICE.get_or_init(|| Arc::new(CachingFactoryService::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factory_stamps_srid() {
        let factory = GeometryFactory::new(3857);
        assert_eq!(factory.point(1.0, 2.0).srid(), 3857);
        assert_eq!(factory.line_string(vec![[0.0, 0.0], [1.0, 1.0]]).srid(), 3857);
    }

    #[test]
    fn test_restamp_keeps_coordinates() {
        let original = GeometryFactory::new(4326).point(115.0, -8.5);
        let restamped = GeometryFactory::new(3857).restamp(&original);

        assert_eq!(restamped.srid(), 3857);
        assert_eq!(restamped.shape(), original.shape());
    }

    #[test]
    fn test_from_geojson() {
        let factory = GeometryFactory::new(4326);
        let geom = factory
            .from_geojson(&json!({ "type": "Point", "coordinates": [10.0, 20.0] }))
            .unwrap();
        assert_eq!(geom.shape(), &Shape::Point { coordinates: [10.0, 20.0] });

        let err = factory.from_geojson(&json!({ "type": "Circle" })).unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[test]
    fn test_from_geojson_drops_third_ordinate() {
        let factory = GeometryFactory::new(4326);

        let point = factory
            .from_geojson(&json!({ "type": "Point", "coordinates": [1.0, 2.0, 30.0] }))
            .unwrap();
        assert_eq!(point.shape(), &Shape::Point { coordinates: [1.0, 2.0] });

        let line = factory
            .from_geojson(&json!({
                "type": "LineString",
                "coordinates": [[0.0, 0.0, 5.0], [3.0, 4.0, 6.0]]
            }))
            .unwrap();
        assert_eq!(line.shape(), &Shape::LineString { coordinates: vec![[0.0, 0.0], [3.0, 4.0]] });
    }

    #[test]
    fn test_from_geojson_rejects_collections() {
        let factory = GeometryFactory::new(4326);
        let err = factory
            .from_geojson(&json!({
                "type": "GeometryCollection",
                "geometries": [{ "type": "Point", "coordinates": [2.0, 2.0] }]
            }))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_from_geo() {
        let factory = GeometryFactory::new(3857);
        let rect = geo::Rect::new(geo::coord! { x: 0.0, y: 0.0 }, geo::coord! { x: 2.0, y: 1.0 });

        let geometry = factory.from_geo(&geo::Geometry::Rect(rect)).unwrap();
        assert_eq!(geometry.srid(), 3857);
        assert_eq!(geometry.shape().type_name(), "Polygon");

        let empty = geo::Geometry::GeometryCollection(geo::GeometryCollection::default());
        assert!(factory.from_geo(&empty).is_err());
    }

    #[test]
    fn test_caching_service_reuses_factories() {
        let service = CachingFactoryService::new();
        let a = service.create_geometry_factory(4326);
        let b = service.create_geometry_factory(4326);
        let c = service.create_geometry_factory(3857);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(c.srid(), 3857);
        assert_eq!(service.cached(), 2);
    }

    #[test]
    fn test_global_service_is_shared() {
        let a = global_factory_service().create_geometry_factory(28992);
        let b = global_factory_service().create_geometry_factory(28992);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
