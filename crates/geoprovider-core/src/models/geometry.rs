//! Geometry types returned by providers.
//!
//! A [`Shape`] is the plain coordinate structure, GeoJSON compatible. A
//! [`Geometry`] is a shape stamped with the SRID of the factory that
//! built it; only [`GeometryFactory`](crate::factory::GeometryFactory)
//! constructs one.

use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::intersects::Intersects;
use geo::Geometry as GeoGeometry;
use serde::{Deserialize, Serialize};

use super::Envelope;

/// GeoJSON-compatible coordinate structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

impl Shape {
    /// GeoJSON type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Point { .. } => "Point",
            Shape::LineString { .. } => "LineString",
            Shape::Polygon { .. } => "Polygon",
            Shape::MultiPoint { .. } => "MultiPoint",
            Shape::MultiLineString { .. } => "MultiLineString",
            Shape::MultiPolygon { .. } => "MultiPolygon",
        }
    }

    /// Convert to a `geo` geometry for predicate evaluation
    pub fn to_geo(&self) -> GeoGeometry<f64> {
        match self {
            Shape::Point { coordinates } => {
                GeoGeometry::Point(geo::Point::new(coordinates[0], coordinates[1]))
            }
            Shape::LineString { coordinates } => GeoGeometry::LineString(line(coordinates)),
            Shape::Polygon { coordinates } => GeoGeometry::Polygon(polygon(coordinates)),
            Shape::MultiPoint { coordinates } => GeoGeometry::MultiPoint(geo::MultiPoint::new(
                coordinates.iter().map(|c| geo::Point::new(c[0], c[1])).collect(),
            )),
            Shape::MultiLineString { coordinates } => GeoGeometry::MultiLineString(
                geo::MultiLineString::new(coordinates.iter().map(|l| line(l)).collect()),
            ),
            Shape::MultiPolygon { coordinates } => GeoGeometry::MultiPolygon(
                geo::MultiPolygon::new(coordinates.iter().map(|p| polygon(p)).collect()),
            ),
        }
    }

    /// Convert from a `geo` geometry
    ///
    /// Returns `None` for geometry collections, which have no single shape.
    pub fn from_geo(geom: &GeoGeometry<f64>) -> Option<Self> {
        let shape = match geom {
            GeoGeometry::Point(p) => Shape::Point { coordinates: [p.x(), p.y()] },
            GeoGeometry::Line(l) => Shape::LineString {
                coordinates: vec![[l.start.x, l.start.y], [l.end.x, l.end.y]],
            },
            GeoGeometry::LineString(ls) => Shape::LineString { coordinates: coords_of(ls) },
            GeoGeometry::Polygon(p) => Shape::Polygon { coordinates: rings_of(p) },
            GeoGeometry::MultiPoint(mp) => Shape::MultiPoint {
                coordinates: mp.iter().map(|p| [p.x(), p.y()]).collect(),
            },
            GeoGeometry::MultiLineString(mls) => Shape::MultiLineString {
                coordinates: mls.iter().map(coords_of).collect(),
            },
            GeoGeometry::MultiPolygon(mp) => {
                Shape::MultiPolygon { coordinates: mp.iter().map(rings_of).collect() }
            }
            GeoGeometry::Rect(r) => Shape::Polygon { coordinates: rings_of(&r.to_polygon()) },
            GeoGeometry::Triangle(t) => Shape::Polygon { coordinates: rings_of(&t.to_polygon()) },
            GeoGeometry::GeometryCollection(_) => return None,
        };
        Some(shape)
    }
}

fn line(coordinates: &[[f64; 2]]) -> geo::LineString<f64> {
    geo::LineString::new(coordinates.iter().map(|c| geo::Coord { x: c[0], y: c[1] }).collect())
}

fn polygon(rings: &[Vec<[f64; 2]>]) -> geo::Polygon<f64> {
    match rings.split_first() {
        Some((exterior, interiors)) => {
            geo::Polygon::new(line(exterior), interiors.iter().map(|r| line(r)).collect())
        }
        None => geo::Polygon::new(geo::LineString::new(vec![]), vec![]),
    }
}

fn coords_of(ls: &geo::LineString<f64>) -> Vec<[f64; 2]> {
    ls.coords().map(|c| [c.x, c.y]).collect()
}

fn rings_of(p: &geo::Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(p.exterior()).chain(p.interiors()).map(coords_of).collect()
}

/// A shape bound to a coordinate reference system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    srid: i32,
    #[serde(flatten)]
    shape: Shape,
}

impl Geometry {
    pub(crate) fn new(srid: i32, shape: Shape) -> Self {
        Self { srid, shape }
    }

    /// SRID of the factory that produced this geometry
    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn into_shape(self) -> Shape {
        self.shape
    }

    pub fn to_geo(&self) -> GeoGeometry<f64> {
        self.shape.to_geo()
    }

    /// Bounding envelope, `None` for shapes without coordinates
    pub fn envelope(&self) -> Option<Envelope> {
        self.to_geo().bounding_rect().map(Envelope::from)
    }

    /// Exact intersection test against another geometry
    pub fn intersects(&self, other: &Geometry) -> bool {
        self.to_geo().intersects(&other.to_geo())
    }

    /// Exact intersection test against a rectangle
    pub fn intersects_envelope(&self, envelope: &Envelope) -> bool {
        self.to_geo().intersects(&envelope.to_rect())
    }

    /// Serialise the coordinate part as a GeoJSON geometry object
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::to_value(&self.shape).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Shape {
        Shape::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [size, 0.0], [size, size], [0.0, size], [0.0, 0.0]]],
        }
    }

    #[test]
    fn test_shape_serialization() {
        let point = Shape::Point { coordinates: [115.0, -8.5] };
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("\"type\":\"Point\""));

        let parsed: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(point, parsed);
    }

    #[test]
    fn test_polygon_geo_conversion() {
        let shape = square(2.0);
        let back = Shape::from_geo(&shape.to_geo()).unwrap();
        assert_eq!(shape, back);
    }

    #[test]
    fn test_envelope_of_polygon() {
        let geom = Geometry::new(4326, square(3.0));
        assert_eq!(geom.envelope(), Some(Envelope::new(0.0, 0.0, 3.0, 3.0)));
    }

    #[test]
    fn test_intersects() {
        let a = Geometry::new(0, square(10.0));
        let inside = Geometry::new(0, Shape::Point { coordinates: [5.0, 5.0] });
        let outside = Geometry::new(0, Shape::Point { coordinates: [15.0, 15.0] });

        assert!(a.intersects(&inside));
        assert!(!a.intersects(&outside));
    }

    #[test]
    fn test_intersects_envelope_is_exact() {
        // Diagonal line whose bounding box covers the query box but never crosses it
        let diagonal = Geometry::new(
            0,
            Shape::LineString { coordinates: vec![[0.0, 0.0], [10.0, 10.0]] },
        );
        let corner = Envelope::new(8.0, 0.0, 10.0, 2.0);

        assert!(diagonal.envelope().unwrap().intersects(&corner));
        assert!(!diagonal.intersects_envelope(&corner));
    }

    #[test]
    fn test_geometry_serializes_with_srid() {
        let geom = Geometry::new(3857, Shape::Point { coordinates: [1.0, 2.0] });
        let json = serde_json::to_value(&geom).unwrap();
        assert_eq!(json["srid"], 3857);
        assert_eq!(json["type"], "Point");
    }
}
