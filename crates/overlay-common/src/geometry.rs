//! GeoJSON-like geometry model for overlay features.
//!
//! The shapes serialize to standard GeoJSON, so a JSON WFS response
//! deserializes directly into these types. Coordinates are stored as
//! `[x, y]` = `[longitude, latitude]` pairs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single coordinate pair: `[longitude, latitude]`.
pub type Position = [f64; 2];

/// A sequence of coordinate pairs (a LineString's path or a Polygon ring).
pub type Ring = Vec<Position>;

/// A geometry value, tagged explicitly in the GeoJSON style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    LineString { coordinates: Ring },
    Polygon { coordinates: Vec<Ring> },
    MultiPoint { coordinates: Ring },
    MultiLineString { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            coordinates: [x, y],
        }
    }

    pub fn line_string(coordinates: Ring) -> Self {
        Geometry::LineString { coordinates }
    }

    pub fn polygon(rings: Vec<Ring>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }

    pub fn multi_point(coordinates: Ring) -> Self {
        Geometry::MultiPoint { coordinates }
    }

    pub fn multi_line_string(lines: Vec<Ring>) -> Self {
        Geometry::MultiLineString { coordinates: lines }
    }

    pub fn multi_polygon(polygons: Vec<Vec<Ring>>) -> Self {
        Geometry::MultiPolygon {
            coordinates: polygons,
        }
    }

    /// Check that every leaf coordinate is a finite number.
    ///
    /// A geometry with any NaN or infinite leaf is invalid as a whole; it
    /// must be dropped rather than partially rendered.
    pub fn has_finite_coordinates(&self) -> bool {
        let mut finite = true;
        self.each_position(&mut |pos| {
            if !pos[0].is_finite() || !pos[1].is_finite() {
                finite = false;
            }
        });
        finite
    }

    /// Swap x and y in every coordinate pair, in place.
    ///
    /// Applying this twice restores the original values exactly.
    pub fn swap_axes(&mut self) {
        self.each_position_mut(&mut |pos| pos.swap(0, 1));
    }

    /// Visit every leaf coordinate pair.
    pub fn each_position<F: FnMut(&Position)>(&self, f: &mut F) {
        match self {
            Geometry::Point { coordinates } => f(coordinates),
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.iter().for_each(|p| f(p));
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().flatten().for_each(|p| f(p));
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates
                    .iter()
                    .flatten()
                    .flatten()
                    .for_each(|p| f(p));
            }
        }
    }

    fn each_position_mut<F: FnMut(&mut Position)>(&mut self, f: &mut F) {
        match self {
            Geometry::Point { coordinates } => f(coordinates),
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.iter_mut().for_each(|p| f(p));
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter_mut().flatten().for_each(|p| f(p));
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates
                    .iter_mut()
                    .flatten()
                    .flatten()
                    .for_each(|p| f(p));
            }
        }
    }
}

/// A feature: one geometry plus its attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A set of features, replaced wholesale on every successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Return a new collection with every non-finite-geometry feature
    /// removed. The original collection is untouched.
    pub fn sanitize(&self) -> FeatureCollection {
        FeatureCollection {
            features: self
                .features
                .iter()
                .filter(|f| f.geometry.has_finite_coordinates())
                .cloned()
                .collect(),
        }
    }

    /// Swap x and y in every feature's coordinates, in place.
    pub fn swap_axes(&mut self) {
        for feature in &mut self.features {
            feature.geometry.swap_axes();
        }
    }

    /// Visit every leaf coordinate pair across all features.
    pub fn each_position<F: FnMut(&Position)>(&self, f: &mut F) {
        for feature in &self.features {
            feature.geometry.each_position(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_ring() -> Ring {
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]
    }

    #[test]
    fn test_finite_check_accepts_valid() {
        assert!(Geometry::point(27.5, 53.9).has_finite_coordinates());
        assert!(Geometry::polygon(vec![square_ring()]).has_finite_coordinates());
    }

    #[test]
    fn test_finite_check_rejects_nan() {
        assert!(!Geometry::point(f64::NAN, 53.9).has_finite_coordinates());
        assert!(!Geometry::line_string(vec![[0.0, 0.0], [f64::INFINITY, 1.0]])
            .has_finite_coordinates());

        let mut rings = vec![square_ring()];
        rings[0][2] = [1.0, f64::NAN];
        assert!(!Geometry::multi_polygon(vec![rings]).has_finite_coordinates());
    }

    #[test]
    fn test_sanitize_drops_invalid_features() {
        let fc = FeatureCollection::new(vec![
            Feature::new(Geometry::point(27.5, 53.9)),
            Feature::new(Geometry::point(f64::NAN, 53.9)),
        ]);

        let clean = fc.sanitize();
        assert_eq!(clean.len(), 1);
        // Original untouched.
        assert_eq!(fc.len(), 2);
    }

    #[test]
    fn test_sanitize_idempotent() {
        let fc = FeatureCollection::new(vec![
            Feature::new(Geometry::point(27.5, 53.9)),
            Feature::new(Geometry::point(f64::NAN, 53.9)),
            Feature::new(Geometry::line_string(vec![[1.0, 2.0], [3.0, 4.0]])),
        ]);

        let once = fc.sanitize();
        let twice = once.sanitize();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_swap_axes_round_trip() {
        let original = Geometry::multi_polygon(vec![vec![square_ring()], vec![square_ring()]]);
        let mut geometry = original.clone();

        geometry.swap_axes();
        assert_ne!(geometry, original);
        geometry.swap_axes();
        assert_eq!(geometry, original);
    }

    #[test]
    fn test_geojson_round_trip() {
        let fc = FeatureCollection::new(vec![Feature::new(Geometry::point(27.5, 53.9))
            .with_property("name", "Minsk")]);

        let json = serde_json::to_string(&fc).unwrap();
        assert!(json.contains("\"type\":\"Point\""));

        let back: FeatureCollection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fc);
    }
}
