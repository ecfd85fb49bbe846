//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::crs::AxisOrder;

/// Kilometers per degree of latitude (roughly constant).
const KM_PER_DEG_LAT: f64 = 110.574;

/// Kilometers per degree of longitude at the equator.
const KM_PER_DEG_LON: f64 = 111.320;

/// Decimal places used when quantizing bounds into a request key.
const REQUEST_KEY_PRECISION: usize = 2;

/// A geographic bounding box in degrees.
///
/// Canonical form: `south <= north` and `west <= east`. The constructor
/// reorders swapped extrema, so a box built from raw map bounds is always
/// canonical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Create a bounding box from possibly-swapped extrema.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south: south.min(north),
            west: west.min(east),
            north: south.max(north),
            east: west.max(east),
        }
    }

    /// Parse a "south,west,north,east" string (probe CLI input format).
    pub fn from_corner_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (i, part) in parts.iter().enumerate() {
            values[i] = part
                .trim()
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Width of the box in degrees of longitude.
    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the box in degrees of latitude.
    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }

    /// Center point as (latitude, longitude).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Check if this box intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.west < other.east
            && self.east > other.west
            && self.south < other.north
            && self.north > other.south
    }

    /// Approximate area in square kilometers.
    ///
    /// Equirectangular estimate: longitude degrees are scaled by the cosine
    /// of the center latitude. Good enough for viewport size limiting; not a
    /// geodesic computation.
    pub fn area_km2(&self) -> f64 {
        let (center_lat, _) = self.center();
        let width_km = self.width_deg() * KM_PER_DEG_LON * center_lat.to_radians().cos().abs();
        let height_km = self.height_deg() * KM_PER_DEG_LAT;
        (width_km * height_km).abs()
    }

    /// Shrink the box around its center so the area does not exceed
    /// `max_area_km2`.
    ///
    /// Both axes are scaled by the same factor, so the center and the aspect
    /// ratio are preserved. A box already within the limit is returned
    /// unchanged.
    pub fn clamp_to_area_km2(&self, max_area_km2: f64) -> BoundingBox {
        let area = self.area_km2();
        if area <= max_area_km2 || area == 0.0 {
            return *self;
        }

        let scale = (max_area_km2 / area).sqrt();
        let (center_lat, center_lon) = self.center();
        let half_width = self.width_deg() * scale / 2.0;
        let half_height = self.height_deg() * scale / 2.0;

        BoundingBox::new(
            center_lat - half_height,
            center_lon - half_width,
            center_lat + half_height,
            center_lon + half_width,
        )
    }

    /// Deduplication key for this box, quantized to avoid refetching on
    /// sub-rounding pans.
    pub fn request_key(&self) -> String {
        format!(
            "{:.prec$}_{:.prec$}_{:.prec$}_{:.prec$}",
            self.south,
            self.west,
            self.north,
            self.east,
            prec = REQUEST_KEY_PRECISION,
        )
    }

    /// WFS `bbox` query parameter value in the given axis order.
    ///
    /// No CRS suffix is appended.
    pub fn to_bbox_param(&self, order: AxisOrder) -> String {
        match order {
            AxisOrder::LonLat => {
                format!("{},{},{},{}", self.west, self.south, self.east, self.north)
            }
            AxisOrder::LatLon => {
                format!("{},{},{},{}", self.south, self.west, self.north, self.east)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bbox format: {0}. Expected 'south,west,north,east'")]
    InvalidFormat(String),

    #[error("Invalid number in bbox: {0}")]
    InvalidNumber(String),
}
