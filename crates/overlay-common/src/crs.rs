//! Spatial reference naming and axis-order helpers.

use serde::{Deserialize, Serialize};

/// The SRS every WFS server is required to understand.
pub const EPSG_4326: &str = "EPSG:4326";

/// Axis order of a coordinate pair on the wire.
///
/// EPSG:4326 officially orders axes latitude-first, but many servers (and
/// every GeoJSON document) use longitude-first anyway. Both orders appear in
/// the wild for the same advertised SRS, which is why the request strategy
/// tries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisOrder {
    /// Longitude (x) first, latitude (y) second.
    LonLat,
    /// Latitude (y) first, longitude (x) second.
    LatLon,
}

impl std::fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisOrder::LonLat => write!(f, "lonlat"),
            AxisOrder::LatLon => write!(f, "latlon"),
        }
    }
}

/// Check whether an SRS name is an alias of CRS84 (WGS84 with lon/lat order).
///
/// Servers configured with a CRS84 alias frequently accept plain EPSG:4326 as
/// well, so the strategy builder adds it as a fallback candidate.
pub fn is_crs84_alias(srs: &str) -> bool {
    let normalized = srs.trim().to_uppercase();
    matches!(
        normalized.as_str(),
        "CRS:84" | "OGC:CRS84" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84"
    )
}
