//! Request parameter strategy for WFS servers of unknown dialect.
//!
//! The exact combination of version, type-name parameter key, output format,
//! SRS name, and bbox axis order a server accepts is not reliably known in
//! advance. Each fetch cycle enumerates candidate combinations in priority
//! order; the scheduler tries them sequentially and remembers the winner as
//! the first candidate for the next cycle.

use std::collections::HashSet;
use std::fmt;

use overlay_common::crs::{is_crs84_alias, AxisOrder, EPSG_4326};
use overlay_common::{BoundingBox, WfsParams};

/// Defaults applied when the layer config leaves a field unset.
pub const DEFAULT_VERSION: &str = "2.0.0";
pub const DEFAULT_OUTPUT_FORMAT: &str = "application/json";

/// Universal format fallback every WFS server can produce.
pub const GML3_OUTPUT_FORMAT: &str = "GML3";

/// Version used by the final fixed fallback attempt.
const LEGACY_VERSION: &str = "1.1.0";

/// Which query parameter carries the feature type name.
///
/// WFS 2.0 uses plural `typeNames`; 1.0/1.1-era servers expect singular
/// `typeName` and ignore the plural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeNameKey {
    TypeNames,
    TypeName,
}

impl TypeNameKey {
    pub fn param_key(&self) -> &'static str {
        match self {
            TypeNameKey::TypeNames => "typeNames",
            TypeNameKey::TypeName => "typeName",
        }
    }
}

/// One immutable combination of protocol parameters to try.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttemptParameters {
    pub version: String,
    pub type_name_key: TypeNameKey,
    pub output_format: String,
    pub srs_name: String,
    pub bbox_order: AxisOrder,
}

impl AttemptParameters {
    /// Query parameters for a GetFeature request with this combination.
    pub fn query_params(&self, type_name: &str, bbox: &BoundingBox) -> Vec<(&'static str, String)> {
        vec![
            ("service", "WFS".to_string()),
            ("request", "GetFeature".to_string()),
            ("version", self.version.clone()),
            (self.type_name_key.param_key(), type_name.to_string()),
            ("outputFormat", self.output_format.clone()),
            ("srsName", self.srs_name.clone()),
            ("bbox", bbox.to_bbox_param(self.bbox_order)),
        ]
    }
}

impl fmt::Display for AttemptParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{} {} {} {} bbox={}",
            self.version,
            self.type_name_key.param_key(),
            self.output_format,
            self.srs_name,
            self.bbox_order,
        )
    }
}

/// Enumerate candidate parameter combinations, highest priority first.
///
/// Order: the last successful combination (if any), then the configured
/// SRS/format grid with WFS 2.0 conventions, a singular-`typeName` legacy
/// attempt, lat/lon bbox repeats when EPSG:4326 is in play (some ArcGIS
/// servers expect lat,lon in the bbox despite standard order), and a fixed
/// WFS 1.1.0 GML3 fallback. Exact duplicates are suppressed.
pub fn build_attempts(
    wfs: &WfsParams,
    preferred: Option<&AttemptParameters>,
) -> Vec<AttemptParameters> {
    let version = wfs
        .version
        .clone()
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());
    let primary_format = wfs
        .output_format
        .clone()
        .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());
    let configured_srs = wfs
        .srs_name
        .clone()
        .unwrap_or_else(|| EPSG_4326.to_string());

    let mut srs_candidates = vec![configured_srs.clone()];
    if is_crs84_alias(&configured_srs) {
        srs_candidates.push(EPSG_4326.to_string());
    }

    let mut formats = vec![primary_format.clone()];
    if !primary_format.eq_ignore_ascii_case(GML3_OUTPUT_FORMAT) {
        formats.push(GML3_OUTPUT_FORMAT.to_string());
    }

    let mut attempts = Vec::new();

    if let Some(p) = preferred {
        attempts.push(p.clone());
    }

    for srs in &srs_candidates {
        for format in &formats {
            attempts.push(AttemptParameters {
                version: version.clone(),
                type_name_key: TypeNameKey::TypeNames,
                output_format: format.clone(),
                srs_name: srs.clone(),
                bbox_order: AxisOrder::LonLat,
            });
        }
    }

    attempts.push(AttemptParameters {
        version: version.clone(),
        type_name_key: TypeNameKey::TypeName,
        output_format: primary_format.clone(),
        srs_name: configured_srs.clone(),
        bbox_order: AxisOrder::LonLat,
    });

    if srs_candidates
        .iter()
        .any(|s| s.eq_ignore_ascii_case(EPSG_4326))
    {
        for srs in &srs_candidates {
            for format in &formats {
                attempts.push(AttemptParameters {
                    version: version.clone(),
                    type_name_key: TypeNameKey::TypeNames,
                    output_format: format.clone(),
                    srs_name: srs.clone(),
                    bbox_order: AxisOrder::LatLon,
                });
            }
        }
        attempts.push(AttemptParameters {
            version: version.clone(),
            type_name_key: TypeNameKey::TypeName,
            output_format: primary_format,
            srs_name: configured_srs,
            bbox_order: AxisOrder::LatLon,
        });
    }

    attempts.push(AttemptParameters {
        version: LEGACY_VERSION.to_string(),
        type_name_key: TypeNameKey::TypeName,
        output_format: GML3_OUTPUT_FORMAT.to_string(),
        srs_name: EPSG_4326.to_string(),
        bbox_order: AxisOrder::LatLon,
    });

    let mut seen = HashSet::new();
    attempts.into_iter().filter(|a| seen.insert(a.clone())).collect()
}
