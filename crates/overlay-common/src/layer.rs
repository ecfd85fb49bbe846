//! Overlay layer definitions.

use serde::{Deserialize, Serialize};

/// A WFS overlay layer definition, typically loaded from static config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayLayer {
    /// Base WFS endpoint URL (query parameters are appended per attempt).
    pub url: String,

    /// WFS request parameters for this layer.
    #[serde(rename = "wfsParams")]
    pub wfs: WfsParams,

    /// Stacking order hint for the map; opaque to the engine.
    #[serde(default, rename = "zIndex")]
    pub z_index: Option<i32>,
}

/// Configured WFS parameters. Optional fields fall back to protocol defaults
/// chosen by the request strategy builder, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WfsParams {
    /// Feature type to query (the `typeNames`/`typeName` value).
    #[serde(rename = "typeName")]
    pub type_name: String,

    /// WFS protocol version, e.g. "2.0.0".
    #[serde(default)]
    pub version: Option<String>,

    /// Requested output format, e.g. "application/json".
    #[serde(default, rename = "outputFormat")]
    pub output_format: Option<String>,

    /// Spatial reference system name, e.g. "EPSG:4326".
    #[serde(default, rename = "srsName")]
    pub srs_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_from_json() {
        let layer: OverlayLayer = serde_json::from_str(
            r#"{
                "url": "https://wfs.example.com/geoserver/wfs",
                "wfsParams": {
                    "typeName": "demo:landmarks",
                    "outputFormat": "application/json"
                },
                "zIndex": 410
            }"#,
        )
        .unwrap();

        assert_eq!(layer.wfs.type_name, "demo:landmarks");
        assert_eq!(layer.wfs.version, None);
        assert_eq!(layer.wfs.output_format.as_deref(), Some("application/json"));
        assert_eq!(layer.z_index, Some(410));
    }
}
