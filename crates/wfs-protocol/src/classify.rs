//! Raw HTTP response classification.
//!
//! WFS servers are loose about content types and status codes: exception
//! documents arrive with HTTP 200, JSON arrives labelled `text/xml`, GML
//! arrives with no content type at all. Classification therefore sniffs the
//! body in addition to the headers.

use serde::Deserialize;
use serde_json::Value;

use overlay_common::{Feature, FeatureCollection, OverlayError};

use crate::gml;

/// How much of the body to sniff for an exception marker.
const EXCEPTION_SNIFF_CHARS: usize = 400;

/// How much of a body to keep in an error excerpt.
const EXCERPT_CHARS: usize = 200;

/// A raw HTTP response as delivered by the transport.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Classify and parse a response body into features.
///
/// Returns `Ok(None)` when the body was well-formed but yielded nothing
/// (caller treats as "no data"), `Ok(Some)` for a decoded collection, and
/// `Err` for exception documents and unparseable bodies. Never panics.
pub fn parse_features(response: &RawResponse) -> Result<Option<FeatureCollection>, OverlayError> {
    let head: String = response
        .body
        .chars()
        .take(EXCEPTION_SNIFF_CHARS)
        .collect::<String>()
        .to_lowercase();

    // Servers frequently wrap errors in an exception document under HTTP 200.
    if head.contains("exceptionreport") {
        return Err(OverlayError::ExceptionReport(excerpt(&response.body)));
    }

    let content_type = response
        .content_type
        .as_deref()
        .unwrap_or("")
        .to_lowercase();

    if content_type.contains("xml") || response.body.trim_start().starts_with('<') {
        return Ok(gml::decode(&response.body));
    }

    let raw: RawJsonCollection = serde_json::from_str(&response.body)?;
    Ok(Some(raw.into_collection()))
}

/// A single-line body excerpt for diagnostics.
fn excerpt(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(EXCERPT_CHARS)
        .collect()
}

/// Lenient GeoJSON intake: unknown geometry types and null geometries drop
/// the feature rather than fail the document, and property values of any
/// JSON type are stringified.
#[derive(Deserialize)]
struct RawJsonCollection {
    #[serde(default)]
    features: Vec<RawJsonFeature>,
}

#[derive(Deserialize)]
struct RawJsonFeature {
    #[serde(default)]
    geometry: Value,
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
}

impl RawJsonCollection {
    fn into_collection(self) -> FeatureCollection {
        let features = self
            .features
            .into_iter()
            .filter_map(|raw| {
                let geometry = serde_json::from_value(raw.geometry).ok()?;
                let properties = raw
                    .properties
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(key, value)| stringify(value).map(|v| (key, v)))
                    .collect();
                Some(Feature {
                    geometry,
                    properties,
                })
            })
            .collect();

        FeatureCollection::new(features)
    }
}

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_common::Geometry;

    fn response(status: u16, content_type: Option<&str>, body: &str) -> RawResponse {
        RawResponse {
            status,
            content_type: content_type.map(String::from),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_exception_report_detected_despite_200() {
        let body = r#"<?xml version="1.0"?>
            <ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1">
              <ows:Exception exceptionCode="InvalidParameterValue"/>
            </ows:ExceptionReport>"#;

        let result = parse_features(&response(200, Some("text/xml"), body));
        assert!(matches!(result, Err(OverlayError::ExceptionReport(_))));
    }

    #[test]
    fn test_exception_report_without_prefix() {
        let body = "<ExceptionReport><Exception/></ExceptionReport>";
        let result = parse_features(&response(200, None, body));
        assert!(matches!(result, Err(OverlayError::ExceptionReport(_))));
    }

    #[test]
    fn test_json_collection_parses() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [27.5, 53.9] },
                "properties": { "name": "Minsk", "population": 1995000 }
            }]
        }"#;

        let fc = parse_features(&response(200, Some("application/json"), body))
            .unwrap()
            .unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].geometry, Geometry::point(27.5, 53.9));
        assert_eq!(fc.features[0].properties.get("population").unwrap(), "1995000");
    }

    #[test]
    fn test_json_null_geometry_dropped() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": null, "properties": {} },
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                  "properties": {} }
            ]
        }"#;

        let fc = parse_features(&response(200, Some("application/json"), body))
            .unwrap()
            .unwrap();
        assert_eq!(fc.len(), 1);
    }

    #[test]
    fn test_xml_body_routed_to_gml_without_content_type() {
        let body = r#"
            <FeatureCollection>
              <featureMember>
                <city><Point><posList>10 20</posList></Point></city>
              </featureMember>
            </FeatureCollection>"#;

        let fc = parse_features(&response(200, None, body)).unwrap().unwrap();
        assert_eq!(fc.len(), 1);
    }

    #[test]
    fn test_empty_gml_is_no_data() {
        let body = r#"<FeatureCollection numberMatched="0"/>"#;
        let result = parse_features(&response(200, Some("text/xml"), body)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_garbage_is_unparseable() {
        let result = parse_features(&response(200, Some("text/html"), "service unavailable"));
        assert!(matches!(result, Err(OverlayError::Unparseable(_))));
    }
}
