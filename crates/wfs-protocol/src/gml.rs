//! GML feature collection decoder.
//!
//! Decodes the XML feature collections WFS servers return when they ignore
//! (or don't support) the requested JSON output format. Matching is on local
//! tag names only; `Surface`/`MultiSurface` decode as Polygon/MultiPolygon.
//!
//! Coordinate tuple order in GML is unreliable: servers emit lat/lon or
//! lon/lat for the same advertised SRS, and some omit axis hints entirely.
//! A per-pair heuristic reorders obviously-flipped pairs here; the
//! viewport-overlap reconciliation in [`crate::axis`] is the second line of
//! defence.

use std::collections::HashMap;

use overlay_common::{Feature, FeatureCollection, Geometry, Position, Ring};

use crate::xml::{self, XmlElement};

/// Local names that wrap features in a GML feature collection.
const MEMBER_TAGS: &[&str] = &["featureMember", "member", "featureMembers"];

/// Local names of decodable geometry elements.
const GEOMETRY_TAGS: &[&str] = &[
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiLineString",
    "MultiPolygon",
    "Surface",
    "MultiSurface",
];

/// Decode a GML document into a feature collection.
///
/// Returns `None` for malformed XML or a document yielding zero features;
/// the caller treats that as "no data this round", not as an error.
pub fn decode(body: &str) -> Option<FeatureCollection> {
    let root = xml::parse(body).ok()?;

    let mut members = Vec::new();
    root.collect_descendants(MEMBER_TAGS, &mut members);

    let mut features = Vec::new();
    for member in members {
        if member.name == "featureMembers" {
            // Plural wrapper: each child is a feature.
            for child in &member.children {
                if let Some(feature) = decode_feature(child) {
                    features.push(feature);
                }
            }
        } else {
            // One feature per wrapper.
            if let Some(child) = member.children.first() {
                if let Some(feature) = decode_feature(child) {
                    features.push(feature);
                }
            }
        }
    }

    if features.is_empty() {
        None
    } else {
        Some(FeatureCollection::new(features))
    }
}

/// Decode one feature element. Features without decodable geometry are
/// dropped silently.
fn decode_feature(element: &XmlElement) -> Option<Feature> {
    let geometry_element = element.find_self_or_descendant(GEOMETRY_TAGS)?;
    let geometry = decode_geometry(geometry_element)?;

    let mut properties = HashMap::new();
    for child in &element.children {
        // A child holding a nested geometry is structural, not a value.
        if child.contains_tag(GEOMETRY_TAGS) {
            continue;
        }
        let text = child.text_content();
        let text = text.trim();
        if !text.is_empty() {
            properties.insert(child.name.clone(), text.to_string());
        }
    }

    Some(Feature {
        geometry,
        properties,
    })
}

fn decode_geometry(element: &XmlElement) -> Option<Geometry> {
    match element.name.as_str() {
        "Point" => coordinate_pairs(element)
            .first()
            .copied()
            .map(|coordinates| Geometry::Point { coordinates }),

        "LineString" => {
            let points = coordinate_pairs(element);
            (!points.is_empty()).then(|| Geometry::line_string(points))
        }

        "Polygon" | "Surface" => decode_rings(element).map(Geometry::polygon),

        "MultiPoint" => {
            let mut point_elements = Vec::new();
            element.collect_descendants(&["Point"], &mut point_elements);

            let points: Ring = if point_elements.is_empty() {
                coordinate_pairs(element)
            } else {
                point_elements
                    .iter()
                    .filter_map(|p| coordinate_pairs(p).first().copied())
                    .collect()
            };
            (!points.is_empty()).then(|| Geometry::multi_point(points))
        }

        "MultiLineString" => {
            let mut line_elements = Vec::new();
            element.collect_descendants(&["LineString"], &mut line_elements);

            let lines: Vec<Ring> = if line_elements.is_empty() {
                let points = coordinate_pairs(element);
                if points.is_empty() {
                    Vec::new()
                } else {
                    vec![points]
                }
            } else {
                line_elements
                    .iter()
                    .map(|l| coordinate_pairs(l))
                    .filter(|l| !l.is_empty())
                    .collect()
            };
            (!lines.is_empty()).then(|| Geometry::multi_line_string(lines))
        }

        "MultiPolygon" | "MultiSurface" => {
            let mut polygon_elements = Vec::new();
            element.collect_descendants(&["Polygon", "Surface"], &mut polygon_elements);

            let polygons: Vec<Vec<Ring>> = polygon_elements
                .iter()
                .filter_map(|p| decode_rings(p))
                .collect();
            (!polygons.is_empty()).then(|| Geometry::multi_polygon(polygons))
        }

        _ => None,
    }
}

/// Collect a polygon's rings: first `LinearRing` is the outer boundary, the
/// rest are holes. A geometry element carrying a bare coordinate list (no
/// explicit ring) decodes as a single degenerate ring.
fn decode_rings(element: &XmlElement) -> Option<Vec<Ring>> {
    let mut ring_elements = Vec::new();
    element.collect_descendants(&["LinearRing"], &mut ring_elements);

    let mut rings: Vec<Ring> = ring_elements
        .iter()
        .map(|r| coordinate_pairs(r))
        .filter(|r| !r.is_empty())
        .collect();

    if rings.is_empty() {
        let own = coordinate_pairs(element);
        if !own.is_empty() {
            rings.push(own);
        }
    }

    (!rings.is_empty()).then_some(rings)
}

/// Extract coordinate pairs from a geometry element.
///
/// `posList` (flat space-separated numbers) is preferred; GML 3 point-style
/// `pos` elements come next; the legacy `coordinates` element (comma- or
/// space-separated pairs) is the last resort.
fn coordinate_pairs(element: &XmlElement) -> Vec<Position> {
    if let Some(pos_list) = element.find_self_or_descendant(&["posList"]) {
        return parse_coordinate_text(&pos_list.text_content());
    }

    let mut pos_elements = Vec::new();
    if element.is_named(&["pos"]) {
        pos_elements.push(element);
    } else {
        element.collect_descendants(&["pos"], &mut pos_elements);
    }
    if !pos_elements.is_empty() {
        return pos_elements
            .iter()
            .filter_map(|p| parse_coordinate_text(&p.text_content()).first().copied())
            .collect();
    }

    if let Some(coordinates) = element.find_self_or_descendant(&["coordinates"]) {
        return parse_coordinate_text(&coordinates.text_content());
    }

    Vec::new()
}

fn parse_coordinate_text(text: &str) -> Vec<Position> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut pairs = Vec::new();

    if tokens.iter().any(|t| t.contains(',')) {
        // "x,y x,y" tuples.
        for token in tokens {
            let numbers: Vec<f64> = token.split(',').filter_map(|s| s.parse().ok()).collect();
            if numbers.len() >= 2 {
                pairs.push(orient_pair(numbers[0], numbers[1]));
            }
        }
    } else {
        // Flat "x y x y" list.
        let numbers: Vec<f64> = tokens.iter().filter_map(|s| s.parse().ok()).collect();
        for chunk in numbers.chunks(2) {
            if let [a, b] = chunk {
                pairs.push(orient_pair(*a, *b));
            }
        }
    }

    pairs
}

/// Decide tuple order for one pair.
///
/// If exactly one of the two values can be a latitude (inside [-90, 90]),
/// assume it is one and return (lon, lat); otherwise preserve source order.
/// Near the equator both values are plausible latitudes and the source order
/// stands; viewport reconciliation covers that case.
fn orient_pair(first: f64, second: f64) -> Position {
    let first_in_range = first.abs() <= 90.0;
    let second_in_range = second.abs() <= 90.0;

    if first_in_range && !second_in_range {
        [second, first]
    } else {
        [first, second]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_pos_list() {
        let gml = r#"
            <wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0">
              <wfs:member>
                <app:city>
                  <app:name>Minsk</app:name>
                  <app:location>
                    <gml:Point><gml:posList>53.9 27.5</gml:posList></gml:Point>
                  </app:location>
                </app:city>
              </wfs:member>
            </wfs:FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        assert_eq!(fc.len(), 1);
        // Both values fit [-90, 90], so source order is preserved here;
        // viewport reconciliation flips it later.
        assert_eq!(
            fc.features[0].geometry,
            Geometry::point(53.9, 27.5)
        );
        assert_eq!(fc.features[0].properties.get("name").unwrap(), "Minsk");
    }

    #[test]
    fn test_pair_heuristic_reorders_out_of_range_lon() {
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <station>
                  <Point><pos>48.85 102.3</pos></Point>
                </station>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        // 102.3 cannot be a latitude, so 48.85 is one: reorder to (lon, lat).
        assert_eq!(fc.features[0].geometry, Geometry::point(102.3, 48.85));
    }

    #[test]
    fn test_legacy_coordinates_comma_pairs() {
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <road>
                  <LineString>
                    <coordinates>102.1,48.1 102.2,48.2 102.3,48.3</coordinates>
                  </LineString>
                </road>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        assert_eq!(
            fc.features[0].geometry,
            Geometry::line_string(vec![[102.1, 48.1], [102.2, 48.2], [102.3, 48.3]])
        );
    }

    #[test]
    fn test_polygon_with_hole() {
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <zone>
                  <Polygon>
                    <exterior><LinearRing>
                      <posList>0 0 0 10 10 10 10 0 0 0</posList>
                    </LinearRing></exterior>
                    <interior><LinearRing>
                      <posList>2 2 2 4 4 4 4 2 2 2</posList>
                    </LinearRing></interior>
                  </Polygon>
                </zone>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        match &fc.features[0].geometry {
            Geometry::Polygon { coordinates } => {
                assert_eq!(coordinates.len(), 2);
                assert_eq!(coordinates[0].len(), 5);
                assert_eq!(coordinates[1][0], [2.0, 2.0]);
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_surface_decodes_as_polygon() {
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <zone>
                  <Surface>
                    <patches><PolygonPatch><exterior><LinearRing>
                      <posList>0 0 0 10 10 10 0 0</posList>
                    </LinearRing></exterior></PolygonPatch></patches>
                  </Surface>
                </zone>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        assert!(matches!(
            fc.features[0].geometry,
            Geometry::Polygon { .. }
        ));
    }

    #[test]
    fn test_multi_surface_decodes_as_multi_polygon() {
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <zone>
                  <MultiSurface>
                    <surfaceMember><Surface><exterior><LinearRing>
                      <posList>0 0 0 1 1 1 0 0</posList>
                    </LinearRing></exterior></Surface></surfaceMember>
                    <surfaceMember><Surface><exterior><LinearRing>
                      <posList>5 5 5 6 6 6 5 5</posList>
                    </LinearRing></exterior></Surface></surfaceMember>
                  </MultiSurface>
                </zone>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        match &fc.features[0].geometry {
            Geometry::MultiPolygon { coordinates } => assert_eq!(coordinates.len(), 2),
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_polygon_without_explicit_ring() {
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <zone>
                  <Polygon><posList>0 0 0 1 1 1 0 0</posList></Polygon>
                </zone>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        match &fc.features[0].geometry {
            Geometry::Polygon { coordinates } => assert_eq!(coordinates.len(), 1),
            other => panic!("expected Polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_feature_members_plural_wrapper() {
        let gml = r#"
            <FeatureCollection>
              <featureMembers>
                <town><Point><posList>10.0 99.5</posList></Point></town>
                <town><Point><posList>11.0 99.6</posList></Point></town>
              </featureMembers>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        assert_eq!(fc.len(), 2);
    }

    #[test]
    fn test_properties_exclude_structural_elements() {
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <city>
                  <name>Omsk</name>
                  <population>1100000</population>
                  <geom><Point><posList>54.99 73.37</posList></Point></geom>
                </city>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        let props = &fc.features[0].properties;
        assert_eq!(props.get("name").unwrap(), "Omsk");
        assert_eq!(props.get("population").unwrap(), "1100000");
        assert!(!props.contains_key("geom"));
    }

    #[test]
    fn test_feature_without_geometry_dropped() {
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <city><name>Nowhere</name></city>
              </featureMember>
              <featureMember>
                <city><Point><posList>10 20</posList></Point></city>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        assert_eq!(fc.len(), 1);
    }

    #[test]
    fn test_empty_document_is_none() {
        let gml = r#"<FeatureCollection numberMatched="0"></FeatureCollection>"#;
        assert!(decode(gml).is_none());
    }

    #[test]
    fn test_malformed_document_is_none() {
        assert!(decode("<FeatureCollection><oops></FeatureCollection>").is_none());
        assert!(decode("plain text").is_none());
    }

    #[test]
    fn test_nan_coordinates_survive_to_sanitize() {
        // The decoder passes NaN through; sanitation drops the feature later.
        let gml = r#"
            <FeatureCollection>
              <featureMember>
                <city><Point><posList>NaN 53.9</posList></Point></city>
              </featureMember>
            </FeatureCollection>"#;

        let fc = decode(gml).unwrap();
        assert_eq!(fc.len(), 1);
        assert!(fc.sanitize().is_empty());
    }
}
