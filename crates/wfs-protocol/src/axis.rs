//! Viewport-overlap axis reconciliation.
//!
//! Last line of defence against servers that advertise one SRS but serve
//! coordinates in the other axis order. Independent of the per-pair
//! heuristic applied during GML decoding.

use overlay_common::{BoundingBox, FeatureCollection};

/// Swap every coordinate pair in the collection iff the as-stored
/// interpretation's bounds do not overlap the requesting viewport but the
/// swapped interpretation's bounds do. Returns whether a swap happened.
///
/// When neither interpretation overlaps the viewport the data is left
/// untouched; rendering off-screen geometry is an accepted edge case, not a
/// failure.
pub fn reconcile(collection: &mut FeatureCollection, viewport: &BoundingBox) -> bool {
    let Some((min_x, min_y, max_x, max_y)) = coordinate_extent(collection) else {
        return false;
    };

    // Stored pairs are (x=lon, y=lat) if the order is right.
    let as_stored = BoundingBox::new(min_y, min_x, max_y, max_x);
    // If they are really (lat, lon), x holds latitude and y longitude.
    let swapped = BoundingBox::new(min_x, min_y, max_x, max_y);

    if !as_stored.intersects(viewport) && swapped.intersects(viewport) {
        collection.swap_axes();
        return true;
    }
    false
}

/// Min/max of raw stored x and y across all leaf coordinates.
fn coordinate_extent(collection: &FeatureCollection) -> Option<(f64, f64, f64, f64)> {
    let mut extent: Option<(f64, f64, f64, f64)> = None;
    collection.each_position(&mut |p| {
        let e = extent.get_or_insert((p[0], p[1], p[0], p[1]));
        e.0 = e.0.min(p[0]);
        e.1 = e.1.min(p[1]);
        e.2 = e.2.max(p[0]);
        e.3 = e.3.max(p[1]);
    });
    extent
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_common::{Feature, Geometry};

    fn collection_of(geometry: Geometry) -> FeatureCollection {
        FeatureCollection::new(vec![Feature::new(geometry)])
    }

    #[test]
    fn test_swaps_lat_lon_point_into_viewport() {
        // Stored as (lat, lon): the GML pair heuristic could not tell because
        // both values fit [-90, 90].
        let mut fc = collection_of(Geometry::point(53.9, 27.5));
        let viewport = BoundingBox::new(53.0, 27.0, 54.0, 28.0);

        assert!(reconcile(&mut fc, &viewport));
        assert_eq!(fc.features[0].geometry, Geometry::point(27.5, 53.9));
    }

    #[test]
    fn test_keeps_correct_order() {
        let mut fc = collection_of(Geometry::point(27.5, 53.9));
        let viewport = BoundingBox::new(53.0, 27.0, 54.0, 28.0);

        assert!(!reconcile(&mut fc, &viewport));
        assert_eq!(fc.features[0].geometry, Geometry::point(27.5, 53.9));
    }

    #[test]
    fn test_no_overlap_either_way_leaves_data() {
        let mut fc = collection_of(Geometry::point(10.0, 10.0));
        let viewport = BoundingBox::new(53.0, 27.0, 54.0, 28.0);

        assert!(!reconcile(&mut fc, &viewport));
        assert_eq!(fc.features[0].geometry, Geometry::point(10.0, 10.0));
    }

    #[test]
    fn test_empty_collection_untouched() {
        let mut fc = FeatureCollection::default();
        let viewport = BoundingBox::new(53.0, 27.0, 54.0, 28.0);
        assert!(!reconcile(&mut fc, &viewport));
    }

    #[test]
    fn test_swap_applies_to_all_features() {
        let mut fc = FeatureCollection::new(vec![
            Feature::new(Geometry::point(53.9, 27.5)),
            Feature::new(Geometry::line_string(vec![[53.1, 27.1], [53.2, 27.2]])),
        ]);
        let viewport = BoundingBox::new(53.0, 27.0, 54.0, 28.0);

        assert!(reconcile(&mut fc, &viewport));
        assert_eq!(
            fc.features[1].geometry,
            Geometry::line_string(vec![[27.1, 53.1], [27.2, 53.2]])
        );
    }
}
