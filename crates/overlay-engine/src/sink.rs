//! The vector layer collaborator boundary.

use overlay_common::FeatureCollection;

/// Receiver for rendered overlay features — the map's vector layer.
///
/// Contents are replaced wholesale on every successful fetch; there is no
/// incremental merge. `clear` removes everything (terminal failure, no data,
/// or detach).
pub trait VectorSink: Send + Sync {
    /// Replace the layer's entire contents with this collection.
    fn replace(&self, features: FeatureCollection);

    /// Remove all features from the layer.
    fn clear(&self);
}
