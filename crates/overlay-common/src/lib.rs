//! Common types shared across the WFS overlay crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod layer;

pub use bbox::BoundingBox;
pub use crs::AxisOrder;
pub use error::{OverlayError, OverlayResult};
pub use geometry::{Feature, FeatureCollection, Geometry, Position, Ring};
pub use layer::{OverlayLayer, WfsParams};
