//! Viewport-driven WFS feature overlay engine.
//!
//! Watches a map viewport, fetches vector features from a WFS endpoint whose
//! protocol dialect is discovered by trial, and hands decoded geometry to a
//! vector layer sink. Debounces viewport churn, deduplicates identical
//! viewports, keeps at most one fetch in flight, and backs off on rate
//! limits.

pub mod config;
pub mod scheduler;
pub mod sink;
pub mod transport;

pub use config::OverlayConfig;
pub use scheduler::WfsOverlay;
pub use sink::VectorSink;
pub use transport::{FeatureTransport, ReqwestTransport};
