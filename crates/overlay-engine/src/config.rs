//! Configuration for the overlay fetch scheduler.

use std::time::Duration;

/// Tunables for one overlay attachment.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Quiet period after the last viewport change before fetching.
    pub debounce: Duration,
    /// Maximum viewport area to request; larger viewports are shrunk around
    /// their center.
    pub max_area_km2: f64,
    /// Minimum spacing between the start of consecutive fetch cycles.
    pub min_request_spacing: Duration,
    /// First backoff step after a rate-limit-class failure (doubles per
    /// consecutive failure).
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
    /// Per-request HTTP timeout enforced by the transport.
    pub request_timeout: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(700),
            max_area_km2: 5000.0,
            min_request_spacing: Duration::from_millis(1200),
            initial_backoff: Duration::from_millis(2000),
            max_backoff: Duration::from_millis(30_000),
            request_timeout: Duration::from_secs(15),
        }
    }
}
