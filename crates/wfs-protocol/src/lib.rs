//! WFS GetFeature protocol support.
//!
//! Covers the protocol-variance half of the overlay engine: decoding GML
//! feature collections, classifying raw HTTP responses (including exception
//! documents served with HTTP 200), reconciling ambiguous coordinate axis
//! order against the requesting viewport, and enumerating request parameter
//! combinations for servers whose exact dialect is unknown.

pub mod axis;
pub mod classify;
pub mod gml;
pub mod request;
pub mod xml;

pub use classify::{parse_features, RawResponse};
pub use request::{build_attempts, AttemptParameters, TypeNameKey};
