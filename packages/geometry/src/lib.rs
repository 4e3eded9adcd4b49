#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geodesic geometry primitives and boolean operations.
//!
//! All measurements are ellipsoidal-aware (WGS84): areas in square
//! meters via [`geo::GeodesicArea`], point buffering via
//! [`geo::Geodesic`] destination. Boolean operations wrap
//! [`geo::BooleanOps`] with the defensive acceptance and fallback rules
//! the coverage calculator relies on.

pub mod ops;
pub mod primitives;

use thiserror::Error;

/// Errors produced while validating or measuring geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Input geometry has too few vertices, non-finite coordinates, or
    /// empty rings.
    #[error("Malformed geometry: {message}")]
    Malformed {
        /// Description of what was wrong with the input.
        message: String,
    },

    /// An operation returned a result with unrecognized structure or
    /// non-positive area.
    #[error("Degenerate geometry result: {message}")]
    DegenerateResult {
        /// Description of the degenerate outcome.
        message: String,
    },
}

impl GeometryError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub(crate) fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateResult {
            message: message.into(),
        }
    }
}
