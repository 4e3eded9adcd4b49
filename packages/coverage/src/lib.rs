#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transit coverage analysis engine.
//!
//! Computes, per neighborhood, what fraction of its area (and
//! population) falls within walking distance of at least one transit
//! station: candidate stations are buffered into geodesic catchments,
//! intersected with the neighborhood, and the intersection pieces are
//! unioned so overlapping catchments are never double-counted.
//!
//! The batch entry point is [`CoverageEngine::compute_coverage`],
//! which fans neighborhoods out over a rayon worker pool and publishes
//! an atomic [`AnalysisSnapshot`] per data owner. Interactive queries
//! go through [`compute_single_neighborhood_coverage`].

mod aggregate;
mod calculator;
mod engine;
pub mod progress;

pub use calculator::compute_single_neighborhood_coverage;
pub use cityreach_coverage_models::{
    AnalysisSnapshot, CoverageResult, Neighborhood, RunMetadata, SingleNeighborhoodCoverage,
    SnapshotStatistics, Station,
};
pub use cityreach_geometry::GeometryError;
pub use engine::{AnalysisOptions, CoverageEngine};

use thiserror::Error;

/// Errors surfaced by the analysis engine.
///
/// Geometry-level problems with individual stations or neighborhoods
/// are recovered locally (skipped and counted in [`RunMetadata`]);
/// only dataset-level and lifecycle problems reach the caller.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Zero stations or zero neighborhoods supplied. Usually an
    /// upstream data-loading bug, so it is surfaced rather than
    /// answered with an empty snapshot.
    #[error("Empty dataset: {stations} stations, {neighborhoods} neighborhoods")]
    EmptyDataset {
        /// Stations supplied.
        stations: usize,
        /// Neighborhoods supplied.
        neighborhoods: usize,
    },

    /// A run for this owner is already in flight. The caller decides
    /// whether to queue, reject, or cancel-and-replace.
    #[error("A coverage analysis for owner {owner} is already running")]
    ConflictingRun {
        /// Owner whose run slot is occupied.
        owner: String,
    },

    /// The run observed its cancellation flag and stopped. The
    /// previous snapshot for the owner remains intact.
    #[error("Coverage analysis was cancelled")]
    Cancelled,

    /// Geometry-level failure from a single-neighborhood query.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
