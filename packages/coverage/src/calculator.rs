//! Per-neighborhood coverage computation.
//!
//! For one neighborhood: normalize its boundary, buffer each candidate
//! station into a geodesic catchment, intersect catchments with the
//! boundary, union the accepted intersection pieces, and derive the
//! covered area ratio. Stations are tracked in a set of distinct
//! identifiers so a station is never double-counted even when the
//! geometry backend reports multiple intersecting fragments.

use std::collections::BTreeSet;

use cityreach_coverage_models::{
    CoverageResult, DEFAULT_CATCHMENT_RADIUS_M, Neighborhood, SingleNeighborhoodCoverage, Station,
};
use cityreach_geometry::primitives::{
    DEFAULT_CATCHMENT_SEGMENTS, area_m2, geodesic_buffer, multi_area_m2, normalize,
};
use cityreach_geometry::{GeometryError, ops};
use cityreach_spatial::StationIndex;
use geo::Polygon;

/// Result of one neighborhood's computation inside a batch run.
pub(crate) enum Outcome {
    /// A usable result, plus the count of discarded degenerate pieces.
    Computed {
        result: CoverageResult,
        degenerate_intersections: usize,
    },
    /// Geometry was unusable; the neighborhood is excluded from the
    /// result set.
    SkippedInvalid,
    /// The run's cancellation flag was set before this neighborhood
    /// started.
    Cancelled,
}

/// Computes coverage for one neighborhood against the shared station
/// index. Never fails: unusable geometry is reported as
/// [`Outcome::SkippedInvalid`] and individual station failures are
/// logged and excluded.
pub(crate) fn compute_neighborhood(
    neighborhood: &Neighborhood,
    stations: &[Station],
    index: &StationIndex,
    max_candidate_radius_m: f64,
    catchment_segments: usize,
) -> Outcome {
    let boundary = match normalize(&neighborhood.geometry) {
        Ok(boundary) => boundary,
        Err(err) => {
            log::warn!(
                "Skipping neighborhood {} ({}): {err}",
                neighborhood.id,
                neighborhood.name
            );
            return Outcome::SkippedInvalid;
        }
    };
    let Ok(boundary_area) = area_m2(&boundary) else {
        log::warn!(
            "Skipping neighborhood {} ({}): boundary has no measurable area",
            neighborhood.id,
            neighborhood.name
        );
        return Outcome::SkippedInvalid;
    };

    let candidates = index.candidates(&boundary, max_candidate_radius_m);
    let coverage = coverage_of_boundary(
        &boundary,
        boundary_area,
        stations,
        &candidates,
        catchment_segments,
    );

    log::debug!(
        "Neighborhood {} ({}): {} intersecting stations, coverage ratio {:.4}",
        neighborhood.id,
        neighborhood.name,
        coverage.station_ids.len(),
        coverage.ratio
    );

    Outcome::Computed {
        result: build_result(neighborhood, coverage.ratio, coverage.station_ids.len()),
        degenerate_intersections: coverage.degenerate,
    }
}

/// Interactive single-neighborhood query: which stations cover this
/// neighborhood, and by how much, without running the full batch.
///
/// Station identifiers come back sorted for determinism.
///
/// # Errors
///
/// Returns [`GeometryError::Malformed`] if the neighborhood's boundary
/// cannot be normalized into a measurable polygon.
pub fn compute_single_neighborhood_coverage(
    neighborhood: &Neighborhood,
    stations: &[Station],
) -> Result<SingleNeighborhoodCoverage, GeometryError> {
    let boundary = normalize(&neighborhood.geometry)?;
    let boundary_area = area_m2(&boundary)?;

    let index = StationIndex::build(stations);
    let max_radius = stations
        .iter()
        .map(|s| s.radius_m)
        .fold(DEFAULT_CATCHMENT_RADIUS_M, f64::max);
    let candidates = index.candidates(&boundary, max_radius);

    let coverage = coverage_of_boundary(
        &boundary,
        boundary_area,
        stations,
        &candidates,
        DEFAULT_CATCHMENT_SEGMENTS,
    );

    Ok(SingleNeighborhoodCoverage {
        coverage_percentage: round2(coverage.ratio * 100.0),
        station_ids: coverage.station_ids.into_iter().collect(),
    })
}

/// Covered-area ratio and contributing stations for one boundary.
struct BoundaryCoverage {
    /// Covered fraction of the boundary area, clamped to [0, 1].
    ratio: f64,
    /// Distinct identifiers of stations with positive-area overlap.
    station_ids: BTreeSet<String>,
    /// Discarded degenerate pieces (failed buffers, zero-area
    /// intersections, failed unions).
    degenerate: usize,
}

fn coverage_of_boundary(
    boundary: &Polygon<f64>,
    boundary_area: f64,
    stations: &[Station],
    candidates: &[usize],
    catchment_segments: usize,
) -> BoundaryCoverage {
    let mut station_ids = BTreeSet::new();
    let mut pieces = Vec::new();
    let mut degenerate = 0_usize;

    for &position in candidates {
        let Some(station) = stations.get(position) else {
            continue;
        };

        let catchment = match geodesic_buffer(
            station.longitude,
            station.latitude,
            station.radius_m,
            catchment_segments,
        ) {
            Ok(catchment) => catchment,
            Err(err) => {
                log::warn!("Excluding station {}: {err}", station.id);
                degenerate += 1;
                continue;
            }
        };

        if !ops::intersects(&catchment, boundary) {
            continue;
        }

        // Adjacency alone does not count as coverage: the station is
        // recorded only once its intersection has positive area.
        match ops::intersection(&catchment, boundary) {
            Some(piece) => {
                station_ids.insert(station.id.clone());
                pieces.push(piece);
            }
            None => {
                log::debug!(
                    "Station {} touches the boundary with zero-area intersection",
                    station.id
                );
                degenerate += 1;
            }
        }
    }

    let ratio = if pieces.is_empty() {
        0.0
    } else {
        match ops::union_pieces(&pieces) {
            Ok(union) => (multi_area_m2(&union) / boundary_area).clamp(0.0, 1.0),
            Err(err) => {
                log::warn!("Union of {} intersection pieces failed: {err}", pieces.len());
                degenerate += 1;
                0.0
            }
        }
    };

    BoundaryCoverage {
        ratio,
        station_ids,
        degenerate,
    }
}

/// Builds the result row. The full-precision ratio drives the
/// population split; only the displayed percentage is rounded.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn build_result(neighborhood: &Neighborhood, ratio: f64, stations_count: usize) -> CoverageResult {
    let covered = ((neighborhood.population as f64) * ratio).round() as u64;
    let covered = covered.min(neighborhood.population);
    CoverageResult {
        neighborhood_id: neighborhood.id.clone(),
        neighborhood_name: neighborhood.name.clone(),
        admin_level: neighborhood.admin_level,
        population: neighborhood.population,
        coverage_percentage: round2(ratio * 100.0),
        stations_count,
        covered_population: covered,
        uncovered_population: neighborhood.population - covered,
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
