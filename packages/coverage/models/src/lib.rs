#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Domain types for transit coverage analysis.
//!
//! Defines the normalized station and neighborhood records the engine
//! consumes, plus the per-neighborhood [`CoverageResult`] and the
//! whole-run [`AnalysisSnapshot`] it produces. Result types serialize
//! with the camelCase field names the reporting surfaces expect.

use chrono::{DateTime, Utc};
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Smallest walking-catchment radius accepted, in meters.
pub const MIN_CATCHMENT_RADIUS_M: f64 = 300.0;
/// Largest walking-catchment radius accepted, in meters.
pub const MAX_CATCHMENT_RADIUS_M: f64 = 500.0;
/// Radius applied when a station record carries none, in meters.
pub const DEFAULT_CATCHMENT_RADIUS_M: f64 = 400.0;

/// Transit mode served by a station. Informational only; the engine
/// treats all categories identically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationCategory {
    /// Bus stop.
    #[default]
    Bus,
    /// Tram stop.
    Tram,
    /// Metro station.
    Metro,
}

impl std::fmt::Display for StationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bus => write!(f, "bus"),
            Self::Tram => write!(f, "tram"),
            Self::Metro => write!(f, "metro"),
        }
    }
}

impl std::str::FromStr for StationCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bus" => Ok(Self::Bus),
            "tram" => Ok(Self::Tram),
            "metro" => Ok(Self::Metro),
            _ => Err(()),
        }
    }
}

/// OSM administrative level of a neighborhood boundary.
///
/// Level 8 is a city district, 10 a fine-grained sub-neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AdminLevel {
    /// District-scale boundary.
    Eight,
    /// Quarter-scale boundary.
    Nine,
    /// Sub-neighborhood boundary.
    Ten,
}

impl From<AdminLevel> for u8 {
    fn from(level: AdminLevel) -> Self {
        match level {
            AdminLevel::Eight => 8,
            AdminLevel::Nine => 9,
            AdminLevel::Ten => 10,
        }
    }
}

impl TryFrom<u8> for AdminLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(Self::Eight),
            9 => Ok(Self::Nine),
            10 => Ok(Self::Ten),
            other => Err(format!("unsupported admin level: {other}")),
        }
    }
}

/// A transit station with its walking-catchment radius.
///
/// Immutable for the duration of an analysis run; location or radius
/// changes require re-running coverage.
#[derive(Debug, Clone)]
pub struct Station {
    /// Identifier, unique within the owning dataset.
    pub id: String,
    /// Human-readable station name.
    pub name: String,
    /// Longitude in degrees (WGS84).
    pub longitude: f64,
    /// Latitude in degrees (WGS84).
    pub latitude: f64,
    /// Walking-catchment radius in meters, clamped to
    /// [`MIN_CATCHMENT_RADIUS_M`]..=[`MAX_CATCHMENT_RADIUS_M`].
    pub radius_m: f64,
    /// Transit mode served.
    pub category: StationCategory,
    /// Owning dataset identifier.
    pub dataset: String,
}

impl Station {
    /// Creates a station, clamping the radius to the supported range.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        longitude: f64,
        latitude: f64,
        radius_m: f64,
        category: StationCategory,
        dataset: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            longitude,
            latitude,
            radius_m: clamp_radius(radius_m),
            category,
            dataset: dataset.into(),
        }
    }
}

/// Clamps a catchment radius to the supported range, substituting the
/// default for non-finite values.
#[must_use]
pub fn clamp_radius(radius_m: f64) -> f64 {
    if radius_m.is_finite() {
        radius_m.clamp(MIN_CATCHMENT_RADIUS_M, MAX_CATCHMENT_RADIUS_M)
    } else {
        DEFAULT_CATCHMENT_RADIUS_M
    }
}

/// A residential neighborhood boundary with population metadata.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    /// Identifier, unique within the owning dataset.
    pub id: String,
    /// Human-readable neighborhood name.
    pub name: String,
    /// Boundary geometry in geographic coordinates (WGS84).
    pub geometry: MultiPolygon<f64>,
    /// Resident population (0 when unknown).
    pub population: u64,
    /// OSM administrative level, when known.
    pub admin_level: Option<AdminLevel>,
    /// Owning dataset identifier.
    pub dataset: String,
}

/// Per-neighborhood outcome of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageResult {
    /// Neighborhood identifier.
    pub neighborhood_id: String,
    /// Neighborhood name.
    pub neighborhood_name: String,
    /// Administrative level, when known.
    pub admin_level: Option<AdminLevel>,
    /// Resident population.
    pub population: u64,
    /// Covered share of the neighborhood area, in percent,
    /// rounded to 2 decimals and clamped to [0, 100].
    pub coverage_percentage: f64,
    /// Count of distinct stations whose catchment overlaps the
    /// neighborhood with positive area.
    pub stations_count: usize,
    /// Population within walking distance of at least one station.
    pub covered_population: u64,
    /// Population outside every station's catchment.
    pub uncovered_population: u64,
}

/// A [`CoverageResult`] augmented with the uncovered-population share,
/// used by the uncovered-percentage ranking (population-0 rows are
/// excluded from that ranking).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncoveredPercentEntry {
    /// The underlying result row.
    #[serde(flatten)]
    pub result: CoverageResult,
    /// `uncoveredPopulation / population`, in percent.
    pub uncovered_population_percent: f64,
}

/// Precomputed top-5 ranking tables for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStatistics {
    /// Top 5 by count of intersecting stations.
    pub top5_by_stations: Vec<CoverageResult>,
    /// Top 5 by resident population.
    pub top5_by_population: Vec<CoverageResult>,
    /// Top 5 by uncovered population.
    pub top5_by_uncovered_population: Vec<CoverageResult>,
    /// Top 5 by uncovered-population share (population > 0 only).
    pub top5_by_uncovered_population_percent: Vec<UncoveredPercentEntry>,
}

/// Observability counters for one analysis run.
///
/// Distinguishes "0% coverage" from "this neighborhood's geometry was
/// unusable": skipped entities never appear in the result rows but are
/// counted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Stations supplied to the run.
    pub station_count: usize,
    /// Neighborhoods supplied to the run.
    pub neighborhood_count: usize,
    /// Neighborhoods rejected for invalid geometry.
    pub skipped_neighborhoods: usize,
    /// Intersection/union results discarded as degenerate
    /// (unrecognized structure or non-positive area).
    pub degenerate_intersections: usize,
}

/// Complete, atomic result of one coverage-analysis run for one owner.
///
/// Never partially updated; a new run produces a new snapshot that
/// supersedes the previous one for the same owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    /// Data owner this snapshot belongs to.
    pub owner: String,
    /// Per-neighborhood results, sorted by coverage percentage
    /// descending.
    pub results: Vec<CoverageResult>,
    /// Top-5 ranking tables.
    pub statistics: SnapshotStatistics,
    /// Run observability counters.
    pub metadata: RunMetadata,
}

/// Answer to an interactive single-neighborhood query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleNeighborhoodCoverage {
    /// Covered share of the neighborhood area, in percent.
    pub coverage_percentage: f64,
    /// Identifiers of the stations whose catchment overlaps the
    /// neighborhood, sorted for determinism.
    pub station_ids: Vec<String>,
}
