#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial candidate index for coverage analysis.
//!
//! Builds an R-tree over station points and answers "which stations
//! could plausibly cover this neighborhood" by querying the
//! neighborhood's bounding box expanded outward by the largest
//! catchment radius. This is a coarse filter: false positives are
//! re-checked by the geometry layer, false negatives would be a bug.

use cityreach_coverage_models::Station;
use geo::{BoundingRect, Polygon};
use rstar::{AABB, RTree, RTreeObject};

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Safety factor applied to the meters-to-degrees conversion so the
/// expanded envelope can never undershoot the true catchment reach.
const ENVELOPE_MARGIN: f64 = 1.05;

/// A station point stored in the R-tree with its slice position.
struct StationEntry {
    /// Position in the station slice the index was built from.
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for StationEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree over station points.
///
/// Constructed once per analysis run and shared read-only across all
/// per-neighborhood tasks.
pub struct StationIndex {
    tree: RTree<StationEntry>,
    station_count: usize,
}

impl StationIndex {
    /// Builds the index from a station slice. Stations with non-finite
    /// coordinates are left out (and logged); they can never intersect
    /// anything.
    #[must_use]
    pub fn build(stations: &[Station]) -> Self {
        let mut entries = Vec::with_capacity(stations.len());
        for (position, station) in stations.iter().enumerate() {
            if !station.longitude.is_finite() || !station.latitude.is_finite() {
                log::warn!(
                    "Station {} has non-finite coordinates; excluded from index",
                    station.id
                );
                continue;
            }
            entries.push(StationEntry {
                position,
                envelope: AABB::from_point([station.longitude, station.latitude]),
            });
        }
        log::debug!("Indexed {} of {} stations", entries.len(), stations.len());
        Self {
            tree: RTree::bulk_load(entries),
            station_count: stations.len(),
        }
    }

    /// Returns slice positions of stations whose point falls inside the
    /// neighborhood's bounding box expanded by `max_radius_m` meters.
    ///
    /// Falls back to every station when the neighborhood has no
    /// bounding box (degenerate geometry is caught later by the
    /// calculator); skipping the neighborhood here would turn a coarse
    /// filter into a correctness bug.
    #[must_use]
    pub fn candidates(&self, neighborhood: &Polygon<f64>, max_radius_m: f64) -> Vec<usize> {
        let Some(bounds) = neighborhood.bounding_rect() else {
            log::warn!("Neighborhood has no bounding box; scanning all stations");
            return (0..self.station_count).collect();
        };

        let widest_lat = bounds.min().y.abs().max(bounds.max().y.abs());
        // cos() shrinks toward the poles; keep the divisor away from 0
        // so high-latitude queries degrade to a wide scan, not a miss.
        let lat_cos = widest_lat.to_radians().cos().max(0.01);
        let lat_pad = max_radius_m / METERS_PER_DEGREE * ENVELOPE_MARGIN;
        let lon_pad = max_radius_m / (METERS_PER_DEGREE * lat_cos) * ENVELOPE_MARGIN;

        let query = AABB::from_corners(
            [bounds.min().x - lon_pad, bounds.min().y - lat_pad],
            [bounds.max().x + lon_pad, bounds.max().y + lat_pad],
        );

        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.position)
            .collect()
    }

    /// Number of stations in the slice the index was built from,
    /// including stations excluded for non-finite coordinates: the
    /// full-scan fallback spans the whole slice, and excluded
    /// positions are harmless there because the geometry layer
    /// rejects their coordinates.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.station_count
    }

    /// True when the index was built from an empty slice.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.station_count == 0
    }
}

#[cfg(test)]
mod tests {
    use cityreach_coverage_models::StationCategory;
    use geo::LineString;

    use super::*;

    fn station(id: &str, longitude: f64, latitude: f64) -> Station {
        Station::new(id, id, longitude, latitude, 400.0, StationCategory::Bus, "test")
    }

    fn square(west: f64, south: f64, side_deg: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (west, south),
                (west + side_deg, south),
                (west + side_deg, south + side_deg),
                (west, south + side_deg),
                (west, south),
            ]),
            Vec::new(),
        )
    }

    #[test]
    fn keeps_nearby_stations_and_drops_distant_ones() {
        let stations = vec![
            station("inside", 13.405, 52.505),
            // ~300 m west of the square's edge, within a 400 m reach.
            station("near", 13.3955, 52.505),
            // Several kilometers away.
            station("far", 13.50, 52.60),
        ];
        let index = StationIndex::build(&stations);
        let hood = square(13.40, 52.50, 0.01);

        let candidates = index.candidates(&hood, 400.0);
        assert!(candidates.contains(&0));
        assert!(candidates.contains(&1));
        assert!(!candidates.contains(&2));
    }

    #[test]
    fn falls_back_to_full_scan_without_bounding_box() {
        let stations = vec![station("a", 13.4, 52.5), station("b", 13.5, 52.6)];
        let index = StationIndex::build(&stations);
        let empty = Polygon::new(LineString::new(Vec::new()), Vec::new());

        let candidates = index.candidates(&empty, 400.0);
        assert_eq!(candidates, vec![0, 1]);
    }

    #[test]
    fn excludes_stations_with_bad_coordinates() {
        let stations = vec![station("ok", 13.405, 52.505), station("nan", f64::NAN, 52.5)];
        let index = StationIndex::build(&stations);
        let hood = square(13.40, 52.50, 0.01);

        let candidates = index.candidates(&hood, 400.0);
        assert_eq!(candidates, vec![0]);
    }

    #[test]
    fn len_spans_the_source_slice_including_excluded_stations() {
        let stations = vec![station("ok", 13.4, 52.5), station("nan", f64::NAN, 52.5)];
        let index = StationIndex::build(&stations);
        assert_eq!(index.len(), 2);

        // The full-scan fallback covers the same range.
        let empty = Polygon::new(LineString::new(Vec::new()), Vec::new());
        assert_eq!(index.candidates(&empty, 400.0), vec![0, 1]);
    }

    #[test]
    fn empty_index_reports_empty() {
        let index = StationIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }
}
