//! Batch analysis engine with a per-owner snapshot store.
//!
//! Neighborhoods are embarrassingly parallel: each task reads the
//! shared station index and writes only its own outcome, so the batch
//! fans out over rayon and joins once before aggregation. Snapshots
//! are replaced, never mutated; a failed or cancelled run leaves the
//! previous snapshot in place.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use cityreach_coverage_models::{
    AnalysisSnapshot, DEFAULT_CATCHMENT_RADIUS_M, Neighborhood, RunMetadata, Station,
};
use cityreach_geometry::primitives::DEFAULT_CATCHMENT_SEGMENTS;
use cityreach_spatial::StationIndex;
use rayon::prelude::*;

use crate::calculator::{self, Outcome};
use crate::progress::ProgressCallback;
use crate::{CoverageError, aggregate};

/// Tunables for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Radius used to expand neighborhood bounding boxes when looking
    /// for candidate stations. Defaults to the largest catchment
    /// radius present in the dataset.
    pub max_candidate_radius_m: Option<f64>,
    /// Vertex count of generated catchment rings.
    pub catchment_segments: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_candidate_radius_m: None,
            catchment_segments: DEFAULT_CATCHMENT_SEGMENTS,
        }
    }
}

/// Coverage analysis engine holding the latest snapshot per owner.
///
/// Runs for the same owner are serialized: a second concurrent request
/// is rejected with [`CoverageError::ConflictingRun`] rather than
/// interleaving writes to the same snapshot slot.
#[derive(Default)]
pub struct CoverageEngine {
    snapshots: RwLock<BTreeMap<String, Arc<AnalysisSnapshot>>>,
    active_runs: Mutex<BTreeSet<String>>,
}

impl CoverageEngine {
    /// Creates an engine with no snapshots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the full coverage analysis for one owner's datasets and
    /// publishes the resulting snapshot.
    ///
    /// The cancellation flag is checked between neighborhoods; a
    /// cancelled run returns [`CoverageError::Cancelled`] and does not
    /// publish.
    ///
    /// # Errors
    ///
    /// * [`CoverageError::EmptyDataset`] if either input is empty.
    /// * [`CoverageError::ConflictingRun`] if a run for this owner is
    ///   already in flight.
    /// * [`CoverageError::Cancelled`] if the flag was set mid-run.
    pub fn compute_coverage(
        &self,
        owner: &str,
        stations: &[Station],
        neighborhoods: &[Neighborhood],
        options: &AnalysisOptions,
        progress: &dyn ProgressCallback,
        cancel: &AtomicBool,
    ) -> Result<Arc<AnalysisSnapshot>, CoverageError> {
        if stations.is_empty() || neighborhoods.is_empty() {
            return Err(CoverageError::EmptyDataset {
                stations: stations.len(),
                neighborhoods: neighborhoods.len(),
            });
        }
        let _slot = self.acquire_run_slot(owner)?;

        log::info!(
            "Computing coverage for owner {owner}: {} neighborhoods x {} stations",
            neighborhoods.len(),
            stations.len()
        );
        let index = StationIndex::build(stations);
        let max_radius = options.max_candidate_radius_m.unwrap_or_else(|| {
            stations
                .iter()
                .map(|s| s.radius_m)
                .fold(DEFAULT_CATCHMENT_RADIUS_M, f64::max)
        });
        progress.set_total(u64::try_from(neighborhoods.len()).unwrap_or(u64::MAX));

        let outcomes: Vec<Outcome> = neighborhoods
            .par_iter()
            .map(|neighborhood| {
                if cancel.load(Ordering::Relaxed) {
                    return Outcome::Cancelled;
                }
                let outcome = calculator::compute_neighborhood(
                    neighborhood,
                    stations,
                    &index,
                    max_radius,
                    options.catchment_segments,
                );
                progress.inc(1);
                outcome
            })
            .collect();

        if cancel.load(Ordering::Relaxed) {
            progress.finish_and_clear();
            log::warn!("Coverage run for owner {owner} cancelled; previous snapshot kept");
            return Err(CoverageError::Cancelled);
        }

        let mut results = Vec::with_capacity(outcomes.len());
        let mut skipped_neighborhoods = 0_usize;
        let mut degenerate_intersections = 0_usize;
        for outcome in outcomes {
            match outcome {
                Outcome::Computed {
                    result,
                    degenerate_intersections: discarded,
                } => {
                    degenerate_intersections += discarded;
                    results.push(result);
                }
                Outcome::SkippedInvalid => skipped_neighborhoods += 1,
                Outcome::Cancelled => {}
            }
        }

        let metadata = RunMetadata {
            generated_at: Utc::now(),
            station_count: stations.len(),
            neighborhood_count: neighborhoods.len(),
            skipped_neighborhoods,
            degenerate_intersections,
        };
        let snapshot = Arc::new(aggregate::build_snapshot(owner, results, metadata));

        self.snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(owner.to_string(), Arc::clone(&snapshot));

        progress.finish(format!(
            "Coverage computed for {} neighborhoods",
            snapshot.results.len()
        ));
        if skipped_neighborhoods > 0 || degenerate_intersections > 0 {
            log::warn!(
                "Run for owner {owner} skipped {skipped_neighborhoods} neighborhoods and discarded {degenerate_intersections} degenerate pieces"
            );
        }
        Ok(snapshot)
    }

    /// Latest published snapshot for an owner, if any run completed.
    #[must_use]
    pub fn latest_snapshot(&self, owner: &str) -> Option<Arc<AnalysisSnapshot>> {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner)
            .cloned()
    }

    fn acquire_run_slot(&self, owner: &str) -> Result<RunSlot<'_>, CoverageError> {
        let mut runs = self
            .active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !runs.insert(owner.to_string()) {
            return Err(CoverageError::ConflictingRun {
                owner: owner.to_string(),
            });
        }
        Ok(RunSlot {
            engine: self,
            owner: owner.to_string(),
        })
    }
}

/// Releases the owner's run slot when the run ends, however it ends.
struct RunSlot<'a> {
    engine: &'a CoverageEngine,
    owner: String,
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        self.engine
            .active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.owner);
    }
}
