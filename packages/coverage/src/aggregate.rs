//! Aggregation of per-neighborhood results into an analysis snapshot.
//!
//! Sorts the canonical result list by coverage percentage descending
//! and precomputes the four top-5 ranking tables consumed by the
//! reporting surfaces.

use cityreach_coverage_models::{
    AnalysisSnapshot, CoverageResult, RunMetadata, SnapshotStatistics, UncoveredPercentEntry,
};

use crate::calculator::round2;

const RANKING_SIZE: usize = 5;

/// Assembles the complete snapshot for one run.
pub(crate) fn build_snapshot(
    owner: &str,
    mut results: Vec<CoverageResult>,
    metadata: RunMetadata,
) -> AnalysisSnapshot {
    results.sort_by(|a, b| b.coverage_percentage.total_cmp(&a.coverage_percentage));
    let statistics = build_statistics(&results);

    AnalysisSnapshot {
        owner: owner.to_string(),
        results,
        statistics,
        metadata,
    }
}

#[allow(clippy::cast_precision_loss)]
fn build_statistics(results: &[CoverageResult]) -> SnapshotStatistics {
    SnapshotStatistics {
        top5_by_stations: top_by(results, |r| r.stations_count as f64),
        top5_by_population: top_by(results, |r| r.population as f64),
        top5_by_uncovered_population: top_by(results, |r| r.uncovered_population as f64),
        top5_by_uncovered_population_percent: top_by_uncovered_percent(results),
    }
}

fn top_by(results: &[CoverageResult], key: impl Fn(&CoverageResult) -> f64) -> Vec<CoverageResult> {
    let mut ranked: Vec<CoverageResult> = results.to_vec();
    ranked.sort_by(|a, b| key(b).total_cmp(&key(a)));
    ranked.truncate(RANKING_SIZE);
    ranked
}

/// Ranks by uncovered-population share. Population-0 neighborhoods are
/// excluded so the ratio is always defined.
#[allow(clippy::cast_precision_loss)]
fn top_by_uncovered_percent(results: &[CoverageResult]) -> Vec<UncoveredPercentEntry> {
    let mut ranked: Vec<UncoveredPercentEntry> = results
        .iter()
        .filter(|r| r.population > 0)
        .map(|r| UncoveredPercentEntry {
            result: r.clone(),
            uncovered_population_percent: round2(
                r.uncovered_population as f64 / r.population as f64 * 100.0,
            ),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.uncovered_population_percent
            .total_cmp(&a.uncovered_population_percent)
    });
    ranked.truncate(RANKING_SIZE);
    ranked
}
