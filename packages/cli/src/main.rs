#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the transit coverage analyzer.
//!
//! Provides subcommands for running a full batch coverage analysis
//! over station and neighborhood `GeoJSON` layers (writing the
//! resulting snapshot as JSON) and for inspecting which stations
//! cover a single neighborhood.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use cityreach_cli_utils::IndicatifProgress;
use cityreach_coverage::{
    AnalysisOptions, AnalysisSnapshot, CoverageEngine, CoverageResult, Neighborhood, Station,
};
use clap::{Parser, Subcommand};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Analyze transit station coverage of city neighborhoods.
#[derive(Parser)]
#[command(name = "cityreach")]
#[command(about = "Analyze transit station coverage of city neighborhoods")]
struct Cli {
    /// Path to the stations `GeoJSON` layer (Point features).
    #[arg(long, default_value = "data/stations.geojson")]
    stations: PathBuf,

    /// Path to the neighborhoods `GeoJSON` layer (Polygon features).
    #[arg(long, default_value = "data/neighborhoods.geojson")]
    neighborhoods: PathBuf,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the full coverage analysis and print the ranking summary.
    Analyze {
        /// Owner key the snapshot is stored under.
        #[arg(long, default_value = "cli")]
        owner: String,

        /// Write the full snapshot as pretty-printed JSON to this file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override the candidate search radius in meters. Defaults to
        /// the largest catchment radius present in the station layer.
        #[arg(long)]
        max_radius: Option<f64>,
    },

    /// Show which stations cover a single neighborhood.
    Inspect {
        /// Neighborhood feature id to inspect.
        #[arg(long)]
        neighborhood_id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = cityreach_cli_utils::init_logger();
    let cli = Cli::parse();

    let stations = load_stations(&cli.stations)?;
    let neighborhoods = load_neighborhoods(&cli.neighborhoods)?;

    match cli.command {
        Commands::Analyze {
            owner,
            output,
            max_radius,
        } => {
            let engine = CoverageEngine::new();
            let options = AnalysisOptions {
                max_candidate_radius_m: max_radius,
                ..AnalysisOptions::default()
            };
            let progress = IndicatifProgress::analysis_bar(&multi, "Computing coverage");
            let cancel = AtomicBool::new(false);

            let snapshot = engine.compute_coverage(
                &owner,
                &stations,
                &neighborhoods,
                &options,
                progress.as_ref(),
                &cancel,
            )?;

            print_snapshot(&snapshot);

            if let Some(path) = output {
                fs::write(&path, serde_json::to_string_pretty(snapshot.as_ref())?)?;
                println!();
                println!("Snapshot written to {}", path.display());
            }
        }
        Commands::Inspect { neighborhood_id } => {
            let Some(neighborhood) = neighborhoods.iter().find(|n| n.id == neighborhood_id) else {
                return Err(format!("No neighborhood with id {neighborhood_id}").into());
            };
            let coverage =
                cityreach_coverage::compute_single_neighborhood_coverage(neighborhood, &stations)?;

            println!("{} ({})", neighborhood.name, neighborhood.id);
            println!("  Population: {}", neighborhood.population);
            println!("  Coverage:   {:.2}%", coverage.coverage_percentage);
            if coverage.station_ids.is_empty() {
                println!("  No station catchment overlaps this neighborhood");
            } else {
                println!("  Covered by {} station(s):", coverage.station_ids.len());
                for id in &coverage.station_ids {
                    let name = stations
                        .iter()
                        .find(|s| s.id == *id)
                        .map_or("unknown", |s| s.name.as_str());
                    println!("    {id}  {name}");
                }
            }
        }
    }

    Ok(())
}

fn load_stations(path: &PathBuf) -> Result<Vec<Station>, Box<dyn std::error::Error>> {
    let payload = fs::read_to_string(path)?;
    let collection = cityreach_layers::parse_collection(&payload)?;
    let dataset = path.display().to_string();
    Ok(cityreach_layers::parse_stations(&collection, &dataset)?)
}

fn load_neighborhoods(path: &PathBuf) -> Result<Vec<Neighborhood>, Box<dyn std::error::Error>> {
    let payload = fs::read_to_string(path)?;
    let collection = cityreach_layers::parse_collection(&payload)?;
    let dataset = path.display().to_string();
    Ok(cityreach_layers::parse_neighborhoods(&collection, &dataset)?)
}

fn print_snapshot(snapshot: &AnalysisSnapshot) {
    let meta = &snapshot.metadata;
    println!();
    println!("Coverage analysis for owner {}", snapshot.owner);
    println!("  Generated:     {}", meta.generated_at.to_rfc3339());
    println!("  Stations:      {}", meta.station_count);
    println!("  Neighborhoods: {}", meta.neighborhood_count);
    if meta.skipped_neighborhoods > 0 {
        println!(
            "  Skipped:       {} (invalid geometry)",
            meta.skipped_neighborhoods
        );
    }
    if meta.degenerate_intersections > 0 {
        println!(
            "  Degenerate:    {} intersections",
            meta.degenerate_intersections
        );
    }

    println!();
    println!("Best covered neighborhoods:");
    for result in snapshot.results.iter().take(5) {
        print_result_line(result, result.coverage_percentage, "%");
    }

    let stats = &snapshot.statistics;
    print_ranking("Most stations", &stats.top5_by_stations, |r| {
        format!("{} stations", r.stations_count)
    });
    print_ranking("Largest population", &stats.top5_by_population, |r| {
        format!("{} residents", r.population)
    });
    print_ranking(
        "Most uncovered residents",
        &stats.top5_by_uncovered_population,
        |r| format!("{} uncovered", r.uncovered_population),
    );

    println!();
    println!("Highest uncovered share:");
    for entry in &stats.top5_by_uncovered_population_percent {
        print_result_line(
            &entry.result,
            entry.uncovered_population_percent,
            "% uncovered",
        );
    }
}

fn print_ranking(
    title: &str,
    results: &[CoverageResult],
    detail: impl Fn(&CoverageResult) -> String,
) {
    println!();
    println!("{title}:");
    for result in results {
        println!(
            "  {:>6.2}%  {}  ({})",
            result.coverage_percentage,
            result.neighborhood_name,
            detail(result)
        );
    }
}

fn print_result_line(result: &CoverageResult, value: f64, unit: &str) {
    println!("  {value:>6.2}{unit}  {}", result.neighborhood_name);
}
