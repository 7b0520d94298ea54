//! Summarise survey progress across several plots in parallel.
//!
//! Run with: cargo run --example plot_summary --features parallel

use std::time::Instant;

use plantation_map::stats::summarize_plots_parallel;
use plantation_map::{
    nearest_neighbors, summarize_plots, GpsPoint, MapConfig, PlanarPoint, PlantedPoint,
    StatsConfig,
};

fn main() {
    let map_config = MapConfig::default();
    let stats_config = StatsConfig::default();

    // Eight plots, each a partial grid of trees; even plots also carry GPS fixes
    let mut trees = Vec::new();
    let mut id = 1;
    for plot in 0..8 {
        let spacing = 28.0 + plot as f64 * 2.0;
        for row in 0..20 {
            for col in 0..(10 + plot * 3) {
                let x = 100.0 + col as f64 * spacing;
                let y = 100.0 + row as f64 * spacing;
                let mut tree =
                    PlantedPoint::new(id, format!("T{:04}", id), format!("P{}", plot + 1), PlanarPoint::new(x, y));
                if plot % 2 == 0 {
                    let lat = 3.215 - y * map_config.meters_per_unit / 111_000.0;
                    let lng = 101.670 + x * map_config.meters_per_unit / 110_800.0;
                    tree = tree.with_gps(GpsPoint::new(lat, lng));
                }
                trees.push(tree);
                id += 1;
            }
        }
    }

    println!("Plot Summary Example\n");
    println!("{} trees across 8 plots\n", trees.len());

    let start = Instant::now();
    let sequential = summarize_plots(&trees, &map_config, &stats_config);
    let sequential_time = start.elapsed();

    let start = Instant::now();
    let parallel = summarize_plots_parallel(&trees, &map_config, &stats_config);
    let parallel_time = start.elapsed();

    assert_eq!(sequential, parallel);

    for stats in &parallel {
        let spacing = match (stats.gps_spacing_meters, stats.spacing_status) {
            (Some(s), Some(status)) => format!("{:.1}m ({})", s, status.as_str()),
            _ => "Need more GPS data".to_string(),
        };
        println!(
            "{}: {} trees, {:.1}% of {}, nearest spacing {:.1}m, GPS spacing {}",
            stats.plot_id,
            stats.tree_count,
            stats.completion_percentage,
            stats.expected_trees,
            stats.nearest_spacing_meters.unwrap_or(0.0),
            spacing
        );
    }

    let first = &trees[0];
    println!("\nNearest trees to {}:", first.label);
    for neighbor in nearest_neighbors(first, &trees, &map_config, &stats_config) {
        println!("   {}: {:.1}m away", neighbor.label, neighbor.distance_meters);
    }

    println!("\nSequential: {:?}", sequential_time);
    println!("Parallel:   {:?}", parallel_time);
}
