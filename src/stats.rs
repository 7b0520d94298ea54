//! Plot statistics for survey progress.
//!
//! Compares what has been plotted against the agronomic standard: triangular
//! planting at 8.5m spacing, 140 trees per hectare, 500m × 500m (25 ha) plots.
//! - Density and completion against the expected tree count
//! - Average spacing (all pairs on the map, nearest neighbours, and GPS pairs)
//! - Nearest trees to a selected tree, for the tree info sheet

use std::collections::BTreeMap;

use log::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{geo_utils, MapConfig, PlantedPoint, PointId, PointIndex};

/// Agronomic targets used to judge a plot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsConfig {
    /// GPS pairs farther apart than this (metres) are not neighbours (default: 50m)
    pub neighbor_cutoff_meters: f64,
    /// Standard planting distance (default: 8.5m)
    pub target_spacing_meters: f64,
    /// Below this average spacing the plot is too dense (default: 7m)
    pub min_good_spacing_meters: f64,
    /// Above this average spacing the plot is too sparse (default: 10m)
    pub max_good_spacing_meters: f64,
    /// Expected planting density (default: 140 trees/ha)
    pub trees_per_hectare: f64,
    /// Trees listed by [`nearest_neighbors`] on the info sheet (default: 3)
    pub nearest_count: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            neighbor_cutoff_meters: 50.0,
            target_spacing_meters: 8.5,
            min_good_spacing_meters: 7.0,
            max_good_spacing_meters: 10.0,
            trees_per_hectare: 140.0,
            nearest_count: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpacingStatus {
    TooClose,
    Good,
    TooFar,
}

impl SpacingStatus {
    pub fn classify(spacing_meters: f64, config: &StatsConfig) -> Self {
        if spacing_meters < config.min_good_spacing_meters {
            SpacingStatus::TooClose
        } else if spacing_meters > config.max_good_spacing_meters {
            SpacingStatus::TooFar
        } else {
            SpacingStatus::Good
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpacingStatus::TooClose => "Too close",
            SpacingStatus::Good => "Good",
            SpacingStatus::TooFar => "Too far",
        }
    }
}

/// Distance from a tree to one of its neighbours
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeighborDistance {
    pub id: PointId,
    pub label: String,
    pub distance_meters: f64,
}

/// Summary of one plot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlotStatistics {
    pub plot_id: String,
    pub tree_count: u32,
    /// Trees with a GPS fix
    pub gps_tree_count: u32,
    /// Trees per square map unit over the whole map
    pub density: f64,
    /// Mean planar distance over all tree pairs, in map units (0 below two trees)
    pub average_spacing: f64,
    /// Mean distance to each tree's nearest neighbour on the map, in metres
    pub nearest_spacing_meters: Option<f64>,
    /// Mean geodesic distance over GPS pairs closer than the neighbour cutoff
    pub gps_spacing_meters: Option<f64>,
    /// Judgement of `gps_spacing_meters`; `None` until enough GPS data exists
    pub spacing_status: Option<SpacingStatus>,
    /// Plot area covered by the map
    pub area_hectares: f64,
    pub expected_trees: u32,
    /// `tree_count` as a percentage of `expected_trees`
    pub completion_percentage: f64,
}

/// Statistics for the points of one plot.
///
/// `points` is expected to hold only this plot's trees; see [`summarize_plots`] for
/// mixed input.
pub fn plot_statistics(
    plot_id: &str,
    points: &[PlantedPoint],
    map_config: &MapConfig,
    stats_config: &StatsConfig,
) -> PlotStatistics {
    let tree_count = points.len() as u32;
    let gps_tree_count = points.iter().filter(|p| p.gps.is_some()).count() as u32;

    let density = geo_utils::density(points, 0.0, 0.0, map_config.map_width, map_config.map_height);
    let average_spacing = average_pair_spacing(points);
    let nearest_spacing_meters = nearest_spacing(points, map_config);
    let gps_spacing_meters = gps_spacing(points, stats_config);
    let spacing_status = gps_spacing_meters.map(|s| SpacingStatus::classify(s, stats_config));

    let area_hectares = (map_config.map_width * map_config.meters_per_unit)
        * (map_config.map_height * map_config.meters_per_unit)
        / 10_000.0;
    let expected_trees = (area_hectares * stats_config.trees_per_hectare).floor() as u32;
    let completion_percentage = if expected_trees > 0 {
        tree_count as f64 * 100.0 / expected_trees as f64
    } else {
        0.0
    };

    debug!(
        "Plot {}: {} trees ({} with GPS), {:.1}% of {}",
        plot_id, tree_count, gps_tree_count, completion_percentage, expected_trees
    );

    PlotStatistics {
        plot_id: plot_id.to_string(),
        tree_count,
        gps_tree_count,
        density,
        average_spacing,
        nearest_spacing_meters,
        gps_spacing_meters,
        spacing_status,
        area_hectares,
        expected_trees,
        completion_percentage,
    }
}

/// The `stats_config.nearest_count` trees closest to `target`, nearest first.
///
/// Distances are geodesic when both trees have GPS and scaled planar otherwise.
/// Ties keep input order.
pub fn nearest_neighbors(
    target: &PlantedPoint,
    points: &[PlantedPoint],
    map_config: &MapConfig,
    stats_config: &StatsConfig,
) -> Vec<NeighborDistance> {
    let mut neighbors: Vec<NeighborDistance> = points
        .iter()
        .filter(|p| p.id != target.id)
        .map(|p| NeighborDistance {
            id: p.id,
            label: p.label.clone(),
            distance_meters: geo_utils::point_distance_meters(target, p, map_config),
        })
        .collect();

    // Stable sort keeps input order among equal distances
    neighbors.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    neighbors.truncate(stats_config.nearest_count as usize);
    neighbors
}

/// Statistics for every plot in `points`, sorted by plot id.
pub fn summarize_plots(
    points: &[PlantedPoint],
    map_config: &MapConfig,
    stats_config: &StatsConfig,
) -> Vec<PlotStatistics> {
    group_by_plot(points)
        .into_iter()
        .map(|(plot_id, plot_points)| {
            plot_statistics(plot_id, &plot_points, map_config, stats_config)
        })
        .collect()
}

/// Parallel version of [`summarize_plots`]; one rayon task per plot.
#[cfg(feature = "parallel")]
pub fn summarize_plots_parallel(
    points: &[PlantedPoint],
    map_config: &MapConfig,
    stats_config: &StatsConfig,
) -> Vec<PlotStatistics> {
    let groups: Vec<(&str, Vec<PlantedPoint>)> = group_by_plot(points).into_iter().collect();

    // Indexed parallel iterator preserves the sorted plot order
    groups
        .par_iter()
        .map(|(plot_id, plot_points)| {
            plot_statistics(plot_id, plot_points, map_config, stats_config)
        })
        .collect()
}

// =============================================================================
// Helpers
// =============================================================================

fn group_by_plot(points: &[PlantedPoint]) -> BTreeMap<&str, Vec<PlantedPoint>> {
    let mut groups: BTreeMap<&str, Vec<PlantedPoint>> = BTreeMap::new();
    for point in points {
        groups.entry(point.plot_id.as_str()).or_default().push(point.clone());
    }
    groups
}

fn average_pair_spacing(points: &[PlantedPoint]) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0u64;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            total += a.planar.distance_to(&b.planar);
            pairs += 1;
        }
    }
    if pairs > 0 {
        total / pairs as f64
    } else {
        0.0
    }
}

fn nearest_spacing(points: &[PlantedPoint], map_config: &MapConfig) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let index = PointIndex::build(points);
    let distances: Vec<f64> = points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| index.k_nearest(&p.planar, 1, Some(i)).first().map(|&(_, d)| d))
        .collect();
    if distances.is_empty() {
        return None;
    }
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    Some(geo_utils::map_units_to_meters(mean, map_config))
}

fn gps_spacing(points: &[PlantedPoint], config: &StatsConfig) -> Option<f64> {
    let with_gps: Vec<_> = points.iter().filter_map(|p| p.gps.as_ref()).collect();
    if with_gps.len() < 2 {
        return None;
    }

    let mut total = 0.0;
    let mut pairs = 0u64;
    for (i, a) in with_gps.iter().enumerate() {
        for b in &with_gps[i + 1..] {
            let d = geo_utils::geodetic_distance(a, b);
            if d < config.neighbor_cutoff_meters {
                total += d;
                pairs += 1;
            }
        }
    }
    (pairs > 0).then(|| total / pairs as f64)
}
