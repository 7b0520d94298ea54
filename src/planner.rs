//! # Harvest Path Planning
//!
//! Nearest-neighbour ordering of trees for a harvest walk.
//!
//! ## Algorithm
//!
//! Starting from the harvester's position, repeatedly walk to the closest unvisited
//! tree (planar distance). O(n²), which is fine for the tens to low hundreds of trees
//! scheduled per plot and day.
//!
//! ## Distances
//!
//! Two distances are kept apart:
//! - [`HarvestPlan::total_distance`] is measured strictly between consecutive trees in the
//!   visiting order. This is the figure reported to the harvester.
//! - [`HarvestPlan::approach_distance`] is the leg from the start position to the first
//!   tree. It is drawn on the map but not included in the reported distance.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{geo_utils, MapConfig, PlanarPoint, PlantedPoint};

/// An ordered harvest route.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarvestPlan {
    /// Where the walk starts (not part of `points`)
    pub start: PlanarPoint,
    /// Trees in visiting order
    pub points: Vec<PlantedPoint>,
    /// Map units between consecutive trees, excluding the approach leg
    pub total_distance: f64,
    /// Map units from `start` to the first tree (0 for an empty plan)
    pub approach_distance: f64,
}

impl HarvestPlan {
    /// Labels in visiting order.
    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    /// Route as display text, e.g. `"T1 → T7 → T3"`.
    pub fn summary(&self) -> String {
        self.labels().join(" → ")
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reported distance converted to metres.
    pub fn total_distance_meters(&self, config: &MapConfig) -> f64 {
        geo_utils::map_units_to_meters(self.total_distance, config)
    }
}

/// Order `points` by the nearest-neighbour heuristic, starting from `start`.
///
/// Equal distances are resolved in favour of the point that comes first in `points`,
/// so the result is deterministic for a given input order. Never fails: an empty
/// input gives an empty plan with zero distance.
///
/// # Example
///
/// ```rust
/// use plantation_map::{plan_greedy_tour, PlanarPoint, PlantedPoint};
///
/// let trees = vec![
///     PlantedPoint::new(1, "T1", "P1", PlanarPoint::new(100.0, 0.0)),
///     PlantedPoint::new(2, "T2", "P1", PlanarPoint::new(10.0, 0.0)),
///     PlantedPoint::new(3, "T3", "P1", PlanarPoint::new(50.0, 0.0)),
/// ];
/// let plan = plan_greedy_tour(PlanarPoint::new(0.0, 0.0), &trees);
/// assert_eq!(plan.summary(), "T2 → T3 → T1");
/// assert_eq!(plan.total_distance, 90.0);
/// assert_eq!(plan.approach_distance, 10.0);
/// ```
pub fn plan_greedy_tour(start: PlanarPoint, points: &[PlantedPoint]) -> HarvestPlan {
    let n = points.len();
    let mut visited = vec![false; n];
    let mut order: Vec<PlantedPoint> = Vec::with_capacity(n);
    let mut current = start;

    for _ in 0..n {
        let mut best: Option<(usize, f64)> = None;
        for (i, point) in points.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let dist = current.distance_to(&point.planar);
            // Strict comparison keeps the earliest candidate on ties
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((i, dist));
            }
        }

        let Some((next, _)) = best else { break };
        visited[next] = true;
        current = points[next].planar;
        order.push(points[next].clone());
    }

    let total_distance = path_distance(&order);
    let approach_distance = order
        .first()
        .map_or(0.0, |first| start.distance_to(&first.planar));

    debug!(
        "Planned harvest path: {} points, {:.1} units (+{:.1} approach)",
        order.len(),
        total_distance,
        approach_distance
    );

    HarvestPlan { start, points: order, total_distance, approach_distance }
}

/// Sum of planar distances between consecutive points.
pub fn path_distance(points: &[PlantedPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].planar.distance_to(&pair[1].planar))
        .sum()
}

// =============================================================================
// Harvest Schedule
// =============================================================================

/// A tree scheduled for harvest on a given day, as recorded on the survey form.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarvestAssignment {
    pub label: String,
    /// Harvest day (1..=3 on the survey form)
    pub day: u8,
}

/// Harvest days per tree label.
#[derive(Debug, Clone, Default)]
pub struct HarvestSchedule {
    by_day: HashMap<u8, Vec<String>>,
}

impl HarvestSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_assignments(assignments: Vec<HarvestAssignment>) -> Self {
        let mut schedule = Self::new();
        for assignment in assignments {
            schedule.assign(assignment.label, assignment.day);
        }
        schedule
    }

    /// Schedule `label` for `day`. A label may be scheduled on several days.
    pub fn assign(&mut self, label: impl Into<String>, day: u8) {
        let label = label.into();
        let labels = self.by_day.entry(day).or_default();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    /// Labels scheduled for `day`, in assignment order.
    pub fn labels_for_day(&self, day: u8) -> &[String] {
        self.by_day.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Points scheduled for any of `days`.
    ///
    /// Points are grouped in the order the days are given, then by their order in
    /// `points`. A point scheduled on several selected days appears once.
    pub fn select_for_days<'a>(
        &self,
        points: &'a [PlantedPoint],
        days: &[u8],
    ) -> Vec<&'a PlantedPoint> {
        let mut seen = HashSet::new();
        let mut selected = Vec::new();

        for day in days {
            let labels = self.labels_for_day(*day);
            for point in points {
                if labels.contains(&point.label) && seen.insert(point.id) {
                    selected.push(point);
                }
            }
        }

        debug!("Selected {} of {} trees for days {:?}", selected.len(), points.len(), days);
        selected
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
