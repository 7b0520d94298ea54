//! In-memory collection of planted points.
//!
//! Owned by the host (one per session), not a global. Enforces:
//! - labels are non-empty and unique within a plot
//! - planar positions are finite and inside the map extent
//! - every edit bumps `updated_at` and marks the point unsynced
//!
//! Timestamps are passed in by the caller (Unix milliseconds) so the registry stays
//! deterministic.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};

use crate::{GpsPoint, MapConfig, MapError, PlanarPoint, PlantedPoint, PointId};

/// Input for [`PlotRegistry::create`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewPoint {
    pub label: String,
    pub plot_id: String,
    pub planar: PlanarPoint,
    pub gps: Option<GpsPoint>,
    pub notes: Option<String>,
}

impl NewPoint {
    /// A manually placed point.
    pub fn manual(label: impl Into<String>, plot_id: impl Into<String>, planar: PlanarPoint) -> Self {
        Self {
            label: label.into(),
            plot_id: plot_id.into(),
            planar,
            gps: None,
            notes: None,
        }
    }

    pub fn with_gps(mut self, gps: GpsPoint) -> Self {
        self.gps = Some(gps);
        self
    }
}

#[derive(Debug, Clone)]
pub struct PlotRegistry {
    map_width: f64,
    map_height: f64,
    points: BTreeMap<PointId, PlantedPoint>,
    /// (plot_id, label) -> id
    labels: HashMap<(String, String), PointId>,
    next_id: PointId,
}

impl PlotRegistry {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            map_width: config.map_width,
            map_height: config.map_height,
            points: BTreeMap::new(),
            labels: HashMap::new(),
            next_id: 1,
        }
    }

    /// Add a point. Ids start at 1 and are never reused.
    pub fn create(&mut self, new: NewPoint, timestamp_ms: i64) -> Result<PointId, MapError> {
        let label = new.label.trim().to_string();
        if label.is_empty() {
            return Err(MapError::EmptyLabel);
        }
        self.check_position(&new.planar)?;
        self.check_label_free(&label, &new.plot_id, None)?;

        let id = self.next_id;
        self.next_id += 1;

        let point = PlantedPoint {
            id,
            label: label.clone(),
            plot_id: new.plot_id.clone(),
            planar: new.planar,
            gps: new.gps,
            notes: new.notes,
            created_at: timestamp_ms,
            updated_at: timestamp_ms,
            synced_at: None,
        };
        info!(
            "Created point {} '{}' in plot {} at ({:.1}, {:.1})",
            id, label, new.plot_id, new.planar.x, new.planar.y
        );
        self.labels.insert((new.plot_id, label), id);
        self.points.insert(id, point);
        Ok(id)
    }

    pub fn get(&self, id: PointId) -> Option<&PlantedPoint> {
        self.points.get(&id)
    }

    pub fn relabel(
        &mut self,
        id: PointId,
        label: impl Into<String>,
        timestamp_ms: i64,
    ) -> Result<(), MapError> {
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(MapError::EmptyLabel);
        }
        let plot_id = self.point(id)?.plot_id.clone();
        self.check_label_free(&label, &plot_id, Some(id))?;

        let point = self.point_mut(id)?;
        let old = std::mem::replace(&mut point.label, label.clone());
        touch(point, timestamp_ms);

        self.labels.remove(&(plot_id.clone(), old));
        self.labels.insert((plot_id, label), id);
        Ok(())
    }

    pub fn move_point(
        &mut self,
        id: PointId,
        planar: PlanarPoint,
        timestamp_ms: i64,
    ) -> Result<(), MapError> {
        self.check_position(&planar)?;
        let point = self.point_mut(id)?;
        point.planar = planar;
        touch(point, timestamp_ms);
        debug!("Moved point {} to ({:.1}, {:.1})", id, planar.x, planar.y);
        Ok(())
    }

    /// Set or clear the GPS fix of a point.
    pub fn set_gps(
        &mut self,
        id: PointId,
        gps: Option<GpsPoint>,
        timestamp_ms: i64,
    ) -> Result<(), MapError> {
        let point = self.point_mut(id)?;
        point.gps = gps;
        touch(point, timestamp_ms);
        Ok(())
    }

    pub fn annotate(
        &mut self,
        id: PointId,
        notes: Option<String>,
        timestamp_ms: i64,
    ) -> Result<(), MapError> {
        let point = self.point_mut(id)?;
        point.notes = notes.filter(|n| !n.trim().is_empty());
        touch(point, timestamp_ms);
        Ok(())
    }

    pub fn delete(&mut self, id: PointId) -> Result<PlantedPoint, MapError> {
        let point = self.points.remove(&id).ok_or(MapError::PointNotFound(id))?;
        self.labels.remove(&(point.plot_id.clone(), point.label.clone()));
        info!("Deleted point {} '{}' from plot {}", id, point.label, point.plot_id);
        Ok(point)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Points of a plot, ordered by label.
    pub fn points_in_plot(&self, plot_id: &str) -> Vec<&PlantedPoint> {
        let mut points: Vec<&PlantedPoint> =
            self.points.values().filter(|p| p.plot_id == plot_id).collect();
        points.sort_by(|a, b| a.label.cmp(&b.label));
        points
    }

    /// Owned snapshot of a plot, ready for [`MapScene::set_points`](crate::MapScene::set_points).
    pub fn snapshot(&self, plot_id: &str) -> Vec<PlantedPoint> {
        self.points_in_plot(plot_id).into_iter().cloned().collect()
    }

    /// Distinct plot ids, sorted.
    pub fn plot_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.points.values().map(|p| p.plot_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn exists(&self, label: &str, plot_id: &str) -> bool {
        self.find_by_label(label, plot_id).is_some()
    }

    pub fn find_by_label(&self, label: &str, plot_id: &str) -> Option<&PlantedPoint> {
        let id = self.labels.get(&(plot_id.to_string(), label.trim().to_string()))?;
        self.points.get(id)
    }

    /// Points whose label contains `term` (ASCII case-insensitive), newest first.
    pub fn search(&self, term: &str) -> Vec<&PlantedPoint> {
        let needle = term.trim().to_ascii_lowercase();
        let mut found: Vec<&PlantedPoint> = self
            .points
            .values()
            .filter(|p| p.label.to_ascii_lowercase().contains(&needle))
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        found
    }

    /// Points created within `[start_ms, end_ms]`, newest first.
    pub fn created_between(&self, start_ms: i64, end_ms: i64) -> Vec<&PlantedPoint> {
        let mut found: Vec<&PlantedPoint> = self
            .points
            .values()
            .filter(|p| p.created_at >= start_ms && p.created_at <= end_ms)
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        found
    }

    pub fn with_gps(&self) -> Vec<&PlantedPoint> {
        self.points.values().filter(|p| p.gps.is_some()).collect()
    }

    /// Points awaiting upload, oldest first.
    pub fn unsynced(&self) -> Vec<&PlantedPoint> {
        let mut pending: Vec<&PlantedPoint> =
            self.points.values().filter(|p| !p.is_synced()).collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending
    }

    pub fn mark_synced(&mut self, id: PointId, timestamp_ms: i64) -> Result<(), MapError> {
        self.point_mut(id)?.synced_at = Some(timestamp_ms);
        Ok(())
    }

    pub fn mark_all_synced(&mut self, timestamp_ms: i64) {
        for point in self.points.values_mut() {
            point.synced_at = Some(timestamp_ms);
        }
    }

    /// Drop points that have already been uploaded. Returns how many were removed.
    pub fn remove_synced(&mut self) -> usize {
        let synced: Vec<PointId> =
            self.points.values().filter(|p| p.is_synced()).map(|p| p.id).collect();
        for id in &synced {
            if let Some(point) = self.points.remove(id) {
                self.labels.remove(&(point.plot_id, point.label));
            }
        }
        synced.len()
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn count_in_plot(&self, plot_id: &str) -> usize {
        self.points.values().filter(|p| p.plot_id == plot_id).count()
    }

    pub fn unsynced_count(&self) -> usize {
        self.points.values().filter(|p| !p.is_synced()).count()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn point(&self, id: PointId) -> Result<&PlantedPoint, MapError> {
        self.points.get(&id).ok_or(MapError::PointNotFound(id))
    }

    fn point_mut(&mut self, id: PointId) -> Result<&mut PlantedPoint, MapError> {
        self.points.get_mut(&id).ok_or(MapError::PointNotFound(id))
    }

    fn check_position(&self, planar: &PlanarPoint) -> Result<(), MapError> {
        let inside = planar.x.is_finite()
            && planar.y.is_finite()
            && planar.x >= 0.0
            && planar.x <= self.map_width
            && planar.y >= 0.0
            && planar.y <= self.map_height;
        if inside {
            Ok(())
        } else {
            Err(MapError::InvalidCoordinate { x: planar.x, y: planar.y })
        }
    }

    fn check_label_free(
        &self,
        label: &str,
        plot_id: &str,
        owner: Option<PointId>,
    ) -> Result<(), MapError> {
        match self.labels.get(&(plot_id.to_string(), label.to_string())) {
            Some(existing) if Some(*existing) != owner => Err(MapError::DuplicateLabel {
                label: label.to_string(),
                plot_id: plot_id.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn touch(point: &mut PlantedPoint, timestamp_ms: i64) {
    point.updated_at = timestamp_ms;
    point.synced_at = None;
}
