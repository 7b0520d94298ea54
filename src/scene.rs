//! # Map Scene
//!
//! State behind the virtual map view: the plotted trees, the harvest path overlay,
//! the user's position marker, the selection and the viewport.
//!
//! The scene is plain data mutated through its methods. Every change bumps
//! [`MapScene::revision`], which the host uses as its re-render signal, and
//! [`render_scene`](crate::render_scene) turns the current state into draw commands.
//!
//! ## Taps
//!
//! [`MapScene::handle_tap`] resolves a screen tap against the points first, then the map
//! extent:
//!
//! | Tap lands | Selection | Event |
//! |-----------|-----------|-------|
//! | within touch tolerance of a point | that point | [`MapEvent::PointSelected`] |
//! | elsewhere inside the map | cleared | [`MapEvent::PlacementRequested`] |
//! | outside the map | unchanged | none |
//!
//! Events are returned and also delivered to every registered [`MapEventListener`].

use log::{debug, info};

use crate::{
    geo_utils, GpsPoint, MapConfig, MapError, PlanarPoint, PlantedPoint, PlotBounds, PointId,
    PointIndex, Viewport,
};

/// Something the user did on the map that the host should react to.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MapEvent {
    /// An existing point was tapped.
    PointSelected { id: PointId },
    /// Empty map space was tapped; the host may place a new point at `(x, y)`.
    PlacementRequested { x: f64, y: f64 },
}

/// Observer for map events.
///
/// Implemented for any `FnMut(&MapEvent)`, so a closure can be registered directly.
pub trait MapEventListener {
    fn on_map_event(&mut self, event: &MapEvent);
}

impl<F: FnMut(&MapEvent)> MapEventListener for F {
    fn on_map_event(&mut self, event: &MapEvent) {
        self(event)
    }
}

/// The user's position on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionMarker {
    pub planar: PlanarPoint,
    /// Reported horizontal accuracy in metres
    pub accuracy_m: f64,
    /// Fix the marker was derived from, if it came from GPS
    pub gps: Option<GpsPoint>,
}

/// Points, overlays, selection and viewport of one map screen.
pub struct MapScene {
    config: MapConfig,
    points: Vec<PlantedPoint>,
    index: PointIndex,
    path: Vec<PlantedPoint>,
    current_position: Option<PositionMarker>,
    selected: Option<PointId>,
    viewport: Viewport,
    listeners: Vec<Box<dyn MapEventListener>>,
    revision: u64,
}

impl MapScene {
    /// Empty scene for a `width` × `height` pixel view.
    pub fn new(config: MapConfig, width: f64, height: f64) -> Self {
        let viewport = Viewport::new(&config, width, height);
        Self {
            config,
            points: Vec::new(),
            index: PointIndex::default(),
            path: Vec::new(),
            current_position: None,
            selected: None,
            viewport,
            listeners: Vec::new(),
            revision: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn points(&self) -> &[PlantedPoint] {
        &self.points
    }

    pub fn path(&self) -> &[PlantedPoint] {
        &self.path
    }

    pub fn current_position(&self) -> Option<&PositionMarker> {
        self.current_position.as_ref()
    }

    pub fn selected(&self) -> Option<PointId> {
        self.selected
    }

    pub fn selected_point(&self) -> Option<&PlantedPoint> {
        let id = self.selected?;
        self.points.iter().find(|p| p.id == id)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Incremented on every state change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 1-based position of `id` in the current path.
    pub fn path_order(&self, id: PointId) -> Option<usize> {
        self.path.iter().position(|p| p.id == id).map(|i| i + 1)
    }

    // -------------------------------------------------------------------------
    // State replacement
    // -------------------------------------------------------------------------

    /// Replace the plotted points wholesale.
    ///
    /// The selection survives only if the selected point is still present.
    pub fn set_points(&mut self, points: Vec<PlantedPoint>) {
        self.index = PointIndex::build(&points);
        self.points = points;
        if let Some(id) = self.selected {
            if !self.points.iter().any(|p| p.id == id) {
                self.selected = None;
            }
        }
        debug!("Scene loaded {} points", self.points.len());
        self.touch();
    }

    /// Replace the path overlay; an empty list clears it.
    pub fn set_path(&mut self, path: Vec<PlantedPoint>) {
        self.path = path;
        self.touch();
    }

    pub fn clear_path(&mut self) {
        self.set_path(Vec::new());
    }

    pub fn set_current_position(&mut self, marker: Option<PositionMarker>) {
        self.current_position = marker;
        self.touch();
    }

    /// Move the position marker to a GPS fix.
    ///
    /// On error (degenerate bounds, non-finite fix) the previous marker is kept.
    pub fn apply_fix(
        &mut self,
        gps: GpsPoint,
        accuracy_m: f64,
        bounds: &PlotBounds,
    ) -> Result<PlanarPoint, MapError> {
        let planar = geo_utils::gps_to_map(&gps, bounds, &self.config)?;
        self.set_current_position(Some(PositionMarker { planar, accuracy_m, gps: Some(gps) }));
        Ok(planar)
    }

    /// Select a point by id, or clear the selection with `None`.
    ///
    /// Returns `false` (and leaves the selection alone) for an unknown id.
    pub fn select(&mut self, id: Option<PointId>) -> bool {
        if let Some(id) = id {
            if !self.points.iter().any(|p| p.id == id) {
                return false;
            }
        }
        self.selected = id;
        self.touch();
        true
    }

    pub fn add_listener(&mut self, listener: Box<dyn MapEventListener>) {
        self.listeners.push(listener);
    }

    // -------------------------------------------------------------------------
    // Hit testing & gestures
    // -------------------------------------------------------------------------

    /// Nearest point within the touch tolerance of a world position.
    ///
    /// The tolerance is `touch_tolerance / scale` map units, so it is constant on
    /// screen at every zoom level. Equal distances resolve to the earlier point.
    pub fn hit_test(&self, world_x: f64, world_y: f64) -> Option<&PlantedPoint> {
        let tolerance = self.config.touch_tolerance / self.viewport.scale();
        self.index
            .nearest_within(&PlanarPoint::new(world_x, world_y), tolerance)
            .and_then(|idx| self.points.get(idx))
    }

    /// Resolve a single tap at screen coordinates.
    pub fn handle_tap(&mut self, screen_x: f64, screen_y: f64) -> Option<MapEvent> {
        let world = self.viewport.screen_to_world(screen_x, screen_y);

        let event = if let Some(id) = self.hit_test(world.x, world.y).map(|p| p.id) {
            self.selected = Some(id);
            MapEvent::PointSelected { id }
        } else if self.config.contains(world.x, world.y) {
            self.selected = None;
            MapEvent::PlacementRequested { x: world.x, y: world.y }
        } else {
            debug!("Tap outside map at ({:.1}, {:.1}) ignored", world.x, world.y);
            return None;
        };

        info!("Map event: {:?}", event);
        self.touch();
        for listener in &mut self.listeners {
            listener.on_map_event(&event);
        }
        Some(event)
    }

    /// Reset zoom and pan, and clear the selection.
    pub fn handle_double_tap(&mut self) {
        self.viewport.double_tap();
        self.selected = None;
        self.touch();
    }

    pub fn pinch(&mut self, factor: f64, focal_x: f64, focal_y: f64) {
        self.viewport.pinch(factor, focal_x, focal_y);
        self.touch();
    }

    pub fn drag(&mut self, dx: f64, dy: f64) {
        self.viewport.drag(dx, dy);
        self.touch();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
        self.touch();
    }

    /// Centre the view on a point. Returns `false` for an unknown id.
    pub fn center_on_point(&mut self, id: PointId) -> bool {
        let Some(planar) = self.points.iter().find(|p| p.id == id).map(|p| p.planar) else {
            return false;
        };
        self.viewport.center_on(&planar);
        self.touch();
        true
    }

    /// Centre the view on the user's position. Returns `false` without a position.
    pub fn center_on_position(&mut self) -> bool {
        let Some(planar) = self.current_position.map(|m| m.planar) else {
            return false;
        };
        self.viewport.center_on(&planar);
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
