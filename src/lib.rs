//! # Plantation Map
//!
//! Headless core of a virtual plantation map used by surveyors and harvesters in the field.
//!
//! This library provides:
//! - GPS ↔ planar map coordinate conversion for a bounded 2000 × 2000 map
//! - Nearest-neighbour harvest path planning
//! - Pan/zoom viewport handling, hit-testing and tap dispatch
//! - Render-ready draw lists, plot statistics and a last-write-wins location feed
//!
//! ## Features
//!
//! - **`location`** (default) - Positioning feed backed by `tokio::sync::watch`
//! - **`parallel`** - Multi-plot statistics with rayon
//! - **`serde`** - `Serialize`/`Deserialize` on the data types
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use plantation_map::{
//!     geo_utils, plan_greedy_tour, GpsPoint, MapConfig, PlanarPoint, PlantedPoint, PlotBounds,
//! };
//!
//! let config = MapConfig::default();
//!
//! // A 500m × 500m plot around a surveyed centre
//! let bounds = PlotBounds::around(GpsPoint::new(3.2125186, 101.6730024), 250.0);
//! let centre = geo_utils::gps_to_map(&bounds.center(), &bounds, &config).unwrap();
//! assert!((centre.x - 1000.0).abs() < 1e-6);
//! assert!((centre.y - 1000.0).abs() < 1e-6);
//!
//! let trees = vec![
//!     PlantedPoint::new(1, "T1", "P1", PlanarPoint::new(10.0, 0.0)),
//!     PlantedPoint::new(2, "T2", "P1", PlanarPoint::new(10.0, 10.0)),
//! ];
//! let plan = plan_greedy_tour(PlanarPoint::new(0.0, 0.0), &trees);
//! assert_eq!(plan.labels(), vec!["T1", "T2"]);
//! assert_eq!(plan.total_distance, 10.0);
//! ```

pub mod error;
pub use error::MapError;

pub mod geo_utils;

// Harvest path planning
pub mod planner;
pub use planner::{
    plan_greedy_tour, path_distance, HarvestAssignment, HarvestPlan, HarvestSchedule,
};

// Spatial index over planar coordinates
pub mod index;
pub use index::PointIndex;

pub mod viewport;
pub use viewport::Viewport;

// Scene state, hit-testing and tap dispatch
pub mod scene;
pub use scene::{MapEvent, MapEventListener, MapScene, PositionMarker};

pub mod render;
pub use render::{render_scene, DrawCommand, DrawList, Layer};

// Plot statistics
pub mod stats;
pub use stats::{
    nearest_neighbors, plot_statistics, summarize_plots, NeighborDistance, PlotStatistics,
    SpacingStatus, StatsConfig,
};

pub mod registry;
pub use registry::{NewPoint, PlotRegistry};

#[cfg(feature = "location")]
pub mod location;

#[cfg(feature = "location")]
pub use location::{AccuracyGrade, LocationFeed, LocationPublisher, PositionFix};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("PlantationMapRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// Stable point identifier, assigned at creation.
pub type PointId = u64;

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use plantation_map::GpsPoint;
/// let point = GpsPoint::new(3.2125186, 101.6730024); // Selangor
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A position on the planar map canvas, in map units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in map units.
    #[inline]
    pub fn distance_to(&self, other: &PlanarPoint) -> f64 {
        geo_utils::planar_distance(self.x, self.y, other.x, other.y)
    }
}

/// Geodetic rectangle of a plot, used to convert between GPS and planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlotBounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl PlotBounds {
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self { min_lat, min_lng, max_lat, max_lng }
    }

    /// Square plot extending `half_extent_m` metres from `center` in each direction.
    ///
    /// Longitude offsets are corrected by `cos(latitude)` so the plot stays square on
    /// the ground.
    pub fn around(center: GpsPoint, half_extent_m: f64) -> Self {
        let lat_offset = half_extent_m / geo_utils::METERS_PER_DEGREE;
        let lng_offset = half_extent_m
            / (geo_utils::METERS_PER_DEGREE * center.latitude.to_radians().cos());

        Self {
            min_lat: center.latitude - lat_offset,
            min_lng: center.longitude - lng_offset,
            max_lat: center.latitude + lat_offset,
            max_lng: center.longitude + lng_offset,
        }
    }

    /// Create bounds from GPS points. Returns `None` for empty input.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self { min_lat, min_lng, max_lat, max_lng })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// Reject bounds that would divide by zero (or flip) during conversion.
    pub fn validate(&self) -> Result<(), MapError> {
        let lat_span = self.lat_span();
        let lng_span = self.lng_span();
        if !(lat_span.is_finite() && lng_span.is_finite() && lat_span > 0.0 && lng_span > 0.0) {
            return Err(MapError::DegenerateBounds { lat_span, lng_span });
        }
        Ok(())
    }

    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// A placed tree marker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlantedPoint {
    /// Unique identifier, immutable
    pub id: PointId,
    /// Tree identifier shown on the map (unique within a plot)
    pub label: String,
    /// Plot this point belongs to
    pub plot_id: String,
    /// Position on the map canvas
    pub planar: PlanarPoint,
    /// Sensor position, only when captured via GPS
    pub gps: Option<GpsPoint>,
    pub notes: Option<String>,
    /// Unix milliseconds
    pub created_at: i64,
    /// Unix milliseconds
    pub updated_at: i64,
    /// Last successful sync (Unix milliseconds), `None` while unsynced
    pub synced_at: Option<i64>,
}

impl PlantedPoint {
    /// Create a manually placed point with zero timestamps.
    pub fn new(
        id: PointId,
        label: impl Into<String>,
        plot_id: impl Into<String>,
        planar: PlanarPoint,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            plot_id: plot_id.into(),
            planar,
            gps: None,
            notes: None,
            created_at: 0,
            updated_at: 0,
            synced_at: None,
        }
    }

    pub fn with_gps(mut self, gps: GpsPoint) -> Self {
        self.gps = Some(gps);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_synced(&self) -> bool {
        self.synced_at.is_some()
    }
}

/// Orientation of the planar Y axis relative to north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AxisConvention {
    /// North at the top of the canvas: planar Y grows southwards (screen drawing order).
    #[default]
    NorthUp,
    /// Planar Y grows northwards, matching latitude.
    SouthUp,
}

/// Configuration of the map canvas, viewport limits and rendering thresholds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapConfig {
    /// Planar extent along X. Default: 2000.0
    pub map_width: f64,

    /// Planar extent along Y. Default: 2000.0
    pub map_height: f64,

    /// Base grid spacing in map units. Default: 25.0
    pub grid_size: f64,

    /// Zoom limits. Default: 0.3 to 8.0
    pub min_scale: f64,
    pub max_scale: f64,

    /// Touch target radius in screen pixels; divided by scale for world-space hit tests.
    /// Default: 30.0
    pub touch_tolerance: f64,

    /// Real-world metres per map unit. Default: 0.25 (2000 units = 500m)
    pub meters_per_unit: f64,

    /// Y axis orientation for GPS conversion. Default: NorthUp
    pub axis: AxisConvention,

    /// Scale above which the half-spacing grid is drawn. Default: 2.0
    pub fine_grid_min_scale: f64,

    /// Scale above which the agronomic guide grid is drawn. Default: 4.0
    pub guide_grid_min_scale: f64,

    /// Planting distance shown by the guide grid, in metres. Default: 8.5
    pub guide_spacing_meters: f64,

    /// Scale above which point labels are drawn. Default: 0.8
    pub label_min_scale: f64,

    /// Point marker radius in screen pixels. Default: 20.0
    pub marker_radius: f64,

    /// Smallest marker radius in map units once the guide grid shows. Default: 8.0
    pub min_marker_radius: f64,

    /// Position fixes worse than this (metres) get no accuracy halo. Default: 100.0
    pub max_halo_accuracy: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            map_width: 2000.0,
            map_height: 2000.0,
            grid_size: 25.0,
            min_scale: 0.3,
            max_scale: 8.0,
            touch_tolerance: 30.0,
            meters_per_unit: 0.25,
            axis: AxisConvention::NorthUp,
            fine_grid_min_scale: 2.0,
            guide_grid_min_scale: 4.0,
            guide_spacing_meters: 8.5,
            label_min_scale: 0.8,
            marker_radius: 20.0,
            min_marker_radius: 8.0,
            max_halo_accuracy: 100.0,
        }
    }
}

impl MapConfig {
    /// Coarser, less zoomable preset used on the harvester's route screen.
    pub fn harvester() -> Self {
        Self {
            grid_size: 50.0,
            max_scale: 5.0,
            marker_radius: 25.0,
            label_min_scale: 0.5,
            ..Self::default()
        }
    }

    /// Whether a planar coordinate lies inside the map extent (edges included).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && x <= self.map_width && y >= 0.0 && y <= self.map_height
    }

    /// Guide grid spacing converted to map units.
    pub fn guide_spacing_units(&self) -> f64 {
        self.guide_spacing_meters / self.meters_per_unit
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{debug, info};

    /// Get default map configuration.
    #[uniffi::export]
    pub fn default_map_config() -> MapConfig {
        init_logging();
        info!("[PlantationMapRust] default_map_config called - Rust is active!");
        MapConfig::default()
    }

    /// Get the harvester screen's map configuration.
    #[uniffi::export]
    pub fn harvester_map_config() -> MapConfig {
        MapConfig::harvester()
    }

    /// Get default statistics configuration.
    #[uniffi::export]
    pub fn default_stats_config() -> StatsConfig {
        StatsConfig::default()
    }

    /// Square plot bounds around a centre.
    #[uniffi::export]
    pub fn plot_bounds_around(center: GpsPoint, half_extent_m: f64) -> PlotBounds {
        PlotBounds::around(center, half_extent_m)
    }

    /// Convert a GPS position into planar map coordinates.
    #[uniffi::export]
    pub fn ffi_gps_to_map(
        gps: GpsPoint,
        bounds: PlotBounds,
        config: MapConfig,
    ) -> Result<PlanarPoint, MapError> {
        init_logging();
        geo_utils::gps_to_map(&gps, &bounds, &config)
    }

    /// Convert planar map coordinates back into a GPS position.
    #[uniffi::export]
    pub fn ffi_map_to_gps(
        planar: PlanarPoint,
        bounds: PlotBounds,
        config: MapConfig,
    ) -> Result<GpsPoint, MapError> {
        init_logging();
        geo_utils::map_to_gps(&planar, &bounds, &config)
    }

    #[uniffi::export]
    pub fn ffi_grid_reference(x: f64, y: f64, cell_size: f64) -> Result<String, MapError> {
        geo_utils::grid_reference(x, y, cell_size)
    }

    #[uniffi::export]
    pub fn ffi_parse_grid_reference(text: String, cell_size: f64) -> Result<PlanarPoint, MapError> {
        geo_utils::parse_grid_reference(&text, cell_size)
    }

    /// Plan a harvest route over the given trees.
    #[uniffi::export]
    pub fn ffi_plan_harvest(start: PlanarPoint, points: Vec<PlantedPoint>) -> HarvestPlan {
        init_logging();
        info!("[PlantationMapRust] plan_harvest called with {} points", points.len());

        let start_time = std::time::Instant::now();
        let plan = plan_greedy_tour(start, &points);
        debug!(
            "[PlantationMapRust] Planned {} stops, {:.1} units in {:?}",
            plan.points.len(),
            plan.total_distance,
            start_time.elapsed()
        );

        plan
    }

    /// Trees scheduled for any of the selected harvest days.
    #[uniffi::export]
    pub fn ffi_select_for_days(
        points: Vec<PlantedPoint>,
        assignments: Vec<HarvestAssignment>,
        days: Vec<u8>,
    ) -> Vec<PlantedPoint> {
        let schedule = HarvestSchedule::from_assignments(assignments);
        schedule
            .select_for_days(&points, &days)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Statistics for one plot.
    #[uniffi::export]
    pub fn ffi_plot_statistics(
        plot_id: String,
        points: Vec<PlantedPoint>,
        map_config: MapConfig,
        stats_config: StatsConfig,
    ) -> PlotStatistics {
        init_logging();
        plot_statistics(&plot_id, &points, &map_config, &stats_config)
    }

    /// Trees closest to `target`, for the tree info sheet.
    #[uniffi::export]
    pub fn ffi_nearest_neighbors(
        target: PlantedPoint,
        points: Vec<PlantedPoint>,
        map_config: MapConfig,
        stats_config: StatsConfig,
    ) -> Vec<NeighborDistance> {
        nearest_neighbors(&target, &points, &map_config, &stats_config)
    }

    /// Statistics for every plot present in `points`, sorted by plot id.
    #[uniffi::export]
    pub fn ffi_summarize_plots(
        points: Vec<PlantedPoint>,
        map_config: MapConfig,
        stats_config: StatsConfig,
    ) -> Vec<PlotStatistics> {
        init_logging();
        info!("[PlantationMapRust] summarize_plots called with {} points", points.len());

        let start = std::time::Instant::now();

        #[cfg(feature = "parallel")]
        let summaries = stats::summarize_plots_parallel(&points, &map_config, &stats_config);

        #[cfg(not(feature = "parallel"))]
        let summaries = summarize_plots(&points, &map_config, &stats_config);

        info!(
            "[PlantationMapRust] Summarized {} plots in {:?}",
            summaries.len(),
            start.elapsed()
        );

        summaries
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn plantation_bounds() -> PlotBounds {
        PlotBounds::around(GpsPoint::new(3.2125186, 101.6730024), 250.0)
    }

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(3.2125, 101.673).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_around_is_square_on_ground() {
        let bounds = plantation_bounds();
        let center = bounds.center();
        assert!((center.latitude - 3.2125186).abs() < 1e-9);
        assert!((center.longitude - 101.6730024).abs() < 1e-9);

        // Longitude span is wider in degrees near the equator by 1/cos(lat)
        let ratio = bounds.lng_span() / bounds.lat_span();
        let expected = 1.0 / 3.2125186_f64.to_radians().cos();
        assert!((ratio - expected).abs() < 1e-9);
        assert!(bounds.validate().is_ok());
    }

    #[test]
    fn test_bounds_validation_rejects_degenerate() {
        let flat = PlotBounds::new(3.21, 101.67, 3.21, 101.68);
        assert!(matches!(flat.validate(), Err(MapError::DegenerateBounds { .. })));

        let nan = PlotBounds::new(f64::NAN, 101.67, 3.22, 101.68);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_bounds_from_points() {
        assert!(PlotBounds::from_points(&[]).is_none());

        let bounds = PlotBounds::from_points(&[
            GpsPoint::new(3.210, 101.670),
            GpsPoint::new(3.215, 101.676),
            GpsPoint::new(3.212, 101.672),
        ])
        .unwrap();
        assert_eq!(bounds.min_lat, 3.210);
        assert_eq!(bounds.max_lat, 3.215);
        assert_eq!(bounds.min_lng, 101.670);
        assert_eq!(bounds.max_lng, 101.676);
        assert!(bounds.contains(&GpsPoint::new(3.212, 101.672)));
        assert!(!bounds.contains(&GpsPoint::new(3.220, 101.672)));
    }

    #[test]
    fn test_end_to_end_centre_maps_to_middle() {
        let config = MapConfig::default();
        let bounds = plantation_bounds();

        let centre = GpsPoint::new(3.2125186, 101.6730024);
        let planar = geo_utils::gps_to_map(&centre, &bounds, &config).unwrap();
        assert!((planar.x - 1000.0).abs() < 0.01);
        assert!((planar.y - 1000.0).abs() < 0.01);

        // A tree placed at the centre lands at the middle of the scene
        let tree = PlantedPoint::new(1, "T001", "P1", planar).with_gps(centre);
        let mut scene = MapScene::new(config, 1080.0, 1920.0);
        scene.set_points(vec![tree]);
        assert_eq!(scene.hit_test(1000.0, 1000.0).map(|p| p.id), Some(1));
    }

    #[test]
    fn test_guide_spacing_units() {
        // 8.5m at 0.25 m/unit
        assert_eq!(MapConfig::default().guide_spacing_units(), 34.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_point_json_shape() {
        let point = PlantedPoint::new(7, "T007", "P1", PlanarPoint::new(12.5, 40.0))
            .with_gps(GpsPoint::new(3.2125, 101.673));
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["label"], "T007");
        assert_eq!(json["planar"]["x"], 12.5);
        assert_eq!(json["gps"]["latitude"], 3.2125);
        assert!(json["synced_at"].is_null());

        let back: PlantedPoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn test_harvester_preset() {
        let config = MapConfig::harvester();
        assert_eq!(config.grid_size, 50.0);
        assert_eq!(config.max_scale, 5.0);
        assert_eq!(config.map_width, 2000.0);
    }
}
