//! # Geographic Utilities
//!
//! Pure geometry used by the map, the planner and the statistics.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`planar_distance`] | Euclidean distance in map units |
//! | [`geodetic_distance`] | Ellipsoidal distance between two GPS points |
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`gps_to_map`] / [`map_to_gps`] | Linear GPS ↔ planar conversion within plot bounds |
//! | [`grid_reference`] / [`parse_grid_reference`] | Spreadsheet-style cell labels ("A1", "AB12") |
//! | [`density`] | Points per square map unit inside a rectangle |
//! | [`points_within_radius`] | Points within a planar radius |
//! | [`point_distance_meters`] | Real-world distance, geodetic when both points carry GPS |
//!
//! ## Example
//!
//! ```rust
//! use plantation_map::{geo_utils, GpsPoint, MapConfig, PlotBounds};
//!
//! let config = MapConfig::default();
//! let bounds = PlotBounds::new(3.210, 101.670, 3.215, 101.676);
//!
//! let planar = geo_utils::gps_to_map(&GpsPoint::new(3.215, 101.670), &bounds, &config).unwrap();
//! // North-west corner sits at the top-left of the canvas
//! assert!(planar.x.abs() < 1e-6 && planar.y.abs() < 1e-6);
//!
//! assert_eq!(geo_utils::grid_reference(1300.0, 0.0, 50.0).unwrap(), "AA1");
//! ```
//!
//! ## Coordinate System
//!
//! GPS input is WGS84 (degrees). The planar canvas spans `0..map_width` × `0..map_height`.
//! With [`AxisConvention::NorthUp`] (the default) the maximum latitude maps to `y = 0`;
//! with [`AxisConvention::SouthUp`] the minimum latitude does. Longitude maps linearly onto
//! X without cosine correction, so conversions are exact inverses of each other. The
//! cosine-corrected metre offsets in [`field_offset_meters`] are for display only.

use geo::{Distance, Geodesic, Haversine, Point};
use log::debug;

use crate::{AxisConvention, GpsPoint, MapConfig, MapError, PlanarPoint, PlantedPoint, PlotBounds};

/// Approximate metres per degree of latitude used for plot layout.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Euclidean distance between two planar coordinates, in map units.
///
/// ```rust
/// use plantation_map::geo_utils::planar_distance;
/// assert_eq!(planar_distance(0.0, 0.0, 3.0, 4.0), 5.0);
/// ```
#[inline]
pub fn planar_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}

/// Distance in metres between two GPS points on the WGS84 ellipsoid.
///
/// Uses Karney's geodesic algorithm, which is what field spacing reports should use:
/// trees are metres apart, where the spherical approximation is noticeably off.
///
/// ```rust
/// use plantation_map::{GpsPoint, geo_utils};
///
/// let a = GpsPoint::new(3.2125, 101.6730);
/// let b = GpsPoint::new(3.2125 + 8.5 / 110_574.0, 101.6730);
/// let d = geo_utils::geodetic_distance(&a, &b);
/// assert!((d - 8.5).abs() < 0.05);
/// ```
#[inline]
pub fn geodetic_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Geodesic::distance(point1, point2)
}

/// Great-circle distance between two GPS points using the Haversine formula.
///
/// Assumes a spherical Earth with radius 6,371 km; cheaper than
/// [`geodetic_distance`] and within 0.5% of it.
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Convert a planar distance into metres.
#[inline]
pub fn map_units_to_meters(distance: f64, config: &MapConfig) -> f64 {
    distance * config.meters_per_unit
}

/// Real-world distance between two points in metres.
///
/// Uses the geodesic distance when both points carry GPS coordinates and falls back
/// to the scaled planar distance otherwise.
pub fn point_distance_meters(a: &PlantedPoint, b: &PlantedPoint, config: &MapConfig) -> f64 {
    match (&a.gps, &b.gps) {
        (Some(ga), Some(gb)) => geodetic_distance(ga, gb),
        _ => map_units_to_meters(a.planar.distance_to(&b.planar), config),
    }
}

/// Convert meters to approximate degrees of longitude at a given latitude.
///
/// At the equator, 1 degree ≈ 111,000 meters; the value grows with `1 / cos(latitude)`.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = METERS_PER_DEGREE * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

/// East/north offset in metres of a GPS point from the plot's south-west corner.
///
/// Longitude is corrected by `cos(latitude)`. Display helper only; the map itself uses
/// the flat conversion of [`gps_to_map`].
pub fn field_offset_meters(point: &GpsPoint, bounds: &PlotBounds) -> (f64, f64) {
    let east = (point.longitude - bounds.min_lng)
        * METERS_PER_DEGREE
        * point.latitude.to_radians().cos();
    let north = (point.latitude - bounds.min_lat) * METERS_PER_DEGREE;
    (east, north)
}

// =============================================================================
// Coordinate Conversion
// =============================================================================

/// Map a GPS position into the planar extent of the map.
///
/// Linear interpolation between the plot bounds; the result is clamped into
/// `0..=map_width` × `0..=map_height`, so positions outside the plot stick to the border.
///
/// # Errors
///
/// - [`MapError::DegenerateBounds`] when the bounds have no area
/// - [`MapError::InvalidCoordinate`] for non-finite input
pub fn gps_to_map(
    point: &GpsPoint,
    bounds: &PlotBounds,
    config: &MapConfig,
) -> Result<PlanarPoint, MapError> {
    bounds.validate()?;
    if !(point.latitude.is_finite() && point.longitude.is_finite()) {
        return Err(MapError::InvalidCoordinate { x: point.longitude, y: point.latitude });
    }

    let fx = (point.longitude - bounds.min_lng) / bounds.lng_span();
    let fy = (point.latitude - bounds.min_lat) / bounds.lat_span();

    let x = fx * config.map_width;
    let y = match config.axis {
        AxisConvention::NorthUp => config.map_height - fy * config.map_height,
        AxisConvention::SouthUp => fy * config.map_height,
    };

    let clamped = PlanarPoint::new(
        x.clamp(0.0, config.map_width),
        y.clamp(0.0, config.map_height),
    );
    debug!(
        "gps_to_map: ({:.7}, {:.7}) -> ({:.2}, {:.2}), clamped ({:.2}, {:.2})",
        point.latitude, point.longitude, x, y, clamped.x, clamped.y
    );

    Ok(clamped)
}

/// Inverse of [`gps_to_map`] for the same bounds and axis convention.
///
/// # Errors
///
/// - [`MapError::DegenerateBounds`] when the bounds have no area
/// - [`MapError::InvalidCoordinate`] for non-finite input
pub fn map_to_gps(
    planar: &PlanarPoint,
    bounds: &PlotBounds,
    config: &MapConfig,
) -> Result<GpsPoint, MapError> {
    bounds.validate()?;
    if !(planar.x.is_finite() && planar.y.is_finite()) {
        return Err(MapError::InvalidCoordinate { x: planar.x, y: planar.y });
    }

    let fx = planar.x / config.map_width;
    let fy = match config.axis {
        AxisConvention::NorthUp => (config.map_height - planar.y) / config.map_height,
        AxisConvention::SouthUp => planar.y / config.map_height,
    };

    Ok(GpsPoint::new(
        bounds.min_lat + fy * bounds.lat_span(),
        bounds.min_lng + fx * bounds.lng_span(),
    ))
}

// =============================================================================
// Grid References
// =============================================================================

/// Spreadsheet-style reference of the grid cell containing `(x, y)`.
///
/// Columns use bijective base-26 letters (A..Z, AA, AB, ..., ZZ, AAA) and rows are
/// 1-based. Negative coordinates fall into the first column/row. Coordinates whose cell
/// index exceeds [`MAX_CELL_INDEX`] fail with [`MapError::InvalidCoordinate`].
///
/// ```rust
/// use plantation_map::geo_utils::grid_reference;
///
/// assert_eq!(grid_reference(0.0, 0.0, 50.0).unwrap(), "A1");
/// assert_eq!(grid_reference(75.0, 560.0, 50.0).unwrap(), "B12");
/// assert_eq!(grid_reference(1300.0, 0.0, 50.0).unwrap(), "AA1");
/// ```
pub fn grid_reference(x: f64, y: f64, cell_size: f64) -> Result<String, MapError> {
    check_cell_size(cell_size)?;
    if !(x.is_finite() && y.is_finite()) {
        return Err(MapError::InvalidCoordinate { x, y });
    }

    let (Some(col), Some(row)) = (cell_index(x, cell_size), cell_index(y, cell_size)) else {
        return Err(MapError::InvalidCoordinate { x, y });
    };

    Ok(format!("{}{}", column_letters(col), row + 1))
}

/// Parse a grid reference back to the origin (top-left corner) of its cell.
///
/// Letters are case-insensitive and must be followed by a 1-based row number.
///
/// ```rust
/// use plantation_map::geo_utils::parse_grid_reference;
///
/// let origin = parse_grid_reference("AA1", 50.0).unwrap();
/// assert_eq!((origin.x, origin.y), (1300.0, 0.0));
/// assert!(parse_grid_reference("12", 50.0).is_err());
/// ```
pub fn parse_grid_reference(text: &str, cell_size: f64) -> Result<PlanarPoint, MapError> {
    check_cell_size(cell_size)?;

    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (letters, digits) = trimmed.split_at(split);

    if letters.is_empty() {
        return Err(MapError::grid(text, "missing column letters"));
    }
    if digits.is_empty() {
        return Err(MapError::grid(text, "missing row number"));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(MapError::grid(text, "row must be numeric"));
    }

    let col = parse_column(letters).ok_or_else(|| MapError::grid(text, "column out of range"))?;
    let row: u64 = digits
        .parse()
        .map_err(|_| MapError::grid(text, "row out of range"))?;
    if row == 0 {
        return Err(MapError::grid(text, "rows start at 1"));
    }

    Ok(PlanarPoint::new(
        col as f64 * cell_size,
        (row - 1) as f64 * cell_size,
    ))
}

fn check_cell_size(cell_size: f64) -> Result<(), MapError> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(MapError::InvalidCellSize(cell_size))
    }
}

/// Largest grid cell index, the last integer `f64` represents exactly.
pub const MAX_CELL_INDEX: u64 = (1 << 53) - 1;

fn cell_index(value: f64, cell_size: f64) -> Option<u64> {
    if value <= 0.0 {
        return Some(0);
    }
    let quotient = value / cell_size;
    let nearest = quotient.round();
    // Quotients a few ulps short of a boundary (0.3 / 0.1) belong to the next cell
    let index = if (quotient - nearest).abs() <= nearest * 4.0 * f64::EPSILON {
        nearest
    } else {
        quotient.floor()
    };
    // Also rejects an infinite quotient
    if index > MAX_CELL_INDEX as f64 {
        return None;
    }
    Some(index as u64)
}

fn column_letters(col: u64) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

fn parse_column(letters: &str) -> Option<u64> {
    let mut value: u64 = 0;
    for c in letters.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u64 + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value - 1)
}

// =============================================================================
// Area Queries
// =============================================================================

/// Points per square map unit inside a rectangle (edges included).
///
/// Returns 0.0 when the rectangle has no area, never NaN.
pub fn density(
    points: &[PlantedPoint],
    region_x: f64,
    region_y: f64,
    region_w: f64,
    region_h: f64,
) -> f64 {
    let area = region_w * region_h;
    if !(area > 0.0) {
        return 0.0;
    }

    let inside = points
        .iter()
        .filter(|p| {
            p.planar.x >= region_x
                && p.planar.x <= region_x + region_w
                && p.planar.y >= region_y
                && p.planar.y <= region_y + region_h
        })
        .count();

    inside as f64 / area
}

/// Points whose planar distance to `center` is at most `radius`, in input order.
pub fn points_within_radius<'a>(
    center: &PlanarPoint,
    radius: f64,
    points: &'a [PlantedPoint],
) -> Vec<&'a PlantedPoint> {
    points
        .iter()
        .filter(|p| center.distance_to(&p.planar) <= radius)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn bounds() -> PlotBounds {
        PlotBounds::around(GpsPoint::new(3.2125186, 101.6730024), 250.0)
    }

    fn tree(id: u64, x: f64, y: f64) -> PlantedPoint {
        PlantedPoint::new(id, format!("T{}", id), "P1", PlanarPoint::new(x, y))
    }

    #[test]
    fn test_planar_distance() {
        assert_eq!(planar_distance(0.0, 0.0, 3.0, 4.0), 5.0);
        assert_eq!(planar_distance(10.0, 10.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn test_geodetic_distance_same_point() {
        let p = GpsPoint::new(3.2125, 101.673);
        assert_eq!(geodetic_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_geodetic_close_to_haversine() {
        let a = GpsPoint::new(3.2100, 101.6700);
        let b = GpsPoint::new(3.2150, 101.6760);
        let geodesic = geodetic_distance(&a, &b);
        let haversine = haversine_distance(&a, &b);
        assert!(geodesic > 800.0 && geodesic < 900.0);
        assert!((geodesic - haversine).abs() / geodesic < 0.005);
    }

    #[test]
    fn test_round_trip_north_up() {
        let config = MapConfig::default();
        let b = bounds();
        for &(flat, flng) in &[(0.0, 0.0), (0.25, 0.75), (0.5, 0.5), (0.9, 0.1), (1.0, 1.0)] {
            let gps = GpsPoint::new(
                b.min_lat + flat * b.lat_span(),
                b.min_lng + flng * b.lng_span(),
            );
            let planar = gps_to_map(&gps, &b, &config).unwrap();
            let back = map_to_gps(&planar, &b, &config).unwrap();
            assert!(approx_eq(back.latitude, gps.latitude, 1e-9));
            assert!(approx_eq(back.longitude, gps.longitude, 1e-9));
        }
    }

    #[test]
    fn test_round_trip_south_up() {
        let config = MapConfig { axis: AxisConvention::SouthUp, ..MapConfig::default() };
        let b = bounds();
        let gps = GpsPoint::new(b.min_lat + 0.3 * b.lat_span(), b.min_lng + 0.6 * b.lng_span());
        let planar = gps_to_map(&gps, &b, &config).unwrap();
        let back = map_to_gps(&planar, &b, &config).unwrap();
        assert!(approx_eq(back.latitude, gps.latitude, 1e-9));
        assert!(approx_eq(back.longitude, gps.longitude, 1e-9));
    }

    #[test]
    fn test_axis_conventions_disagree_on_y() {
        let b = bounds();
        let north_edge = GpsPoint::new(b.max_lat, b.min_lng);

        let north_up = gps_to_map(&north_edge, &b, &MapConfig::default()).unwrap();
        assert!(approx_eq(north_up.x, 0.0, 1e-6));
        assert!(approx_eq(north_up.y, 0.0, 1e-6));

        let south_up_config = MapConfig { axis: AxisConvention::SouthUp, ..MapConfig::default() };
        let south_up = gps_to_map(&north_edge, &b, &south_up_config).unwrap();
        assert!(approx_eq(south_up.y, 2000.0, 1e-6));
    }

    #[test]
    fn test_gps_to_map_clamps_outside_points() {
        let config = MapConfig::default();
        let b = bounds();
        let far = GpsPoint::new(b.max_lat + 1.0, b.max_lng + 1.0);
        let planar = gps_to_map(&far, &b, &config).unwrap();
        assert_eq!(planar, PlanarPoint::new(2000.0, 0.0));

        let below = GpsPoint::new(b.min_lat - 1.0, b.min_lng - 1.0);
        let planar = gps_to_map(&below, &b, &config).unwrap();
        assert_eq!(planar, PlanarPoint::new(0.0, 2000.0));
    }

    #[test]
    fn test_degenerate_bounds_fail() {
        let config = MapConfig::default();
        let flat = PlotBounds::new(3.21, 101.67, 3.21, 101.68);
        let gps = GpsPoint::new(3.21, 101.675);

        assert!(matches!(
            gps_to_map(&gps, &flat, &config),
            Err(MapError::DegenerateBounds { .. })
        ));
        assert!(matches!(
            map_to_gps(&PlanarPoint::new(10.0, 10.0), &flat, &config),
            Err(MapError::DegenerateBounds { .. })
        ));
    }

    #[test]
    fn test_non_finite_input_fails() {
        let config = MapConfig::default();
        let result = gps_to_map(&GpsPoint::new(f64::NAN, 101.67), &bounds(), &config);
        assert!(matches!(result, Err(MapError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_grid_reference_examples() {
        assert_eq!(grid_reference(0.0, 0.0, 50.0).unwrap(), "A1");
        assert_eq!(grid_reference(49.9, 49.9, 50.0).unwrap(), "A1");
        assert_eq!(grid_reference(50.0, 550.0, 50.0).unwrap(), "B12");
        assert_eq!(grid_reference(25.0 * 50.0, 0.0, 50.0).unwrap(), "Z1");
        assert_eq!(grid_reference(26.0 * 50.0, 0.0, 50.0).unwrap(), "AA1");
        assert_eq!(grid_reference(27.0 * 50.0, 0.0, 50.0).unwrap(), "AB1");
        assert_eq!(grid_reference(701.0 * 50.0, 0.0, 50.0).unwrap(), "ZZ1");
        assert_eq!(grid_reference(702.0 * 50.0, 0.0, 50.0).unwrap(), "AAA1");
        assert_eq!(grid_reference(-10.0, -10.0, 50.0).unwrap(), "A1");
    }

    #[test]
    fn test_grid_reference_identity() {
        for col in [0u64, 1, 25, 26, 27, 51, 52, 700, 701, 702, 18_277] {
            for row in [0u64, 1, 9, 39, 120] {
                let x = col as f64 * 25.0;
                let y = row as f64 * 25.0;
                let reference = grid_reference(x, y, 25.0).unwrap();
                let origin = parse_grid_reference(&reference, 25.0).unwrap();
                assert_eq!(origin, PlanarPoint::new(x, y), "reference {}", reference);
            }
        }
    }

    #[test]
    fn test_grid_reference_cell_boundaries() {
        assert_eq!(grid_reference(49.99999999999, 0.0, 50.0).unwrap(), "A1");
        assert_eq!(grid_reference(0.0, 49.99999999999, 50.0).unwrap(), "A1");
        // 0.3 / 0.1 is 2.9999999999999996 in floating point
        assert_eq!(grid_reference(0.3, 0.0, 0.1).unwrap(), "D1");
        assert_eq!(grid_reference(0.0, 0.3, 0.1).unwrap(), "A4");
    }

    #[test]
    fn test_grid_reference_huge_coordinates_fail() {
        for (x, y) in [(1e300, 0.0), (0.0, 1e300), (f64::MAX, f64::MAX)] {
            assert!(
                matches!(grid_reference(x, y, 1.0), Err(MapError::InvalidCoordinate { .. })),
                "expected failure for ({}, {})",
                x,
                y
            );
        }
        // Finite coordinate but infinite quotient
        assert!(grid_reference(1e300, 0.0, 1e-300).is_err());

        let largest = MAX_CELL_INDEX as f64;
        let reference = grid_reference(largest, largest, 1.0).unwrap();
        let origin = parse_grid_reference(&reference, 1.0).unwrap();
        assert_eq!(origin, PlanarPoint::new(largest, largest));
    }

    #[test]
    fn test_parse_grid_reference_lowercase_and_whitespace() {
        assert_eq!(parse_grid_reference(" b12 ", 50.0).unwrap(), PlanarPoint::new(50.0, 550.0));
    }

    #[test]
    fn test_parse_grid_reference_errors() {
        for bad in ["", "12", "A", "A1B", "A-1", "A0", "1A"] {
            assert!(
                matches!(parse_grid_reference(bad, 50.0), Err(MapError::GridReference { .. })),
                "expected parse failure for {:?}",
                bad
            );
        }
        assert!(matches!(
            parse_grid_reference("A1", 0.0),
            Err(MapError::InvalidCellSize(_))
        ));
        assert!(grid_reference(1.0, 1.0, -5.0).is_err());
    }

    #[test]
    fn test_density() {
        let trees = vec![tree(1, 10.0, 10.0), tree(2, 20.0, 20.0), tree(3, 500.0, 500.0)];
        assert_eq!(density(&trees, 0.0, 0.0, 100.0, 100.0), 2.0 / 10_000.0);
        // Edges are inclusive
        assert_eq!(density(&trees, 10.0, 10.0, 10.0, 10.0), 2.0 / 100.0);
    }

    #[test]
    fn test_density_zero_area() {
        let trees = vec![tree(1, 10.0, 10.0)];
        assert_eq!(density(&trees, 10.0, 10.0, 0.0, 100.0), 0.0);
        assert_eq!(density(&trees, 10.0, 10.0, 0.0, 0.0), 0.0);
        assert_eq!(density(&[], 0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_points_within_radius() {
        let trees = vec![tree(1, 0.0, 0.0), tree(2, 30.0, 40.0), tree(3, 31.0, 40.0)];
        let near: Vec<u64> = points_within_radius(&PlanarPoint::new(0.0, 0.0), 50.0, &trees)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(near, vec![1, 2]);
    }

    #[test]
    fn test_point_distance_meters_falls_back_to_planar() {
        let config = MapConfig::default();
        let a = tree(1, 0.0, 0.0);
        let b = tree(2, 34.0, 0.0);
        assert!(approx_eq(point_distance_meters(&a, &b, &config), 8.5, 1e-9));

        let ga = a.clone().with_gps(GpsPoint::new(3.2125, 101.6730));
        let gb = b.clone().with_gps(GpsPoint::new(3.2125, 101.6730));
        // Both carry GPS: geodesic wins even though planar positions differ
        assert_eq!(point_distance_meters(&ga, &gb, &config), 0.0);
        // Only one carries GPS: planar fallback
        assert!(approx_eq(point_distance_meters(&ga, &b, &config), 8.5, 1e-9));
    }

    #[test]
    fn test_field_offset_meters() {
        let b = bounds();
        let (east, north) = field_offset_meters(&b.center(), &b);
        assert!(approx_eq(east, 250.0, 0.5));
        assert!(approx_eq(north, 250.0, 1e-6));
    }

    #[test]
    fn test_meters_to_degrees() {
        let deg = meters_to_degrees(111_000.0, 0.0);
        assert!(approx_eq(deg, 1.0, 0.01));

        let deg_45 = meters_to_degrees(111_000.0, 45.0);
        assert!(deg_45 > 1.0);
    }
}
