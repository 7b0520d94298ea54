//! Scene → draw commands.
//!
//! [`render_scene`] is a pure function of the scene state. Hosts replay the
//! [`DrawList`] on their canvas: world-space commands under the `translate(pan)` +
//! `scale(scale)` transform, then the screen-space overlay without it. Styling
//! (colours, fonts) is left to the host and keyed by [`Layer`].

use std::f64::consts::PI;

use crate::{MapScene, PlanarPoint};

/// Screen-pixel radius of the user position marker.
const POSITION_RADIUS: f64 = 15.0;
/// Screen-pixel length of path arrowheads.
const ARROW_LENGTH: f64 = 15.0;
/// Half-angle between an arrowhead's barbs and the path.
const ARROW_ANGLE: f64 = PI / 6.0;
/// Screen-pixel label size.
const LABEL_SIZE: f64 = 24.0;

/// What a command draws, for host-side styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layer {
    Background,
    Grid,
    FineGrid,
    /// Dashed planting-distance guide
    GuideGrid,
    Border,
    Path,
    PathArrow,
    /// Leg from the user's position to the first path point
    Approach,
    Point,
    SelectedPoint,
    SelectionRing,
    Label,
    PathOrder,
    AccuracyHalo,
    Position,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawCommand {
    Rect { x: f64, y: f64, width: f64, height: f64, filled: bool, layer: Layer },
    Line { x1: f64, y1: f64, x2: f64, y2: f64, stroke: f64, dashed: bool, layer: Layer },
    Circle { x: f64, y: f64, radius: f64, filled: bool, layer: Layer },
    Text { x: f64, y: f64, size: f64, text: String, layer: Layer },
}

impl DrawCommand {
    pub fn layer(&self) -> Layer {
        match self {
            DrawCommand::Rect { layer, .. }
            | DrawCommand::Line { layer, .. }
            | DrawCommand::Circle { layer, .. }
            | DrawCommand::Text { layer, .. } => *layer,
        }
    }
}

/// One frame's worth of drawing.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawList {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale: f64,
    /// World-space commands, back to front
    pub commands: Vec<DrawCommand>,
    /// Screen-space commands drawn after `commands`
    pub overlay: Vec<DrawCommand>,
}

impl DrawList {
    /// Number of world-space commands on `layer`.
    pub fn count(&self, layer: Layer) -> usize {
        self.commands.iter().filter(|c| c.layer() == layer).count()
    }

    pub fn has_layer(&self, layer: Layer) -> bool {
        self.commands.iter().any(|c| c.layer() == layer)
    }
}

/// Build the draw list for the current scene state.
pub fn render_scene(scene: &MapScene) -> DrawList {
    let config = scene.config();
    let viewport = scene.viewport();
    let scale = viewport.scale();
    let (pan_x, pan_y) = viewport.pan();
    let (_, view_height) = viewport.size();

    let mut commands = Vec::new();

    // Background, grids, border
    commands.push(DrawCommand::Rect {
        x: 0.0,
        y: 0.0,
        width: config.map_width,
        height: config.map_height,
        filled: true,
        layer: Layer::Background,
    });
    grid_lines(&mut commands, config.map_width, config.map_height, config.grid_size, 1.0, false, Layer::Grid);
    if scale > config.fine_grid_min_scale {
        grid_lines(
            &mut commands,
            config.map_width,
            config.map_height,
            config.grid_size / 2.0,
            0.5,
            false,
            Layer::FineGrid,
        );
    }
    if scale > config.guide_grid_min_scale {
        grid_lines(
            &mut commands,
            config.map_width,
            config.map_height,
            config.guide_spacing_units(),
            1.0,
            true,
            Layer::GuideGrid,
        );
    }
    commands.push(DrawCommand::Rect {
        x: 0.0,
        y: 0.0,
        width: config.map_width,
        height: config.map_height,
        filled: false,
        layer: Layer::Border,
    });

    // Path
    let path = scene.path();
    if let (Some(marker), Some(first)) = (scene.current_position(), path.first()) {
        commands.push(DrawCommand::Line {
            x1: marker.planar.x,
            y1: marker.planar.y,
            x2: first.planar.x,
            y2: first.planar.y,
            stroke: 2.0,
            dashed: true,
            layer: Layer::Approach,
        });
    }
    for pair in path.windows(2) {
        let (from, to) = (&pair[0].planar, &pair[1].planar);
        commands.push(DrawCommand::Line {
            x1: from.x,
            y1: from.y,
            x2: to.x,
            y2: to.y,
            stroke: 3.0,
            dashed: false,
            layer: Layer::Path,
        });
        arrowhead(&mut commands, from, to, ARROW_LENGTH / scale);
    }

    // Points
    let mut radius = config.marker_radius / scale;
    if scale > config.guide_grid_min_scale {
        radius = radius.max(config.min_marker_radius);
    }
    let show_labels = scale > config.label_min_scale;
    let text_size = LABEL_SIZE / scale;

    for point in scene.points() {
        let (x, y) = (point.planar.x, point.planar.y);
        let selected = scene.selected() == Some(point.id);

        commands.push(DrawCommand::Circle {
            x,
            y,
            radius,
            filled: true,
            layer: if selected { Layer::SelectedPoint } else { Layer::Point },
        });
        if selected {
            commands.push(DrawCommand::Circle {
                x,
                y,
                radius: radius + (5.0 / scale).max(2.0),
                filled: false,
                layer: Layer::SelectionRing,
            });
        }
        if show_labels {
            commands.push(DrawCommand::Text {
                x,
                y: y + text_size / 3.0,
                size: text_size,
                text: point.label.clone(),
                layer: Layer::Label,
            });
        }
        if let Some(order) = scene.path_order(point.id) {
            commands.push(DrawCommand::Text {
                x: x + radius,
                y: y - radius,
                size: text_size,
                text: order.to_string(),
                layer: Layer::PathOrder,
            });
        }
    }

    // User position
    if let Some(marker) = scene.current_position() {
        let (x, y) = (marker.planar.x, marker.planar.y);
        let marker_radius = POSITION_RADIUS / scale;
        let halo = marker.accuracy_m / config.meters_per_unit;
        if marker.accuracy_m < config.max_halo_accuracy && halo > marker_radius {
            commands.push(DrawCommand::Circle {
                x,
                y,
                radius: halo,
                filled: true,
                layer: Layer::AccuracyHalo,
            });
        }
        commands.push(DrawCommand::Circle {
            x,
            y,
            radius: marker_radius,
            filled: true,
            layer: Layer::Position,
        });
    }

    // Info text, screen space
    let mut overlay = vec![DrawCommand::Text {
        x: 20.0,
        y: view_height - 60.0,
        size: 32.0,
        text: info_line(scene),
        layer: Layer::Info,
    }];
    if let Some(marker) = scene.current_position() {
        overlay.push(DrawCommand::Text {
            x: 20.0,
            y: view_height - 20.0,
            size: 32.0,
            text: format!(
                "Your Location: ({}, {})",
                marker.planar.x.trunc(),
                marker.planar.y.trunc()
            ),
            layer: Layer::Info,
        });
    }

    DrawList { pan_x, pan_y, scale, commands, overlay }
}

/// Status line shown under the map, e.g. `"Scale: 1.00x | Trees: 12"`.
pub fn info_line(scene: &MapScene) -> String {
    let mut info = format!(
        "Scale: {:.2}x | Trees: {}",
        scene.viewport().scale(),
        scene.points().len()
    );
    if !scene.path().is_empty() {
        info.push_str(&format!(" | Path: {}", scene.path().len()));
    }
    info
}

fn grid_lines(
    commands: &mut Vec<DrawCommand>,
    width: f64,
    height: f64,
    spacing: f64,
    stroke: f64,
    dashed: bool,
    layer: Layer,
) {
    if !(spacing.is_finite() && spacing > 0.0) {
        return;
    }
    let columns = (width / spacing).floor() as usize;
    for i in 0..=columns {
        let x = i as f64 * spacing;
        commands.push(DrawCommand::Line { x1: x, y1: 0.0, x2: x, y2: height, stroke, dashed, layer });
    }
    let rows = (height / spacing).floor() as usize;
    for i in 0..=rows {
        let y = i as f64 * spacing;
        commands.push(DrawCommand::Line { x1: 0.0, y1: y, x2: width, y2: y, stroke, dashed, layer });
    }
}

fn arrowhead(commands: &mut Vec<DrawCommand>, from: &PlanarPoint, to: &PlanarPoint, length: f64) {
    if from == to {
        return;
    }
    let angle = (to.y - from.y).atan2(to.x - from.x);
    for barb in [angle - ARROW_ANGLE, angle + ARROW_ANGLE] {
        commands.push(DrawCommand::Line {
            x1: to.x,
            y1: to.y,
            x2: to.x - length * barb.cos(),
            y2: to.y - length * barb.sin(),
            stroke: 3.0,
            dashed: false,
            layer: Layer::PathArrow,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{plan_greedy_tour, MapConfig, PlantedPoint, PositionMarker};

    fn tree(id: u64, x: f64, y: f64) -> PlantedPoint {
        PlantedPoint::new(id, format!("T{}", id), "P1", PlanarPoint::new(x, y))
    }

    fn scene() -> MapScene {
        let mut scene = MapScene::new(MapConfig::default(), 1080.0, 1920.0);
        scene.set_points(vec![tree(1, 100.0, 100.0), tree(2, 200.0, 100.0), tree(3, 200.0, 300.0)]);
        scene
    }

    #[test]
    fn test_base_layers_at_scale_one() {
        let list = render_scene(&scene());
        assert_eq!(list.scale, 1.0);
        assert_eq!(list.count(Layer::Background), 1);
        assert_eq!(list.count(Layer::Border), 1);
        // 2000 / 25 = 80 cells, 81 lines per direction
        assert_eq!(list.count(Layer::Grid), 162);
        assert!(!list.has_layer(Layer::FineGrid));
        assert!(!list.has_layer(Layer::GuideGrid));
        assert_eq!(list.count(Layer::Point), 3);
        assert_eq!(list.count(Layer::Label), 3);
        assert!(!list.has_layer(Layer::Path));
    }

    #[test]
    fn test_zoom_selects_grid_layers() {
        let mut scene = scene();
        scene.pinch(0.5, 540.0, 960.0);
        let list = render_scene(&scene);
        // Labels hidden at scale 0.8 and below
        assert!(!list.has_layer(Layer::Label));

        scene.pinch(5.0, 540.0, 960.0);
        let list = render_scene(&scene);
        assert_eq!(list.scale, 2.5);
        assert_eq!(list.count(Layer::FineGrid), 322);
        assert!(!list.has_layer(Layer::GuideGrid));

        scene.pinch(2.0, 540.0, 960.0);
        let list = render_scene(&scene);
        assert!(list.has_layer(Layer::GuideGrid));
        // 34-unit guide spacing: 58 full cells, 59 lines per direction
        assert_eq!(list.count(Layer::GuideGrid), 118);
        let dashed = list.commands.iter().all(|c| match c {
            DrawCommand::Line { layer: Layer::GuideGrid, dashed, .. } => *dashed,
            _ => true,
        });
        assert!(dashed);
    }

    #[test]
    fn test_marker_radius_floor_at_high_zoom() {
        let mut scene = scene();
        scene.pinch(8.0, 540.0, 960.0);
        let list = render_scene(&scene);
        let radius = list.commands.iter().find_map(|c| match c {
            DrawCommand::Circle { radius, layer: Layer::Point, .. } => Some(*radius),
            _ => None,
        });
        assert_eq!(radius, Some(8.0));
    }

    #[test]
    fn test_path_arrows_and_order() {
        let mut scene = scene();
        let plan = plan_greedy_tour(PlanarPoint::new(0.0, 0.0), scene.points());
        scene.set_path(plan.points);
        let list = render_scene(&scene);

        assert_eq!(list.count(Layer::Path), 2);
        assert_eq!(list.count(Layer::PathArrow), 4);
        assert!(!list.has_layer(Layer::Approach));

        let orders: Vec<&str> = list
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, layer: Layer::PathOrder, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(orders, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_arrowhead_geometry() {
        let mut commands = Vec::new();
        arrowhead(&mut commands, &PlanarPoint::new(0.0, 0.0), &PlanarPoint::new(10.0, 0.0), 15.0);
        assert_eq!(commands.len(), 2);
        for command in &commands {
            if let DrawCommand::Line { x1, y1, x2, y2, .. } = command {
                assert_eq!((*x1, *y1), (10.0, 0.0));
                let len = (x2 - x1).hypot(y2 - y1);
                assert!((len - 15.0).abs() < 1e-9);
                // Barbs point back along the path
                assert!(*x2 < 10.0);
            }
        }
    }

    #[test]
    fn test_position_marker_and_approach_leg() {
        let mut scene = scene();
        scene.set_path(vec![tree(2, 200.0, 100.0)]);
        scene.set_current_position(Some(PositionMarker {
            planar: PlanarPoint::new(150.0, 150.0),
            accuracy_m: 8.0,
            gps: None,
        }));
        let list = render_scene(&scene);

        assert_eq!(list.count(Layer::Approach), 1);
        assert_eq!(list.count(Layer::Position), 1);
        // 8m = 32 map units, wider than the 15-unit marker
        let halo = list.commands.iter().find_map(|c| match c {
            DrawCommand::Circle { radius, layer: Layer::AccuracyHalo, .. } => Some(*radius),
            _ => None,
        });
        assert_eq!(halo, Some(32.0));
        assert_eq!(list.overlay.len(), 2);
    }

    #[test]
    fn test_no_halo_for_poor_or_tight_fix() {
        let mut scene = scene();
        for accuracy in [150.0, 2.0] {
            scene.set_current_position(Some(PositionMarker {
                planar: PlanarPoint::new(150.0, 150.0),
                accuracy_m: accuracy,
                gps: None,
            }));
            let list = render_scene(&scene);
            assert!(!list.has_layer(Layer::AccuracyHalo), "accuracy {}", accuracy);
            assert!(list.has_layer(Layer::Position));
        }
    }

    #[test]
    fn test_selection_ring() {
        let mut scene = scene();
        scene.select(Some(2));
        let list = render_scene(&scene);
        assert_eq!(list.count(Layer::SelectedPoint), 1);
        assert_eq!(list.count(Layer::SelectionRing), 1);
        assert_eq!(list.count(Layer::Point), 2);
    }

    #[test]
    fn test_info_line() {
        let mut scene = scene();
        assert_eq!(info_line(&scene), "Scale: 1.00x | Trees: 3");
        let all = scene.points().to_vec();
        scene.set_path(all);
        assert_eq!(info_line(&scene), "Scale: 1.00x | Trees: 3 | Path: 3");
    }
}
