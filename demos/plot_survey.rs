//! Survey a plot: place trees by tap and by GPS, then render the map.
//!
//! Run with: cargo run --example plot_survey

use plantation_map::location::channel;
use plantation_map::{
    geo_utils, render_scene, GpsPoint, Layer, MapConfig, MapEvent, MapScene, NewPoint, PlanarPoint,
    PlotBounds, PlotRegistry, PositionFix,
};

fn main() {
    let config = MapConfig::default();

    // 500m × 500m plot around the estate office (Selangor)
    let bounds = PlotBounds::around(GpsPoint::new(3.2125186, 101.6730024), 250.0);
    let mut registry = PlotRegistry::new(&config);
    let mut scene = MapScene::new(config.clone(), 1080.0, 1920.0);

    println!("Plot Survey Example\n");
    println!(
        "Bounds: lat {:.6}..{:.6}, lng {:.6}..{:.6}\n",
        bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng
    );

    // 1. Manual placement: tap on empty map space
    println!("1. Tap-to-place:");
    for (i, (sx, sy)) in [(540.0, 960.0), (574.0, 960.0), (540.0, 994.0)].iter().enumerate() {
        if let Some(MapEvent::PlacementRequested { x, y }) = scene.handle_tap(*sx, *sy) {
            let label = format!("T{:03}", i + 1);
            let id = registry
                .create(NewPoint::manual(&label, "P1", PlanarPoint::new(x, y)), 0)
                .unwrap();
            println!(
                "   {} (id {}) at ({:.1}, {:.1}), cell {}",
                label,
                id,
                x,
                y,
                geo_utils::grid_reference(x, y, 50.0).unwrap()
            );
            scene.set_points(registry.snapshot("P1"));
        }
    }

    // 2. Tapping an existing tree selects it instead
    println!("\n2. Tap on a tree:");
    match scene.handle_tap(540.0, 960.0) {
        Some(MapEvent::PointSelected { id }) => {
            println!("   Selected {}", registry.get(id).unwrap().label)
        }
        other => println!("   Unexpected: {:?}", other),
    }

    // 3. GPS placement from the location feed
    println!("\n3. GPS placement:");
    let (publisher, mut feed) = channel();
    feed.start();
    publisher.publish(PositionFix {
        latitude: 3.2130,
        longitude: 101.6725,
        accuracy_m: 4.0,
        timestamp_ms: 1_700_000_000_000,
    });
    if let Some(planar) = feed.apply_latest(&mut scene, &bounds).unwrap() {
        let gps = GpsPoint::new(3.2130, 101.6725);
        let id = registry
            .create(NewPoint::manual("T004", "P1", planar).with_gps(gps), 1_700_000_000_000)
            .unwrap();
        let (east, north) = geo_utils::field_offset_meters(&gps, &bounds);
        println!(
            "   T004 (id {}) at ({:.1}, {:.1}), {:.0}m E, {:.0}m N of the SW corner",
            id, planar.x, planar.y, east, north
        );
        scene.set_points(registry.snapshot("P1"));
    }

    // 4. Duplicate labels are rejected
    println!("\n4. Duplicate label:");
    let duplicate = registry.create(NewPoint::manual("T001", "P1", PlanarPoint::new(10.0, 10.0)), 0);
    println!("   {}", duplicate.unwrap_err());

    // 5. Render at a few zoom levels
    println!("\n5. Rendering:");
    for factor in [1.0, 3.0, 2.0] {
        scene.pinch(factor, 540.0, 960.0);
        let list = render_scene(&scene);
        println!(
            "   scale {:.1}: {} commands (grid {}, fine {}, guide {}, labels {})",
            list.scale,
            list.commands.len(),
            list.count(Layer::Grid),
            list.count(Layer::FineGrid),
            list.count(Layer::GuideGrid),
            list.count(Layer::Label)
        );
    }
}
