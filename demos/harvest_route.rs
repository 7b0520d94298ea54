//! Plan a harvest route for the trees scheduled on selected days.
//!
//! Run with: cargo run --example harvest_route

use plantation_map::{
    plan_greedy_tour, render_scene, HarvestAssignment, HarvestSchedule, Layer, MapConfig, MapScene,
    PlanarPoint, PlantedPoint,
};

fn main() {
    // A small block of trees on a rough 34-unit (8.5m) grid
    let trees: Vec<PlantedPoint> = (0..12)
        .map(|i| {
            let x = 900.0 + (i % 4) as f64 * 34.0 + if i % 2 == 0 { 0.0 } else { 5.0 };
            let y = 900.0 + (i / 4) as f64 * 34.0;
            PlantedPoint::new(i + 1, format!("T{:03}", i + 1), "P1", PlanarPoint::new(x, y))
        })
        .collect();

    // Harvest days from the survey forms
    let schedule = HarvestSchedule::from_assignments(vec![
        HarvestAssignment { label: "T002".into(), day: 1 },
        HarvestAssignment { label: "T007".into(), day: 1 },
        HarvestAssignment { label: "T011".into(), day: 1 },
        HarvestAssignment { label: "T004".into(), day: 2 },
        HarvestAssignment { label: "T007".into(), day: 2 },
        HarvestAssignment { label: "T009".into(), day: 3 },
    ]);

    println!("Harvest Route Example\n");

    for days in [vec![1u8], vec![1, 2], vec![1, 2, 3]] {
        let selected: Vec<PlantedPoint> =
            schedule.select_for_days(&trees, &days).into_iter().cloned().collect();

        // Harvesters start from the middle of the map
        let plan = plan_greedy_tour(PlanarPoint::new(1000.0, 1000.0), &selected);
        let config = MapConfig::harvester();

        println!("Days {:?}: {} trees", days, plan.points.len());
        println!("   Route: {}", plan.summary());
        println!(
            "   Distance: {:.1} units ({:.1}m), approach {:.1} units",
            plan.total_distance,
            plan.total_distance_meters(&config),
            plan.approach_distance
        );

        let mut scene = MapScene::new(config, 1080.0, 1920.0);
        scene.set_points(selected);
        scene.set_path(plan.points.clone());
        let list = render_scene(&scene);
        println!(
            "   Draw list: {} path segments, {} arrowheads\n",
            list.count(Layer::Path),
            list.count(Layer::PathArrow)
        );
    }
}
